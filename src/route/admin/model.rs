use serde::Deserialize;
use validator::Validate;

use crate::model::{PageCategory, Visibility};

pub use crate::content::{CreatePortlet, CreatePost, UpdatePortlet, UpdatePost};

fn one() -> i64 {
	1
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePage {
	#[serde(default)]
	pub category: PageCategory,
	#[serde(default = "one")]
	pub order: i64,
	pub post_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePage {
	pub category: Option<PageCategory>,
	pub order: Option<i64>,
	/// Omitted keeps the binding; an explicit `null` unbinds the page.
	#[serde(default, deserialize_with = "crate::content::explicit_null")]
	pub post_id: Option<Option<i64>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSocialButton {
	#[validate(length(min = 1, max = 25))]
	pub name: String,
	pub image: Option<String>,
	pub url: Option<String>,
	#[serde(default = "one")]
	pub order: i64,
	#[serde(default)]
	pub disabled: bool,
	#[serde(default)]
	pub state: Visibility,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSocialButton {
	#[validate(length(min = 1, max = 25))]
	pub name: Option<String>,
	pub image: Option<String>,
	pub url: Option<String>,
	pub order: Option<i64>,
	pub disabled: Option<bool>,
	pub state: Option<Visibility>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSlot {
	#[validate(length(min = 1, max = 25))]
	pub name: String,
	pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
	#[validate(length(min = 1, max = 16))]
	pub username: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}
