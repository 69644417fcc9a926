use serde::{Deserialize, Serialize};

/// Publication state shared by posts, social buttons and portlets.
///
/// Stored as lowercase text; an out-of-enum value cannot be represented, so
/// it is rejected at the deserialization boundary instead of at save time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
	#[default]
	Private,
	Public,
}

/// The kind of a post. `Page` posts are navigational content and are
/// excluded from the front-page stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PostType {
	#[default]
	Standard,
	Image,
	Quote,
	Page,
	Flashnews,
}

impl PostType {
	/// Every kind that shows up in the content stream, i.e. everything
	/// except `Page`.
	pub const CONTENT: [PostType; 4] = [
		PostType::Standard,
		PostType::Image,
		PostType::Quote,
		PostType::Flashnews,
	];

	pub const ALL: [PostType; 5] = [
		PostType::Standard,
		PostType::Image,
		PostType::Quote,
		PostType::Page,
		PostType::Flashnews,
	];
}

/// Where a page is slotted in the navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum PageCategory {
	#[default]
	TopNavigation,
	BottomNavigation,
}

/// A single content item.
///
/// `shortname` is the unique, URL-safe lowercase identifier derived from the
/// title (or a custom override) through [`crate::slug::normalize`]; `author`
/// and `date` are populated once at creation and never overwritten by later
/// updates that omit them.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
	pub id: i64,
	pub shortname: String,
	pub title: String,
	pub description: Option<String>,
	pub body: String,
	pub show_full: bool,
	pub image: Option<String>,
	pub date: chrono::DateTime<chrono::Utc>,
	#[serde(rename = "type")]
	pub kind: PostType,
	pub state: Visibility,
	pub author: String,
}

/// A raw navigation row as stored, for the back-office.
///
/// `post_id` may reference a post of any kind; the public listing only
/// resolves the binding when the post is a [`PostType::Page`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Page {
	pub id: i64,
	pub category: PageCategory,
	pub order: i64,
	pub post_id: Option<i64>,
}

/// A navigation entry joined with its bound post.
///
/// A page row may reference any post, but the binding only resolves when the
/// referenced post's kind is [`PostType::Page`]; rows bound to anything else
/// behave as unbound and never appear in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PageNav {
	pub id: i64,
	pub category: PageCategory,
	pub order: i64,
	pub post_id: i64,
	pub post_title: String,
	pub post_shortname: String,
	pub post_state: Visibility,
}

/// A social link/icon shown in the page chrome.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SocialButton {
	pub id: i64,
	pub name: String,
	pub image: Option<String>,
	pub url: Option<String>,
	pub order: i64,
	pub disabled: bool,
	pub state: Visibility,
}

/// A named mounting point for portlets, e.g. "sidebar".
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PortletSlot {
	pub id: i64,
	pub name: String,
	pub description: Option<String>,
}

/// A pluggable content unit attached to a slot.
///
/// The `kind` discriminator names the registered variant (lowercase); how a
/// portlet turns into markup is owned by the matching renderer in
/// [`crate::portlet::Registry`]. The built-in `text` kind requires `body`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Portlet {
	pub id: i64,
	#[serde(rename = "type")]
	pub kind: String,
	pub state: Visibility,
	pub title: String,
	pub order: i64,
	pub slot_id: Option<i64>,
	pub body: Option<String>,
}

/// A registered back-office user.
///
/// The password hash is never serialized to the client.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
	pub id: i64,
	pub username: String,
	#[serde(skip_serializing)]
	pub password: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A login session, keyed by the opaque id stored in the session cookie.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Session {
	pub id: String,
	pub user_id: i64,
	pub created_at: chrono::DateTime<chrono::Utc>,
}
