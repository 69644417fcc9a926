use axum::{
	http::StatusCode,
	routing::{delete, get, post, put},
	Router,
};

use crate::AppState;

pub mod model;
pub mod route;

/// Back-office errors for the entities whose CRUD lives here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown page {0}")]
	UnknownPage(i64),
	#[error("unknown social button {0}")]
	UnknownSocialButton(i64),
	#[error("unknown slot {0}")]
	UnknownSlot(i64),
	#[error("slot name already in use")]
	SlotNameTaken,
}

impl Error {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPage(..) | Self::UnknownSocialButton(..) | Self::UnknownSlot(..) => {
				StatusCode::NOT_FOUND
			}
			Self::SlotNameTaken => StatusCode::CONFLICT,
		}
	}
}

pub fn routes() -> Router<AppState> {
	use route::*;

	Router::new()
		.route("/posts", get(list_posts).post(create_post))
		.route("/posts/:id", put(update_post).delete(delete_post))
		.route("/pages", get(list_pages).post(create_page))
		.route("/pages/:id", put(update_page).delete(delete_page))
		.route(
			"/social-buttons",
			get(list_social_buttons).post(create_social_button),
		)
		.route(
			"/social-buttons/:id",
			put(update_social_button).delete(delete_social_button),
		)
		.route("/slots", get(list_slots).post(create_slot))
		.route("/slots/:id", delete(delete_slot))
		.route("/portlets", get(list_portlets).post(create_portlet))
		.route("/portlets/:id", put(update_portlet).delete(delete_portlet))
		.route("/users", post(create_user))
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test(migrations = "./migrations")]
	async fn test_admin_requires_session(pool: Database) {
		let app = app(pool);

		let response = app.get("/admin/posts").await;
		assert_eq!(response.status_code(), 401);

		let response = app
			.post("/admin/posts")
			.json(&json!({ "title": "Sneaky", "body": "body" }))
			.await;
		assert_eq!(response.status_code(), 401);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_duplicate_title_conflicts(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);
		login(&app, "antonio", "hunter2hunter").await;

		let response = app
			.post("/admin/posts")
			.json(&json!({ "title": "My test Post", "body": "My Body" }))
			.await;
		assert_eq!(response.status_code(), 200);

		// Same title, same derived shortname: the UNIQUE constraint answers.
		let response = app
			.post("/admin/posts")
			.json(&json!({ "title": "My test Post", "body": "My Body" }))
			.await;
		assert_eq!(response.status_code(), 409);

		// A custom shortname sidesteps the collision.
		let response = app
			.post("/admin/posts")
			.json(&json!({
				"title": "My test Post",
				"body": "Body",
				"shortname": "Custom Short Name",
			}))
			.await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.json::<serde_json::Value>()["shortname"],
			"custom%20short%20name"
		);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_author_and_date_survive_updates(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);
		login(&app, "antonio", "hunter2hunter").await;

		let response = app
			.post("/admin/posts")
			.json(&json!({ "title": "Evergreen", "body": "body" }))
			.await;

		let created = response.json::<serde_json::Value>();
		assert_eq!(created["author"], "antonio");
		let date = created["date"].clone();

		let response = app
			.put(&format!("/admin/posts/{}", created["id"]))
			.json(&json!({ "title": "Evergreen, revised", "date": null }))
			.await;

		let updated = response.json::<serde_json::Value>();
		assert_eq!(updated["title"], "Evergreen, revised");
		assert_eq!(updated["author"], "antonio");
		assert_eq!(updated["date"], date);
		// The stored shortname is not re-derived from the new title.
		assert_eq!(updated["shortname"], "evergreen");
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_rejects_out_of_enum_values(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);
		login(&app, "antonio", "hunter2hunter").await;

		let response = app
			.post("/admin/posts")
			.json(&json!({ "title": "Bad", "body": "body", "state": "published" }))
			.await;
		assert_eq!(response.status_code(), 400);

		let response = app
			.post("/admin/posts")
			.json(&json!({ "title": "Bad", "body": "body", "type": "video" }))
			.await;
		assert_eq!(response.status_code(), 400);

		let response = app
			.post("/admin/pages")
			.json(&json!({ "category": "sideways-navigation" }))
			.await;
		assert_eq!(response.status_code(), 400);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_portlet_kind_is_checked_against_registry(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);
		login(&app, "antonio", "hunter2hunter").await;

		let response = app
			.post("/admin/portlets")
			.json(&json!({ "type": "marquee", "title": "Nope" }))
			.await;
		assert_eq!(response.status_code(), 400);

		// A text portlet without a body cannot render, so it is refused here.
		let response = app
			.post("/admin/portlets")
			.json(&json!({ "type": "text", "title": "Empty" }))
			.await;
		assert_eq!(response.status_code(), 400);

		let response = app
			.post("/admin/portlets")
			.json(&json!({ "type": "text", "title": "Welcome", "body": "hi" }))
			.await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<serde_json::Value>()["type"], "text");
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_page_can_be_unbound(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);
		login(&app, "antonio", "hunter2hunter").await;

		let response = app
			.post("/admin/posts")
			.json(&json!({ "title": "About", "body": "body", "type": "page" }))
			.await;
		let post_id = response.json::<serde_json::Value>()["id"].as_i64().unwrap();

		let response = app
			.post("/admin/pages")
			.json(&json!({ "post_id": post_id }))
			.await;
		assert_eq!(response.status_code(), 200);
		let id = response.json::<serde_json::Value>()["id"].as_i64().unwrap();

		// Omitting post_id keeps the binding.
		let response = app
			.put(&format!("/admin/pages/{id}"))
			.json(&json!({ "order": 2 }))
			.await;
		assert_eq!(
			response.json::<serde_json::Value>()["post_id"].as_i64(),
			Some(post_id)
		);

		// An explicit null unbinds it.
		let response = app
			.put(&format!("/admin/pages/{id}"))
			.json(&json!({ "post_id": null }))
			.await;
		assert_eq!(response.status_code(), 200);
		assert!(response.json::<serde_json::Value>()["post_id"].is_null());
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_slot_name_is_unique(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);
		login(&app, "antonio", "hunter2hunter").await;

		let response = app
			.post("/admin/slots")
			.json(&json!({ "name": "sidebar" }))
			.await;
		assert_eq!(response.status_code(), 200);

		let response = app
			.post("/admin/slots")
			.json(&json!({ "name": "sidebar", "description": "again" }))
			.await;
		assert_eq!(response.status_code(), 409);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_create_user(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);
		login(&app, "antonio", "hunter2hunter").await;

		let response = app
			.post("/admin/users")
			.json(&json!({ "username": "beatrice", "password": "hunter2hunter" }))
			.await;

		assert_eq!(response.status_code(), 200);

		let user = response.json::<serde_json::Value>();
		assert_eq!(user["username"], "beatrice");
		// The hash never leaves the server.
		assert!(user.get("password").is_none());

		let response = app
			.post("/admin/users")
			.json(&json!({ "username": "antonio", "password": "hunter2hunter" }))
			.await;

		assert_eq!(response.status_code(), 409);
	}
}
