use axum::{
	extract::{Path, State},
	http::header,
	response::{IntoResponse, Redirect, Response},
	routing::get,
	Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
	content::ContentService,
	extract::{Json, Query},
	model::{PageNav, Portlet, Post, SocialButton},
	visibility::Viewer,
	AppState, Config, Error,
};

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/", get(index))
		.route("/post/:key", get(post))
		.route("/slot/:name", get(slot))
		.route("/feed", get(feed))
}

#[derive(Debug, Deserialize, Validate)]
pub struct IndexQuery {
	pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
	pub posts: Vec<Post>,
	pub pages: Vec<PageNav>,
	pub social_buttons: Vec<SocialButton>,
}

/// The front page: the ordered visible content stream plus navigation and
/// chrome, optionally paginated. A page number past the end (or below 1) is
/// a 404; a non-numeric one never reaches us (400 at deserialization).
async fn index(
	State(content): State<ContentService>,
	viewer: Viewer,
	Query(query): Query<IndexQuery>,
) -> Result<Json<IndexResponse>, Error> {
	let set = content.page_render_set(&viewer, None, query.page).await?;

	// The empty first page of an empty blog is fine; every other empty page
	// means the caller walked off the end.
	if set.posts.is_empty() && query.page.is_some_and(|page| page != 1) {
		return Err(Error::NotFound);
	}

	Ok(Json(IndexResponse {
		posts: set.posts,
		pages: set.pages,
		social_buttons: set.social_buttons,
	}))
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
	pub post: Post,
	pub pages: Vec<PageNav>,
	pub social_buttons: Vec<SocialButton>,
}

/// A single post, addressed by numeric id or by shortname.
///
/// Ids redirect to the canonical shortname URL. Missing and invisible posts
/// are the same 404.
async fn post(
	State(content): State<ContentService>,
	viewer: Viewer,
	Path(key): Path<String>,
) -> Result<Response, Error> {
	if let Ok(id) = key.parse::<i64>() {
		let post = content
			.post_by_id(id, &viewer)
			.await?
			.ok_or(Error::NotFound)?;

		return Ok(Redirect::temporary(&format!("/post/{}", post.shortname)).into_response());
	}

	// The router hands the path segment over percent-decoded; normalizing it
	// again (idempotent) recovers the stored shortname form.
	let post = content
		.post_by_shortname(&crate::slug::normalize(&key), &viewer)
		.await?
		.ok_or(Error::NotFound)?;

	let set = content
		.page_render_set(&viewer, Some(post.clone()), None)
		.await?;

	Ok(Json(PostResponse {
		post,
		pages: set.pages,
		social_buttons: set.social_buttons,
	})
	.into_response())
}

#[derive(Debug, Serialize)]
pub struct RenderedPortlet {
	#[serde(flatten)]
	pub portlet: Portlet,
	pub html: String,
}

/// The visible portlets of a named slot, in order, with their rendered
/// fragments. An unknown slot is an empty list, not an error.
async fn slot(
	State(content): State<ContentService>,
	viewer: Viewer,
	Path(name): Path<String>,
) -> Result<Json<Vec<RenderedPortlet>>, Error> {
	let portlets = content
		.list_portlets_for_slot(&name, &viewer, false, true)
		.await?;

	let rendered = portlets
		.into_iter()
		.map(|portlet| {
			Ok(RenderedPortlet {
				html: content.registry().render(&portlet)?,
				portlet,
			})
		})
		.collect::<Result<Vec<_>, crate::portlet::Error>>()?;

	Ok(Json(rendered))
}

/// RSS 2.0 feed of the visible content stream, newest first.
async fn feed(
	State(content): State<ContentService>,
	State(config): State<Config>,
	viewer: Viewer,
) -> Result<Response, Error> {
	let posts = content.list_all_content_posts(&viewer, false, true).await?;
	let xml = render_feed(&config, &posts);

	Ok(([(header::CONTENT_TYPE, "application/rss+xml")], xml).into_response())
}

fn xml_escape(value: &str) -> String {
	value
		.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

fn render_feed(config: &Config, posts: &[Post]) -> String {
	let mut items = String::new();

	for post in posts {
		// Posts are linked by id; the route redirects to the shortname.
		let link = format!("{}/post/{}", config.base_url, post.id);

		items.push_str(&format!(
			"<item><title>{}</title><link>{}</link><guid>{}</guid>\
			 <description>{}</description><pubDate>{}</pubDate></item>",
			xml_escape(&post.title),
			link,
			link,
			xml_escape(post.description.as_deref().unwrap_or_default()),
			post.date.to_rfc2822(),
		));
	}

	format!(
		"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
		 <rss version=\"2.0\"><channel><title>{}</title><link>{}</link>\
		 <description>{}</description><lastBuildDate>{}</lastBuildDate>{}</channel></rss>",
		xml_escape(&config.title),
		config.base_url,
		xml_escape(&config.description),
		Utc::now().to_rfc2822(),
		items,
	)
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test(migrations = "./migrations")]
	async fn test_private_post_hidden_until_published(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let admin = app(pool.clone());
		login(&admin, "antonio", "hunter2hunter").await;

		let response = admin
			.post("/admin/posts")
			.json(&json!({ "title": "Alpha", "body": "first post" }))
			.await;

		assert_eq!(response.status_code(), 200);
		let id = response.json::<serde_json::Value>()["id"].as_i64().unwrap();

		// Anonymous server: the default-private post is invisible.
		let anon = app(pool.clone());

		let response = anon.get("/").await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.json::<serde_json::Value>()["posts"]
				.as_array()
				.unwrap()
				.len(),
			0
		);

		let response = anon.get("/post/alpha").await;
		assert_eq!(response.status_code(), 404);

		// The author still sees it.
		let response = admin.get("/post/alpha").await;
		assert_eq!(response.status_code(), 200);

		// Publish, then anonymous sees exactly one post named Alpha.
		let response = admin
			.put(&format!("/admin/posts/{id}"))
			.json(&json!({ "state": "public" }))
			.await;

		assert_eq!(response.status_code(), 200);

		let response = anon.get("/").await;
		let posts = response.json::<serde_json::Value>();
		let posts = posts["posts"].as_array().unwrap();

		assert_eq!(posts.len(), 1);
		assert_eq!(posts[0]["title"], "Alpha");
		assert_eq!(posts[0]["shortname"], "alpha");
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_post_id_redirects_to_shortname(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let admin = app(pool.clone());
		login(&admin, "antonio", "hunter2hunter").await;

		let response = admin
			.post("/admin/posts")
			.json(&json!({ "title": "My test Post", "body": "body", "state": "public" }))
			.await;

		let id = response.json::<serde_json::Value>()["id"].as_i64().unwrap();

		let anon = app(pool);
		let response = anon.get(&format!("/post/{id}")).await;

		assert_eq!(response.status_code(), 307);
		assert_eq!(
			response.header("location").to_str().unwrap(),
			"/post/my%20test%20post"
		);

		let response = anon.get("/post/my%20test%20post").await;
		assert_eq!(response.status_code(), 200);

		let response = anon.get("/post/unknown").await;
		assert_eq!(response.status_code(), 404);

		let response = anon.get("/post/42").await;
		assert_eq!(response.status_code(), 404);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_pagination(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let admin = app(pool.clone());
		login(&admin, "antonio", "hunter2hunter").await;

		for n in 0..5 {
			let response = admin
				.post("/admin/posts")
				.json(&json!({
					"title": format!("Post {n}"),
					"body": "body",
					"state": "public",
				}))
				.await;

			assert_eq!(response.status_code(), 200);
		}

		let anon = app(pool);

		let response = anon.get("/").await;
		assert_eq!(
			response.json::<serde_json::Value>()["posts"]
				.as_array()
				.unwrap()
				.len(),
			5
		);

		let response = anon.get("/").add_query_param("page", 1).await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.json::<serde_json::Value>()["posts"]
				.as_array()
				.unwrap()
				.len(),
			4
		);

		let response = anon.get("/").add_query_param("page", 2).await;
		assert_eq!(
			response.json::<serde_json::Value>()["posts"]
				.as_array()
				.unwrap()
				.len(),
			1
		);

		// Off the end, below 1: the caller-side NotFound.
		assert_eq!(
			anon.get("/").add_query_param("page", 3).await.status_code(),
			404
		);
		assert_eq!(
			anon.get("/").add_query_param("page", 0).await.status_code(),
			404
		);
		assert_eq!(
			anon.get("/").add_query_param("page", "x").await.status_code(),
			400
		);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_feed(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let admin = app(pool.clone());
		login(&admin, "antonio", "hunter2hunter").await;

		let response = admin
			.post("/admin/posts")
			.json(&json!({
				"title": "Fish & Chips",
				"body": "body",
				"description": "a <description>",
				"state": "public",
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		let anon = app(pool);
		let response = anon.get("/feed").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.header("content-type").to_str().unwrap(),
			"application/rss+xml"
		);

		let body = response.text();

		assert!(body.contains("<rss version=\"2.0\">"));
		assert!(body.contains("Fish &amp; Chips"));
		assert!(body.contains("a &lt;description&gt;"));
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_unknown_slot_is_empty(pool: Database) {
		let app = app(pool);

		let response = app.get("/slot/nonexistent").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.json::<serde_json::Value>().as_array().unwrap().len(),
			0
		);
	}
}
