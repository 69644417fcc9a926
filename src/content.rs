use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::{
	model::{PageNav, Portlet, PortletSlot, Post, PostType, SocialButton, Visibility},
	portlet::{self, Registry},
	slug,
	visibility::{visible, Viewer},
	Database,
};

/// Fixed number of posts per front page.
pub const PAGE_SIZE: i64 = 4;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("shortname already in use")]
	ShortnameTaken,
	#[error("unknown post {0}")]
	UnknownPost(i64),
	#[error("unknown portlet {0}")]
	UnknownPortlet(i64),
	#[error("unknown portlet kind `{0}`")]
	UnknownKind(String),
	#[error("invalid portlet: {0}")]
	InvalidPortlet(portlet::Error),
	#[error("referenced row does not exist")]
	BadReference,
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
	matches!(error, sqlx::Error::Database(e) if e.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
	matches!(error, sqlx::Error::Database(e) if e.is_foreign_key_violation())
}

/// Deserializes a field so that an omitted key and an explicit `null` are
/// distinguishable, letting an update clear a nullable foreign key.
pub(crate) fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
	T: serde::Deserialize<'de>,
	D: serde::Deserializer<'de>,
{
	serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Payload for the explicit post factory step.
///
/// Shortname, author and date are derived here, once, instead of being
/// populated as a side effect of field assignment: the shortname comes from
/// the custom override or the title through [`slug::normalize`], the author
/// from the acting user, the date from the payload or "now".
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePost {
	#[validate(length(min = 1, max = 120))]
	pub title: String,
	#[validate(length(min = 1, max = 120))]
	pub shortname: Option<String>,
	pub description: Option<String>,
	#[validate(length(min = 1))]
	pub body: String,
	#[serde(default)]
	pub show_full: bool,
	pub image: Option<String>,
	pub date: Option<DateTime<Utc>>,
	#[serde(default, rename = "type")]
	pub kind: PostType,
	#[serde(default)]
	pub state: Visibility,
}

/// Partial update; omitted fields keep their stored value. There is no way
/// to clear the date or reassign the author.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePost {
	#[validate(length(min = 1, max = 120))]
	pub title: Option<String>,
	#[validate(length(min = 1, max = 120))]
	pub shortname: Option<String>,
	pub description: Option<String>,
	#[validate(length(min = 1))]
	pub body: Option<String>,
	pub show_full: Option<bool>,
	pub image: Option<String>,
	pub date: Option<DateTime<Utc>>,
	#[serde(rename = "type")]
	pub kind: Option<PostType>,
	pub state: Option<Visibility>,
}

fn one() -> i64 {
	1
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePortlet {
	#[serde(rename = "type")]
	pub kind: String,
	#[validate(length(min = 1, max = 120))]
	pub title: String,
	#[serde(default)]
	pub state: Visibility,
	#[serde(default = "one")]
	pub order: i64,
	pub slot_id: Option<i64>,
	pub body: Option<String>,
}

/// Partial portlet update. The kind tag is the variant's identity and is not
/// updatable.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePortlet {
	#[validate(length(min = 1, max = 120))]
	pub title: Option<String>,
	pub state: Option<Visibility>,
	pub order: Option<i64>,
	/// Omitted keeps the binding; an explicit `null` detaches the portlet
	/// from its slot.
	#[serde(default, deserialize_with = "explicit_null")]
	pub slot_id: Option<Option<i64>>,
	pub body: Option<String>,
}

/// Everything a page template needs, assembled in one call.
///
/// `portlets_for_slot` is the slot lookup capability with the viewer already
/// bound, so the rendering layer never re-decides visibility.
pub struct RenderSet {
	pub post: Option<Post>,
	pub posts: Vec<Post>,
	pub pages: Vec<PageNav>,
	pub social_buttons: Vec<SocialButton>,
	service: ContentService,
	viewer: Viewer,
}

impl RenderSet {
	pub async fn portlets_for_slot(&self, name: &str) -> Result<Vec<Portlet>, Error> {
		self.service
			.list_portlets_for_slot(name, &self.viewer, false, true)
			.await
	}
}

/// The content aggregator: every read goes through the visibility policy,
/// every write is a single all-or-nothing statement with uniqueness left to
/// the storage constraints.
#[derive(Clone)]
pub struct ContentService {
	database: Database,
	registry: Arc<Registry>,
}

impl ContentService {
	pub fn new(database: Database, registry: Registry) -> Self {
		Self {
			database,
			registry: Arc::new(registry),
		}
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	/// Posts whose kind is in `kinds`, filtered by the visibility policy
	/// unless `unrestricted`; `ordered` sorts by date descending with the
	/// identifier as a stable tiebreak.
	pub async fn list_posts(
		&self,
		kinds: &[PostType],
		viewer: &Viewer,
		unrestricted: bool,
		ordered: bool,
	) -> Result<Vec<Post>, Error> {
		if kinds.is_empty() {
			return Ok(Vec::new());
		}

		let mut query = sqlx::QueryBuilder::new("SELECT * FROM post WHERE kind IN (");

		{
			let mut separated = query.separated(", ");
			for kind in kinds {
				separated.push_bind(*kind);
			}
		}

		query.push(")");

		if ordered {
			query.push(" ORDER BY date DESC, id");
		}

		let posts: Vec<Post> = query.build_query_as().fetch_all(&self.database).await?;

		Ok(posts
			.into_iter()
			.filter(|post| visible(post, viewer, unrestricted))
			.collect())
	}

	/// Convenience: every post kind except `page`.
	pub async fn list_all_content_posts(
		&self,
		viewer: &Viewer,
		unrestricted: bool,
		ordered: bool,
	) -> Result<Vec<Post>, Error> {
		self.list_posts(&PostType::CONTENT, viewer, unrestricted, ordered)
			.await
	}

	/// Navigation pages whose bound post resolves (kind == `page`), filtered
	/// through the bound post's visibility. Pages bound to a non-page post,
	/// or to nothing, are silently dropped.
	pub async fn list_pages(
		&self,
		viewer: &Viewer,
		unrestricted: bool,
		ordered: bool,
	) -> Result<Vec<PageNav>, Error> {
		let mut sql = String::from(
			r#"
			SELECT page.id AS id, page.category AS category, page."order" AS "order",
			       post.id AS post_id, post.title AS post_title,
			       post.shortname AS post_shortname, post.state AS post_state
			FROM page
			JOIN post ON post.id = page.post_id AND post.kind = ?
			"#,
		);

		if ordered {
			sql.push_str(r#" ORDER BY page."order", page.id"#);
		}

		let pages: Vec<PageNav> = sqlx::query_as(&sql)
			.bind(PostType::Page)
			.fetch_all(&self.database)
			.await?;

		Ok(pages
			.into_iter()
			.filter(|page| visible(page, viewer, unrestricted))
			.collect())
	}

	pub async fn list_social_buttons(
		&self,
		viewer: &Viewer,
		unrestricted: bool,
		ordered: bool,
	) -> Result<Vec<SocialButton>, Error> {
		let sql = if ordered {
			r#"SELECT * FROM social_button ORDER BY "order", id"#
		} else {
			"SELECT * FROM social_button"
		};

		let buttons: Vec<SocialButton> =
			sqlx::query_as(sql).fetch_all(&self.database).await?;

		Ok(buttons
			.into_iter()
			.filter(|button| visible(button, viewer, unrestricted))
			.collect())
	}

	pub async fn slot_by_name(&self, name: &str) -> Result<Option<PortletSlot>, Error> {
		Ok(
			sqlx::query_as::<_, PortletSlot>("SELECT * FROM portlet_slot WHERE name = ?")
				.bind(name)
				.fetch_optional(&self.database)
				.await?,
		)
	}

	/// Portlets of every registered kind attached to the named slot.
	///
	/// An unknown slot name yields an empty list, not an error. The kinds are
	/// collected in one discriminator query (stable id order), filtered by
	/// visibility, and only then sorted by the portlet order when `ordered` —
	/// filter-before-final-sort is part of the contract.
	pub async fn list_portlets_for_slot(
		&self,
		name: &str,
		viewer: &Viewer,
		unrestricted: bool,
		ordered: bool,
	) -> Result<Vec<Portlet>, Error> {
		let Some(slot) = self.slot_by_name(name).await? else {
			return Ok(Vec::new());
		};

		let mut query = sqlx::QueryBuilder::new("SELECT * FROM portlet WHERE slot_id = ");

		query.push_bind(slot.id);
		query.push(" AND kind IN (");

		{
			let mut separated = query.separated(", ");
			for kind in self.registry.kinds() {
				separated.push_bind(kind);
			}
		}

		query.push(") ORDER BY id");

		let portlets: Vec<Portlet> = query.build_query_as().fetch_all(&self.database).await?;

		let mut portlets: Vec<Portlet> = portlets
			.into_iter()
			.filter(|portlet| visible(portlet, viewer, unrestricted))
			.collect();

		if ordered {
			// Vec::sort_by_key is stable, so equal orders keep id order.
			portlets.sort_by_key(|portlet| portlet.order);
		}

		Ok(portlets)
	}

	/// A post by id, already filtered by visibility: an invisible post is
	/// indistinguishable from a missing one.
	pub async fn post_by_id(&self, id: i64, viewer: &Viewer) -> Result<Option<Post>, Error> {
		let post = sqlx::query_as::<_, Post>("SELECT * FROM post WHERE id = ?")
			.bind(id)
			.fetch_optional(&self.database)
			.await?;

		Ok(post.filter(|post| visible(post, viewer, false)))
	}

	pub async fn post_by_shortname(
		&self,
		shortname: &str,
		viewer: &Viewer,
	) -> Result<Option<Post>, Error> {
		let post = sqlx::query_as::<_, Post>("SELECT * FROM post WHERE shortname = ?")
			.bind(shortname)
			.fetch_optional(&self.database)
			.await?;

		Ok(post.filter(|post| visible(post, viewer, false)))
	}

	/// The single call a page-rendering view needs.
	///
	/// With a target post the stream is skipped (the caller has already
	/// resolved visibility for it); otherwise the ordered visible stream is
	/// returned, sliced to the requested page when `page_number` is given.
	/// An empty slice is returned as-is; whether that is a NotFound is the
	/// caller's decision.
	pub async fn page_render_set(
		&self,
		viewer: &Viewer,
		post: Option<Post>,
		page_number: Option<i64>,
	) -> Result<RenderSet, Error> {
		let posts = if post.is_some() {
			Vec::new()
		} else {
			let posts = self.list_all_content_posts(viewer, false, true).await?;

			match page_number {
				None => posts,
				Some(page) if page < 1 => Vec::new(),
				Some(page) => posts
					.into_iter()
					.skip(((page - 1) * PAGE_SIZE) as usize)
					.take(PAGE_SIZE as usize)
					.collect(),
			}
		};

		Ok(RenderSet {
			post,
			posts,
			pages: self.list_pages(viewer, false, true).await?,
			social_buttons: self.list_social_buttons(viewer, false, true).await?,
			service: self.clone(),
			viewer: viewer.clone(),
		})
	}

	/// Creates a post. The duplicate-shortname check is *not* made in
	/// advance; the UNIQUE constraint violation at insert time is the only
	/// uniqueness signal.
	pub async fn create_post(&self, input: CreatePost, author: &str) -> Result<Post, Error> {
		let shortname = slug::normalize(input.shortname.as_deref().unwrap_or(&input.title));
		let date = input.date.unwrap_or_else(Utc::now);

		sqlx::query_as::<_, Post>(
			r#"
			INSERT INTO post (shortname, title, description, body, show_full, image, date, kind, state, author)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			RETURNING *
			"#,
		)
		.bind(shortname)
		.bind(&input.title)
		.bind(&input.description)
		.bind(&input.body)
		.bind(input.show_full)
		.bind(&input.image)
		.bind(date)
		.bind(input.kind)
		.bind(input.state)
		.bind(author)
		.fetch_one(&self.database)
		.await
		.map_err(|e| {
			if is_unique_violation(&e) {
				Error::ShortnameTaken
			} else {
				e.into()
			}
		})
	}

	/// Updates a post. A changed title does not re-derive the stored
	/// shortname; an explicit shortname goes through normalization again.
	pub async fn update_post(&self, id: i64, input: UpdatePost) -> Result<Post, Error> {
		let shortname = input.shortname.as_deref().map(slug::normalize);

		let post = sqlx::query_as::<_, Post>(
			r#"
			UPDATE post SET
				shortname = COALESCE(?, shortname),
				title = COALESCE(?, title),
				description = COALESCE(?, description),
				body = COALESCE(?, body),
				show_full = COALESCE(?, show_full),
				image = COALESCE(?, image),
				date = COALESCE(?, date),
				kind = COALESCE(?, kind),
				state = COALESCE(?, state)
			WHERE id = ?
			RETURNING *
			"#,
		)
		.bind(shortname)
		.bind(&input.title)
		.bind(&input.description)
		.bind(&input.body)
		.bind(input.show_full)
		.bind(&input.image)
		.bind(input.date)
		.bind(input.kind)
		.bind(input.state)
		.bind(id)
		.fetch_optional(&self.database)
		.await
		.map_err(|e| {
			if is_unique_violation(&e) {
				Error::ShortnameTaken
			} else {
				Error::from(e)
			}
		})?;

		post.ok_or(Error::UnknownPost(id))
	}

	pub async fn delete_post(&self, id: i64) -> Result<(), Error> {
		let result = sqlx::query("DELETE FROM post WHERE id = ?")
			.bind(id)
			.execute(&self.database)
			.await?;

		if result.rows_affected() == 0 {
			return Err(Error::UnknownPost(id));
		}

		Ok(())
	}

	/// Creates a portlet after checking the kind against the registry and
	/// running the variant's own field check, so a row that cannot render is
	/// never stored. The registry plays no part in building the query.
	pub async fn create_portlet(&self, input: CreatePortlet) -> Result<Portlet, Error> {
		if !self.registry.contains(&input.kind) {
			return Err(Error::UnknownKind(input.kind));
		}

		self.registry
			.validate(&input.kind, input.body.as_deref())
			.map_err(Error::InvalidPortlet)?;

		Ok(sqlx::query_as::<_, Portlet>(
			r#"
			INSERT INTO portlet (kind, state, title, "order", slot_id, body)
			VALUES (?, ?, ?, ?, ?, ?)
			RETURNING *
			"#,
		)
		.bind(&input.kind)
		.bind(input.state)
		.bind(&input.title)
		.bind(input.order)
		.bind(input.slot_id)
		.bind(&input.body)
		.fetch_one(&self.database)
		.await
		.map_err(|e| {
			if is_foreign_key_violation(&e) {
				Error::BadReference
			} else {
				Error::from(e)
			}
		})?)
	}

	pub async fn update_portlet(&self, id: i64, input: UpdatePortlet) -> Result<Portlet, Error> {
		let portlet = sqlx::query_as::<_, Portlet>(
			r#"
			UPDATE portlet SET
				state = COALESCE(?, state),
				title = COALESCE(?, title),
				"order" = COALESCE(?, "order"),
				slot_id = CASE WHEN ? THEN ? ELSE slot_id END,
				body = COALESCE(?, body)
			WHERE id = ?
			RETURNING *
			"#,
		)
		.bind(input.state)
		.bind(&input.title)
		.bind(input.order)
		.bind(input.slot_id.is_some())
		.bind(input.slot_id.flatten())
		.bind(&input.body)
		.bind(id)
		.fetch_optional(&self.database)
		.await
		.map_err(|e| {
			if is_foreign_key_violation(&e) {
				Error::BadReference
			} else {
				Error::from(e)
			}
		})?;

		portlet.ok_or(Error::UnknownPortlet(id))
	}

	pub async fn delete_portlet(&self, id: i64) -> Result<(), Error> {
		let result = sqlx::query("DELETE FROM portlet WHERE id = ?")
			.bind(id)
			.execute(&self.database)
			.await?;

		if result.rows_affected() == 0 {
			return Err(Error::UnknownPortlet(id));
		}

		Ok(())
	}
}
