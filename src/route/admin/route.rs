use argon2::Argon2;
use axum::{
	extract::{Path, State},
	http::StatusCode,
};

use super::{model, Error};
use crate::{
	content::{self, ContentService},
	extract::{Json, Session},
	model::{Page, Portlet, PortletSlot, Post, PostType, SocialButton, User},
	route::auth,
	visibility::Viewer,
	Database,
};

/// Every post, regardless of state or kind. The back-office sees the whole
/// table.
pub async fn list_posts(
	State(content): State<ContentService>,
	_session: Session,
) -> Result<Json<Vec<Post>>, crate::Error> {
	Ok(Json(
		content
			.list_posts(&PostType::ALL, &Viewer::anonymous(), true, true)
			.await?,
	))
}

pub async fn create_post(
	State(content): State<ContentService>,
	session: Session,
	Json(input): Json<model::CreatePost>,
) -> Result<Json<Post>, crate::Error> {
	Ok(Json(
		content.create_post(input, &session.user.username).await?,
	))
}

pub async fn update_post(
	State(content): State<ContentService>,
	_session: Session,
	Path(id): Path<i64>,
	Json(input): Json<model::UpdatePost>,
) -> Result<Json<Post>, crate::Error> {
	Ok(Json(content.update_post(id, input).await?))
}

pub async fn delete_post(
	State(content): State<ContentService>,
	_session: Session,
	Path(id): Path<i64>,
) -> Result<StatusCode, crate::Error> {
	content.delete_post(id).await?;

	Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pages(
	State(database): State<Database>,
	_session: Session,
) -> Result<Json<Vec<Page>>, crate::Error> {
	Ok(Json(
		sqlx::query_as::<_, Page>(r#"SELECT * FROM page ORDER BY "order", id"#)
			.fetch_all(&database)
			.await?,
	))
}

pub async fn create_page(
	State(database): State<Database>,
	_session: Session,
	Json(input): Json<model::CreatePage>,
) -> Result<Json<Page>, crate::Error> {
	let page = sqlx::query_as::<_, Page>(
		r#"INSERT INTO page (category, "order", post_id) VALUES (?, ?, ?) RETURNING *"#,
	)
	.bind(input.category)
	.bind(input.order)
	.bind(input.post_id)
	.fetch_one(&database)
	.await
	.map_err(|e| {
		if content::is_foreign_key_violation(&e) {
			crate::Error::from(content::Error::BadReference)
		} else {
			e.into()
		}
	})?;

	Ok(Json(page))
}

pub async fn update_page(
	State(database): State<Database>,
	_session: Session,
	Path(id): Path<i64>,
	Json(input): Json<model::UpdatePage>,
) -> Result<Json<Page>, crate::Error> {
	let page = sqlx::query_as::<_, Page>(
		r#"
		UPDATE page SET
			category = COALESCE(?, category),
			"order" = COALESCE(?, "order"),
			post_id = CASE WHEN ? THEN ? ELSE post_id END
		WHERE id = ?
		RETURNING *
		"#,
	)
	.bind(input.category)
	.bind(input.order)
	.bind(input.post_id.is_some())
	.bind(input.post_id.flatten())
	.bind(id)
	.fetch_optional(&database)
	.await
	.map_err(|e| {
		if content::is_foreign_key_violation(&e) {
			crate::Error::from(content::Error::BadReference)
		} else {
			e.into()
		}
	})?;

	Ok(Json(page.ok_or(Error::UnknownPage(id))?))
}

pub async fn delete_page(
	State(database): State<Database>,
	_session: Session,
	Path(id): Path<i64>,
) -> Result<StatusCode, crate::Error> {
	let result = sqlx::query("DELETE FROM page WHERE id = ?")
		.bind(id)
		.execute(&database)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::UnknownPage(id).into());
	}

	Ok(StatusCode::NO_CONTENT)
}

pub async fn list_social_buttons(
	State(content): State<ContentService>,
	_session: Session,
) -> Result<Json<Vec<SocialButton>>, crate::Error> {
	Ok(Json(
		content
			.list_social_buttons(&Viewer::anonymous(), true, true)
			.await?,
	))
}

pub async fn create_social_button(
	State(database): State<Database>,
	_session: Session,
	Json(input): Json<model::CreateSocialButton>,
) -> Result<Json<SocialButton>, crate::Error> {
	Ok(Json(
		sqlx::query_as::<_, SocialButton>(
			r#"
			INSERT INTO social_button (name, image, url, "order", disabled, state)
			VALUES (?, ?, ?, ?, ?, ?)
			RETURNING *
			"#,
		)
		.bind(&input.name)
		.bind(&input.image)
		.bind(&input.url)
		.bind(input.order)
		.bind(input.disabled)
		.bind(input.state)
		.fetch_one(&database)
		.await?,
	))
}

pub async fn update_social_button(
	State(database): State<Database>,
	_session: Session,
	Path(id): Path<i64>,
	Json(input): Json<model::UpdateSocialButton>,
) -> Result<Json<SocialButton>, crate::Error> {
	let button = sqlx::query_as::<_, SocialButton>(
		r#"
		UPDATE social_button SET
			name = COALESCE(?, name),
			image = COALESCE(?, image),
			url = COALESCE(?, url),
			"order" = COALESCE(?, "order"),
			disabled = COALESCE(?, disabled),
			state = COALESCE(?, state)
		WHERE id = ?
		RETURNING *
		"#,
	)
	.bind(&input.name)
	.bind(&input.image)
	.bind(&input.url)
	.bind(input.order)
	.bind(input.disabled)
	.bind(input.state)
	.bind(id)
	.fetch_optional(&database)
	.await?;

	Ok(Json(button.ok_or(Error::UnknownSocialButton(id))?))
}

pub async fn delete_social_button(
	State(database): State<Database>,
	_session: Session,
	Path(id): Path<i64>,
) -> Result<StatusCode, crate::Error> {
	let result = sqlx::query("DELETE FROM social_button WHERE id = ?")
		.bind(id)
		.execute(&database)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::UnknownSocialButton(id).into());
	}

	Ok(StatusCode::NO_CONTENT)
}

pub async fn list_slots(
	State(database): State<Database>,
	_session: Session,
) -> Result<Json<Vec<PortletSlot>>, crate::Error> {
	Ok(Json(
		sqlx::query_as::<_, PortletSlot>("SELECT * FROM portlet_slot ORDER BY id")
			.fetch_all(&database)
			.await?,
	))
}

pub async fn create_slot(
	State(database): State<Database>,
	_session: Session,
	Json(input): Json<model::CreateSlot>,
) -> Result<Json<PortletSlot>, crate::Error> {
	let slot = sqlx::query_as::<_, PortletSlot>(
		"INSERT INTO portlet_slot (name, description) VALUES (?, ?) RETURNING *",
	)
	.bind(&input.name)
	.bind(&input.description)
	.fetch_one(&database)
	.await
	.map_err(|e| {
		if content::is_unique_violation(&e) {
			crate::Error::from(Error::SlotNameTaken)
		} else {
			e.into()
		}
	})?;

	Ok(Json(slot))
}

/// Deleting a slot detaches its portlets (slot_id goes NULL through the
/// foreign key) rather than deleting them.
pub async fn delete_slot(
	State(database): State<Database>,
	_session: Session,
	Path(id): Path<i64>,
) -> Result<StatusCode, crate::Error> {
	let result = sqlx::query("DELETE FROM portlet_slot WHERE id = ?")
		.bind(id)
		.execute(&database)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::UnknownSlot(id).into());
	}

	Ok(StatusCode::NO_CONTENT)
}

/// Every portlet row, registered kind or not; the back-office must be able
/// to see rows whose renderer has gone away.
pub async fn list_portlets(
	State(database): State<Database>,
	_session: Session,
) -> Result<Json<Vec<Portlet>>, crate::Error> {
	Ok(Json(
		sqlx::query_as::<_, Portlet>("SELECT * FROM portlet ORDER BY id")
			.fetch_all(&database)
			.await?,
	))
}

pub async fn create_portlet(
	State(content): State<ContentService>,
	_session: Session,
	Json(input): Json<model::CreatePortlet>,
) -> Result<Json<Portlet>, crate::Error> {
	Ok(Json(content.create_portlet(input).await?))
}

pub async fn update_portlet(
	State(content): State<ContentService>,
	_session: Session,
	Path(id): Path<i64>,
	Json(input): Json<model::UpdatePortlet>,
) -> Result<Json<Portlet>, crate::Error> {
	Ok(Json(content.update_portlet(id, input).await?))
}

pub async fn delete_portlet(
	State(content): State<ContentService>,
	_session: Session,
	Path(id): Path<i64>,
) -> Result<StatusCode, crate::Error> {
	content.delete_portlet(id).await?;

	Ok(StatusCode::NO_CONTENT)
}

pub async fn create_user(
	State(database): State<Database>,
	State(hasher): State<Argon2<'static>>,
	_session: Session,
	Json(input): Json<model::CreateUser>,
) -> Result<Json<User>, crate::Error> {
	let password = auth::hash_password(&hasher, &input.password)?;

	// SQLite rejects a qualified star in RETURNING.
	let user = sqlx::query_as::<_, User>(
		r#"INSERT INTO "user" (username, password, created_at) VALUES (?, ?, ?) RETURNING *"#,
	)
	.bind(&input.username)
	.bind(&password)
	.bind(chrono::Utc::now())
	.fetch_one(&database)
	.await
	.map_err(|e| {
		if content::is_unique_violation(&e) {
			crate::Error::from(auth::Error::UsernameTaken)
		} else {
			e.into()
		}
	})?;

	Ok(Json(user))
}
