use axum::{
	body::Body,
	extract::{FromRef, FromRequest, FromRequestParts, Request},
	http::{header, request, Response},
	response::IntoResponse,
};
use serde::de;

use crate::{model::User, route::auth, session, visibility::Viewer, Database, Error};

/// Extractor that deserializes a JSON body and validates it.
///
/// ```rust,ignore
/// async fn route(Json(input): Json<CreatePost>) {
///   // ...
/// }
/// ```
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
	T: serde::Serialize,
{
	fn into_response(self) -> Response<Body> {
		axum::Json(self.0).into_response()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
	T: de::DeserializeOwned + validator::Validate,
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;

		value.validate()?;
		Ok(Self(value))
	}
}

/// Extractor that deserializes a query string and validates it.
///
/// This is similar to [`Json<T>`], but does not consume the body.
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
	T: de::DeserializeOwned + validator::Validate,
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let axum::extract::Query(value) =
			axum::extract::Query::<T>::from_request_parts(parts, state).await?;

		value.validate()?;
		Ok(Self(value))
	}
}

/// Pulls the session id out of the request's cookie headers, if any.
fn session_cookie(parts: &request::Parts) -> Option<String> {
	parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == session::COOKIE_NAME)
		.map(|cookie| cookie.value().to_string())
}

async fn user_for_session(database: &Database, session_id: &str) -> Result<Option<User>, Error> {
	Ok(sqlx::query_as::<_, User>(
		r#"
		SELECT "user".* FROM "user"
		JOIN session ON session.user_id = "user".id
		WHERE session.id = ?
		"#,
	)
	.bind(session_id)
	.fetch_optional(database)
	.await?)
}

/// Extracts the session and related user from the request, rejecting
/// unauthenticated callers.
///
/// If no cookie is present, [`auth::Error::NoSessionCookie`] is returned.
/// If the session does not resolve, [`auth::Error::InvalidSessionCookie`].
#[derive(Debug)]
pub struct Session {
	pub id: String,
	pub user: User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let id = session_cookie(parts).ok_or(auth::Error::NoSessionCookie)?;
		let database = Database::from_ref(state);
		let user = user_for_session(&database, &id)
			.await?
			.ok_or(auth::Error::InvalidSessionCookie)?;

		Ok(Self { id, user })
	}
}

/// Extracts the caller identity for visibility filtering.
///
/// Unlike [`Session`], an absent or stale cookie is not an error: the caller
/// is simply anonymous.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Viewer
where
	Database: FromRef<S>,
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let Some(id) = session_cookie(parts) else {
			return Ok(Viewer::anonymous());
		};

		let database = Database::from_ref(state);

		Ok(user_for_session(&database, &id)
			.await?
			.map_or_else(Viewer::anonymous, Viewer::authenticated))
	}
}
