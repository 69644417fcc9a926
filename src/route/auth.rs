use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};
use axum::{
	extract::State,
	http::{header, StatusCode},
	response::IntoResponse,
	routing::{get, post},
	Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
	extract::{Json, Session},
	model, session, AppState, Database,
};

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not
/// contain sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid username or password")]
	InvalidUsernameOrPassword,
	#[error("password hash error")]
	Hash,
	#[error("no session cookie")]
	NoSessionCookie,
	#[error("invalid session cookie")]
	InvalidSessionCookie,
	#[error("username already taken")]
	UsernameTaken,
}

impl Error {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::InvalidUsernameOrPassword
			| Self::NoSessionCookie
			| Self::InvalidSessionCookie => StatusCode::UNAUTHORIZED,
			Self::Hash => StatusCode::INTERNAL_SERVER_ERROR,
			Self::UsernameTaken => StatusCode::CONFLICT,
		}
	}
}

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/login", post(login))
		.route("/logout", get(logout))
}

/// Hashes a password into its PHC string form for storage.
pub fn hash_password(hasher: &Argon2<'_>, password: &str) -> Result<String, Error> {
	let salt = SaltString::generate(&mut OsRng);

	Ok(hasher
		.hash_password(password.as_bytes(), &salt)
		.map_err(|_| Error::Hash)?
		.to_string())
}

pub fn verify_password(hasher: &Argon2<'_>, password: &str, hash: &str) -> bool {
	PasswordHash::new(hash)
		.map(|parsed| hasher.verify_password(password.as_bytes(), &parsed).is_ok())
		.unwrap_or(false)
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
	#[validate(length(min = 1, max = 16))]
	pub username: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
}

/// Logs in, returning the new session and its cookie. Bad usernames and bad
/// passwords are deliberately indistinguishable.
async fn login(
	State(state): State<AppState>,
	Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse, crate::Error> {
	let user = sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE username = ?"#)
		.bind(&input.username)
		.fetch_optional(&state.database)
		.await?
		.ok_or(Error::InvalidUsernameOrPassword)?;

	if !verify_password(&state.hasher, &input.password, &user.password) {
		return Err(Error::InvalidUsernameOrPassword.into());
	}

	let session = sqlx::query_as::<_, model::Session>(
		"INSERT INTO session (id, user_id, created_at) VALUES (?, ?, ?) RETURNING *",
	)
	.bind(Uuid::new_v4().to_string())
	.bind(user.id)
	.bind(Utc::now())
	.fetch_one(&state.database)
	.await?;

	let cookie = session::create_cookie(&session.id);

	Ok(([(header::SET_COOKIE, cookie.to_string())], Json(session)))
}

/// Logs out of the authenticated session and clears the cookie.
async fn logout(
	State(database): State<Database>,
	session: Session,
) -> Result<impl IntoResponse, crate::Error> {
	sqlx::query("DELETE FROM session WHERE id = ?")
		.bind(&session.id)
		.execute(&database)
		.await?;

	Ok((
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		StatusCode::NO_CONTENT,
	))
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test(migrations = "./migrations")]
	async fn test_login_flow(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);

		let response = app
			.post("/auth/login")
			.json(&json!({
				"username": "antonio",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		assert!(response
			.header("set-cookie")
			.to_str()
			.unwrap()
			.contains("session="));

		let response = app.get("/auth/logout").await;

		assert_eq!(response.status_code(), 204);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_bad_credentials(pool: Database) {
		seed_user(&pool, "antonio", "hunter2hunter").await;

		let app = app(pool);

		let response = app
			.post("/auth/login")
			.json(&json!({
				"username": "antonio",
				"password": "wrong password",
			}))
			.await;

		assert_eq!(response.status_code(), 401);

		let response = app
			.post("/auth/login")
			.json(&json!({
				"username": "nobody",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 401);
	}

	#[sqlx::test(migrations = "./migrations")]
	async fn test_logout_requires_session(pool: Database) {
		let app = app(pool);

		let response = app.get("/auth/logout").await;

		assert_eq!(response.status_code(), 401);
	}
}
