use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use serde::Serialize;

use crate::{content, portlet, route::admin, route::auth};

/// Error type for the application.
///
/// The Display trait is not sent to the client for server-side failures, so
/// those variants can show sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("auth error: {0}")]
	Auth(#[from] auth::Error),
	#[error("admin error: {0}")]
	Admin(#[from] admin::Error),
	#[error("content error: {0}")]
	Content(#[from] content::Error),
	#[error("portlet error: {0}")]
	Portlet(#[from] portlet::Error),
	#[error("not found")]
	NotFound,
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<String>,
}

impl Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Query(..) => StatusCode::BAD_REQUEST,
			Self::Auth(error) => error.status(),
			Self::Admin(error) => error.status(),
			Self::Content(error) => match error {
				content::Error::ShortnameTaken => StatusCode::CONFLICT,
				content::Error::UnknownPost(..) | content::Error::UnknownPortlet(..) => {
					StatusCode::NOT_FOUND
				}
				content::Error::UnknownKind(..)
				| content::Error::InvalidPortlet(..)
				| content::Error::BadReference => StatusCode::BAD_REQUEST,
				content::Error::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
			},
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::Portlet(..) | Self::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		// Server-side failures are logged and returned without detail.
		if status == StatusCode::INTERNAL_SERVER_ERROR {
			tracing::error!(error = %self, "internal error");

			return (
				status,
				Json(ErrorResponse {
					success: false,
					errors: Vec::new(),
				}),
			)
				.into_response();
		}

		let errors = match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors
						.iter()
						.map(move |error| format!("{field}: {error}"))
				})
				.collect(),
			error => vec![error.to_string()],
		};

		(
			status,
			Json(ErrorResponse {
				success: false,
				errors,
			}),
		)
			.into_response()
	}
}
