#![warn(clippy::pedantic)]

mod content;
mod error;
mod extract;
mod model;
mod portlet;
mod route;
mod session;
mod slug;
mod visibility;


use argon2::Argon2;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use content::ContentService;
use portlet::Registry;

pub use error::Error;

pub type Database = sqlx::Pool<sqlx::Sqlite>;
pub type AppState = State;

/// Site-wide presentation settings, read once at startup.
#[derive(Clone)]
pub struct Config {
	pub title: String,
	pub description: String,
	pub base_url: String,
}

impl Config {
	pub fn from_env() -> Self {
		Self {
			title: std::env::var("BLOG_TITLE").unwrap_or_else(|_| "Blog".to_string()),
			description: std::env::var("BLOG_DESCRIPTION").unwrap_or_default(),
			base_url: std::env::var("BASE_URL")
				.unwrap_or_else(|_| "http://localhost:3000".to_string()),
		}
	}
}

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as a database connection pool, a hash configuratin (if it's expensive to create),
/// or a cache client.
///
/// For dependencies only used by a single handler, you can combine states instead.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub content: ContentService,
	pub config: Config,
}

pub fn app(state: State) -> Router {
	Router::new()
		.merge(route::blog::routes())
		.nest("/auth", route::auth::routes())
		.nest("/admin", route::admin::routes())
		.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
		.with_state(state)
}

/// Creates the first user from ADMIN_USERNAME/ADMIN_PASSWORD when the user
/// table is empty, so a fresh database is usable without manual SQL.
async fn seed_admin(database: &Database, hasher: &Argon2<'_>) {
	let (Ok(username), Ok(password)) = (
		std::env::var("ADMIN_USERNAME"),
		std::env::var("ADMIN_PASSWORD"),
	) else {
		return;
	};

	let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "user""#)
		.fetch_one(database)
		.await
		.expect("failed to count users");

	if count > 0 {
		return;
	}

	let hash = route::auth::hash_password(hasher, &password).expect("failed to hash password");

	sqlx::query(r#"INSERT INTO "user" (username, password, created_at) VALUES (?, ?, ?)"#)
		.bind(&username)
		.bind(&hash)
		.bind(chrono::Utc::now())
		.execute(database)
		.await
		.expect("failed to seed admin user");

	tracing::info!(username, "seeded admin user");
}

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt::init();
	dotenvy::dotenv().ok();

	let database = Database::connect(
		&std::env::var("DATABASE_URL")
			.unwrap_or_else(|_| "sqlite://scrivano.db?mode=rwc".to_string()),
	)
	.await
	.expect("failed to connect to database");

	sqlx::migrate!()
		.run(&database)
		.await
		.expect("failed to run migrations");

	let hasher = Argon2::default();

	seed_admin(&database, &hasher).await;

	let state = State {
		content: ContentService::new(database.clone(), Registry::new()),
		config: Config::from_env(),
		database,
		hasher,
	};

	let app = app(state);

	let port = std::env::var("PORT").map_or_else(
		|_| 3000,
		|port| port.parse().expect("PORT must be a number"),
	);

	let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on port {}", port);

	axum::serve(listener, app).await.unwrap();
}
