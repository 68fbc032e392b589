use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod models;
mod routes;
mod schema;
mod services;
mod store;

use config::AppConfig;
use services::clock::SystemClock;
use services::Services;
use store::pg::PgStore;
use vq_shared::clients::db::{create_pool, DbPool};
use vq_shared::clients::email::EmailClient;
use vq_shared::middleware::{HasJwtVerifier, JwtVerifier};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub services: Services,
    pub verifier: JwtVerifier,
    pub email: EmailClient,
}

impl HasJwtVerifier for AppState {
    fn jwt_verifier(&self) -> &JwtVerifier {
        &self.verifier
    }
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/checkusernameavailability", get(routes::register::check_username))
        .route(
            "/users",
            post(routes::register::register).put(routes::me::update_profile),
        )
        .route("/me", get(routes::me::me))
        .route("/login", post(routes::login::login))
        .route("/refreshtoken", post(routes::refresh::refresh_token))
        .route("/logout", post(routes::logout::logout))
        .route("/logoutall", post(routes::logout::logout_all))
        .route("/changepassword", post(routes::change_password::change_password))
        .route("/sendforgotpasswordemail", post(routes::forgot_password::forgot_password))
        .route("/resetpassword", post(routes::reset_password::reset_password))
        .route("/sendemailverificationemail", post(routes::verify_email::send_verification_email))
        .route("/verifyemail", post(routes::verify_email::verify_email))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    vq_shared::middleware::init_tracing("vq-auth");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let settings = config.token_settings();
    let verifier = JwtVerifier::new(&settings.secret);
    let services = Services::new(Arc::new(PgStore::new(db.clone())), settings, Arc::new(SystemClock));
    let email = EmailClient::new(&config.email_api_url, &config.email_api_key, &config.from_email, &config.from_name);

    let state = Arc::new(AppState { db, config, services, verifier, email });

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "vq-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
