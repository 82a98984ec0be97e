use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Router,
};
use server_api::ApiContext;
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

const MAX_BODY_BYTES: usize = 256 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let credentials = settings.credentials();
    if credentials.is_none() {
        warn!("basic auth is not configured; /api is open");
    }
    let state = AppState {
        api: ApiContext::new(storage).with_page_size(settings.page_size),
        credentials,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, page_size = settings.page_size, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/campaigns",
            get(api::campaigns::list).post(api::campaigns::create),
        )
        .route(
            "/campaigns/:campaign_id",
            get(api::campaigns::show)
                .put(api::campaigns::update)
                .delete(api::campaigns::destroy),
        )
        .route(
            "/campaigns/:campaign_id/lists",
            get(api::lists::campaign_lists),
        )
        .route(
            "/campaigns/:campaign_id/lists/:list_id",
            put(api::lists::attach_campaign),
        )
        .route(
            "/templates",
            get(api::templates::list).post(api::templates::create),
        )
        .route(
            "/templates/:template_id",
            get(api::templates::show)
                .put(api::templates::update)
                .delete(api::templates::destroy),
        )
        .route(
            "/templates/by-name/:name",
            get(api::templates::show_by_name),
        )
        .route("/lists", get(api::lists::index).post(api::lists::create))
        .route(
            "/lists/:list_id",
            get(api::lists::show).delete(api::lists::destroy),
        )
        .route("/lists/:list_id/subscribers", get(api::lists::subscribers))
        .route(
            "/lists/:list_id/subscribers/:subscriber_id",
            put(api::lists::subscribe),
        )
        .route(
            "/subscribers",
            post(api::lists::create_subscriber),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_basic_auth,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(error = %format!("{error:#}"), "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
