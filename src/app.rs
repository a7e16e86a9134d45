use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{protected, public};
use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;

/// Full HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(device_routes())
        .merge(backup_routes())
        .merge(schedule_routes())
        .merge(settings_routes())
        .merge(user_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Public
        .route("/api/health", get(public::health_get))
        .merge(auth_public_routes())
        // Bearer token required
        .merge(protected)
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.security.cors_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    // Browsers refuse credentials with a wildcard origin.
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(origins).allow_credentials(true)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/refresh", post(auth::refresh_post))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/me", get(auth::session_me))
        .route("/api/auth/password", put(auth::password_put))
        .route("/api/auth/logout", post(auth::session_logout))
}

fn device_routes() -> Router<AppState> {
    use protected::devices;

    Router::new()
        .route("/api/devices", get(devices::device_list).post(devices::device_create))
        .route(
            "/api/devices/:id",
            get(devices::device_get)
                .put(devices::device_update)
                .delete(devices::device_delete),
        )
}

fn backup_routes() -> Router<AppState> {
    use protected::backups;

    Router::new()
        .route("/api/backups", get(backups::backup_list).post(backups::backup_create))
        .route("/api/backups/calendar", get(backups::backup_calendar))
        .route(
            "/api/backups/:id",
            get(backups::backup_get).delete(backups::backup_delete),
        )
        .route("/api/backups/:id/status", put(backups::backup_status_put))
}

fn schedule_routes() -> Router<AppState> {
    use protected::schedules;

    Router::new()
        .route(
            "/api/schedules",
            get(schedules::schedule_list).post(schedules::schedule_create),
        )
        .route(
            "/api/schedules/:id",
            get(schedules::schedule_get)
                .put(schedules::schedule_update)
                .delete(schedules::schedule_delete),
        )
}

fn settings_routes() -> Router<AppState> {
    use protected::settings;

    let admin_put = put(settings::settings_put).route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/api/settings", get(settings::settings_get).merge(admin_put))
        .route("/api/settings/storage", get(settings::storage_get))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::user_list).post(users::user_create))
        .route(
            "/api/users/:id",
            get(users::user_get)
                .put(users::user_update)
                .delete(users::user_delete),
        )
        .route_layer(middleware::from_fn(require_admin))
}
