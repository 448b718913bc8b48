use axum::{
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use crate::{handlers, state::AppState};

/// Any origin may call the API.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-http-method-override"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/api", get(handlers::api_home))
        .route("/api/", get(handlers::api_home))

        // Task routes
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/tasks/:id",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )

        // User routes
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .fallback(handlers::not_found)

        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}
