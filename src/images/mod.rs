pub mod handlers;
pub mod store;
pub mod upload;

use crate::state::AppState;
use axum::Router;

/// `/files/...` management routes, mounted under the API prefix.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes(max_upload_bytes))
}

/// `/static/:name`, the public form of stored image references.
pub fn static_router() -> Router<AppState> {
    handlers::static_routes()
}
