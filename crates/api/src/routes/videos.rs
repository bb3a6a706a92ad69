use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::videos;
use crate::state::AppState;

/// Routes mounted at `/videos`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(videos::publish_video))
        .route(
            "/{id}",
            get(videos::get_video)
                .patch(videos::update_video)
                .delete(videos::delete_video),
        )
        .route("/toggle/publish/{id}", patch(videos::toggle_publish))
}
