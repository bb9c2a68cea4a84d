pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::consent::handlers as consent;
use crate::design::handlers as design;
use crate::designs::{handlers as designs, share};
use crate::orders::handlers as orders;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Design generation and previews
        .route("/api/design/generate", post(design::handle_generate))
        .route("/api/design/price", post(design::handle_price))
        .route("/api/design/validate", post(design::handle_validate))
        // Saved designs
        .route(
            "/api/designs/save",
            post(designs::handle_save_design)
                .get(designs::handle_get_designs)
                .delete(designs::handle_delete_design),
        )
        .route("/api/designs/:id/share", post(share::handle_share_design))
        .route("/api/shared/:token", get(share::handle_get_shared))
        // Orders
        .route("/api/orders", post(orders::handle_create_order))
        .route("/api/orders/:id", get(orders::handle_get_order))
        // GDPR consent
        .route(
            "/api/user/consent",
            post(consent::handle_record_consent)
                .get(consent::handle_get_consent)
                .patch(consent::handle_update_consent),
        )
        .with_state(state)
}
