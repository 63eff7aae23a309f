pub mod handlers;

pub use handlers::{health_check, import_voucher, AppState};

use crate::upstream::VoucherService;
use axum::routing::{get, post};
use axum::Router;

pub fn router<S: VoucherService + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/vouchers/import", post(import_voucher::<S>))
        .with_state(state)
}
