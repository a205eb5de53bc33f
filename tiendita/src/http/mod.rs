//! HTTP layer: Axum router, handlers, and responses.
//!
//! Exposes the user directory (`/usuarios`), the product catalog
//! (`/productos`), and a health probe.

mod error;
mod handlers;
mod responses;
mod state;


pub use handlers::router;
pub use state::AppState;
