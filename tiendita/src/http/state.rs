use crate::store::Store;

/// Per-request shared state. The store handle is constructed in `main` and
/// injected here; cloning is cheap, the pool inside is shared.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Store,
}
