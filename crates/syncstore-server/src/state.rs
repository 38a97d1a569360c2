use std::sync::Arc;

use syncstore_core::StoreRegistry;

/// Shared handler state: the account handle table.
#[derive(Debug, Clone)]
pub struct ServiceState {
    registry: Arc<StoreRegistry>,
}

impl ServiceState {
    pub fn new(registry: StoreRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    pub fn from_shared(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    /// Owned handle, so it can move into `spawn_blocking`
    pub fn registry(&self) -> Arc<StoreRegistry> {
        self.registry.clone()
    }
}
