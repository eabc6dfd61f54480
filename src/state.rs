//! Shared application state for all routes.

use crate::config::Catalog;
use crate::service::{CrudService, StatementExecutor};
use crate::sql::OperatorRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn StatementExecutor>,
    pub catalog: Arc<Catalog>,
    pub registry: Arc<OperatorRegistry>,
    /// Require a known `X-API-KEY` on every API request.
    pub auth_enabled: bool,
    /// Let query documents carry raw literals that are emitted verbatim.
    pub allow_raw_literals: bool,
}

impl AppState {
    pub fn new(executor: Arc<dyn StatementExecutor>, catalog: Catalog) -> Self {
        Self {
            executor,
            catalog: Arc::new(catalog),
            registry: Arc::new(OperatorRegistry::standard()),
            auth_enabled: false,
            allow_raw_literals: false,
        }
    }

    pub fn with_auth(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    pub fn with_raw_literals(mut self, allowed: bool) -> Self {
        self.allow_raw_literals = allowed;
        self
    }

    pub fn crud(&self) -> CrudService<'_> {
        CrudService::new(self.executor.as_ref(), &self.catalog, &self.registry)
    }
}
