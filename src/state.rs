//! Shared application state for all routes. Everything behind it is read-only after startup.

use crate::resource::Catalog;
use crate::settings::Settings;
use crate::storage::FileStorage;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: Arc<Catalog>,
    pub storage: Arc<dyn FileStorage>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        catalog: Catalog,
        storage: Arc<dyn FileStorage>,
        settings: Settings,
    ) -> Self {
        AppState {
            pool,
            catalog: Arc::new(catalog),
            storage,
            settings: Arc::new(settings),
        }
    }
}
