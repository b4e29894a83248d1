//! Storage wiring: picks a backend from configuration and exposes it through
//! the domain ports the handlers use.

use std::sync::Arc;

use tracing::info;

use ordermgmt_clients::ClientRepository;
use ordermgmt_core::PersistenceResult;
use ordermgmt_infra::{AppConfig, InMemoryDatabase, PgDatabase};
use ordermgmt_products::ProductRepository;
use ordermgmt_sales::{OrderPlacement, OrderQueries, OrderWorkflow};

/// Ports shared by every request handler.
#[derive(Clone)]
pub struct AppServices {
    pub clients: Arc<dyn ClientRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderQueries>,
    pub placement: Arc<dyn OrderPlacement>,
}

impl AppServices {
    pub fn in_memory(db: InMemoryDatabase) -> Self {
        Self {
            clients: Arc::new(db.clone()),
            products: Arc::new(db.clone()),
            orders: Arc::new(db.clone()),
            placement: Arc::new(OrderWorkflow::new(db.clone(), db.clone(), db.clone(), db)),
        }
    }

    pub fn postgres(db: PgDatabase) -> Self {
        Self {
            clients: Arc::new(db.clients()),
            products: Arc::new(db.products()),
            orders: Arc::new(db.orders()),
            placement: Arc::new(OrderWorkflow::new(
                db.clone(),
                db.clients(),
                db.products(),
                db.orders(),
            )),
        }
    }
}

/// Connect the backend selected by `config` (Postgres when `database_url` is
/// set, otherwise a fresh in-memory store).
pub async fn build_services(config: &AppConfig) -> PersistenceResult<AppServices> {
    match &config.database_url {
        None => {
            info!("DATABASE_URL not set; using in-memory storage");
            Ok(AppServices::in_memory(InMemoryDatabase::new()))
        }
        Some(url) => {
            let db = PgDatabase::connect(url, config.max_connections).await?;
            if config.run_migrations {
                db.migrate().await?;
            }
            info!(max_connections = config.max_connections, "connected to postgres");
            Ok(AppServices::postgres(db))
        }
    }
}
