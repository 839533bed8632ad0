use std::sync::Arc;

use crate::{
    config::Config,
    infrastructure::{
        middleware::HasHostPlatform, BasicRenderer, ChangeBroadcaster, Database, HostPlatform,
        SqliteHostPlatform, TopicMessageBus,
    },
    services::MutationService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub database: Database,
    pub host: Arc<dyn HostPlatform>,
    pub bus: Arc<TopicMessageBus>,
    pub broadcaster: Arc<ChangeBroadcaster>,
    pub service: Arc<MutationService>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let database = Database::connect(&config.database).await?;
        database.initialize().await?;
        Ok(Self::with_database(config, database))
    }

    /// Wire the service graph over an already initialized database.
    /// Spawns the broadcast workers, so it must run inside a tokio runtime.
    pub fn with_database(config: Config, database: Database) -> Self {
        let host: Arc<dyn HostPlatform> = Arc::new(SqliteHostPlatform::new(database.pool.clone()));
        let bus = Arc::new(TopicMessageBus::default());
        let broadcaster = Arc::new(ChangeBroadcaster::new(bus.clone(), config.broadcast.clone()));

        let service = Arc::new(MutationService::new(
            &config,
            database.pool.clone(),
            host.clone(),
            Arc::new(BasicRenderer::new()),
            broadcaster.clone(),
        ));

        Self {
            config,
            database,
            host,
            bus,
            broadcaster,
            service,
        }
    }
}

impl HasHostPlatform for AppState {
    fn host_platform(&self) -> &Arc<dyn HostPlatform> {
        &self.host
    }
}
