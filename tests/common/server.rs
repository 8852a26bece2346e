//! Test server lifecycle management
//!
//! Each test gets an isolated server on a random port with its own set of
//! SQLite databases and a stub media gateway.

use super::gateway::TestGateway;
use mixwheel_server::catalog::SqliteTrackCatalog;
use mixwheel_server::interactions::SqliteInteractionStore;
use mixwheel_server::profiles::{spawn_rebuild_worker, ProfileBuilder, SqliteProfileStore};
use mixwheel_server::recommend::{EngineSettings, RecommendationEngine};
use mixwheel_server::server::{server::make_app, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases.
///
/// The store handles are exposed so tests can seed data directly instead of
/// going through the HTTP surface.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    pub catalog: Arc<SqliteTrackCatalog>,
    pub interactions: Arc<SqliteInteractionStore>,
    pub profiles: Arc<SqliteProfileStore>,
    pub engine: Arc<RecommendationEngine>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
}

impl TestServer {
    /// Spawns a test server whose gateway knows no tracks.
    pub async fn spawn() -> Self {
        Self::spawn_with_gateway(Arc::new(TestGateway::empty())).await
    }

    /// Spawns a test server backed by the given stub gateway.
    pub async fn spawn_with_gateway(gateway: Arc<TestGateway>) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp db dir");

        let catalog = Arc::new(
            SqliteTrackCatalog::new(temp_db_dir.path().join("catalog.db"))
                .expect("Failed to open catalog"),
        );
        let interactions = Arc::new(
            SqliteInteractionStore::new(temp_db_dir.path().join("interactions.db"))
                .expect("Failed to open interaction log"),
        );
        let profiles = Arc::new(
            SqliteProfileStore::new(temp_db_dir.path().join("profiles.db"))
                .expect("Failed to open profile store"),
        );

        let builder = Arc::new(ProfileBuilder::new(
            interactions.clone(),
            catalog.clone(),
            profiles.clone(),
        ));
        let engine = Arc::new(RecommendationEngine::new(
            catalog.clone(),
            interactions.clone(),
            profiles.clone(),
            builder.clone(),
            gateway.clone(),
            gateway,
            EngineSettings::default(),
        ));
        let rebuild_queue = spawn_rebuild_worker(builder);

        let app = make_app(
            ServerConfig::default(),
            catalog.clone(),
            interactions.clone(),
            profiles.clone(),
            engine.clone(),
            rebuild_queue,
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to read local addr")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server crashed");
        });

        let server = Self {
            base_url,
            catalog,
            interactions,
            profiles,
            engine,
            _temp_db_dir: temp_db_dir,
        };
        server.wait_until_ready().await;
        server
    }

    async fn wait_until_ready(&self) {
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Server did not become ready");
    }
}
