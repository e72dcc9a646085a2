//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own database and media
//! directory on a random port. Dropping the server shuts it down.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;

use viewvault_server::media::{DiskMediaStore, MediaStore};
use viewvault_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use viewvault_server::store::{PlatformStore, SqlitePlatformStore};
use viewvault_server::user::{User, UserManager};

use super::constants::*;
use super::fixtures::seed_test_users;

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Store handle for direct database access in tests
    pub store: Arc<dyn PlatformStore>,

    /// The pre-seeded regular user (TEST_USER credentials)
    pub test_user: User,

    /// The pre-seeded creator user (CREATOR_USER credentials)
    pub creator_user: User,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with two seeded users.
    ///
    /// # Panics
    ///
    /// Panics if database creation, port binding or server startup fails,
    /// or if the server doesn't become ready within the timeout.
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("platform.db");
        let media_path = temp_dir.path().join("media");

        let sqlite_store =
            SqlitePlatformStore::new(&db_path).expect("Failed to open platform store");
        let (test_user, creator_user) =
            seed_test_users(&sqlite_store).expect("Failed to seed test users");

        let store: Arc<dyn PlatformStore> = Arc::new(sqlite_store);
        let user_manager = Arc::new(UserManager::new(store.clone()));
        let media: Arc<dyn MediaStore> =
            Arc::new(DiskMediaStore::new(&media_path).expect("Failed to open media store"));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            frontend_dir_path: None,
        };
        let app = make_app(config, store.clone(), user_manager, media);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            store,
            test_user,
            creator_user,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint.
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
