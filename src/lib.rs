//! ViewVault Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod media;
pub mod server;
pub mod sqlite_persistence;
pub mod store;
pub mod user;

// Re-export commonly used types for convenience
pub use media::{DiskMediaStore, MediaStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use store::{PlatformStore, SqlitePlatformStore};
pub use user::UserManager;
