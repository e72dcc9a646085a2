use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;
use crate::media::MediaStore;
use crate::store::PlatformStore;
use crate::user::UserManager;

pub type GuardedPlatformStore = Arc<dyn PlatformStore>;
pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedMediaStore = Arc<dyn MediaStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedPlatformStore,
    pub user_manager: GuardedUserManager,
    pub media: GuardedMediaStore,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedPlatformStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedMediaStore {
    fn from_ref(input: &ServerState) -> Self {
        input.media.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
