pub mod config;
mod comment_routes;
mod dashboard_routes;
pub mod error;
mod http_layers;
pub mod metrics;
mod like_routes;
mod playlist_routes;
pub mod server;
pub mod session;
pub mod state;
mod subscription_routes;
mod tweet_routes;
mod uploads;
mod user_routes;
mod video_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
