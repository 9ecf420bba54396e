//! Outbound ポートの実装

mod process_daemon_spawner;
mod static_request_context;

pub use process_daemon_spawner::ProcessDaemonSpawner;
pub use static_request_context::StaticRequestContext;
