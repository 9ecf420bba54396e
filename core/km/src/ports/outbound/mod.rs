//! Outbound ポート: km が外界を使うための trait

pub mod daemon_spawner;
pub mod request_context;

pub use daemon_spawner::DaemonSpawner;
pub use request_context::RequestContext;
