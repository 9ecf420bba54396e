//! km のドメイン型（外部 I/O に依存しない）

pub mod action;
pub mod escape;
pub mod log_line;
pub mod property;
pub mod user_agent;

pub use action::{Action, PropertyMap, TypedValue};
pub use escape::{escape, unescape};
pub use log_line::{LineError, LogLine, LogProperty};
pub use property::{PropertyType, PropertyValue, RawValue};
pub use user_agent::{is_robot, should_track};
