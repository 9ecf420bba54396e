//! コマンドライン解析

mod args;

pub use args::{parse_args, resolve_target, Config, Target};
