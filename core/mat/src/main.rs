mod adapter;
mod cli;
mod ports;
mod usecase;
mod wiring;

#[cfg(test)]
mod tests;

use cli::{parse_args, resolve_target, Config, Target};
use common::adapter::StdFileSystem;
use common::config::{KmConfig, SEGMENT_ID_ENV};
use common::error::Error;
use common::ports::outbound::{Log, LogRecord};
use std::backtrace::Backtrace;
use std::process;
use std::sync::Arc;
use usecase::diagnostic;
use wiring::{error_log, wire_mat, MatApp};

fn main() {
    let args = parse_args();
    let config_path = args.as_ref().ok().and_then(|a| a.config_path.clone());
    // 設定が読めなくても既定の場所のエラーログには書く
    let (config, loaded) = match KmConfig::resolve(&StdFileSystem, config_path.as_deref()) {
        Ok((config, _)) => (config, Ok(())),
        Err(e) => (KmConfig::default(), Err(e)),
    };
    let log = error_log(&config);
    install_panic_hook(Arc::clone(&log));

    let result = args.and_then(|args| {
        loaded?;
        run(&args, &config, Arc::clone(&log), wire_mat)
    });
    process::exit(finish(log.as_ref(), result));
}

fn run<W>(args: &Config, config: &KmConfig, log: Arc<dyn Log>, wire: W) -> Result<i32, Error>
where
    W: FnOnce(&KmConfig, Arc<dyn Log>) -> Result<MatApp, Error>,
{
    match resolve_target(args, std::env::var(SEGMENT_ID_ENV).ok())? {
        Target::Diagnostic => {
            let last = diagnostic::last_upload(&StdFileSystem, &config.watermark_path());
            println!("{}", diagnostic::render(last));
            Ok(0)
        }
        Target::Segment(id) => wire(config, log)?.run(id).map(|_| 0),
    }
}

/// 終了コードを決める。エラーは標準出力が閉じられていても残るようエラーログにも書く
fn finish(log: &dyn Log, result: Result<i32, Error>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            let _ = log.log_urgent(
                &LogRecord::error(e.to_string())
                    .layer("mat")
                    .kind("fatal")
                    .field("backtrace", Backtrace::force_capture().to_string()),
            );
            if e.is_usage() {
                print_usage();
            }
            eprintln!("km-mat: {}", e);
            e.exit_code()
        }
    }
}

fn install_panic_hook(log: Arc<dyn Log>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = log.log_urgent(
            &LogRecord::error(info.to_string())
                .layer("mat")
                .kind("panic")
                .field("backtrace", Backtrace::force_capture().to_string()),
        );
        default_hook(info);
    }));
}

fn print_usage() {
    eprintln!("Usage: km-mat [--config <path>] [--segment <id> | --diagnostic]");
}
