use clap::builder::ArgAction;
use common::config::SEGMENT_ID_ENV;
use common::error::Error;
use common::segment::SegmentId;
use std::path::PathBuf;

/// KM_SEGMENT_ID にこの値を入れると診断モード
pub const DIAGNOSTIC_ID: &str = "diagnostic";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// --config: 設定ファイル（未指定なら KM_CONFIG）
    pub config_path: Option<PathBuf>,
    /// --diagnostic: 最終アップロード時刻を表示して終了
    pub diagnostic: bool,
    /// --segment: 処理を始めるセグメント（未指定なら KM_SEGMENT_ID）
    pub segment: Option<String>,
}

/// このプロセスがやること
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Diagnostic,
    Segment(SegmentId),
}

fn build_clap_command() -> clap::Command {
    clap::Command::new("km-mat")
        .about("Compress and upload rotated km log segments")
        .arg(
            clap::Arg::new("config")
                .long("config")
                .value_name("path")
                .help("Config file (JSON). Default: $KM_CONFIG")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("diagnostic")
                .long("diagnostic")
                .help("Print the time of the last successful upload and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("segment")
                .long("segment")
                .value_name("id")
                .help("Segment id to start with. Default: $KM_SEGMENT_ID")
                .num_args(1),
        )
}

fn matches_to_config(matches: &clap::ArgMatches) -> Config {
    Config {
        config_path: matches.get_one::<String>("config").map(PathBuf::from),
        diagnostic: matches.get_flag("diagnostic"),
        segment: matches.get_one::<String>("segment").cloned(),
    }
}

pub fn parse_args() -> Result<Config, Error> {
    parse_args_from(std::env::args())
}

pub fn parse_args_from<I, T>(args: I) -> Result<Config, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_clap_command()
        .try_get_matches_from(args)
        .map_err(|e| Error::invalid_argument(e.to_string()))?;
    Ok(matches_to_config(&matches))
}

/// 引数と環境変数の値から処理対象を決める（引数が優先）
pub fn resolve_target(config: &Config, env_segment: Option<String>) -> Result<Target, Error> {
    if config.diagnostic {
        return Ok(Target::Diagnostic);
    }
    let raw = config
        .segment
        .clone()
        .or(env_segment)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::env(format!("No segment id: {} is not set", SEGMENT_ID_ENV)))?;
    if raw == DIAGNOSTIC_ID {
        return Ok(Target::Diagnostic);
    }
    SegmentId::parse(&raw).map(Target::Segment)
}
