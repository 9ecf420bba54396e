use clap::builder::ArgAction;
use common::error::Error;
use km::domain::{PropertyMap, PropertyType, TypedValue};
use std::path::PathBuf;

/// km の実行モード
#[derive(Debug, Clone, PartialEq)]
pub enum KmCommand {
    Help,
    /// アクションを 1 件記録してすぐ書き出す
    Record {
        name: String,
        properties: PropertyMap,
        user_agent: Option<String>,
        person_id: Option<String>,
    },
    /// アクティブログをローテートしてデーモンを起動する
    Rotate { force: bool },
    /// 転送待ちセグメントのデーモンを起動し直す
    Launch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// --config: 設定ファイル（未指定なら KM_CONFIG）
    pub config_path: Option<PathBuf>,
    pub command: KmCommand,
}

fn build_clap_command() -> clap::Command {
    clap::Command::new("km")
        .about("Record tracking events and hand rotated logs to the transfer daemon")
        .disable_help_flag(true)
        .disable_help_subcommand(true)
        .arg(
            clap::Arg::new("help")
                .short('h')
                .long("help")
                .help("Show this help message")
                .action(ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("config")
                .long("config")
                .value_name("path")
                .help("Config file (JSON). Default: $KM_CONFIG")
                .global(true)
                .num_args(1),
        )
        .subcommand(
            clap::Command::new("record")
                .about("Record one action and flush it to the active log")
                .arg(clap::Arg::new("name").required(true).index(1))
                .arg(
                    clap::Arg::new("property")
                        .index(2)
                        .value_name("key=type:value")
                        .num_args(0..),
                )
                .arg(
                    clap::Arg::new("user-agent")
                        .long("user-agent")
                        .value_name("ua")
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("person-id")
                        .long("person-id")
                        .value_name("id")
                        .num_args(1),
                ),
        )
        .subcommand(
            clap::Command::new("rotate")
                .about("Rotate the active log now and launch transfer daemons")
                .arg(
                    clap::Arg::new("force")
                        .short('f')
                        .long("force")
                        .help("Rotate even if the period and size thresholds are not reached")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            clap::Command::new("launch").about("Launch transfer daemons for pending segments"),
        )
}

/// `key=type:value` を 1 件解析する（type は string / integer / float / ...）
pub fn parse_property(arg: &str) -> Result<(String, TypedValue), Error> {
    let invalid = || {
        Error::invalid_argument(format!(
            "Invalid property '{}': expected key=type:value",
            arg
        ))
    };
    let (key, rest) = arg.split_once('=').ok_or_else(invalid)?;
    let (ty, value) = rest.split_once(':').ok_or_else(invalid)?;
    if key.is_empty() {
        return Err(invalid());
    }
    let ty: PropertyType = ty.parse().map_err(Error::invalid_argument)?;
    Ok((key.to_string(), TypedValue::new(value, ty)))
}

fn matches_to_config(matches: &clap::ArgMatches) -> Result<Config, Error> {
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    if matches.get_flag("help") {
        return Ok(Config {
            config_path,
            command: KmCommand::Help,
        });
    }
    let command = match matches.subcommand() {
        Some(("record", m)) => {
            let name = m.get_one::<String>("name").cloned().unwrap_or_default();
            let properties = m
                .get_many::<String>("property")
                .map(|vals| vals.map(|s| parse_property(s)).collect::<Result<_, _>>())
                .transpose()?
                .unwrap_or_default();
            KmCommand::Record {
                name,
                properties,
                user_agent: m.get_one::<String>("user-agent").cloned(),
                person_id: m.get_one::<String>("person-id").cloned(),
            }
        }
        Some(("rotate", m)) => KmCommand::Rotate {
            force: m.get_flag("force"),
        },
        Some(("launch", _)) => KmCommand::Launch,
        _ => KmCommand::Help,
    };
    Ok(Config {
        config_path,
        command,
    })
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
    matches_to_config(&matches)
}
