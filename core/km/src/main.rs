mod cli;

use cli::{parse_args, Config, KmCommand};
use common::adapter::StdFileSystem;
use common::config::KmConfig;
use common::error::Error;
use common::ports::outbound::LogRecord;
use km::adapter::StaticRequestContext;
use km::ports::inbound::{Tracker, UseCaseRunner};
use km::usecase::RotateOutcome;
use km::Pipeline;
use std::process;
use std::sync::Arc;

/// KmCommand をディスパッチする Runner（match は main レイヤーに集約）
struct Runner {
    pipeline: Pipeline,
}

impl UseCaseRunner for Runner {
    type Command = KmCommand;

    fn run(&self, command: KmCommand) -> Result<i32, Error> {
        let result = self.dispatch(command);
        if let Err(ref e) = result {
            let _ = self.pipeline.log.log(
                &LogRecord::error(e.to_string())
                    .layer("cli")
                    .kind("error"),
            );
        }
        result
    }
}

impl Runner {
    fn dispatch(&self, command: KmCommand) -> Result<i32, Error> {
        match command {
            KmCommand::Help => {
                print_help();
                Ok(0)
            }
            KmCommand::Record {
                name,
                properties,
                user_agent,
                person_id,
            } => self.record(&name, properties, user_agent, person_id),
            KmCommand::Rotate { force } => match self.pipeline.rotator.maybe_rotate(force)? {
                RotateOutcome::Rotated(id) => {
                    println!("rotated {}", id);
                    Ok(0)
                }
                RotateOutcome::NotNeeded => {
                    println!("nothing to rotate");
                    Ok(0)
                }
            },
            KmCommand::Launch => {
                let n = self.pipeline.launcher.launch()?;
                println!("launched {} daemon(s)", n);
                Ok(0)
            }
        }
    }

    fn record(
        &self,
        name: &str,
        properties: km::domain::PropertyMap,
        user_agent: Option<String>,
        person_id: Option<String>,
    ) -> Result<i32, Error> {
        let request = Arc::new(StaticRequestContext::new(user_agent, person_id));
        let mut recorder = self.pipeline.recorder(request);
        if !recorder.do_track() {
            println!("not tracked (disabled or robot user agent)");
            return Ok(0);
        }
        recorder.record(name, properties);
        match recorder.teardown() {
            0 => Err(Error::io_msg(format!(
                "Failed to record '{}'; see the error log",
                name
            ))),
            n => {
                println!("recorded {} action(s)", n);
                Ok(0)
            }
        }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(e) => {
            if e.is_usage() {
                print_usage();
            }
            eprintln!("km: {}", e);
            e.exit_code()
        }
    };
    process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let Config {
        config_path,
        command,
    } = parse_args()?;
    if command == KmCommand::Help {
        print_help();
        return Ok(0);
    }
    let (config, config_path) = KmConfig::resolve(&StdFileSystem, config_path.as_deref())?;
    let runner = Runner {
        pipeline: Pipeline::from_config(config, config_path),
    };
    runner.run(command)
}

fn print_usage() {
    eprintln!("Usage: km [--config <path>] <record|rotate|launch> [args...]");
}

fn print_help() {
    println!("Usage: km [--config <path>] <command> [args...]");
    println!("Commands:");
    println!("  record <name> [key=type:value ...]  Record one action and flush it to the active log");
    println!("      --user-agent <ua>                 Apply the robot filter to this user agent");
    println!("      --person-id <id>                  Visitor id (a new one is generated if omitted)");
    println!("  rotate [-f|--force]                 Rotate the active log and launch transfer daemons");
    println!("  launch                              Launch transfer daemons for pending segments");
    println!();
    println!("Property types:");
    println!("  string integer float time_duration timestamp url ip_address bool tags");
    println!();
    println!("Environment:");
    println!("  KM_CONFIG   Config file (JSON) used when --config is not given.");
    println!("              Relative paths in it are resolved against its directory.");
    println!();
    println!("Examples:");
    println!("  km record 'Signed Up' plan=string:pro seats=integer:3");
    println!("  km rotate --force");
}
