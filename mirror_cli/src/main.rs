mod cli_options;
mod pipeline;

use std::env::current_dir;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use common::config::{apply_env_overrides, read_config, MirrorConfig};
use common::err::MResult;
use common::log::tracing_factory::{OutputType, TracingFactory, TracingFactoryOptions};
use common::pretty_util::{to_string_pretty, Format};

use crate::cli_options::CliOptions;
use crate::pipeline::Pipeline;

#[derive(Parser, Serialize, Debug, Clone)]
#[command(name = "mirror-cli")]
#[command(version = "0.1.0")]
#[command(about = "MySQL to MySQL replication pipeline")]
#[command(long_about = None)]
pub(crate) struct CliArgs {
    /// 加载的配置文件路径
    #[arg(short, long, help = "Path to loaded configuration file", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// enable debug info
    #[arg(short, long, help = "enable debug mode", default_value_t = false)]
    pub debug: bool,

    #[arg(short, long, help = "output format: [yaml | json], default Yaml", default_value = "yaml")]
    pub format: String,

    #[arg(long = "host", help = "source mysql host", value_name = "host")]
    pub host: Option<String>,

    #[arg(long = "port", help = "source mysql port, [1-65535]", value_name = "port")]
    pub port: Option<i16>,

    #[arg(short, long = "username", help = "source mysql username", value_name = "username")]
    pub username: Option<String>,

    #[arg(short, long = "password", help = "source mysql password", value_name = "password")]
    pub password: Option<String>,
}

#[derive(Subcommand, Serialize, Debug, Clone)]
enum Commands {
    /// Print per-table snapshot progress and exit.
    Status,

    /// Put a FAILED table back to PENDING and exit.
    Reset { table: String },
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => {}
        Err(err) => {
            error!("unrecoverable error: {}", err);
            eprintln!("unrecoverable error: {}", err);
            std::process::exit(1);
        }
    }
}

async fn run(args: CliArgs) -> MResult<()> {
    let format = Format::format(&args.format);
    let options = CliOptions::new(args.debug, format.clone());

    let mut config = load_config(&args)?;
    merge(&mut config, &args);

    let log_opt = TracingFactoryOptions::new(args.debug, OutputType::LOG, config.base.get_log_dir());
    let log_factory = TracingFactory::init_log_with_options(log_opt);
    eprintln!("log_dir: {:?}", log_factory.get_log_dir());

    if options.is_debug() {
        eprintln!("config: \n{}", to_string_pretty(&options.get_format(), &config));
    }

    eprintln!();
    eprintln!("╔╦╗╦╦═╗╦═╗╔═╗╦═╗");
    eprintln!("║║║║╠╦╝╠╦╝║ ║╠╦╝");
    eprintln!("╩ ╩╩╩╚═╩╚═╚═╝╩╚═ MySQL mirror {}", env!("CARGO_PKG_VERSION"));
    eprintln!();

    let pipeline = Pipeline::new(config.clone());

    match args.command {
        Some(Commands::Status) => {
            let store = pipeline.progress_store()?;
            for record in store.get_all() {
                println!("{}", to_string_pretty(&options.get_format(), record));
            }
            return Ok(());
        }
        Some(Commands::Reset { table }) => {
            let mut store = pipeline.progress_store()?;
            store.reset(&table)?;
            println!("table {} reset", table);
            return Ok(());
        }
        None => {}
    }

    // (a) discovery, (b) snapshot start checkpoint, (c) snapshot phases.
    let tables = pipeline.discover_tables()?;
    let checkpoint = pipeline.ensure_checkpoint()?;

    if config.migration.create_tables || config.migration.migrate_data {
        let summary = pipeline.run_snapshot(&tables)?;
        info!(
            "snapshot summary: {} completed, {} failed, {} rows",
            summary.tables_completed, summary.tables_failed, summary.rows_copied
        );
    }

    if !config.migration.enable_incremental {
        info!("incremental phase disabled; done");
        return Ok(());
    }

    // (d) tail into the configured sink, (e) replay behind the checkpoint.
    // A SIGINT stops everything cleanly and exits 0.
    let start = pipeline.checkpoint_store().load()?.unwrap_or(checkpoint);
    let replayer = if config.migration.is_direct_sink() {
        None
    } else {
        Some(pipeline.spawn_replayer()?)
    };
    let (tailer_handle, tailer_join) = pipeline.spawn_tailer(start)?;

    info!("tailing; press ctrl-c to stop");
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");

    tailer_handle.stop();
    let _ = tailer_join.join();
    if let Some((replayer_handle, replayer_join)) = replayer {
        replayer_handle.stop();
        let _ = replayer_join.join();
    }

    info!("stopped cleanly");
    Ok(())
}

fn load_config(args: &CliArgs) -> MResult<MirrorConfig> {
    match get_config_path(args) {
        Some(path) if path.exists() => read_config(path),
        _ => {
            let mut config = MirrorConfig::default();
            apply_env_overrides(&mut config);
            Ok(config)
        }
    }
}

fn get_config_path(args: &CliArgs) -> Option<PathBuf> {
    if let Some(config) = args.config.as_ref() {
        return Some(config.clone());
    }

    let mut pwd = current_dir().unwrap_or("/".into());
    // ./conf/mirror.toml
    pwd.push("conf");
    pwd.push("mirror");
    pwd.set_extension("toml");

    Some(pwd)
}

fn merge(config: &mut MirrorConfig, args: &CliArgs) {
    if args.host.is_some() {
        config.source.host = args.host.clone();
    }
    if args.port.is_some() {
        config.source.port = args.port;
    }
    if let Some(username) = args.username.as_ref() {
        config.source.username = username.clone();
    }
    if let Some(password) = args.password.as_ref() {
        config.source.password = password.clone();
    }
}
