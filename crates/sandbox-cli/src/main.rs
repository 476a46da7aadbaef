//! `sandbox-sync` command line driver
//!
//! Runs the synchronization engine against a project directory on the local
//! disk, mainly for inspecting what the indexer does to real sources.

mod local;
mod telemetry;

use anyhow::{bail, Context};
use clap::{Arg, ArgMatches, Command};
use local::LocalSandbox;
use sandbox_core::constants::OUTPUT_DIR;
use sandbox_core::FileEventType;
use sandbox_sync::{FileEventBus, FileStorage, SandboxManager, SyncConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use telemetry::LogFormat;

fn cli() -> Command {
    let dir = || {
        Arg::new("dir")
            .required(true)
            .value_parser(clap::value_parser!(PathBuf))
            .help("Project directory")
    };

    Command::new("sandbox-sync")
        .version(sandbox_sync::VERSION)
        .about("Keep a project's element identifiers and source map in sync")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format"),
        )
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Where the cache snapshot is kept (default: <dir>/.sandbox-sync)"),
        )
        .subcommand(
            Command::new("index")
                .about("Inject identifiers and print the identifier map as JSON")
                .arg(dir()),
        )
        .subcommand(
            Command::new("block")
                .about("Print the current source of one element")
                .arg(dir())
                .arg(Arg::new("oid").required(true).help("Element identifier")),
        )
        .subcommand(
            Command::new("watch")
                .about("Index, then keep the map live until interrupted")
                .arg(dir()),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let (command, args) = matches.subcommand().context("missing subcommand")?;

    let format = args
        .get_one::<String>("log-format")
        .and_then(|f| LogFormat::parse(f))
        .unwrap_or(LogFormat::Text);
    telemetry::init(format);

    let manager = open(args).await?;
    match command {
        "index" => {
            let nodes: BTreeMap<_, _> = manager.template_nodes().into_iter().collect();
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        "block" => {
            let oid = args
                .get_one::<String>("oid")
                .context("missing identifier")?;
            match manager.get_code_block(oid).await {
                Some(block) => println!("{block}"),
                None => bail!("no element with identifier {oid}"),
            }
        }
        "watch" => {
            manager.subscribe(FileEventType::All, |event| {
                tracing::info!("{} {:?}", event.event_type, event.paths);
                Ok(())
            });
            tracing::info!("{} identifiers mapped, watching", manager.template_nodes().len());
            tokio::signal::ctrl_c().await?;
        }
        other => bail!("unknown command {other}"),
    }
    Ok(())
}

/// Build a manager over the subcommand's directory and run the initial scan
async fn open(args: &ArgMatches) -> anyhow::Result<SandboxManager> {
    let dir = args.get_one::<PathBuf>("dir").context("missing directory")?;
    let root = dir
        .canonicalize()
        .with_context(|| format!("cannot open {}", dir.display()))?;

    let config = load_config(args.get_one::<PathBuf>("config"))?
        .with_sandbox_root(root.to_string_lossy().into_owned());

    let state_dir = args
        .get_one::<PathBuf>("state-dir")
        .cloned()
        .unwrap_or_else(|| root.join(OUTPUT_DIR));

    let manager = SandboxManager::open(
        config,
        Arc::new(FileStorage::new(state_dir)),
        FileEventBus::new(),
    )
    .await;

    let indexed = manager.connect(Arc::new(LocalSandbox::new(&root))).await;
    tracing::info!("Indexed {} files in {}", indexed, root.display());
    Ok(manager)
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(SyncConfig::default()),
    }
}
