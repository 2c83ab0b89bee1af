//! Harvest Monitor
//!
//! Records blocks harvested through a Symbol node and lists the kickbacks
//! owed to delegated harvesters.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harvest_ledger::Address;
use reconciler::{report, Config, ReconciliationEngine};
use std::path::PathBuf;
use symbol_adapter::NodeClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type Engine = ReconciliationEngine<NodeClient>;

/// Harvest kickback ledger for Symbol node operators
#[derive(Parser, Debug)]
#[command(name = "harvest-monitor", version)]
#[command(about = "Track harvested blocks and kickbacks owed to delegated harvesters")]
struct Args {
    /// TOML config file; HARVEST_* environment variables override it
    #[arg(short, long, env = "HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Write Prometheus metrics here on exit (textfile collector format)
    #[arg(long, env = "HARVEST_METRICS_FILE")]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Fetch new harvests from the node into the ledger
    Sync,
    /// Unpaid kickback heights and the total owed
    Unpaid,
    /// Every block harvested by a third party
    ThirdParty,
    /// Every block in the ledger
    All,
    /// Counts per payment status
    Totals,
    /// Number of blocks on chain per operator address
    Count {
        /// Count a single address instead of every operator address
        #[arg(long)]
        address: Option<String>,
    },
    /// Accounts currently harvesting on the node
    Harvesters,
    /// Interactive menu (default)
    Menu,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    info!(
        node = %config.node.url,
        ledger = %config.ledger.path.display(),
        "Starting harvest monitor"
    );

    let client = NodeClient::new(config.node_config()).context("Failed to create node client")?;
    let mut engine = ReconciliationEngine::new(client, &config).context("Failed to open ledger")?;
    engine.initialize().context("Failed to read ledger")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current block");
            ctrl_c.cancel();
        }
    });

    let result = match args.command.unwrap_or(Command::Menu) {
        Command::Menu => run_menu(&mut engine, &cancel).await,
        command => execute(&mut engine, &command, &cancel).await,
    };

    if let Some(path) = &args.metrics_file {
        write_metrics(&engine, path)?;
    }

    result
}

fn write_metrics(engine: &Engine, path: &std::path::Path) -> Result<()> {
    let text = engine
        .metrics()
        .encode_text()
        .context("Failed to encode metrics")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    info!(path = %path.display(), "Metrics written");
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn execute(
    engine: &mut Engine,
    command: &Command,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Command::Sync => {
            let report = engine.sync(cancel).await?;
            println!(
                "{} blocks harvested by others and {} by you since the last check",
                report.third_party, report.operator
            );
        }
        Command::Unpaid => {
            let summary = report::unpaid(engine.ledger_mut())?;
            println!("{}", summary);
            println!(
                "... to see additional block detail list third-party blocks or open {}",
                engine.ledger_mut().path().display()
            );
        }
        Command::ThirdParty => {
            let records = report::third_party(engine.ledger_mut())?;
            for record in &records {
                println!("{}", report::RecordLine(record));
            }
            println!("{} blocks harvested by others", records.len());
        }
        Command::All => {
            let records = report::all(engine.ledger_mut())?;
            for record in &records {
                println!("{}", report::RecordLine(record));
            }
            println!("{} blocks on record", records.len());
        }
        Command::Totals => {
            println!("{}", report::totals(engine.ledger_mut())?);
        }
        Command::Count { address } => {
            let counts = match address {
                Some(raw) => {
                    let address = Address::parse(raw)?;
                    let count =
                        report::harvested_block_count(engine.source(), &address, cancel).await?;
                    vec![(address, count)]
                }
                None => {
                    report::operator_block_counts(engine.source(), engine.classifier(), cancel)
                        .await?
                }
            };
            for (address, count) in counts {
                println!("Your address {} has harvested {} blocks", address, count);
            }
        }
        Command::Harvesters => {
            let roster =
                report::delegated_harvesters(engine.source(), engine.classifier(), cancel).await?;
            print!("{}", roster);
        }
        Command::Menu => {}
    }

    Ok(())
}

const MENU: &str = "\
Enter:
   1 to refresh data from blockchain
   2 to show unpaid block kickbacks
   3 to show details of all blocks harvested by others
   4 to show details of all harvested blocks
   5 for total # of harvested blocks on your node (including yours)
   6 to see harvesters delegated to your node (incl. node beneficiary address)
   x to exit";

async fn run_menu(engine: &mut Engine, cancel: &CancellationToken) -> Result<()> {
    // Bring the ledger up to date before the first prompt
    if let Err(e) = execute(engine, &Command::Sync, cancel).await {
        error!(error = %e, "Initial sync failed");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("{}", MENU);

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        let command = match line.trim() {
            "1" => Command::Sync,
            "2" => Command::Unpaid,
            "3" => Command::ThirdParty,
            "4" => Command::All,
            "5" => Command::Count { address: None },
            "6" => Command::Harvesters,
            "x" | "X" => break,
            other => {
                println!("Unknown option '{}'", other);
                continue;
            }
        };

        if let Err(e) = execute(engine, &command, cancel).await {
            error!(error = %e, "Command failed");
            println!("Error: {:#}", e);
        }

        if cancel.is_cancelled() {
            break;
        }
    }

    info!("Exiting harvest monitor");
    Ok(())
}
