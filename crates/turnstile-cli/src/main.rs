use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use turnstile_core::config::Config;
use turnstile_core::domain::{Client, ClientId, Subscription, SubscriptionKind, Visit};
use turnstile_core::ports::{Clock, SystemClock};
use turnstile_core::registry::{self, Registry, SortKey};
use turnstile_core::{Services, TurnstileError, telemetry};

#[derive(Debug, Parser)]
#[command(name = "turnstile", version, about = "Fitness-club client registry")]
struct Cli {
    /// JSON 設定ファイル
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 登録簿ファイル（設定の data_path を上書き）
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a new client
    Add {
        name: String,
        /// standard | premium | student
        kind: SubscriptionKind,
        /// Expiration date (YYYY-MM-DD)
        expires: NaiveDate,
    },
    /// Record a visit
    Visit {
        id: ClientId,
        date: NaiveDate,
        #[arg(default_value = "")]
        notes: String,
    },
    /// Edit the date or notes of a recorded visit
    EditVisit {
        id: ClientId,
        /// Visit index as shown by `list` (0-based)
        index: usize,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Change a client's name
    Rename { id: ClientId, name: String },
    /// Remove a client and their visits
    Remove { id: ClientId },
    /// List clients
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Id)]
        sort: SortArg,
    },
    /// Search clients by name
    Search { query: String },
    /// Show subscription status
    Status,
    /// Run the status updater and log sink until Ctrl-C
    Watch {
        /// Sweep interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Status log file
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Id,
    Expiration,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Id => SortKey::Id,
            SortArg::Expiration => SortKey::Expiration,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), TurnstileError> {
    let mut config = Config::from_optional_path(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    let clock = SystemClock;
    let mut reg = registry::load(&config.data_path, &clock)?;

    match cli.command {
        Command::Add {
            name,
            kind,
            expires,
        } => {
            let id = reg.next_id();
            let client = Client::new(id, name, Subscription::new(kind, expires), clock.now());
            reg.add(client)?;
            registry::save(&config.data_path, &reg)?;
            println!("added client {id}");
        }
        Command::Visit { id, date, notes } => {
            reg.record_visit(id, Visit::new(date, notes))?;
            registry::save(&config.data_path, &reg)?;
            println!("recorded visit for client {id}");
        }
        Command::EditVisit {
            id,
            index,
            date,
            notes,
        } => {
            if date.is_none() && notes.is_none() {
                println!("nothing to change; pass --date and/or --notes");
                return Ok(());
            }
            if let Some(date) = date {
                reg.edit_visit_date(id, index, date)?;
            }
            if let Some(notes) = notes {
                reg.edit_visit_notes(id, index, notes)?;
            }
            registry::save(&config.data_path, &reg)?;
            println!("updated visit {index} of client {id}");
        }
        Command::Rename { id, name } => {
            reg.rename(id, name)?;
            registry::save(&config.data_path, &reg)?;
            println!("renamed client {id}");
        }
        Command::Remove { id } => {
            let removed = reg.remove(id)?;
            registry::save(&config.data_path, &reg)?;
            println!("removed client {id} ({})", removed.name());
        }
        Command::List { sort } => {
            reg.sort_by(sort.into());
            print_clients(reg.iter());
        }
        Command::Search { query } => {
            let found = reg.search_by_name(&query);
            if found.is_empty() {
                println!("no clients match '{query}'");
            }
            print_clients(found.into_iter());
        }
        Command::Status => {
            let summary = reg.summary();
            println!(
                "{} clients: {} active, {} expired, {} visits",
                reg.len(),
                summary.active,
                summary.expired,
                summary.visits
            );
            print_clients(reg.iter());
        }
        Command::Watch { interval, log } => {
            if let Some(secs) = interval {
                config.status_interval_secs = secs;
            }
            if let Some(log) = log {
                config.log_path = log;
            }
            config.validate()?;
            watch(config, reg).await?;
        }
    }
    Ok(())
}

fn print_clients<'a>(clients: impl Iterator<Item = &'a Client>) {
    for client in clients {
        println!("{client}");
        for (index, visit) in client.visits().iter().enumerate() {
            println!("    [{index}] {} {}", visit.date, visit.notes);
        }
    }
}

/// バックグラウンド処理を動かし、Ctrl-C で順序通りに止めて保存する
async fn watch(config: Config, reg: Registry) -> Result<(), TurnstileError> {
    let shared = reg.into_shared();
    let services = Services::start(&config, Arc::clone(&shared), Arc::new(SystemClock))?;
    services.append(format!("watch started with {} clients", client_count(&shared)));

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "cannot listen for Ctrl-C; stopping now");
    }
    info!("shutdown requested");

    let report = services.shutdown_async().await;
    if let Some(sink) = &report.sink {
        println!(
            "status log: {} lines written, {} discarded",
            sink.written, sink.discarded
        );
        if let Some(err) = &sink.open_error {
            eprintln!("warning: {err}");
        }
    }

    let snapshot = shared
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone();
    registry::save(&config.data_path, &snapshot)?;
    Ok(())
}

fn client_count(shared: &turnstile_core::SharedRegistry) -> usize {
    shared
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .len()
}
