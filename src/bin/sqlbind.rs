use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use sqlbind::{
    logging, Binder, CancellationToken, Catalog, ConsoleConfig, Error, FailurePolicy, HttpTransport, Params,
    ReadinessGate, ResourceDescriptor, ResultShape, Transport,
};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Query a cluster's catalog resources through the sqlresource web tier", long_about = None)]
struct Args {
    /// TOML config file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Overrides server.base_url
    #[clap(long, value_parser)]
    base_url: Option<String>,

    /// Overrides server.base_path
    #[clap(long, value_parser)]
    base_path: Option<String>,

    /// Overrides logging.level
    #[clap(long, value_parser)]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait until the cluster has finished bootstrapping
    Ready {
        #[clap(long, value_parser)]
        interval_ms: Option<u64>,
        #[clap(long, value_parser)]
        timeout_ms: Option<u64>,
        /// Report a probe failure instead of retrying
        #[clap(long)]
        fail_fast: bool,
    },
    /// Recent statement history
    Statements,
    /// Explain plan tree of a traced statement
    Explain { statement_id: String },
    /// SQL text of a traced statement
    Sql { statement_id: String },
    /// Statistics for every region server
    RegionStats,
    /// Run an ad-hoc statement through query2js
    Query {
        sql: String,
        /// Placeholder value, as name=value
        #[clap(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Expect a single JSON object instead of an array
        #[clap(long)]
        single: bool,
    },
    /// Print the request URL for a template without sending it
    Render {
        template: String,
        #[clap(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Treat the template as a path (e.g. /sqlresource/tracedStatements/:statementId)
        #[clap(long)]
        path: bool,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

fn load_config(args: &Args) -> Result<ConsoleConfig, Error> {
    let mut config = match &args.config {
        Some(path) => ConsoleConfig::from_file(path)?,
        None => ConsoleConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.server.base_url = base_url.clone();
    }
    if let Some(base_path) = &args.base_path {
        config.server.base_path = base_path.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: could not format result: {}", e),
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let mut config = load_config(&args)?;
    logging::init_logging(&config.logging)?;

    match args.command {
        Command::Ready {
            interval_ms,
            timeout_ms,
            fail_fast,
        } => {
            if let Some(interval_ms) = interval_ms {
                config.readiness.interval_ms = interval_ms;
            }
            if timeout_ms.is_some() {
                config.readiness.timeout_ms = timeout_ms;
            }
            config.validate()?;

            let mut options = config.readiness.options();
            if fail_fast {
                options.on_failure = FailurePolicy::Surface;
            }

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let catalog = Catalog::from_config(&config)?;
            info!("Waiting for cluster at {}", config.server.endpoint_base());
            let report = catalog.await_ready(&ReadinessGate::new(), &options, &cancel).await?;
            println!(
                "ready after {} attempt(s) in {} session(s), {:?}",
                report.attempts, report.sessions, report.elapsed
            );
        }
        Command::Statements => {
            let catalog = Catalog::from_config(&config)?;
            print_json(&catalog.statement_history().await?);
        }
        Command::Explain { statement_id } => {
            let catalog = Catalog::from_config(&config)?;
            print_json(&catalog.statement_detail(&statement_id).await?);
        }
        Command::Sql { statement_id } => {
            let catalog = Catalog::from_config(&config)?;
            match catalog.statement_sql(&statement_id).await? {
                Some(sql) => println!("{}", sql),
                None => eprintln!("No statement with id {}", statement_id),
            }
        }
        Command::RegionStats => {
            let catalog = Catalog::from_config(&config)?;
            print_json(&catalog.region_server_stats().await?);
        }
        Command::Query { sql, params, single } => {
            let shape = if single { ResultShape::Single } else { ResultShape::Array };
            let descriptor = ResourceDescriptor::query("adhoc", &sql, shape)?;
            let transport =
                HttpTransport::new(config.server.request_timeout(), config.server.connect_timeout())?;
            let binder = Binder::new(config.server.endpoint_base(), Arc::new(transport) as Arc<dyn Transport>);
            let params: Params = params.into_iter().collect();
            let result = binder.bind(descriptor).fetch(&params).await?;
            print_json(&result.into_value());
        }
        Command::Render { template, params, path } => {
            let descriptor = if path {
                ResourceDescriptor::path("render", &template, ResultShape::Single)?
            } else {
                ResourceDescriptor::query("render", &template, ResultShape::Array)?
            };
            let params: Params = params.into_iter().collect();
            println!("{}{}", config.server.endpoint_base(), descriptor.request_path(&params)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
