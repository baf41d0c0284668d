mod config;
mod report;

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

use crate::config::{Endpoints, mask_password};

/// Copy Postgres schemas in foreign key order.
#[derive(Parser, Debug)]
#[command(name = "graphcopy", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Connections {
    /// Source database connection URL
    #[arg(long, env = "GRAPHCOPY_SOURCE_URL", hide_env_values = true)]
    source: String,

    /// Destination database connection URL
    #[arg(long, env = "GRAPHCOPY_DESTINATION_URL", hide_env_values = true)]
    destination: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy every table of a schema into another schema
    Copy {
        #[command(flatten)]
        connections: Connections,

        /// Schema to read from
        #[arg(long, default_value = "public")]
        source_schema: String,

        /// Schema to write into
        #[arg(long)]
        destination_schema: String,

        /// Rows per insert statement
        #[arg(long)]
        batch_size: Option<usize>,

        /// Table to leave out, in addition to `version` (repeatable)
        #[arg(long = "exclude", value_name = "TABLE")]
        exclude: Vec<String>,

        /// Copy `version` too; only `--exclude` tables are left out
        #[arg(long)]
        no_default_excludes: bool,
    },
    /// Upsert permission subjects into a schema
    Permissions {
        #[command(flatten)]
        connections: Connections,

        /// Schema to write into
        #[arg(long)]
        destination_schema: String,

        /// Rows per insert statement
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("graphcopy=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), error_chain(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let colored = std::io::stdout().is_terminal();

    match cli.command {
        Commands::Copy {
            connections,
            source_schema,
            destination_schema,
            batch_size,
            exclude,
            no_default_excludes,
        } => {
            let endpoints = connections.endpoints();
            let config = config::copy_config(
                &endpoints,
                &source_schema,
                &destination_schema,
                batch_size,
                &exclude,
                !no_default_excludes,
            )?;

            let (mut source, mut destination) = connect_both(&endpoints).await?;
            let report = graphcopy::pg::copy_schema(&mut source, &mut destination, &config).await?;
            println!("{}", report::copy_summary(&report, colored));
        }
        Commands::Permissions {
            connections,
            destination_schema,
            batch_size,
        } => {
            let endpoints = connections.endpoints();
            let config = config::permissions_config(&destination_schema, batch_size)?;

            let (mut source, mut destination) = connect_both(&endpoints).await?;
            let stats =
                graphcopy::pg::sync_permissions(&mut source, &mut destination, &config).await?;
            println!(
                "{}",
                report::permissions_summary(&config.destination_schema, &stats)
            );
        }
    }

    Ok(())
}

impl Connections {
    fn endpoints(self) -> Endpoints {
        Endpoints {
            source: self.source,
            destination: self.destination,
        }
    }
}

async fn connect_both(endpoints: &Endpoints) -> Result<(Client, Client), tokio_postgres::Error> {
    let source = connect("source", &endpoints.source).await?;
    let destination = connect("destination", &endpoints.destination).await?;
    Ok((source, destination))
}

/// Connect and spawn the connection driver.
async fn connect(role: &'static str, url: &str) -> Result<Client, tokio_postgres::Error> {
    info!("connecting to {role} database {}", mask_password(url));
    let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("{role} connection error: {e}");
        }
    });

    Ok(client)
}

/// Join an error and its sources into one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
