mod cli;
mod error;
mod output;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use jablonet_api::{JablonetClient, TransportConfig};
use jablonet_core::{Adapter, CycleOutcome, Poller};

use crate::cli::{Cli, LogFormat};
use crate::error::CliError;
use crate::output::JsonLinesStore;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, format: LogFormat) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(jablonet_config::config_path);
    let cfg = jablonet_config::load_config(Some(config_path.as_path()))
        .map_err(|e| CliError::config(&config_path, e))?;

    if cli.print_config {
        let rendered =
            jablonet_config::render_config(&cfg).map_err(|e| CliError::config(&config_path, e))?;
        std::io::stdout().write_all(rendered.as_bytes())?;
        return Ok(());
    }

    let adapter_cfg =
        jablonet_config::to_adapter_config(&cfg).map_err(|e| CliError::config(&config_path, e))?;

    let transport = TransportConfig::new(adapter_cfg.base_url.clone(), adapter_cfg.request_timeout);
    let client = JablonetClient::new(&transport)?.log_responses(adapter_cfg.log_response);
    let store = Arc::new(JsonLinesStore::stdout());

    if cli.once {
        let mut poller = Poller::new(&adapter_cfg, client, store)?;
        let report = poller.run_cycle().await?;
        debug!(
            fetched = report.fetched,
            skipped = report.skipped,
            declared = report.reconcile.declared,
            written = report.reconcile.written,
            "single cycle finished"
        );
        return match report.outcome {
            CycleOutcome::Completed => Ok(()),
            CycleOutcome::Abandoned(e) | CycleOutcome::Skipped(e) => Err(e.into()),
        };
    }

    let adapter = Adapter::start(&adapter_cfg, client, store)?;

    let stop = adapter.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            stop.cancel();
        }
    });

    let result = adapter.wait().await;
    // Give the final connectivity write a chance to land.
    tokio::task::yield_now().await;
    result.map_err(CliError::from)
}
