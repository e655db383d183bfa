//! CLI entrypoint for thinktank
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod output;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use commands::Cli;
use output::ConsoleReporter;
use std::path::Path;
use thinktank_application::{Beadifier, Orchestrator, OrchestratorError};
use thinktank_domain::{Goal, Session, render_tracker_commands};
use thinktank_infrastructure::{
    ConfigLoader, FileConfig, JsonlEventLogger, ProviderRegistry, write_spec_files,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        println!("Configuration sources (in priority order):");
        for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("  {}", line);
        }
        return Ok(());
    }

    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref());
    info!("Starting thinktank");

    // === Configuration ===
    let mut file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    apply_overrides(&cli, &mut file_config);

    let issues = file_config.validate();
    if !issues.is_empty() {
        let list = issues
            .iter()
            .map(|issue| format!("  - {}", issue))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Invalid configuration:\n{}", list);
    }

    // === Dependency Injection ===
    let registry = ProviderRegistry::new(file_config.providers.to_provider_settings());
    let goal = Goal::new(cli.goal.clone().unwrap_or_default())?;
    let mut orchestrator = Orchestrator::new(Session::new(goal))
        .with_config(file_config.deliberation.to_deliberation_config());

    for (participant, fallbacks) in file_config.participants()? {
        let adapter = registry
            .build_with_fallbacks(&participant.model, &fallbacks)
            .with_context(|| format!("No usable model for participant {}", participant.name))?;
        orchestrator.add_participant(participant, adapter)?;
    }

    let reporter = (!cli.quiet).then(|| ConsoleReporter::spawn(orchestrator.subscribe()));
    let event_logger = cli
        .event_log
        .clone()
        .or_else(|| file_config.logging.event_log.clone())
        .and_then(JsonlEventLogger::new)
        .map(|logger| logger.spawn(orchestrator.subscribe()));

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling deliberation");
            token.cancel();
        }
    });

    if !cli.quiet {
        let names: Vec<String> = orchestrator
            .session()
            .participants
            .iter()
            .map(|p| format!("{} ({})", p.name, p.model.model))
            .collect();
        println!("{}", output::header(orchestrator.session().goal.content(), &names));
    }

    let result = orchestrator.deliberate().await;
    // Dropping the orchestrator closes the event channel so subscribers finish.
    let session = orchestrator.into_session();
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }
    if let Some(event_logger) = event_logger
        && let Ok(written) = event_logger.await
    {
        info!("Logged {} events", written);
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(OrchestratorError::Cancelled) => {
            eprintln!("Deliberation cancelled after {} rounds", session.rounds.len());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    println!("{}", output::format_verdict(&outcome, &session));

    if cli.beadify {
        if !outcome.converged {
            warn!("Beadifying a synthesis that did not reach consensus");
        }
        beadify(&cli, &file_config, &registry, &session).await?;
    }

    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut FileConfig) {
    if let Some(max_rounds) = cli.max_rounds {
        config.deliberation.max_rounds = max_rounds;
    }
    if let Some(threshold) = cli.threshold {
        config.deliberation.convergence_threshold = threshold;
    }
    if let Some(epic) = &cli.epic {
        config.beadifier.epic = Some(epic.clone());
    }
}

async fn beadify(
    cli: &Cli,
    config: &FileConfig,
    registry: &ProviderRegistry,
    session: &Session,
) -> Result<()> {
    let synthesis = session
        .latest_synthesis()
        .map(|c| c.content.clone())
        .context("No synthesis to beadify")?;

    let model = match config.beadifier.model_config()? {
        Some(model) => model,
        None => session
            .participants
            .iter()
            .find(|p| !p.is_human)
            .map(|p| p.model.clone())
            .context("No model available for the beadifier")?,
    };
    let adapter = registry.build(&model)?;

    let outcome = Beadifier::new(adapter)
        .with_config(config.beadifier.to_beadifier_config())
        .beadify(&synthesis)
        .await?;

    let commands = render_tracker_commands(&outcome.tasks, config.beadifier.epic.as_deref());
    println!("{}", output::format_beads(&outcome, &commands));

    if let Some(dir) = &cli.spec_dir {
        let written = write_spec_files(dir, &outcome.tasks)?;
        println!("Wrote {} spec files to {}", written.len(), dir.display());
    }
    Ok(())
}

/// Initialize logging based on verbosity level; `RUST_LOG` wins when set.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = log_file.and_then(|path| {
        let name = path.file_name()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Some(tracing_appender::rolling::never(dir, name))
    });

    match file {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}
