//! `roundtable run` — converse, extract, publish.
//!
//! Configuration and persona problems stop the command before anything
//! starts. Once the conversation is running, every failure is reported and
//! the command still completes.

use async_trait::async_trait;
use roundtable_agent::{ApprovalGate, RoleAgent, RunOutcome, StaticApproval, TurnOrchestrator};
use roundtable_config::{AppConfig, CONFIG_FILE};
use roundtable_core::event::{DomainEvent, EventBus};
use roundtable_core::persona::Persona;
use roundtable_publish::{
    BrowserPresenter, GitClient, Publication, PublicationPipeline, PublishSettings,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};

pub struct RunArgs {
    pub prompt: Option<String>,
    pub config: Option<PathBuf>,
    pub transcript: Option<PathBuf>,
    pub no_publish: bool,
    pub yes: bool,
    pub no_gate: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let workdir = std::env::current_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| workdir.join(CONFIG_FILE));
    let config = AppConfig::load_with_env(&config_path, |key| std::env::var(key).ok())
        .map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ROUNDTABLE_API_KEY      (generic)");
        eprintln!("    OPENAI_API_KEY          (OpenAI)");
        eprintln!("    AZURE_OPENAI_API_KEY    (Azure OpenAI, with AZURE_OPENAI_ENDPOINT)");
        eprintln!();
        eprintln!("  Or add `api_key` to {}", config_path.display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let persona_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(workdir.as_path());
    let personas = load_personas(&config, persona_dir)?;

    let provider = roundtable_providers::build_from_config(&config)
        .map_err(|e| format!("Failed to build provider: {e}"))?;
    let model = roundtable_providers::router::resolve_model(&config);
    let agents: Vec<RoleAgent> = personas
        .into_iter()
        .map(|persona| {
            RoleAgent::new(Arc::new(persona), provider.clone(), model.clone())
                .with_temperature(config.default_temperature)
                .with_max_tokens(config.default_max_tokens)
        })
        .collect();

    let prompt = match args.prompt {
        Some(prompt) => prompt,
        None => read_prompt().await?,
    };
    if prompt.trim().is_empty() {
        eprintln!("No prompt given, nothing to do.");
        return Ok(());
    }

    println!();
    println!("  Provider:  {}", provider.name());
    println!("  Model:     {model}");
    for agent in &agents {
        println!(
            "  Persona:   {} (~{} tokens of instructions)",
            agent.name(),
            agent.persona().estimated_tokens()
        );
    }
    println!("  Turns:     up to {}", config.conversation.max_turns);
    println!();

    let events = Arc::new(EventBus::default());
    let printer = tokio::spawn(print_events(events.subscribe()));

    let mut orchestrator =
        TurnOrchestrator::from_config(agents, &config).with_event_bus(events.clone());
    if !args.no_gate {
        let gate: Arc<dyn ApprovalGate> = if args.yes {
            Arc::new(StaticApproval(Some(config.conversation.approval_keyword.clone())))
        } else {
            Arc::new(StdinApproval)
        };
        orchestrator = orchestrator.with_approval_gate(gate);
    }

    let result = orchestrator.run_until(&prompt, shutdown_signal()).await;
    drop(events);
    if let Err(e) = printer.await {
        warn!(error = %e, "Turn printer stopped unexpectedly");
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Nothing to run: {e}");
            return Ok(());
        }
    };
    print_summary(&outcome);

    if let Some(path) = &args.transcript {
        write_transcript(path, &outcome);
    }

    let mut settings = PublishSettings::from_config(&config.publish);
    if args.no_publish {
        settings.enabled = false;
    }
    let mut pipeline =
        PublicationPipeline::new(&workdir, settings, Arc::new(GitClient::new(&workdir)));
    if config.publish.open_viewer {
        pipeline = pipeline.with_presenter(Arc::new(BrowserPresenter));
    }

    let publication = tokio::select! {
        publication = pipeline.publish_outcome(&outcome) => publication,
        _ = ctrl_c() => {
            eprintln!("\nInterrupted during publication, stopping.");
            return Ok(());
        }
    };
    print_publication(&publication, &config);

    Ok(())
}

fn print_publication(publication: &Publication, config: &AppConfig) {
    let report = match publication {
        Publication::NoArtifact => {
            println!("No artifact produced; nothing written or published.");
            return;
        }
        Publication::Disabled => return,
        Publication::AwaitingApproval => {
            println!(
                "Artifact found but not {}; publication requires approval.",
                config.conversation.approval_keyword
            );
            return;
        }
        Publication::Published(report) => report,
    };

    if report.written() {
        println!(
            "Wrote {} ({} bytes)",
            report.path.display(),
            report.bytes_written.unwrap_or_default()
        );
    }
    match (report.changed, report.pushed) {
        (false, _) if report.written() && report.is_clean() => {
            println!("Content unchanged; nothing to commit.")
        }
        (true, true) => println!("Committed and pushed to {}.", config.publish.remote),
        _ => {}
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
}

/// Load every configured persona; any failure is fatal.
fn load_personas(
    config: &AppConfig,
    base_dir: &Path,
) -> Result<Vec<Persona>, Box<dyn std::error::Error>> {
    config
        .personas
        .iter()
        .map(|p| {
            Persona::load(&p.name, &p.description, &p.resolve_path(base_dir)).map_err(|e| {
                eprintln!("  Run `roundtable onboard` to create persona files.");
                Box::<dyn std::error::Error>::from(e)
            })
        })
        .collect()
}

async fn read_prompt() -> Result<String, Box<dyn std::error::Error>> {
    eprintln!("Enter the request, then end input (Ctrl-D):");
    let mut prompt = String::new();
    tokio::io::stdin().read_to_string(&mut prompt).await?;
    Ok(prompt)
}

/// Resolves on Ctrl-C; never resolves when the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    ctrl_c().await;
    eprintln!("\nInterrupted, extracting from what has been said so far...");
}

async fn print_events(mut rx: broadcast::Receiver<Arc<DomainEvent>>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.as_ref() {
                DomainEvent::TurnCompleted { author, content, .. } => {
                    println!("# {author}: {content}\n");
                }
                DomainEvent::DirectedRequestIssued { author, .. } => {
                    println!("(asking {author} directly for the complete artifact)\n");
                }
                DomainEvent::AgentFailed {
                    author,
                    error_message,
                    ..
                } => {
                    eprintln!("{author} failed: {error_message}");
                }
                _ => {}
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Turn printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_summary(outcome: &RunOutcome) {
    println!("────────────────────────────────────────");
    println!("  Stopped:   {}", outcome.stop);
    println!("  Turns:     {}", outcome.turns);
    println!("  Approved:  {}", if outcome.approved { "yes" } else { "no" });
    match &outcome.artifact {
        Some(a) => println!(
            "  Artifact:  {} chars from message #{} ({})",
            a.chars(),
            a.source_sequence,
            a.pattern
        ),
        None => println!("  Artifact:  none"),
    }
    println!("────────────────────────────────────────");
}

fn write_transcript(path: &Path, outcome: &RunOutcome) {
    let json = match serde_json::to_string_pretty(&outcome.conversation) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Could not serialize transcript");
            return;
        }
    };
    match std::fs::write(path, json) {
        Ok(()) => info!(path = %path.display(), "Transcript written"),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not write transcript"),
    }
}

/// Asks on stderr and reads one line from stdin.
struct StdinApproval;

#[async_trait]
impl ApprovalGate for StdinApproval {
    async fn ask(&self, question: &str) -> Option<String> {
        eprintln!("\n{question}");
        eprint!("  You > ");
        read_line_detached(|| std::io::stdin().lock())
            .await
            .ok()
            .flatten()
    }
}

/// Reads one line on a detached OS thread.
///
/// Dropping the receiver abandons the read. The runtime never waits on the
/// thread at shutdown, so an interrupted prompt cannot hold the process open.
fn read_line_detached<F, R>(open: F) -> oneshot::Receiver<Option<String>>
where
    F: FnOnce() -> R + Send + 'static,
    R: BufRead,
{
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let answer = match open().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!(error = %e, "Could not read approval from stdin");
                None
            }
        };
        // The receiver is gone when the prompt was interrupted.
        let _ = tx.send(answer);
    });
    rx
}
