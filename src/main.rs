use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use knowledge_manager::config::Command;
use knowledge_manager::domain::ports::EventPublisher;
use knowledge_manager::domain::topology::knowledge_manager_stack;
use knowledge_manager::utils::error::ErrorSeverity;
use knowledge_manager::utils::{logger, validation::Validate};
use knowledge_manager::{CliConfig, Fixtures, HandlerEngine, HandlerKind, KnowledgeError};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    logger::init_cli_logger(config.verbose());

    match config.command {
        Command::Topology { pretty } => {
            let stack = knowledge_manager_stack();
            if let Err(e) = stack.validate() {
                exit_with(&e);
            }
            let rendered = if pretty {
                serde_json::to_string_pretty(&stack)?
            } else {
                serde_json::to_string(&stack)?
            };
            println!("{}", rendered);
        }
        Command::Invoke {
            handler,
            event,
            fixtures,
            ..
        } => {
            let raw = std::fs::read_to_string(&event)
                .with_context(|| format!("reading event file {}", event.display()))?;
            let event: Value = serde_json::from_str(&raw)
                .context("parsing event file as JSON")?;

            tracing::info!(handler = %handler, "Invoking handler");
            if let Err(e) = invoke(handler, event, fixtures.as_deref()).await {
                exit_with(&e);
            }
        }
    }

    Ok(())
}

async fn invoke(
    kind: HandlerKind,
    event: Value,
    fixtures: Option<&Path>,
) -> knowledge_manager::Result<()> {
    match fixtures {
        Some(path) => {
            let offline = Fixtures::load(path)?.offline_services()?;
            offline.services.runtime.validate()?;

            let publisher: Arc<dyn EventPublisher> = Arc::new(offline.publisher.clone());
            let engine = HandlerEngine::new(kind.build(&offline.services, Some(publisher))?);
            let output = engine.run(event).await?;

            println!("{}", serde_json::to_string_pretty(&output)?);
            for published in offline.publisher.events() {
                println!(
                    "📣 {}: {}",
                    published.detail_type,
                    serde_json::to_string(&published.message)?
                );
            }
            Ok(())
        }
        None => invoke_on_aws(kind, event).await,
    }
}

#[cfg(feature = "aws")]
async fn invoke_on_aws(kind: HandlerKind, event: Value) -> knowledge_manager::Result<()> {
    use knowledge_manager::config::lambda::aws_services;
    use knowledge_manager::RuntimeConfig;

    let runtime = RuntimeConfig::from_env()?;
    runtime.validate()?;

    let (services, publisher) = aws_services(runtime, kind).await?;
    let engine = HandlerEngine::new(kind.build(&services, publisher)?);
    let output = engine.run(event).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(not(feature = "aws"))]
async fn invoke_on_aws(_kind: HandlerKind, _event: Value) -> knowledge_manager::Result<()> {
    Err(KnowledgeError::ConfigError {
        message: "--fixtures is required when built without the `aws` feature".to_string(),
    })
}

fn exit_with(e: &KnowledgeError) -> ! {
    tracing::error!(error = %e, severity = ?e.severity(), "Command failed");
    eprintln!("❌ {}", e);
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
