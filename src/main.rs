mod command;
mod config;
mod pr;

use clap::Parser;
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use command::template::MessageRenderer;
use command::Capability;

/// Finds a GitHub pull request link in chat text and renders a
/// message describing its review status.
#[derive(Parser, Debug)]
#[command(name = "pr-status", version, about)]
struct Cli {
    /// Chat message text. Read from stdin when omitted.
    text: Option<String>,

    /// Message template file, overriding the configured template
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Configuration file (defaults to .pr-status.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the pull request status as JSON instead of rendering a message
    #[arg(long)]
    json: bool,

    /// List the registered pull request commands and exit
    #[arg(long)]
    list_commands: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = match cli.config.as_deref() {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };
    let capability = Capability::from_config(&config.github)?;

    if cli.list_commands {
        print_commands(&capability);
        return Ok(());
    }

    let text = match cli.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let matcher = pr::ReferenceMatcher::new(&config.github.host);
    let Some(found) = matcher.find(&text) else {
        info!("no pull request link found");
        return Ok(());
    };
    let reference = pr::PullRequestRef::try_from(&found)?;
    debug!(
        project = %reference.project,
        repo = %reference.repo,
        pr = reference.number,
        "matched pull request link"
    );

    let Some(fetcher) = capability.fetcher() else {
        warn!(
            pr = %reference,
            "pull request lookups are disabled, set GITHUB_TOKEN to enable them"
        );
        return Ok(());
    };

    let cancel = CancellationToken::new();
    spawn_deadline(cancel.clone(), config.timeout());
    let span = info_span!("pr_status", pr = %reference);

    if cli.json {
        let pull_request = fetcher
            .get_pull_request(&reference, &cancel)
            .instrument(span)
            .await?;
        info!(status = %pull_request.status(), "fetched pull request");
        println!("{}", serde_json::to_string_pretty(&pull_request)?);
        return Ok(());
    }

    let template = match cli.template.as_deref() {
        Some(path) => std::fs::read_to_string(path)?,
        None => config.template.clone(),
    };
    let renderer = Arc::new(MessageRenderer::new(&capability, template, cancel)?);
    let message = match renderer.render(reference).instrument(span).await {
        Ok(message) => message,
        Err(err) => {
            if let Some(fetch_error) = err.fetch_error() {
                warn!(error = %fetch_error, "pull request lookup failed");
            }
            return Err(err.into());
        }
    };
    println!("{}", message.trim_end());

    Ok(())
}

/// Cancels `cancel` on Ctrl-C or once `timeout` has elapsed.
fn spawn_deadline(cancel: CancellationToken, timeout: std::time::Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => warn!("interrupted, cancelling lookup"),
            _ = tokio::time::sleep(timeout) => {
                warn!(?timeout, "deadline reached, cancelling lookup")
            }
            _ = cancel.cancelled() => return,
        }
        cancel.cancel();
    });
}

fn print_commands(capability: &Capability) {
    let commands = capability.help();
    if commands.is_empty() {
        println!("No pull request commands registered (no GitHub token configured).");
        return;
    }
    for help in commands {
        println!("{}", help.command.bold());
        println!("  {}", help.description);
        for example in &help.examples {
            println!("  e.g. {}", example.cyan());
        }
    }
}
