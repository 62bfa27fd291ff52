use std::sync::Arc;

use slack_void::config::SweepConfig;
use slack_void::error::{Error, Result};
use slack_void::slack::SlackClient;
use slack_void::sweep::{RunSummary, Sweeper};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(summary) => println!("results: {summary}"),
        Err(Error::Config(e)) => {
            eprintln!("Error: {e}");
            eprintln!("  export SLACK_TOKEN=xoxp-...");
            eprintln!("  export VOID_CHANNEL_ID=C0123456789");
            std::process::exit(1);
        }
        Err(e) => {
            // Platform errors carry Slack's own response; log all of it.
            if let Some(response) = e.platform_response() {
                tracing::error!(error = %e, response = %response, "Slack platform error");
            } else {
                tracing::error!(error = %e, "Unexpected error");
            }
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<RunSummary> {
    let config = SweepConfig::from_env()?;
    print_banner(&config);

    let client = SlackClient::from_config(&config)?;
    Sweeper::new(&config, Arc::new(client)).run().await
}

fn print_banner(config: &SweepConfig) {
    eprintln!("🕳  slack-void v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Holding channel: {}", config.holding_channel);
    eprintln!("   Exempt channel: #{}", config.exempt_channel);
    eprintln!(
        "   Cutoff: {} ago",
        humantime::format_duration(config.cutoff_age)
    );
    eprintln!("   Max users: {}", config.max_users);
    eprintln!(
        "   Recency check: {}",
        if config.check_recent_messages {
            "enabled"
        } else {
            "disabled"
        }
    );
    if config.preview {
        eprintln!("   Preview mode: no changes will be made\n");
    } else {
        eprintln!("   Live mode: users WILL be moved\n");
    }
}
