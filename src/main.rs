use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use llm_gateway::cli::{Args, ChatArgs, Commands, ConfigDiscovery, GatewayConfig, load_image};
use llm_gateway::env::DEFAULT_LOG_FILTER;
use llm_gateway::llm::registry;
use llm_gateway::llm::retry::RetryNotice;
use llm_gateway::llm::stream::UsageAccumulator;
use llm_gateway::{Conversation, Gateway, ProviderConfig, StreamEvent, Turn};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Chat(chat) => run_chat(chat).await,
        Commands::Models { provider } => {
            let table = registry::provider_models(provider);
            for (id, info) in table.models {
                let marker = if *id == table.default_id { "*" } else { " " };
                println!(
                    "{} {:<36} ctx={:<7} out={:<6} ${}/${} per Mtok",
                    marker,
                    id,
                    info.context_window,
                    info.max_tokens,
                    info.input_price,
                    info.output_price
                );
            }
            Ok(())
        }
        Commands::ShowConfig { config } => {
            ConfigDiscovery::show_discovery_info();
            let loaded = load_config(config.as_deref())?;
            println!();
            println!("{}", loaded.redacted().to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<GatewayConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            GatewayConfig::from_toml_file(path)
        }
        None => ConfigDiscovery::discover_config(),
    }
}

async fn run_chat(args: ChatArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(provider) = args.provider
        && provider != config.provider.provider_type
    {
        config.provider = ProviderConfig::new(provider);
    }
    if let Some(model) = args.model {
        config.provider.model = Some(model);
    }

    let mut turn = Turn::user(args.prompt);
    for path in &args.images {
        turn = turn.with_image(load_image(path)?);
    }
    let conversation = Conversation::new().with_turn(turn);

    let observer = Arc::new(|notice: &RetryNotice| {
        if notice.discarded_output {
            eprintln!();
            eprintln!("--- connection lost, restarting response ---");
        }
        eprintln!(
            "attempt {} failed ({}), retrying in {:?}",
            notice.attempt, notice.error, notice.delay
        );
    });
    let gateway = Gateway::with_reqwest(&config.transport, config.retry.clone())?
        .with_retry_observer(observer);

    let handler = gateway
        .handler(&config.provider)
        .context("Cannot use the configured provider")?;
    let model = handler.resolve_model();
    if args.verbose {
        eprintln!("provider: {}, model: {}", handler.provider_name(), model.id);
    }

    let mut usage = UsageAccumulator::new(handler.usage_policy());
    let mut stream = gateway.create_message(&args.system, &conversation, &config.provider);
    let mut stdout = io::stdout();

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Text { text } => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            StreamEvent::Reasoning { reasoning } => {
                if args.show_reasoning {
                    eprint!("{}", reasoning);
                }
            }
            StreamEvent::Usage(delta) => usage.record(&delta),
        }
    }
    writeln!(stdout)?;

    if let Some(total) = usage.total() {
        eprintln!(
            "tokens: in={} out={} cache_write={} cache_read={} cost=${:.6}",
            total.input_tokens,
            total.output_tokens,
            total.cache_write_tokens.unwrap_or(0),
            total.cache_read_tokens.unwrap_or(0),
            total.total_cost.unwrap_or(0.0)
        );
    }

    Ok(())
}
