mod api;
mod commands;
mod gateway;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use maritaca_channels::EvolutionClient;
use maritaca_core::config;
use maritaca_providers::{OpenRouterProvider, PiperSynthesizer};
use maritaca_store::{SenderType, Store};

#[derive(Parser)]
#[command(
    name = "maritaca",
    version,
    about = "Maritaca — WhatsApp chat assistant backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and reminder loop.
    Serve,
    /// Print the effective configuration summary.
    Status,
    /// Manage the whitelist.
    Whitelist {
        #[command(subcommand)]
        action: WhitelistAction,
    },
}

#[derive(Subcommand)]
enum WhitelistAction {
    /// Allow a sender. `kind` is `user` or `group`, `id` the store row id.
    Add { kind: String, id: i64 },
    /// Remove a sender.
    Remove { kind: String, id: i64 },
}

fn parse_sender_type(kind: &str) -> anyhow::Result<SenderType> {
    match kind {
        "user" => Ok(SenderType::User),
        "group" => Ok(SenderType::Group),
        other => anyhow::bail!("unknown sender kind '{other}', expected user or group"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve => {
            let cfg = config::load(&cli.config)?;
            let store = Store::new(&cfg.memory).await?;

            let transport = Arc::new(EvolutionClient::from_config(&cfg.evolution));
            let provider = Arc::new(OpenRouterProvider::from_config(&cfg.openrouter));
            let speech = Arc::new(PiperSynthesizer::from_config(&cfg.tts));

            let gateway = Arc::new(gateway::Gateway::new(
                transport.clone(),
                provider.clone(),
                provider.clone(),
                provider,
                speech,
                store.clone(),
                cfg.clone(),
            ));

            if cfg.scheduler.enabled {
                tokio::spawn(gateway::reminder_loop(
                    store,
                    transport,
                    cfg.scheduler.poll_interval_secs,
                ));
            }

            let server = tokio::spawn(api::serve(
                cfg.webhook.clone(),
                cfg.maintenance.clone(),
                gateway,
            ));

            tokio::select! {
                _ = server => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                }
            }
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Maritaca — Status\n");
            println!("Config: {}", cli.config);
            println!("Bot: {} ({})", cfg.bot.name, cfg.bot.number);
            println!("Webhook: {}:{}", cfg.webhook.host, cfg.webhook.port);
            println!("Evolution: {} (instance {})", cfg.evolution.base_url, cfg.evolution.instance);
            println!(
                "Models: text={} audio={} image={} classifier={}",
                cfg.openrouter.text_model,
                cfg.openrouter.audio_model,
                cfg.openrouter.image_model,
                cfg.openrouter.classifier_model,
            );
            println!("Database: {}", cfg.memory.db_path);
            println!(
                "Scheduler: {} (every {}s)",
                if cfg.scheduler.enabled { "on" } else { "off" },
                cfg.scheduler.poll_interval_secs,
            );
            if cfg.maintenance.enabled {
                println!("Maintenance mode: ON, serving only {}", cfg.maintenance.allowed_number);
            }
        }
        Commands::Whitelist { action } => {
            let cfg = config::load(&cli.config)?;
            let store = Store::new(&cfg.memory).await?;
            match action {
                WhitelistAction::Add { kind, id } => {
                    let sender_type = parse_sender_type(&kind)?;
                    store.add_to_whitelist(sender_type, id).await?;
                    println!("Whitelisted {kind} {id}");
                }
                WhitelistAction::Remove { kind, id } => {
                    let sender_type = parse_sender_type(&kind)?;
                    if store.remove_from_whitelist(sender_type, id).await? {
                        println!("Removed {kind} {id} from the whitelist");
                    } else {
                        println!("{kind} {id} was not whitelisted");
                    }
                }
            }
        }
    }

    Ok(())
}
