mod commands;
mod error;
mod feed;
mod llm;
mod render;
mod state;
mod summarize;

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tokio::sync::RwLock;
use tracing::{error, info, Level};

use feed::extract::Extractor;
use feed::site::SiteProfile;
use feed::FeedPipeline;
use llm::LlmClient;
use render::chrome::ChromeRenderer;
use state::{AppState, PipelineTuning};
use summarize::LlmSummarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    let level = dotenv::var("LOG_LEVEL")
        .ok()
        .and_then(|l| Level::from_str(&l).ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let token = dotenv::var("DISCORD_TOKEN").context("DISCORD_TOKEN required")?;
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    // Site profile and listing selectors
    let site = SiteProfile::from_env()?;
    info!(origin = %site.origin, "Site profile loaded");
    let extractor = Extractor::new(site)?;

    // Collaborators
    let renderer = Arc::new(ChromeRenderer::from_env()?);
    let llm_client = Arc::new(LlmClient::from_env()?);
    let language = dotenv::var("SUMMARY_LANGUAGE").unwrap_or_else(|_| "Russian".to_string());
    let summarizer = Arc::new(LlmSummarizer::new(llm_client, language));
    info!("Renderer and summarizer initialized");

    let pipeline = Arc::new(FeedPipeline::new(renderer, summarizer, extractor));
    let tuning = PipelineTuning::from_env()?;
    info!(?tuning, "Pipeline tuning loaded");

    // Parse admin user IDs from env
    let admin_ids: HashSet<u64> = dotenv::var("ADMIN_USER_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect();
    if !admin_ids.is_empty() {
        info!(count = admin_ids.len(), "Admin users configured");
    }

    let app_state = AppState {
        pipeline,
        admin_ids,
        tuning: Arc::new(RwLock::new(tuning)),
        selections: Arc::new(RwLock::new(HashMap::new())),
    };

    let intents = serenity::GatewayIntents::GUILDS;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::digest()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                info!("Registering {} top-level command(s):", commands.len());
                for cmd in commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                    for sub in &cmd.subcommands {
                        info!("    /{} {}", cmd.name, sub.name);
                    }
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, gid)
                        .await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting digest Discord bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
