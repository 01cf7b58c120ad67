use super::{format_reply, send_chunked};
use crate::feed::PipelineRequest;
use crate::state::Context;
use tracing::info;

/// Rank site-wide search results by popularity and freshness
#[poise::command(slash_command)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Search query"] query: String,
) -> Result<(), anyhow::Error> {
    let query = query.trim().to_string();
    if query.is_empty() {
        ctx.say("Send a non-empty query.").await?;
        return Ok(());
    }

    ctx.say(format!("Searching for '{}'...", query)).await?;

    let tuning = ctx.data().tuning_snapshot().await;
    info!(user = ctx.author().name, query, "search started");

    let request = PipelineRequest::Search {
        query: query.clone(),
    };
    let reply = ctx.data().pipeline.run(&request, &tuning).await;

    send_chunked(&ctx, &format_reply(&reply, "search")).await
}
