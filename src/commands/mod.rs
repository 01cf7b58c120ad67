mod browse;
mod config;
mod search;
mod sections;

use crate::feed::{Mode, PipelineReply};
use crate::state::Context;

/// Digest - news digests from dtf.ru listings
#[poise::command(
    slash_command,
    subcommands(
        "sections::sections",
        "sections::section",
        "browse::browse",
        "search::search",
        "config::config"
    )
)]
pub async fn digest(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Discord rejects messages over 2000 chars.
const CHUNK_LIMIT: usize = 1990;

/// Split text into chunks of at most `limit` bytes, preferring line then word breaks.
fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let mut chunk_len = remaining.len().min(limit);
        while !remaining.is_char_boundary(chunk_len) {
            chunk_len -= 1;
        }
        let split_at = if chunk_len < remaining.len() {
            remaining[..chunk_len]
                .rfind('\n')
                .or_else(|| remaining[..chunk_len].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(chunk_len)
        } else {
            chunk_len
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

/// Send a message in Discord-safe chunks.
/// Follow-ups go through ctx.say() so they ride the interaction webhook.
async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in split_chunks(text, CHUNK_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Render a pipeline reply as chat text. `place` names the section for browse replies.
fn format_reply(reply: &PipelineReply, place: &str) -> String {
    match reply {
        PipelineReply::Summary { text, .. } => text.clone(),
        PipelineReply::Ranked { query, items } => {
            let mut out = format!("**Top {} results for '{}':**\n", items.len(), query);
            for (i, ranked) in items.iter().enumerate() {
                let r = &ranked.record;
                out.push_str(&format!(
                    "{}. [{}](<{}>) — {} views\n",
                    i + 1,
                    r.title,
                    r.url,
                    r.view_count
                ));
            }
            out
        }
        PipelineReply::NoResults {
            mode,
            topic,
            source_unavailable,
        } => {
            let mut out = match mode {
                Mode::Browse => format!(
                    "No news about '{}' found in '{}'. Try another topic.",
                    topic, place
                ),
                Mode::Search => format!("Nothing found for '{}'.", topic),
            };
            if *source_unavailable {
                out.push_str(" (The site could not be loaded right now.)");
            }
            out
        }
    }
}
