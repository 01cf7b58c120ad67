use super::sections::autocomplete_section;
use super::{format_reply, send_chunked};
use crate::feed::site::find_section;
use crate::feed::PipelineRequest;
use crate::state::Context;
use tracing::info;

/// Summarize the latest news on a topic from a section
#[poise::command(slash_command)]
pub async fn browse(
    ctx: Context<'_>,
    #[description = "Topic to look for"] topic: String,
    #[description = "Section (defaults to your selected one)"]
    #[autocomplete = "autocomplete_section"]
    section: Option<String>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();

    let section = match section.as_deref() {
        Some(name) => match find_section(name) {
            Some(found) => {
                ctx.data().select_section(user_id, found).await;
                Some(found)
            }
            None => {
                ctx.say(format!(
                    "Unknown section `{}`. Use `/digest sections` to see the list.",
                    name
                ))
                .await?;
                return Ok(());
            }
        },
        None => ctx.data().selected_section(user_id).await,
    };
    let Some(section) = section else {
        ctx.say("Pick a section first with `/digest section`.").await?;
        return Ok(());
    };

    let topic = topic.trim().to_string();
    if topic.is_empty() {
        ctx.say("Send a non-empty topic.").await?;
        return Ok(());
    }

    // Loading the listing takes a while; acknowledge first.
    ctx.say(format!(
        "Looking for news about '{}' in '{}'...",
        topic, section.label
    ))
    .await?;

    let tuning = ctx.data().tuning_snapshot().await;
    info!(
        user = ctx.author().name,
        section = section.key,
        topic,
        "browse started"
    );

    let request = PipelineRequest::Browse {
        section,
        topic: topic.clone(),
    };
    let reply = ctx.data().pipeline.run(&request, &tuning).await;

    send_chunked(&ctx, &format_reply(&reply, section.label)).await
}
