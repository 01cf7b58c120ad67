use crate::feed::site::{find_section, SECTIONS};
use crate::state::Context;
use tracing::info;

/// List the sections available for browsing
#[poise::command(slash_command)]
pub async fn sections(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let current = ctx.data().selected_section(ctx.author().id.get()).await;

    let mut output = String::from("**Sections**\n");
    for section in SECTIONS {
        let marker = if current.map(|c| c.key) == Some(section.key) {
            " (selected)"
        } else {
            ""
        };
        output.push_str(&format!(
            "- `{}` — {}{}\n",
            section.key, section.label, marker
        ));
    }
    output.push_str("\nPick one with `/digest section`, then `/digest browse <topic>`.");

    ctx.say(output).await?;
    Ok(())
}

/// Choose the section your browse requests will use
#[poise::command(slash_command)]
pub async fn section(
    ctx: Context<'_>,
    #[description = "Section name"]
    #[autocomplete = "autocomplete_section"]
    name: String,
) -> Result<(), anyhow::Error> {
    let Some(section) = find_section(&name) else {
        ctx.say(format!(
            "Unknown section `{}`. Use `/digest sections` to see the list.",
            name
        ))
        .await?;
        return Ok(());
    };

    ctx.data()
        .select_section(ctx.author().id.get(), section)
        .await;
    info!(user = ctx.author().name, section = section.key, "section selected");

    ctx.say(format!(
        "Section selected: **{}**. Now send a topic with `/digest browse <topic>`.",
        section.label
    ))
    .await?;
    Ok(())
}

/// Autocomplete for section keys.
pub async fn autocomplete_section(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    let partial = partial.to_lowercase();
    SECTIONS
        .iter()
        .filter(|s| s.key.contains(&partial) || s.label.to_lowercase().contains(&partial))
        .map(|s| s.key.to_string())
        .collect()
}
