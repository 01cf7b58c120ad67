use crate::state::{Context, PipelineTuning};

const PARAMS: &str = "browse_max_cycles | browse_target | browse_extract_limit | browse_keep | \
    search_max_cycles | search_keep | initial_settle_ms | cycle_settle_ms | deadline_secs | \
    freshness_window_hours | popularity_boost";

fn describe(t: &PipelineTuning) -> String {
    format!(
        "**Pipeline Configuration:**\n\
         `browse_target`: {}\n\
         `browse_max_cycles`: {}\n\
         `browse_extract_limit`: {}\n\
         `browse_keep`: {}\n\
         `search_max_cycles`: {}\n\
         `search_keep`: {}\n\
         `initial_settle_ms`: {}\n\
         `cycle_settle_ms`: {}\n\
         `deadline_secs`: {}\n\
         `freshness_window_hours`: {}\n\
         `popularity_boost`: {}",
        t.browse_target,
        t.browse_max_cycles,
        t.browse_extract_limit,
        t.browse_keep,
        t.search_max_cycles,
        t.search_keep,
        t.initial_settle_ms,
        t.cycle_settle_ms,
        t.deadline_secs,
        t.freshness_window_hours,
        t.popularity_boost
    )
}

/// Apply one parameter change. Returns the confirmation or a user-facing error.
///
/// `t` is left untouched when the change is rejected.
fn apply(t: &mut PipelineTuning, key: &str, value: f64) -> Result<String, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("`{}` must be a non-negative number", key));
    }
    let whole = || {
        if value.fract() == 0.0 && value <= u32::MAX as f64 {
            Ok(value as u32)
        } else {
            Err(format!("`{}` must be a whole number", key))
        }
    };

    let mut next = t.clone();
    match key {
        "browse_target" => next.browse_target = whole()? as usize,
        "browse_max_cycles" => next.browse_max_cycles = whole()?,
        "browse_extract_limit" => next.browse_extract_limit = whole()? as usize,
        "browse_keep" => next.browse_keep = whole()? as usize,
        "search_max_cycles" => next.search_max_cycles = whole()?,
        "search_keep" => next.search_keep = whole()? as usize,
        "initial_settle_ms" => next.initial_settle_ms = whole()? as u64,
        "cycle_settle_ms" => next.cycle_settle_ms = whole()? as u64,
        "deadline_secs" => next.deadline_secs = whole()? as u64,
        "freshness_window_hours" => next.freshness_window_hours = value,
        "popularity_boost" => next.popularity_boost = value,
        _ => return Err(format!("Unknown param `{}`. Valid: {}", key, PARAMS)),
    }
    next.validate().map_err(|e| format!("`{}` rejected: {}", key, e))?;

    *t = next;
    Ok(format!("`{}` set to {}", key, value))
}

/// Configure pipeline parameters (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "Parameter name"] param: Option<String>,
    #[description = "New value"] value: Option<f64>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let tuning = ctx.data().tuning_snapshot().await;
            ctx.say(describe(&tuning)).await?;
        }
        (Some(key), Some(val)) => {
            let outcome = {
                let mut tuning = ctx.data().tuning.write().await;
                apply(&mut tuning, key, val)
            };
            match outcome {
                Ok(msg) | Err(msg) => ctx.say(msg).await?,
            };
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/digest config search_keep 10`")
                .await?;
        }
    }

    Ok(())
}
