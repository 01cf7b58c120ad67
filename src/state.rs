use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::error::ConfigError;
use crate::feed::rank::RankingWeights;
use crate::feed::site::Section;
use crate::feed::{FeedPipeline, Mode};
use crate::render::LoadPlan;

/// Pipeline knobs (admins can modify at runtime).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTuning {
    pub browse_target: usize,
    pub browse_max_cycles: u32,
    pub browse_extract_limit: usize,
    pub browse_keep: usize,
    pub search_max_cycles: u32,
    pub search_keep: usize,
    pub initial_settle_ms: u64,
    pub cycle_settle_ms: u64,
    /// 0 disables the loader deadline.
    pub deadline_secs: u64,
    pub freshness_window_hours: f64,
    pub popularity_boost: f64,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            browse_target: 50,
            browse_max_cycles: 5,
            browse_extract_limit: 50,
            browse_keep: 5,
            search_max_cycles: 3,
            search_keep: 20,
            initial_settle_ms: 2000,
            cycle_settle_ms: 2000,
            deadline_secs: 90,
            freshness_window_hours: 24.0,
            popularity_boost: 1.0,
        }
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match dotenv::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Value { key, value: raw }),
        _ => Ok(default),
    }
}

impl PipelineTuning {
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        let tuning = Self {
            browse_target: env_or("BROWSE_TARGET", d.browse_target)?,
            browse_max_cycles: env_or("BROWSE_MAX_CYCLES", d.browse_max_cycles)?,
            browse_extract_limit: env_or("BROWSE_EXTRACT_LIMIT", d.browse_extract_limit)?,
            browse_keep: env_or("BROWSE_KEEP", d.browse_keep)?,
            search_max_cycles: env_or("SEARCH_MAX_CYCLES", d.search_max_cycles)?,
            search_keep: env_or("SEARCH_KEEP", d.search_keep)?,
            initial_settle_ms: env_or("INITIAL_SETTLE_MS", d.initial_settle_ms)?,
            cycle_settle_ms: env_or("CYCLE_SETTLE_MS", d.cycle_settle_ms)?,
            deadline_secs: env_or("LOAD_DEADLINE_SECS", d.deadline_secs)?,
            freshness_window_hours: env_or("FRESHNESS_WINDOW_HOURS", d.freshness_window_hours)?,
            popularity_boost: env_or("POPULARITY_BOOST", d.popularity_boost)?,
        };
        tuning.validate()?;
        Ok(tuning)
    }

    /// Scores stay within `[views, (1 + boost) * views]` only for a positive
    /// finite window and a non-negative finite boost.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = self.freshness_window_hours;
        if !(window.is_finite() && window > 0.0) {
            return Err(ConfigError::Value {
                key: "FRESHNESS_WINDOW_HOURS",
                value: window.to_string(),
            });
        }
        let boost = self.popularity_boost;
        if !(boost.is_finite() && boost >= 0.0) {
            return Err(ConfigError::Value {
                key: "POPULARITY_BOOST",
                value: boost.to_string(),
            });
        }
        Ok(())
    }

    pub fn plan(&self, mode: Mode) -> LoadPlan {
        let (target_count, max_cycles) = match mode {
            Mode::Browse => (Some(self.browse_target), self.browse_max_cycles),
            Mode::Search => (None, self.search_max_cycles),
        };
        LoadPlan {
            target_count,
            max_cycles,
            initial_settle: Duration::from_millis(self.initial_settle_ms),
            cycle_settle: Duration::from_millis(self.cycle_settle_ms),
            deadline: (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs)),
        }
    }

    pub fn extract_limit(&self, mode: Mode) -> Option<usize> {
        match mode {
            Mode::Browse => Some(self.browse_extract_limit),
            Mode::Search => None,
        }
    }

    pub fn keep(&self, mode: Mode) -> usize {
        match mode {
            Mode::Browse => self.browse_keep,
            Mode::Search => self.search_keep,
        }
    }

    pub fn weights(&self) -> RankingWeights {
        RankingWeights {
            freshness_window_hours: self.freshness_window_hours,
            popularity_boost: self.popularity_boost,
        }
    }
}

pub struct AppState {
    pub pipeline: Arc<FeedPipeline>,
    pub admin_ids: HashSet<u64>,
    pub tuning: Arc<RwLock<PipelineTuning>>,
    /// Each user's current section, remembered between commands.
    pub selections: Arc<RwLock<HashMap<u64, &'static Section>>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub async fn tuning_snapshot(&self) -> PipelineTuning {
        self.tuning.read().await.clone()
    }

    pub async fn select_section(&self, user_id: u64, section: &'static Section) {
        self.selections.write().await.insert(user_id, section);
    }

    pub async fn selected_section(&self, user_id: u64) -> Option<&'static Section> {
        self.selections.read().await.get(&user_id).copied()
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
