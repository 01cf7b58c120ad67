pub mod chrome;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::feed::extract::Extractor;
use crate::feed::types::{LoadedPage, StopReason};

/// Starts isolated browser sessions. One session per pipeline invocation.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RenderSession>, FetchError>;
}

/// A live browser tab owned by exactly one loader run.
#[async_trait]
pub trait RenderSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;
    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError>;
    /// Current rendered document height.
    async fn content_height(&mut self) -> Result<u64, FetchError>;
    async fn page_source(&mut self) -> Result<String, FetchError>;
    /// Tear the session down. Safe to call more than once.
    async fn close(&mut self) -> Result<(), FetchError>;
}

/// How hard the loader tries to reveal more content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadPlan {
    /// Stop once this many candidate blocks are rendered. `None` is best-effort.
    pub target_count: Option<usize>,
    pub max_cycles: u32,
    pub initial_settle: Duration,
    pub cycle_settle: Duration,
    /// Wall-clock bound for the whole load, session start included.
    pub deadline: Option<Duration>,
}

pub struct PageLoader<'a> {
    renderer: &'a dyn Renderer,
    extractor: &'a Extractor,
}

impl<'a> PageLoader<'a> {
    pub fn new(renderer: &'a dyn Renderer, extractor: &'a Extractor) -> Self {
        Self {
            renderer,
            extractor,
        }
    }

    /// Load `url`, scrolling until the page converges, the target is met,
    /// or `max_cycles` runs out. The session is closed on every path.
    pub async fn load(&self, url: &str, plan: &LoadPlan) -> Result<LoadedPage, FetchError> {
        let mut slot = None;

        let result = {
            let run = self.open_and_drive(&mut slot, url, plan);
            match plan.deadline {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(url, ?limit, "page load timed out, tearing session down");
                        Err(FetchError::Timeout(limit))
                    }
                },
                None => run.await,
            }
        };

        if let Some(mut session) = slot {
            if let Err(e) = session.close().await {
                warn!(url, error = %e, "failed to close rendering session");
            }
        }
        result
    }

    /// The opened session is parked in `slot` so `load` can close it even
    /// when this future is cut short.
    async fn open_and_drive(
        &self,
        slot: &mut Option<Box<dyn RenderSession>>,
        url: &str,
        plan: &LoadPlan,
    ) -> Result<LoadedPage, FetchError> {
        let session = slot.insert(self.renderer.open().await?);
        self.drive(session.as_mut(), url, plan).await
    }

    async fn drive(
        &self,
        session: &mut dyn RenderSession,
        url: &str,
        plan: &LoadPlan,
    ) -> Result<LoadedPage, FetchError> {
        session.navigate(url).await.map_err(|e| match e {
            FetchError::Navigation { .. } => e,
            other => FetchError::Navigation {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })?;
        tokio::time::sleep(plan.initial_settle).await;

        let mut cycles = 0u32;
        let stop = match session.content_height().await {
            Ok(initial) => self.scroll_until_settled(session, plan, initial, &mut cycles).await,
            Err(e) => {
                warn!(url, error = %e, "could not measure initial height");
                StopReason::Interrupted
            }
        };

        let html = session.page_source().await?;
        info!(url, cycles, ?stop, bytes = html.len(), "listing loaded");
        Ok(LoadedPage { html, cycles, stop })
    }

    async fn scroll_until_settled(
        &self,
        session: &mut dyn RenderSession,
        plan: &LoadPlan,
        initial_height: u64,
        cycles: &mut u32,
    ) -> StopReason {
        let mut last_height = initial_height;

        while *cycles < plan.max_cycles {
            *cycles += 1;

            if let Err(e) = session.scroll_to_bottom().await {
                warn!(cycle = *cycles, error = %e, "scroll failed");
                return StopReason::Interrupted;
            }
            tokio::time::sleep(plan.cycle_settle).await;

            let height = match session.content_height().await {
                Ok(h) => h,
                Err(e) => {
                    warn!(cycle = *cycles, error = %e, "height measurement failed");
                    return StopReason::Interrupted;
                }
            };
            debug!(cycle = *cycles, last_height, height, "scroll cycle");

            if height <= last_height {
                return StopReason::Converged;
            }
            last_height = height;

            if let Some(target) = plan.target_count {
                let html = match session.page_source().await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(cycle = *cycles, error = %e, "snapshot failed");
                        return StopReason::Interrupted;
                    }
                };
                let blocks = self.extractor.count_blocks(&html);
                debug!(cycle = *cycles, blocks, target, "rendered blocks");
                if blocks >= target {
                    return StopReason::TargetReached;
                }
            }
        }

        StopReason::CycleLimit
    }
}
