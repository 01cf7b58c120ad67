pub mod extract;
pub mod filter;
pub mod rank;
pub mod site;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::render::{LoadPlan, PageLoader, Renderer};
use crate::state::PipelineTuning;
use crate::summarize::Summarizer;

use extract::Extractor;
use site::{Section, SiteProfile};
use types::{RankedRecord, Record};

/// Shown in place of a digest when the summarizer fails.
pub const SUMMARY_FALLBACK: &str =
    "Could not get a summary from the model right now. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Filter a section listing by topic and summarize the top matches.
    Browse,
    /// Rank site search results by popularity and freshness.
    Search,
}

#[derive(Debug, Clone)]
pub enum PipelineRequest {
    Browse {
        section: &'static Section,
        topic: String,
    },
    Search {
        query: String,
    },
}

impl PipelineRequest {
    pub fn mode(&self) -> Mode {
        match self {
            PipelineRequest::Browse { .. } => Mode::Browse,
            PipelineRequest::Search { .. } => Mode::Search,
        }
    }

    fn topic(&self) -> &str {
        match self {
            PipelineRequest::Browse { topic, .. } => topic,
            PipelineRequest::Search { query } => query,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineReply {
    Summary {
        topic: String,
        items: Vec<Record>,
        text: String,
    },
    Ranked {
        query: String,
        items: Vec<RankedRecord>,
    },
    NoResults {
        mode: Mode,
        topic: String,
        /// The listing could not be loaded at all.
        source_unavailable: bool,
    },
}

/// Loader → extractor → filter or scorer → bounded result.
pub struct FeedPipeline {
    renderer: Arc<dyn Renderer>,
    summarizer: Arc<dyn Summarizer>,
    extractor: Extractor,
}

impl FeedPipeline {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        summarizer: Arc<dyn Summarizer>,
        extractor: Extractor,
    ) -> Self {
        Self {
            renderer,
            summarizer,
            extractor,
        }
    }

    pub fn site(&self) -> &SiteProfile {
        self.extractor.site()
    }

    pub async fn run(&self, request: &PipelineRequest, tuning: &PipelineTuning) -> PipelineReply {
        self.run_at(request, tuning, Utc::now()).await
    }

    /// Run one invocation with `now` as the reference time for defaults and scoring.
    pub async fn run_at(
        &self,
        request: &PipelineRequest,
        tuning: &PipelineTuning,
        now: DateTime<Utc>,
    ) -> PipelineReply {
        let mode = request.mode();
        let topic = request.topic().trim().to_string();
        let no_results = |source_unavailable| PipelineReply::NoResults {
            mode,
            topic: topic.clone(),
            source_unavailable,
        };

        let target = match request {
            PipelineRequest::Browse { section, .. } => self.site().section_url(section),
            PipelineRequest::Search { query } => self.site().search_url(query),
        };
        let url = match target {
            Ok(url) => String::from(url),
            Err(e) => {
                warn!(?mode, error = %e, "could not build listing url");
                return no_results(true);
            }
        };

        let records = match self
            .collect(&url, &tuning.plan(mode), tuning.extract_limit(mode), now)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(?mode, url, error = %e, "listing unavailable");
                return no_results(true);
            }
        };
        let extracted = records.len();

        match mode {
            Mode::Browse => {
                let mut matched = filter::filter_by_topic(records, &topic);
                let total_matched = matched.len();
                matched.truncate(tuning.keep(mode));
                info!(
                    url,
                    topic,
                    extracted,
                    total_matched,
                    kept = matched.len(),
                    "browse filtered"
                );

                if matched.is_empty() {
                    return no_results(false);
                }

                let blocks: Vec<String> = matched.iter().map(Record::text_block).collect();
                let text = match self.summarizer.summarize(&topic, &blocks).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(topic, error = %e, "summarization failed, using fallback");
                        SUMMARY_FALLBACK.to_string()
                    }
                };

                PipelineReply::Summary {
                    topic: topic.clone(),
                    items: matched,
                    text,
                }
            }
            Mode::Search => {
                let mut ranked = rank::rank(records, &tuning.weights(), now);
                ranked.truncate(tuning.keep(mode));
                info!(url, query = topic, extracted, kept = ranked.len(), "search ranked");

                if ranked.is_empty() {
                    return no_results(false);
                }

                PipelineReply::Ranked {
                    query: topic.clone(),
                    items: ranked,
                }
            }
        }
    }

    async fn collect(
        &self,
        url: &str,
        plan: &LoadPlan,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Record>, FetchError> {
        let page = PageLoader::new(self.renderer.as_ref(), &self.extractor)
            .load(url, plan)
            .await?;
        debug!(url, cycles = page.cycles, stop = ?page.stop, "extracting records");
        Ok(self.extractor.extract(&page.html, limit, now))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::render::testing::{listing, ScriptedRenderer};
    use super::site::find_section;

    #[derive(Default)]
    struct RecordingSummarizer {
        fail: bool,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn summarize(&self, topic: &str, items: &[String]) -> Result<String> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((topic.to_string(), items.to_vec()));
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(format!("digest of {} items", items.len()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn tuning() -> PipelineTuning {
        PipelineTuning {
            initial_settle_ms: 0,
            cycle_settle_ms: 0,
            deadline_secs: 0,
            ..Default::default()
        }
    }

    fn pipeline(renderer: ScriptedRenderer, summarizer: Arc<RecordingSummarizer>) -> FeedPipeline {
        let extractor = Extractor::new(SiteProfile::default()).expect("default selectors compile");
        FeedPipeline::new(Arc::new(renderer), summarizer, extractor)
    }

    fn browse(topic: &str) -> PipelineRequest {
        PipelineRequest::Browse {
            section: find_section("games").expect("games section"),
            topic: topic.to_string(),
        }
    }

    #[tokio::test]
    async fn browse_keeps_first_five_matches_in_order() {
        let renderer = ScriptedRenderer::new(vec![100, 100], vec![listing(12)]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let reply = pipeline(renderer.clone(), summarizer.clone())
            .run_at(&browse("item"), &tuning(), now())
            .await;

        match reply {
            PipelineReply::Summary { topic, items, text } => {
                assert_eq!(topic, "item");
                let titles: Vec<_> = items.iter().map(|r| r.title.as_str()).collect();
                assert_eq!(titles, ["Item 0", "Item 1", "Item 2", "Item 3", "Item 4"]);
                assert_eq!(text, "digest of 5 items");
            }
            other => panic!("expected summary, got {other:?}"),
        }

        let calls = summarizer.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1[0], "Item 0\nhttps://dtf.ru/item/0\n");
        assert_eq!(renderer.journal().navigated, ["https://dtf.ru/games"]);
    }

    #[tokio::test]
    async fn browse_without_matches_skips_summarizer() {
        let renderer = ScriptedRenderer::new(vec![100, 100], vec![listing(3)]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let reply = pipeline(renderer, summarizer.clone())
            .run_at(&browse("cooking"), &tuning(), now())
            .await;

        assert_eq!(
            reply,
            PipelineReply::NoResults {
                mode: Mode::Browse,
                topic: "cooking".to_string(),
                source_unavailable: false,
            }
        );
        assert!(summarizer.calls.lock().expect("calls lock").is_empty());
    }

    #[tokio::test]
    async fn browse_only_considers_extract_limit_blocks() {
        let renderer = ScriptedRenderer::new(vec![100, 100], vec![listing(60)]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let reply = pipeline(renderer, summarizer)
            .run_at(&browse("Item 5"), &tuning(), now())
            .await;

        match reply {
            PipelineReply::Summary { items, .. } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].title, "Item 5");
            }
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn summarizer_failure_yields_fallback_text() {
        let renderer = ScriptedRenderer::new(vec![100, 100], vec![listing(2)]);
        let summarizer = Arc::new(RecordingSummarizer {
            fail: true,
            ..Default::default()
        });
        let reply = pipeline(renderer, summarizer)
            .run_at(&browse("item 1"), &tuning(), now())
            .await;

        match reply {
            PipelineReply::Summary { text, items, .. } => {
                assert_eq!(text, SUMMARY_FALLBACK);
                assert_eq!(items.len(), 1);
            }
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_failure_is_no_results() {
        let mut renderer = ScriptedRenderer::new(vec![], vec![]);
        renderer.fail_open = true;
        let summarizer = Arc::new(RecordingSummarizer::default());
        let reply = pipeline(renderer, summarizer.clone())
            .run_at(&browse("game"), &tuning(), now())
            .await;

        assert!(matches!(
            reply,
            PipelineReply::NoResults {
                mode: Mode::Browse,
                source_unavailable: true,
                ..
            }
        ));
        assert!(summarizer.calls.lock().expect("calls lock").is_empty());
    }

    #[tokio::test]
    async fn search_ranks_and_truncates_to_twenty() {
        let renderer = ScriptedRenderer::new(vec![100, 100], vec![listing(30)]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let request = PipelineRequest::Search {
            query: "half life".to_string(),
        };
        let reply = pipeline(renderer.clone(), summarizer.clone())
            .run_at(&request, &tuning(), now())
            .await;

        match reply {
            PipelineReply::Ranked { query, items } => {
                assert_eq!(query, "half life");
                assert_eq!(items.len(), 20);
                assert_eq!(items[0].record.title, "Item 29");
                // No timestamp in the markup: published "now", full freshness boost.
                assert_eq!(items[0].score, 580.0);
                assert!(items.windows(2).all(|w| w[0].score >= w[1].score));
            }
            other => panic!("expected ranked list, got {other:?}"),
        }

        assert!(summarizer.calls.lock().expect("calls lock").is_empty());
        assert_eq!(
            renderer.journal().navigated,
            ["https://dtf.ru/search/v2/content/new?query=half+life"]
        );
    }

    #[tokio::test]
    async fn search_with_empty_page_is_no_results() {
        let renderer = ScriptedRenderer::new(vec![100, 100], vec![listing(0)]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let request = PipelineRequest::Search {
            query: "nothing".to_string(),
        };
        let reply = pipeline(renderer, summarizer).run_at(&request, &tuning(), now()).await;

        assert!(matches!(
            reply,
            PipelineReply::NoResults {
                mode: Mode::Search,
                source_unavailable: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn session_is_closed_after_each_run() {
        let renderer = ScriptedRenderer::new(vec![100, 200, 200], vec![listing(3)]);
        let summarizer = Arc::new(RecordingSummarizer::default());
        let pipeline = pipeline(renderer.clone(), summarizer);

        pipeline.run_at(&browse("item"), &tuning(), now()).await;
        pipeline.run_at(&browse("item"), &tuning(), now()).await;

        let journal = renderer.journal();
        assert_eq!(journal.opened, 2);
        assert_eq!(journal.closed, 2);
    }
}
