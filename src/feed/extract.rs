//! Turns a rendered listing snapshot into [`Record`]s.
//!
//! Candidate blocks missing a title or link are skipped; malformed optional
//! fields fall back to defaults. Neither ever aborts the batch.

use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use super::site::SiteProfile;
use super::types::{DefaultedFields, Parsed, Record};
use crate::error::ConfigError;

/// Why a candidate block produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("block has no title")]
    MissingTitle,
    #[error("block has no link")]
    MissingLink,
    #[error("link does not lead to a page on the site: {0}")]
    ForeignLink(String),
}

pub struct Extractor {
    site: SiteProfile,
    block: Selector,
    title: Selector,
    link: Selector,
    excerpt: Selector,
    views: Selector,
    timestamp: Selector,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::Selector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Collapse runs of whitespace the way rendered text reads.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Extractor {
    pub fn new(site: SiteProfile) -> Result<Self, ConfigError> {
        let s = &site.selectors;
        Ok(Self {
            block: compile("block", &s.block)?,
            title: compile("title", &s.title)?,
            link: compile("link", &s.link)?,
            excerpt: compile("excerpt", &s.excerpt)?,
            views: compile("views", &s.views)?,
            timestamp: compile("timestamp", &s.timestamp)?,
            site,
        })
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    /// Number of candidate blocks currently rendered, valid or not.
    pub fn count_blocks(&self, html: &str) -> usize {
        Html::parse_document(html).select(&self.block).count()
    }

    /// Extract records in document order from at most `limit` candidate blocks.
    pub fn extract(&self, html: &str, limit: Option<usize>, now: DateTime<Utc>) -> Vec<Record> {
        let document = Html::parse_document(html);
        let limit = limit.unwrap_or(usize::MAX);

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (index, block) in document.select(&self.block).take(limit).enumerate() {
            match self.extract_block(block, now) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    skipped += 1;
                    debug!(index, %reason, "skipping listing block");
                }
            }
        }

        debug!(records = records.len(), skipped, "extraction finished");
        records
    }

    fn extract_block(
        &self,
        block: ElementRef<'_>,
        now: DateTime<Utc>,
    ) -> Result<Record, SkipReason> {
        let title = block
            .select(&self.title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .ok_or(SkipReason::MissingTitle)?;

        let href = block
            .select(&self.link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SkipReason::MissingLink)?;
        let url = self.resolve_link(href)?;

        let excerpt = block
            .select(&self.excerpt)
            .next()
            .map(element_text)
            .unwrap_or_default();

        let views_text = block.select(&self.views).next().map(element_text);
        let views = parse_view_count(views_text.as_deref());

        let selectors = &self.site.selectors;
        let raw_time = block
            .select(&self.timestamp)
            .next()
            .and_then(|el| el.value().attr(&selectors.timestamp_attr));
        let published = parse_timestamp(raw_time, &selectors.timestamp_format, now);

        Ok(Record {
            title,
            url,
            excerpt,
            view_count: views.value,
            published_at: published.value,
            defaulted: DefaultedFields {
                view_count: views.defaulted,
                published_at: published.defaulted,
            },
        })
    }

    fn resolve_link(&self, href: &str) -> Result<String, SkipReason> {
        self.site
            .resolve(href)
            .map(String::from)
            .ok_or_else(|| SkipReason::ForeignLink(href.to_string()))
    }
}

/// Parse a rendered view counter; digit-group spaces are tolerated.
pub fn parse_view_count(raw: Option<&str>) -> Parsed<u64> {
    let Some(raw) = raw else {
        return Parsed::defaulted(0);
    };
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match digits.parse::<u64>() {
        Ok(views) => Parsed::parsed(views),
        Err(_) => Parsed::defaulted(0),
    }
}

/// Parse a timestamp attribute with `format`, falling back to `now`.
///
/// Formats without an offset are read as UTC.
pub fn parse_timestamp(
    raw: Option<&str>,
    format: &str,
    now: DateTime<Utc>,
) -> Parsed<DateTime<Utc>> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Parsed::defaulted(now);
    };
    if let Ok(dt) = DateTime::parse_from_str(raw, format) {
        return Parsed::parsed(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
        return Parsed::parsed(naive.and_utc());
    }
    Parsed::defaulted(now)
}
