use chrono::{DateTime, Utc};

/// A value produced by a parse-with-default step.
///
/// `defaulted` is true when the raw input was missing or malformed and `value`
/// is the substitute, so "genuinely zero views" and "unparseable" stay apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub defaulted: bool,
}

impl<T> Parsed<T> {
    pub fn parsed(value: T) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    pub fn defaulted(value: T) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }
}

/// Which optional fields of a record fell back to their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultedFields {
    pub view_count: bool,
    pub published_at: bool,
}

/// One listing item.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub title: String,
    /// Absolute: site origin + the item's relative path.
    pub url: String,
    pub excerpt: String,
    pub view_count: u64,
    pub published_at: DateTime<Utc>,
    pub defaulted: DefaultedFields,
}

impl Record {
    /// Text handed to the summarizer and searched by the relevance filter.
    pub fn text_block(&self) -> String {
        format!("{}\n{}\n{}", self.title, self.url, self.excerpt)
    }
}

/// A record with its search-mode score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub record: Record,
    pub score: f64,
}

/// Why the loader stopped scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Content height stopped growing.
    Converged,
    /// Enough candidate blocks were rendered.
    TargetReached,
    /// `max_cycles` scrolls ran without converging.
    CycleLimit,
    /// A scroll or measurement failed mid-loop; the snapshot is partial.
    Interrupted,
}

/// Final rendered snapshot returned by the loader.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub html: String,
    pub cycles: u32,
    pub stop: StopReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_block_joins_searchable_fields() {
        let record = Record {
            title: "Title".to_string(),
            url: "https://dtf.ru/a".to_string(),
            excerpt: "Body".to_string(),
            view_count: 0,
            published_at: Utc::now(),
            defaulted: DefaultedFields::default(),
        };
        assert_eq!(record.text_block(), "Title\nhttps://dtf.ru/a\nBody");
    }

    #[test]
    fn parsed_constructors_set_flag() {
        assert!(!Parsed::parsed(3u64).defaulted);
        assert!(Parsed::defaulted(0u64).defaulted);
    }
}
