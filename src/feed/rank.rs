use chrono::{DateTime, Utc};

use super::types::{RankedRecord, Record};

/// Weights for the search-mode popularity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// Age at which freshness reaches zero.
    pub freshness_window_hours: f64,
    /// Extra multiplier applied at full freshness.
    pub popularity_boost: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            freshness_window_hours: 24.0,
            popularity_boost: 1.0,
        }
    }
}

impl RankingWeights {
    /// 1.0 at publish time, falling linearly to 0.0 at the window edge.
    pub fn freshness(&self, published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        if self.freshness_window_hours <= 0.0 {
            return 0.0;
        }
        let hours_elapsed = (now - published_at).num_seconds() as f64 / 3600.0;
        (1.0 - hours_elapsed / self.freshness_window_hours).clamp(0.0, 1.0)
    }

    pub fn score(&self, record: &Record, now: DateTime<Utc>) -> f64 {
        let freshness = self.freshness(record.published_at, now);
        record.view_count as f64 * (1.0 + self.popularity_boost * freshness)
    }
}

/// Score every record and sort by score descending; ties keep input order.
pub fn rank(
    records: Vec<Record>,
    weights: &RankingWeights,
    now: DateTime<Utc>,
) -> Vec<RankedRecord> {
    let mut ranked: Vec<RankedRecord> = records
        .into_iter()
        .map(|record| RankedRecord {
            score: weights.score(&record, now),
            record,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::DefaultedFields;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn record(title: &str, views: u64, hours_ago: i64) -> Record {
        Record {
            title: title.to_string(),
            url: format!("https://dtf.ru/{title}"),
            excerpt: String::new(),
            view_count: views,
            published_at: now() - Duration::hours(hours_ago),
            defaulted: DefaultedFields::default(),
        }
    }

    #[test]
    fn fresh_item_outranks_stale_popular_one() {
        let weights = RankingWeights::default();
        let ranked = rank(vec![record("b", 150, 30), record("a", 100, 0)], &weights, now());

        assert_eq!(ranked[0].record.title, "a");
        assert_eq!(ranked[0].score, 200.0);
        assert_eq!(ranked[1].record.title, "b");
        assert_eq!(ranked[1].score, 150.0);
    }

    #[test]
    fn old_items_score_exactly_their_views() {
        let weights = RankingWeights::default();
        for hours in [24, 25, 48, 1000] {
            assert_eq!(weights.score(&record("x", 777, hours), now()), 777.0);
        }
    }

    #[test]
    fn fresher_never_scores_lower_for_equal_views() {
        let weights = RankingWeights::default();
        let mut previous = f64::INFINITY;
        for hours in 0..40 {
            let score = weights.score(&record("x", 90, hours), now());
            assert!(score <= previous, "score rose at {hours}h");
            previous = score;
        }
    }

    #[test]
    fn half_window_gives_half_boost() {
        let weights = RankingWeights::default();
        assert_eq!(weights.score(&record("x", 100, 12), now()), 150.0);
    }

    #[test]
    fn future_dates_are_clamped() {
        let weights = RankingWeights::default();
        assert_eq!(weights.score(&record("x", 10, -5), now()), 20.0);
    }

    #[test]
    fn ties_keep_document_order() {
        let weights = RankingWeights::default();
        let ranked = rank(
            vec![record("first", 50, 30), record("second", 50, 40), record("third", 10, 0)],
            &weights,
            now(),
        );
        let titles: Vec<_> = ranked.iter().map(|r| r.record.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn custom_weights() {
        let weights = RankingWeights {
            freshness_window_hours: 48.0,
            popularity_boost: 3.0,
        };
        assert_eq!(weights.score(&record("x", 100, 24), now()), 250.0);
    }
}
