use super::types::Record;

/// Case-folded substring match over title, url and excerpt joined together.
pub fn matches_topic(record: &Record, topic: &str) -> bool {
    record
        .text_block()
        .to_lowercase()
        .contains(&topic.to_lowercase())
}

/// Keep the records matching `topic`, in input order.
pub fn filter_by_topic(records: Vec<Record>, topic: &str) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| matches_topic(r, topic))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::DefaultedFields;
    use chrono::Utc;

    fn record(title: &str, url: &str, excerpt: &str) -> Record {
        Record {
            title: title.to_string(),
            url: url.to_string(),
            excerpt: excerpt.to_string(),
            view_count: 0,
            published_at: Utc::now(),
            defaulted: DefaultedFields::default(),
        }
    }

    #[test]
    fn keeps_only_matching_titles() {
        let records = vec![
            record("New Game Released", "https://dtf.ru/1", ""),
            record("Cooking Show", "https://dtf.ru/2", ""),
        ];
        let kept = filter_by_topic(records, "game");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "New Game Released");
    }

    #[test]
    fn matches_url_and_excerpt_case_insensitively() {
        let by_url = record("Patch notes", "https://dtf.ru/games/77-witcher", "");
        let by_excerpt = record("Interview", "https://dtf.ru/3", "Talking about ВЕДЬМАК");
        assert!(matches_topic(&by_url, "WITCHER"));
        assert!(matches_topic(&by_excerpt, "ведьмак"));
        assert!(!matches_topic(&by_excerpt, "cyberpunk"));
    }

    #[test]
    fn match_can_span_joined_fields() {
        // The searchable text is one blob, so a needle crossing the newline still hits.
        let r = record("Alpha", "https://dtf.ru/x", "Beta");
        assert!(matches_topic(&r, "x\nbeta"));
    }

    #[test]
    fn filter_is_stable_and_idempotent() {
        let records = vec![
            record("Game C", "https://dtf.ru/c", ""),
            record("Other", "https://dtf.ru/o", ""),
            record("game A", "https://dtf.ru/a", ""),
            record("B", "https://dtf.ru/b", "a GAME review"),
        ];
        let once = filter_by_topic(records, "game");
        let titles: Vec<_> = once.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Game C", "game A", "B"]);

        let twice = filter_by_topic(once.clone(), "game");
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_topic_keeps_everything() {
        let records = vec![record("A", "https://dtf.ru/a", ""), record("B", "https://dtf.ru/b", "")];
        assert_eq!(filter_by_topic(records, "").len(), 2);
    }
}
