use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::llm::{LlmClient, Message};

/// Turns a short list of items into a digest for a topic.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, topic: &str, items: &[String]) -> Result<String>;
}

/// Build the digest prompt. Items are joined with blank lines.
pub fn build_prompt(topic: &str, items: &[String], language: &str) -> String {
    format!(
        "Write a short digest of the following news on the topic '{topic}'. \
        If some items do not really match the topic, say so. \
        Answer in {language}. Format:\n\
        1. [Title](link) - short description\n\
        2. ...\n\n\
        News:\n\n{}",
        items.join("\n\n")
    )
}

pub struct LlmSummarizer {
    llm: Arc<LlmClient>,
    language: String,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<LlmClient>, language: impl Into<String>) -> Self {
        Self {
            llm,
            language: language.into(),
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, topic: &str, items: &[String]) -> Result<String> {
        let prompt = build_prompt(topic, items, &self.language);
        debug!(
            topic,
            items = items.len(),
            prompt_len = prompt.len(),
            model = self.llm.model(),
            "requesting summary"
        );

        let answer = self.llm.chat(&[Message::user(prompt)]).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            anyhow::bail!("model returned an empty summary");
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_items_and_language() {
        let items = vec![
            "A\nhttps://dtf.ru/a\nfirst".to_string(),
            "B\nhttps://dtf.ru/b\n".to_string(),
        ];
        let prompt = build_prompt("games", &items, "Russian");
        assert!(prompt.contains("topic 'games'"));
        assert!(prompt.contains("Answer in Russian."));
        assert!(prompt.ends_with("A\nhttps://dtf.ru/a\nfirst\n\nB\nhttps://dtf.ru/b\n"));
    }
}
