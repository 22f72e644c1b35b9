//! Response synthesis over retrieved chunks.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::Llm;
use crate::vector_store::{Node, SearchResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Answer returned when there is nothing to synthesize from.
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Turns retrieved chunks into an answer with an LLM.
pub struct Synthesizer {
    llm: Arc<dyn Llm>,
    prompts: Prompts,
    max_concurrent: usize,
    context_chars: usize,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn Llm>, prompts: Prompts) -> Self {
        Self {
            llm,
            prompts,
            max_concurrent: 4,
            context_chars: 12_000,
        }
    }

    /// Set the maximum number of concurrent summarization calls.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Set the character budget of one summarization call.
    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars.max(8);
        self
    }

    /// Answer a query from vector search results in a single call.
    #[instrument(skip(self, results), fields(results = results.len()))]
    pub async fn answer(&self, query: &str, results: &[SearchResult]) -> Result<String> {
        if results.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let context = results
            .iter()
            .map(|r| format_node(&r.node))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = self.render(&self.prompts.synthesis.text_qa, &context, query);
        self.llm.complete(&self.prompts.synthesis.system, &prompt).await
    }

    /// Summarize every chunk of a document against a query.
    pub async fn summarize_nodes(&self, query: &str, nodes: &[Node]) -> Result<String> {
        let texts = nodes.iter().map(format_node).collect();
        self.tree_summarize(query, texts).await
    }

    /// Hierarchically summarize texts until a single answer remains.
    ///
    /// Each level packs the texts into groups that fit the context budget and
    /// summarizes the groups concurrently.
    #[instrument(skip(self, texts), fields(texts = texts.len()))]
    pub async fn tree_summarize(&self, query: &str, texts: Vec<String>) -> Result<String> {
        if texts.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let mut texts = texts;
        let mut level = 0;

        loop {
            let groups = pack_texts(&texts, self.context_chars);
            debug!("Summary level {}: {} texts in {} groups", level, texts.len(), groups.len());

            if groups.len() == 1 {
                return self.summarize_group(query, &groups[0]).await;
            }

            let futures: Vec<_> = groups
                .iter()
                .map(|group| self.summarize_group(query, group))
                .collect();
            texts = stream::iter(futures)
                .buffered(self.max_concurrent)
                .try_collect()
                .await?;
            level += 1;
        }
    }

    async fn summarize_group(&self, query: &str, context: &str) -> Result<String> {
        let prompt = self.render(&self.prompts.synthesis.tree_summarize, context, query);
        self.llm.complete(&self.prompts.synthesis.system, &prompt).await
    }

    fn render(&self, template: &str, context: &str, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("query".to_string(), query.to_string());
        self.prompts.render_with_custom(template, &vars)
    }
}

fn format_node(node: &Node) -> String {
    format!("[{}]\n{}", node.citation(), node.content)
}

/// Greedily pack texts into groups of at most `budget` characters.
///
/// Each text is cut to half the budget so any two texts share a group, which
/// guarantees every level of the tree at least halves the number of texts.
fn pack_texts(texts: &[String], budget: usize) -> Vec<String> {
    const SEPARATOR: &str = "\n\n";
    let per_text = budget.saturating_sub(SEPARATOR.len()) / 2;

    let mut groups = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for text in texts {
        let text = truncate_chars(text, per_text);
        let len = text.chars().count();

        if !current.is_empty() && current_len + SEPARATOR.len() + len > budget {
            groups.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str(SEPARATOR);
            current_len += SEPARATOR.len();
        }
        current.push_str(&text);
        current_len += len;
    }

    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
