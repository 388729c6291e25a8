//! Past-question history and the suggestion filter omnibox glue consults.
//!
//! The core only reads history through the `HistoryStore` seam; hosts back
//! it with whatever persisted list they keep. `MemoryHistory` is the
//! in-process implementation used by the CLI and tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::normalizer::fold_for_match;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Past question strings, newest first.
    async fn recent(&self) -> Vec<String>;
    /// Remember a submitted question; resubmitting moves it to the front.
    async fn record(&self, question: &str);
}

/// Bounded in-memory history.
pub struct MemoryHistory {
    max_entries: usize,
    entries: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn recent(&self) -> Vec<String> {
        self.entries.lock().await.clone()
    }

    async fn record(&self, question: &str) {
        let mut entries = self.entries.lock().await;
        entries.retain(|q| q != question);
        entries.insert(0, question.to_string());
        entries.truncate(self.max_entries);
    }
}

/// One omnibox suggestion: the resubmittable question plus a display string
/// with the matched span wrapped in `<match>` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub content: String,
    pub description: String,
}

/// Case-insensitive substring filter over past questions. An empty input
/// matches everything and highlights nothing.
pub fn suggestions(history: &[String], input: &str) -> Vec<Suggestion> {
    let needle = fold_for_match(input);
    history
        .iter()
        .filter(|item| fold_for_match(item).contains(&needle))
        .map(|item| {
            let description = match find_fold(item, &needle) {
                Some((start, end)) => format!(
                    "{}<match>{}</match>{}",
                    &item[..start],
                    &item[start..end],
                    &item[end..]
                ),
                None => item.clone(),
            };
            Suggestion {
                content: item.clone(),
                description,
            }
        })
        .collect()
}

/// Byte span of the first case-insensitive occurrence of `needle` (already
/// folded) in `haystack`, on char boundaries of the original string.
fn find_fold(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    for (start, _) in haystack.char_indices() {
        let mut matched = 0;
        let mut rest = haystack[start..].chars();
        let mut want = needle.chars();
        loop {
            let Some(nc) = want.next() else {
                return Some((start, start + matched));
            };
            match rest.next() {
                Some(hc) if hc.to_lowercase().eq(nc.to_lowercase()) => {
                    matched += hc.len_utf8();
                }
                _ => break,
            }
        }
    }
    None
}
