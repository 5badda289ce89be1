//! Topic Content Cache
//!
//! Session-scoped store of generated content and quizzes, keyed by topic
//! title. The cache is unbounded: roadmaps are tens of topics, and the whole
//! cache is dropped when the session resets.

use crate::content::{LearningContent, Mcq};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content and quiz generated together for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: LearningContent,
    pub quiz: Vec<Mcq>,
}

#[derive(Debug, Clone, Default)]
pub struct TopicContentCache {
    entries: HashMap<String, CacheEntry>,
}

impl TopicContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, title: &str) -> Option<&CacheEntry> {
        self.entries.get(title)
    }

    /// Stores `entry` for `title`. Last write wins.
    pub fn put(&mut self, title: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(title.into(), entry);
    }

    pub fn has(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached titles in lexical order.
    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.entries.keys().cloned().collect();
        titles.sort();
        titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(explanation: &str) -> CacheEntry {
        CacheEntry {
            content: LearningContent {
                explanation: explanation.to_string(),
                examples: vec![],
            },
            quiz: vec![],
        }
    }

    #[test]
    fn test_get_put_has() {
        let mut cache = TopicContentCache::new();
        assert!(!cache.has("Intro"));
        assert!(cache.get("Intro").is_none());

        cache.put("Intro", entry("first"));
        assert!(cache.has("Intro"));
        assert_eq!(cache.get("Intro").unwrap().content.explanation, "first");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites_silently() {
        let mut cache = TopicContentCache::new();
        cache.put("Intro", entry("first"));
        cache.put("Intro", entry("second"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Intro").unwrap().content.explanation, "second");
    }

    #[test]
    fn test_clear_and_titles() {
        let mut cache = TopicContentCache::new();
        cache.put("Loops", entry("l"));
        cache.put("Intro", entry("i"));
        assert_eq!(cache.titles(), vec!["Intro".to_string(), "Loops".to_string()]);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.titles().is_empty());
    }
}
