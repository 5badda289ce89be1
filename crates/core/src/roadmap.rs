//! Learning Roadmap Model
//!
//! A roadmap is the ordered curriculum produced by the generation service:
//! modules, each holding an ordered list of topics. The flattened topic order
//! (module order, then topic order) drives navigation and prefetching and is
//! always derived from the modules, never stored on its own.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single learning unit inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl Topic {
    /// Creates a new, incomplete `Topic`.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            completed: false,
        }
    }
}

/// A titled group of topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub title: String,
    pub topics: Vec<Topic>,
}

/// A topic as returned by the generation service, before progress tracking.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedTopic {
    /// The title of the topic.
    pub title: String,
    /// A short, one-sentence description of the topic.
    pub description: String,
}

/// A module as returned by the generation service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedModule {
    /// The title of the module.
    pub title: String,
    pub topics: Vec<GeneratedTopic>,
}

/// Reasons a generated roadmap cannot be used for a session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoadmapError {
    #[error("Roadmap contains a topic with an empty title")]
    BlankTitle,
    #[error("Roadmap contains the topic '{0}' more than once")]
    DuplicateTitle(String),
}

/// The full ordered curriculum for one learning session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roadmap {
    modules: Vec<Module>,
}

impl Roadmap {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// Builds a roadmap from generated modules, with every topic incomplete.
    pub fn from_generated(modules: Vec<GeneratedModule>) -> Self {
        let modules = modules
            .into_iter()
            .map(|module| Module {
                title: module.title,
                topics: module
                    .topics
                    .into_iter()
                    .map(|topic| Topic::new(topic.title, topic.description))
                    .collect(),
            })
            .collect();
        Self { modules }
    }

    /// Checks that every topic title is present and unique, since titles are
    /// the identity used by selection, caching and completion.
    pub fn validate(&self) -> Result<(), RoadmapError> {
        let mut seen = HashSet::new();
        for topic in self.topics() {
            if topic.title.trim().is_empty() {
                return Err(RoadmapError::BlankTitle);
            }
            if !seen.insert(topic.title.as_str()) {
                return Err(RoadmapError::DuplicateTitle(topic.title.clone()));
            }
        }
        Ok(())
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterates over all topics in module order, then topic order.
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.modules.iter().flat_map(|module| module.topics.iter())
    }

    pub fn topic(&self, title: &str) -> Option<&Topic> {
        self.topics().find(|topic| topic.title == title)
    }

    /// Returns the topic following `title` in the flattened order, if any.
    pub fn successor_of(&self, title: &str) -> Option<&Topic> {
        let mut topics = self.topics();
        topics.find(|topic| topic.title == title)?;
        topics.next()
    }

    /// Marks the topic with the given title as completed.
    ///
    /// Returns `false` when no such topic exists. Completion is one-way, so
    /// marking an already completed topic is a successful no-op.
    pub fn mark_complete(&mut self, title: &str) -> bool {
        match self
            .modules
            .iter_mut()
            .flat_map(|module| module.topics.iter_mut())
            .find(|topic| topic.title == title)
        {
            Some(topic) => {
                topic.completed = true;
                true
            }
            None => false,
        }
    }

    /// True iff the roadmap has modules and every topic in them is completed.
    pub fn is_complete(&self) -> bool {
        !self.modules.is_empty()
            && self
                .modules
                .iter()
                .all(|module| module.topics.iter().all(|topic| topic.completed))
    }

    /// Returns `(completed, total)` topic counts.
    pub fn progress(&self) -> (usize, usize) {
        self.topics().fold((0, 0), |(done, total), topic| {
            (done + usize::from(topic.completed), total + 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Roadmap {
        Roadmap::new(vec![
            Module {
                title: "Basics".to_string(),
                topics: vec![Topic::new("Intro", "desc"), Topic::new("Loops", "desc")],
            },
            Module {
                title: "Advanced".to_string(),
                topics: vec![
                    Topic::new("Closures", "desc"),
                    Topic::new("Traits", "desc"),
                ],
            },
        ])
    }

    #[test]
    fn test_flattened_order_follows_modules_then_topics() {
        let roadmap = two_by_two();
        let titles: Vec<&str> = roadmap.topics().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Loops", "Closures", "Traits"]);
    }

    #[test]
    fn test_successor_crosses_module_boundary() {
        let roadmap = two_by_two();
        assert_eq!(roadmap.successor_of("Intro").unwrap().title, "Loops");
        assert_eq!(roadmap.successor_of("Loops").unwrap().title, "Closures");
        assert!(roadmap.successor_of("Traits").is_none());
        assert!(roadmap.successor_of("Missing").is_none());
    }

    #[test]
    fn test_completion_requires_every_topic() {
        let mut roadmap = two_by_two();
        for title in ["Intro", "Loops", "Closures"] {
            assert!(roadmap.mark_complete(title));
            assert!(!roadmap.is_complete());
        }
        assert!(!roadmap.mark_complete("Generics"));
        assert!(!roadmap.is_complete());

        assert!(roadmap.mark_complete("Traits"));
        assert!(roadmap.is_complete());

        assert!(!roadmap.mark_complete("Generics"));
        assert!(roadmap.is_complete());
    }

    #[test]
    fn test_mark_complete_twice_is_idempotent() {
        let mut roadmap = two_by_two();
        assert!(roadmap.mark_complete("Loops"));
        assert!(roadmap.mark_complete("Loops"));
        assert!(roadmap.topic("Loops").unwrap().completed);
        assert_eq!(roadmap.progress(), (1, 4));
    }

    #[test]
    fn test_empty_roadmap_is_never_complete() {
        assert!(!Roadmap::default().is_complete());
    }

    #[test]
    fn test_from_generated_starts_incomplete() {
        let roadmap = Roadmap::from_generated(vec![GeneratedModule {
            title: "Basics".to_string(),
            topics: vec![GeneratedTopic {
                title: "Intro".to_string(),
                description: "What it is".to_string(),
            }],
        }]);
        let topic = roadmap.topic("Intro").unwrap();
        assert!(!topic.completed);
        assert_eq!(topic.description, "What it is");
    }

    #[test]
    fn test_validate_rejects_duplicate_and_blank_titles() {
        assert!(two_by_two().validate().is_ok());

        let duplicated = Roadmap::new(vec![Module {
            title: "Basics".to_string(),
            topics: vec![Topic::new("Intro", "a"), Topic::new("Intro", "b")],
        }]);
        assert_eq!(
            duplicated.validate(),
            Err(RoadmapError::DuplicateTitle("Intro".to_string()))
        );

        let blank = Roadmap::new(vec![Module {
            title: "Basics".to_string(),
            topics: vec![Topic::new("  ", "a")],
        }]);
        assert_eq!(blank.validate(), Err(RoadmapError::BlankTitle));
    }

    #[test]
    fn test_roadmap_serializes_as_module_array() {
        let json = serde_json::to_value(two_by_two()).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["topics"][1]["title"], "Loops");
        assert_eq!(json[0]["topics"][1]["completed"], false);
    }
}
