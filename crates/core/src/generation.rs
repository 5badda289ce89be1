//! Content Generation Service
//!
//! This module is the boundary to the generative AI backend. It produces the
//! roadmap for a set of learning materials, the explanation and quiz for each
//! topic, and answers to the learner's follow-up questions. Every failure at
//! this boundary surfaces as a single `GenerationError` kind.

use crate::content::{ChatMessage, LearningContent, Mcq};
use crate::llm_client::{LLMClient, ResponseSchema};
use crate::material::{self, KnowledgeLevel, LearningMaterial};
use crate::roadmap::{GeneratedModule, GeneratedTopic, Roadmap};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::Arc;

const SYSTEM_PROMPT: &str =
    "You are Sikho, an expert tutor that designs curricula, explains topics and writes quizzes.";

/// The generation service failed or returned data that could not be used.
///
/// Each variant carries the user-facing message for the operation that failed
/// and the underlying cause.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(
        "Failed to generate a learning roadmap from the AI. Please check the provided materials and try again."
    )]
    Roadmap(#[source] anyhow::Error),
    #[error("Failed to generate content for \"{topic}\".")]
    Content {
        topic: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to generate a quiz for \"{topic}\".")]
    Quiz {
        topic: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to get an answer from the AI assistant.")]
    Doubt(#[source] anyhow::Error),
}

/// Defines the contract for any service that can generate learning content.
///
/// The learning session only talks to this trait, so the AI backend can be
/// swapped for a deterministic mock in development and tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generates a module/topic roadmap tailored to the materials and level.
    /// Every topic in the returned roadmap is incomplete.
    async fn generate_roadmap(
        &self,
        materials: &[LearningMaterial],
        knowledge_level: KnowledgeLevel,
    ) -> Result<Roadmap, GenerationError>;

    /// Generates the explanation and examples for one topic.
    async fn generate_learning_content(
        &self,
        topic_title: &str,
        materials: &[LearningMaterial],
    ) -> Result<LearningContent, GenerationError>;

    /// Generates a multiple-choice quiz for one topic.
    async fn generate_mcqs(
        &self,
        topic_title: &str,
        materials: &[LearningMaterial],
    ) -> Result<Vec<Mcq>, GenerationError>;

    /// Answers a follow-up question given the chat transcript so far.
    async fn answer_doubt(
        &self,
        question: &str,
        transcript: &[ChatMessage],
        materials: &[LearningMaterial],
        topic_title: &str,
    ) -> Result<String, GenerationError>;
}

/// Top-level wrapper so the roadmap schema is a JSON object.
#[derive(Deserialize, JsonSchema)]
struct RoadmapResponse {
    modules: Vec<GeneratedModule>,
}

/// Top-level wrapper so the quiz schema is a JSON object.
#[derive(Deserialize, JsonSchema)]
struct QuizResponse {
    questions: Vec<Mcq>,
}

/// An implementation of `ContentGenerator` backed by an `LLMClient`.
///
/// Prompts are templates keyed by name (`generate_roadmap`,
/// `generate_learning_content`, `generate_mcqs`, `answer_doubt`) with
/// `{placeholder}` markers filled in per call.
pub struct LLMContentGenerator {
    client: Arc<dyn LLMClient>,
    prompts: HashMap<String, String>,
}

impl LLMContentGenerator {
    pub fn new(client: Arc<dyn LLMClient>, prompts: HashMap<String, String>) -> Self {
        Self { client, prompts }
    }

    fn render(&self, key: &str, values: &[(&str, &str)]) -> anyhow::Result<String> {
        let template = self
            .prompts
            .get(key)
            .with_context(|| format!("Missing prompt template: '{key}'"))?;
        Ok(values
            .iter()
            .fold(template.clone(), |prompt, (name, value)| {
                prompt.replace(&format!("{{{name}}}"), value)
            }))
    }

    /// Requests a JSON response shaped like `T` and parses it.
    async fn complete_json<T>(
        &self,
        name: &str,
        description: &str,
        prompt: String,
        materials: &[LearningMaterial],
    ) -> anyhow::Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = ResponseSchema {
            name: name.to_string(),
            description: description.to_string(),
            schema: serde_json::to_value(schemars::schema_for!(T))?,
        };
        let answer = self
            .client
            .complete(
                SYSTEM_PROMPT.to_string(),
                prompt,
                material::image_urls(materials),
                Some(schema),
            )
            .await?;
        serde_json::from_str(extract_json(&answer))
            .with_context(|| format!("LLM returned malformed JSON for '{name}'"))
    }
}

#[async_trait]
impl ContentGenerator for LLMContentGenerator {
    async fn generate_roadmap(
        &self,
        materials: &[LearningMaterial],
        knowledge_level: KnowledgeLevel,
    ) -> Result<Roadmap, GenerationError> {
        self.try_generate_roadmap(materials, knowledge_level)
            .await
            .map_err(GenerationError::Roadmap)
    }

    async fn generate_learning_content(
        &self,
        topic_title: &str,
        materials: &[LearningMaterial],
    ) -> Result<LearningContent, GenerationError> {
        self.try_generate_learning_content(topic_title, materials)
            .await
            .map_err(|source| GenerationError::Content {
                topic: topic_title.to_string(),
                source,
            })
    }

    async fn generate_mcqs(
        &self,
        topic_title: &str,
        materials: &[LearningMaterial],
    ) -> Result<Vec<Mcq>, GenerationError> {
        self.try_generate_mcqs(topic_title, materials)
            .await
            .map_err(|source| GenerationError::Quiz {
                topic: topic_title.to_string(),
                source,
            })
    }

    async fn answer_doubt(
        &self,
        question: &str,
        transcript: &[ChatMessage],
        materials: &[LearningMaterial],
        topic_title: &str,
    ) -> Result<String, GenerationError> {
        let history = transcript
            .iter()
            .map(|message| format!("{}: {}", message.role, message.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = self
            .render(
                "answer_doubt",
                &[
                    ("materials", material::format_for_prompt(materials).as_str()),
                    ("topic", topic_title),
                    ("history", history.as_str()),
                    ("question", question),
                ],
            )
            .map_err(GenerationError::Doubt)?;
        self.client
            .complete(
                SYSTEM_PROMPT.to_string(),
                prompt,
                material::image_urls(materials),
                None,
            )
            .await
            .map_err(GenerationError::Doubt)
    }
}

impl LLMContentGenerator {
    async fn try_generate_roadmap(
        &self,
        materials: &[LearningMaterial],
        knowledge_level: KnowledgeLevel,
    ) -> anyhow::Result<Roadmap> {
        let prompt = self.render(
            "generate_roadmap",
            &[
                ("materials", material::format_for_prompt(materials).as_str()),
                ("knowledge_level", knowledge_level.to_string().as_str()),
            ],
        )?;
        let response: RoadmapResponse = self
            .complete_json("roadmap", "Modules of a learning roadmap", prompt, materials)
            .await?;
        if response.modules.is_empty() {
            return Err(anyhow!("LLM returned a roadmap without modules"));
        }
        Ok(Roadmap::from_generated(response.modules))
    }

    async fn try_generate_learning_content(
        &self,
        topic_title: &str,
        materials: &[LearningMaterial],
    ) -> anyhow::Result<LearningContent> {
        let prompt = self.render(
            "generate_learning_content",
            &[
                ("materials", material::format_for_prompt(materials).as_str()),
                ("topic", topic_title),
            ],
        )?;
        self.complete_json("learning_content", "Explanation and examples", prompt, materials)
            .await
    }

    async fn try_generate_mcqs(
        &self,
        topic_title: &str,
        materials: &[LearningMaterial],
    ) -> anyhow::Result<Vec<Mcq>> {
        let prompt = self.render(
            "generate_mcqs",
            &[
                ("materials", material::format_for_prompt(materials).as_str()),
                ("topic", topic_title),
            ],
        )?;
        let response: QuizResponse = self
            .complete_json("quiz", "Multiple-choice questions", prompt, materials)
            .await?;
        if let Some(bad) = response.questions.iter().find(|mcq| !mcq.is_well_formed()) {
            return Err(anyhow!(
                "Question '{}' has no option at index {}",
                bad.question,
                bad.correct_answer_index
            ));
        }
        Ok(response.questions)
    }
}

/// Strips a Markdown code fence some models wrap around JSON output.
fn extract_json(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// A canned `ContentGenerator` for local development without API costs.
///
/// Output is deterministic and derived from the course name and topic titles.
pub struct StubContentGenerator;

#[async_trait]
impl ContentGenerator for StubContentGenerator {
    async fn generate_roadmap(
        &self,
        materials: &[LearningMaterial],
        knowledge_level: KnowledgeLevel,
    ) -> Result<Roadmap, GenerationError> {
        let course = material::course_name(materials);
        let topic = |title: String| GeneratedTopic {
            description: format!("{title} for a {knowledge_level} learner."),
            title,
        };
        Ok(Roadmap::from_generated(vec![
            GeneratedModule {
                title: "Foundations".to_string(),
                topics: vec![
                    topic(format!("Introduction to {course}")),
                    topic("Core Concepts".to_string()),
                ],
            },
            GeneratedModule {
                title: "Going Further".to_string(),
                topics: vec![
                    topic("Practical Applications".to_string()),
                    topic("Advanced Topics".to_string()),
                ],
            },
        ]))
    }

    async fn generate_learning_content(
        &self,
        topic_title: &str,
        _materials: &[LearningMaterial],
    ) -> Result<LearningContent, GenerationError> {
        Ok(LearningContent {
            explanation: format!("{topic_title} explained step by step."),
            examples: vec![
                format!("A first example of {topic_title}."),
                format!("A second example of {topic_title}."),
            ],
        })
    }

    async fn generate_mcqs(
        &self,
        topic_title: &str,
        _materials: &[LearningMaterial],
    ) -> Result<Vec<Mcq>, GenerationError> {
        Ok((0..5)
            .map(|i| Mcq {
                question: format!("Question {} about {topic_title}?", i + 1),
                options: (0..4).map(|o| format!("Option {}", o + 1)).collect(),
                correct_answer_index: i % 4,
            })
            .collect())
    }

    async fn answer_doubt(
        &self,
        question: &str,
        _transcript: &[ChatMessage],
        _materials: &[LearningMaterial],
        topic_title: &str,
    ) -> Result<String, GenerationError> {
        Ok(format!(
            "Good question about {topic_title}! You asked: \"{question}\"."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::MockLLMClient;

    fn prompts() -> HashMap<String, String> {
        [
            ("generate_roadmap", "Level: {knowledge_level}\n{materials}"),
            ("generate_learning_content", "Explain {topic}\n{materials}"),
            ("generate_mcqs", "Quiz on {topic}"),
            ("answer_doubt", "{history}\nTopic: {topic}\nQ: {question}"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn generator(client: MockLLMClient) -> LLMContentGenerator {
        LLMContentGenerator::new(Arc::new(client), prompts())
    }

    #[test]
    fn test_extract_json_strips_fences() {
        assert_eq!(extract_json("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n[1]\n```"), "[1]");
    }

    #[tokio::test]
    async fn test_roadmap_is_parsed_and_prompt_rendered() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .withf(|_, prompt, images, schema| {
                images.is_empty()
                    && prompt.starts_with("Level: Advanced\n")
                    && prompt.contains("learn about: \"Rust\"")
                    && schema.as_ref().is_some_and(|s| s.name == "roadmap")
            })
            .times(1)
            .returning(|_, _, _, _| {
                Ok(r#"```json
{"modules": [{"title": "Basics", "topics": [
    {"title": "Intro", "description": "Start here"},
    {"title": "Loops", "description": "Repeat"}
]}]}
```"#
                    .to_string())
            });

        let roadmap = generator(client)
            .generate_roadmap(&[LearningMaterial::topic("Rust")], KnowledgeLevel::Advanced)
            .await
            .unwrap();

        assert_eq!(roadmap.modules().len(), 1);
        assert_eq!(roadmap.successor_of("Intro").unwrap().title, "Loops");
        assert!(roadmap.topics().all(|t| !t.completed));
    }

    #[tokio::test]
    async fn test_empty_roadmap_is_a_generation_error() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .returning(|_, _, _, _| Ok(r#"{"modules": []}"#.to_string()));

        let err = generator(client)
            .generate_roadmap(&[], KnowledgeLevel::Beginner)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Roadmap(_)));
        assert!(err.to_string().starts_with("Failed to generate a learning roadmap"));
    }

    #[tokio::test]
    async fn test_malformed_content_is_a_generation_error() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .returning(|_, _, _, _| Ok("Sure! Here is an explanation.".to_string()));

        let err = generator(client)
            .generate_learning_content("Loops", &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate content for \"Loops\".");
    }

    #[tokio::test]
    async fn test_quiz_with_out_of_range_answer_is_rejected() {
        let mut client = MockLLMClient::new();
        client.expect_complete().returning(|_, _, _, _| {
            Ok(r#"{"questions": [{"question": "?", "options": ["a", "b"], "correctAnswerIndex": 2}]}"#
                .to_string())
        });

        let err = generator(client).generate_mcqs("Loops", &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Quiz { ref topic, .. } if topic == "Loops"));
    }

    #[tokio::test]
    async fn test_answer_doubt_includes_transcript() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .withf(|_, prompt, images, schema| {
                schema.is_none()
                    && images.is_empty()
                    && prompt
                        == "Student: What is a loop?\nAssistant: A repetition.\nTopic: Loops\nQ: Why?"
            })
            .returning(|_, _, _, _| Ok("Because.".to_string()));

        let transcript = vec![
            ChatMessage::user("What is a loop?"),
            ChatMessage::assistant("A repetition."),
        ];
        let answer = generator(client)
            .answer_doubt("Why?", &transcript, &[], "Loops")
            .await
            .unwrap();
        assert_eq!(answer, "Because.");
    }

    #[tokio::test]
    async fn test_uploaded_images_reach_the_client() {
        use base64::{Engine, engine::general_purpose::STANDARD};

        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .withf(|_, prompt, images, _| {
                prompt.contains("an image named \"cell.png\"")
                    && images.len() == 1
                    && images[0].starts_with("data:image/png;base64,")
            })
            .times(1)
            .returning(|_, _, _, _| {
                Ok(r#"{"explanation": "Cells divide.", "examples": ["Mitosis"]}"#.to_string())
            });

        let materials = [LearningMaterial::file(
            "cell.png",
            STANDARD.encode([0x89u8, b'P', b'N', b'G']),
            "image/png",
        )];
        let content = generator(client)
            .generate_learning_content("Cell Division", &materials)
            .await
            .unwrap();
        assert_eq!(content.explanation, "Cells divide.");
    }

    #[tokio::test]
    async fn test_missing_template_fails_without_calling_llm() {
        let mut client = MockLLMClient::new();
        client.expect_complete().never();
        let generator = LLMContentGenerator::new(Arc::new(client), HashMap::new());

        let err = generator.answer_doubt("Why?", &[], &[], "Loops").await.unwrap_err();
        assert!(matches!(err, GenerationError::Doubt(_)));
    }

    #[tokio::test]
    async fn test_stub_generator_is_deterministic() {
        let materials = [LearningMaterial::topic("Chemistry")];
        let roadmap = StubContentGenerator
            .generate_roadmap(&materials, KnowledgeLevel::Beginner)
            .await
            .unwrap();
        assert!(roadmap.validate().is_ok());
        assert_eq!(
            roadmap.topics().next().unwrap().title,
            "Introduction to Chemistry"
        );

        let quiz = StubContentGenerator.generate_mcqs("Atoms", &materials).await.unwrap();
        assert_eq!(quiz.len(), 5);
        assert!(quiz.iter().all(Mcq::is_well_formed));
    }
}
