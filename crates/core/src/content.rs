//! Topic content, quizzes and the doubt-chat transcript.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of correct answers needed to pass a topic quiz.
pub const QUIZ_PASS_RATIO: f64 = 0.6;

/// Explanation and worked examples for a single topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LearningContent {
    /// A detailed explanation of the topic.
    pub explanation: String,
    /// Each entry is one relevant example.
    pub examples: Vec<String>,
}

impl LearningContent {
    /// The placeholder shown when content for `title` could not be generated.
    pub fn load_failed(title: &str) -> Self {
        Self {
            explanation: format!("Failed to load content for {title}. Please try again."),
            examples: Vec::new(),
        }
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer_index: usize,
}

impl Mcq {
    /// True when the correct answer index addresses one of the options.
    pub fn is_well_formed(&self) -> bool {
        self.correct_answer_index < self.options.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "Student"),
            ChatRole::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("There is no quiz to submit")]
    Empty,
    #[error("Expected {expected} answers but received {received}")]
    AnswerCount { expected: usize, received: usize },
}

/// Outcome of a submitted quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    pub passed: bool,
}

/// Scores `answers` against `quiz`. Unanswered questions count as wrong.
pub fn score_quiz(quiz: &[Mcq], answers: &[Option<usize>]) -> Result<QuizResult, QuizError> {
    if quiz.is_empty() {
        return Err(QuizError::Empty);
    }
    if quiz.len() != answers.len() {
        return Err(QuizError::AnswerCount {
            expected: quiz.len(),
            received: answers.len(),
        });
    }
    let score = quiz
        .iter()
        .zip(answers)
        .filter(|(mcq, answer)| **answer == Some(mcq.correct_answer_index))
        .count();
    let total = quiz.len();
    Ok(QuizResult {
        score,
        total,
        passed: score as f64 / total as f64 >= QUIZ_PASS_RATIO,
    })
}
