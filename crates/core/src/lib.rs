//! Sikho Core
//!
//! Domain logic for the Sikho AI tutor: roadmap and material models, the
//! content generation boundary, the topic content cache, and the learning
//! session controller that ties them together.

pub mod cache;
pub mod certificate;
pub mod content;
pub mod generation;
pub mod llm_client;
pub mod material;
pub mod roadmap;
pub mod session;

pub use generation::{ContentGenerator, GenerationError};
pub use session::{LearningSession, SessionError, SessionPhase, SessionSnapshot, TopicLoad};
