//! API Models
//!
//! Request payloads and response bodies for the REST API. Domain types from
//! `sikho-core` are embedded as-is and documented as opaque objects in the
//! OpenAPI schema.

use serde::{Deserialize, Serialize};
use sikho_core::{
    SessionSnapshot, TopicLoad,
    content::{ChatMessage, QuizResult},
    material::{KnowledgeLevel, LearningMaterial},
};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct StartLearningPayload {
    #[schema(value_type = Vec<Object>, example = json!([{"type": "topic", "content": "Linear Algebra"}]))]
    pub materials: Vec<LearningMaterial>,
    #[serde(default)]
    #[schema(value_type = String, example = "Beginner")]
    pub knowledge_level: KnowledgeLevel,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectTopicPayload {
    #[schema(example = "Vectors and Scalars")]
    pub title: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteTopicPayload {
    /// The topic to complete. Defaults to the active topic.
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitQuizPayload {
    /// One entry per question: the chosen option index, or null if unanswered.
    pub answers: Vec<Option<usize>>,
}

#[derive(Deserialize, ToSchema)]
pub struct AskDoubtPayload {
    #[schema(example = "Why is the dot product commutative?")]
    pub question: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    #[schema(value_type = Object)]
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SelectTopicResponse {
    #[schema(value_type = String, example = "fetched")]
    pub load: TopicLoad,
    #[schema(value_type = Object)]
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizResponse {
    #[schema(value_type = Object)]
    pub result: QuizResult,
    #[schema(value_type = Object)]
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DoubtResponse {
    #[schema(value_type = Object)]
    pub reply: ChatMessage,
    #[schema(value_type = Object)]
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sikho_core::material::MaterialKind;

    #[test]
    fn test_start_learning_payload_deserialization() {
        let json = r#"{
            "materials": [
                {"type": "topic", "content": "Linear Algebra"},
                {"type": "file", "content": "notes.txt", "data": "aGk=", "mime_type": "text/plain"}
            ],
            "knowledge_level": "Intermediate"
        }"#;
        let payload: StartLearningPayload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.materials.len(), 2);
        assert_eq!(payload.materials[0].kind, MaterialKind::Topic);
        assert_eq!(payload.materials[1].data.as_deref(), Some("aGk="));
        assert_eq!(payload.knowledge_level, KnowledgeLevel::Intermediate);
    }

    #[test]
    fn test_knowledge_level_defaults_to_beginner() {
        let payload: StartLearningPayload = serde_json::from_str(r#"{"materials": []}"#).unwrap();
        assert_eq!(payload.knowledge_level, KnowledgeLevel::Beginner);
    }

    #[test]
    fn test_unknown_material_type_is_rejected() {
        let json = r#"{"materials": [{"type": "video", "content": "lecture.mp4"}]}"#;
        let result: Result<StartLearningPayload, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_complete_topic_payload_title_is_optional() {
        let payload: CompleteTopicPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.title.is_none());
    }

    #[test]
    fn test_submit_quiz_payload_accepts_unanswered() {
        let payload: SubmitQuizPayload =
            serde_json::from_str(r#"{"answers": [0, null, 3]}"#).unwrap();
        assert_eq!(payload.answers, vec![Some(0), None, Some(3)]);
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Session not found".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Session not found"}"#);
    }
}
