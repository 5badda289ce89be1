//! Learning Materials
//!
//! Materials are the context a learner supplies before a roadmap is generated:
//! a topic name, a block of pasted text, or an uploaded file. Every generation
//! call receives them rendered as a prompt section.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Label used for the course when no topic material was supplied.
pub const DEFAULT_COURSE_NAME: &str = "Selected Topics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Topic,
    Text,
    File,
}

/// One piece of learning context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningMaterial {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    /// Topic name, pasted text, or file name.
    pub content: String,
    /// Base64 file content, for file materials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl LearningMaterial {
    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(MaterialKind::Topic, name.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MaterialKind::Text, text.into())
    }

    pub fn file(name: impl Into<String>, data: String, mime_type: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            mime_type: Some(mime_type.into()),
            ..Self::new(MaterialKind::File, name.into())
        }
    }

    fn new(kind: MaterialKind, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content,
            data: None,
            mime_type: None,
        }
    }

    /// Decodes the attached file data when it is textual and valid UTF-8.
    fn inline_text(&self) -> Option<String> {
        let mime = self.mime_type.as_deref()?;
        let textual = mime.starts_with("text/")
            || mime == "application/json"
            || mime == "application/x-markdown";
        if !textual {
            return None;
        }
        let bytes = STANDARD.decode(self.data.as_deref()?.trim()).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// A `data:` URL for an uploaded image, so the model can see it.
    fn image_url(&self) -> Option<String> {
        if self.kind != MaterialKind::File {
            return None;
        }
        let mime = self.mime_type.as_deref().filter(|m| m.starts_with("image/"))?;
        let data = self.data.as_deref()?.trim();
        STANDARD.decode(data).ok()?;
        Some(format!("data:{mime};base64,{data}"))
    }
}

/// The learner's self-assessed starting point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for KnowledgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeLevel::Beginner => write!(f, "Beginner"),
            KnowledgeLevel::Intermediate => write!(f, "Intermediate"),
            KnowledgeLevel::Advanced => write!(f, "Advanced"),
        }
    }
}

/// Renders materials as the context section of a generation prompt.
pub fn format_for_prompt(materials: &[LearningMaterial]) -> String {
    materials
        .iter()
        .map(|material| match material.kind {
            MaterialKind::Topic => {
                format!("The user wants to learn about: \"{}\".", material.content)
            }
            MaterialKind::Text => format!(
                "The user provided the following text:\n---\n{}\n---",
                material.content
            ),
            MaterialKind::File => match (material.inline_text(), material.image_url()) {
                (Some(text), _) => format!(
                    "The user uploaded a file named \"{}\" with the following content:\n---\n{}\n---",
                    material.content, text
                ),
                (None, Some(_)) => format!(
                    "The user uploaded an image named \"{}\". It is attached to this message.",
                    material.content
                ),
                (None, None) => format!("The user uploaded a file named \"{}\".", material.content),
            },
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Data URLs of every uploaded image, in material order.
pub fn image_urls(materials: &[LearningMaterial]) -> Vec<String> {
    materials.iter().filter_map(LearningMaterial::image_url).collect()
}

/// Names the course after the first topic material.
pub fn course_name(materials: &[LearningMaterial]) -> &str {
    materials
        .iter()
        .find(|material| material.kind == MaterialKind::Topic)
        .map(|material| material.content.as_str())
        .unwrap_or(DEFAULT_COURSE_NAME)
}
