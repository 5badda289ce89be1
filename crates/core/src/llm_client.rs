use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrlArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;

/// A JSON schema the LLM is asked to shape its response after.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// A generic client for single-turn completions against an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Makes a single, non-streaming call and returns the trimmed text answer.
    ///
    /// `image_urls` are attached to the user message after the prompt. When
    /// `response_schema` is set the provider is asked for a JSON document
    /// matching it.
    async fn complete(
        &self,
        system_prompt: String,
        prompt: String,
        image_urls: Vec<String>,
        response_schema: Option<ResponseSchema>,
    ) -> Result<String>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gemini-2.5-flash").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

/// Builds the user message: plain text, or text followed by image parts.
fn user_message(prompt: String, image_urls: Vec<String>) -> Result<ChatCompletionRequestUserMessage> {
    if image_urls.is_empty() {
        return Ok(ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?);
    }
    let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> =
        vec![ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(prompt)
            .build()?
            .into()];
    for url in image_urls {
        let image_url = ImageUrlArgs::default()
            .url(url)
            .detail(ImageDetail::Auto)
            .build()?;
        parts.push(
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(image_url)
                .build()?
                .into(),
        );
    }
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(parts)
        .build()?)
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        system_prompt: String,
        prompt: String,
        image_urls: Vec<String>,
        response_schema: Option<ResponseSchema>,
    ) -> Result<String> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()?
                .into(),
            user_message(prompt, image_urls)?.into(),
        ]);
        if let Some(schema) = response_schema {
            args.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some(schema.description),
                    name: schema.name,
                    schema: Some(schema.schema),
                    strict: None,
                },
            });
        }
        let request = args.build()?;

        let response = self.client.chat().create(request).await?;

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .context("No content in LLM response")?;

        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::types::ChatCompletionRequestUserMessageContent;

    #[test]
    fn test_text_only_message_stays_plain() {
        let message = user_message("Explain loops".to_string(), vec![]).unwrap();
        assert_eq!(
            message.content,
            ChatCompletionRequestUserMessageContent::Text("Explain loops".to_string())
        );
    }

    #[test]
    fn test_images_follow_the_prompt() {
        let message = user_message(
            "Explain this diagram".to_string(),
            vec!["data:image/png;base64,iVBORw==".to_string()],
        )
        .unwrap();
        let ChatCompletionRequestUserMessageContent::Array(parts) = message.content else {
            panic!("expected content parts");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(
            &parts[0],
            ChatCompletionRequestUserMessageContentPart::Text(text) if text.text == "Explain this diagram"
        ));
        assert!(matches!(
            &parts[1],
            ChatCompletionRequestUserMessageContentPart::ImageUrl(image)
                if image.image_url.url == "data:image/png;base64,iVBORw=="
        ));
    }
}
