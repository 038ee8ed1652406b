use crate::llm::client::{LLMClient, TokenStream};
use crate::types::{AppError, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use futures::StreamExt;

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn messages(system: &str, prompt: &str) -> Vec<ChatCompletionRequestMessage> {
        vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                system.to_string(),
            )),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                prompt.to_string(),
            )),
        ]
    }

    fn build_request(&self, system: &str, prompt: &str) -> Result<CreateChatCompletionRequest> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(Self::messages(system, prompt));

        if let Some(temperature) = self.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            args.max_completion_tokens(max_tokens);
        }

        args.build()
            .map_err(|e| AppError::Upstream(format!("Failed to build request: {}", e)))
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = self.build_request(system, prompt)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::Upstream(format!("OpenAI API error: {}", e)))?;

        // A reply without text is malformed output, not a failed call
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        if content.is_none() {
            tracing::warn!(model = %self.model, "OpenAI returned no message content");
        }
        Ok(content.unwrap_or_default())
    }

    async fn open_stream(&self, system: &str, prompt: &str) -> Result<TokenStream> {
        let request = self.build_request(system, prompt)?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| AppError::Upstream(format!("OpenAI API error: {}", e)))?;

        let result_stream = async_stream::stream! {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(response) => {
                        for choice in response.choices {
                            if let Some(content) = choice.delta.content {
                                yield Ok(content);
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::Upstream(format!("Stream error: {}", e)));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(result_stream)))
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.complete(system, prompt).await
    }

    async fn stream_with_system(&self, system: &str, prompt: &str) -> Result<TokenStream> {
        self.open_stream(system, prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_includes_system_message() {
        let client = OpenAIClient::new(
            "sk-test".to_string(),
            "https://api.openai.com/v1".to_string(),
            "gpt-4".to_string(),
        )
        .with_temperature(Some(0.7));

        let request = client.build_request("system", "user").unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_request_defaults() {
        let client = OpenAIClient::new(
            "sk-test".to_string(),
            "https://api.openai.com/v1".to_string(),
            "gpt-4".to_string(),
        );

        let request = client.build_request("system", "user").unwrap();
        assert_eq!(request.temperature, None);
        assert_eq!(request.max_completion_tokens, None);
        assert_eq!(client.model_name(), "gpt-4");
    }
}
