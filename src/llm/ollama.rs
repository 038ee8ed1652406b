use crate::llm::client::{LLMClient, TokenStream};
use crate::types::{AppError, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

/// Split `http://host:port` into host and port, defaulting to 11434.
fn parse_base_url(base_url: &str) -> (String, u16) {
    match base_url.split_once("://") {
        Some((scheme, rest)) => {
            let rest = rest.trim_end_matches('/');
            let (host, port) = match rest.split_once(':') {
                Some((host, port)) => (host, port.parse().unwrap_or(11434)),
                None => (rest, 11434),
            };
            (format!("{}://{}", scheme, host), port)
        }
        None => ("http://localhost".to_string(), 11434),
    }
}

impl OllamaClient {
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let (host, port) = parse_base_url(&base_url);
        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }

    fn request(&self, system: &str, prompt: &str) -> ChatMessageRequest {
        let messages = vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ];
        ChatMessageRequest::new(self.model.clone(), messages)
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let response = self
            .client
            .send_chat_messages(self.request(system, prompt))
            .await
            .map_err(|e| AppError::Upstream(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }

    async fn open_stream(&self, system: &str, prompt: &str) -> Result<TokenStream> {
        let mut stream_response = self
            .client
            .send_chat_messages_stream(self.request(system, prompt))
            .await
            .map_err(|e| AppError::Upstream(format!("Ollama stream error: {}", e)))?;

        let output_stream = stream! {
            while let Some(chunk_result) = stream_response.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let content = chunk.message.content;
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                    }
                    Err(_) => {
                        yield Err(AppError::Upstream("Stream chunk error".to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(output_stream)))
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
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
    fn test_url_parsing_full() {
        assert_eq!(
            parse_base_url("http://localhost:11434"),
            ("http://localhost".to_string(), 11434)
        );
    }

    #[test]
    fn test_url_parsing_no_port() {
        assert_eq!(
            parse_base_url("http://localhost"),
            ("http://localhost".to_string(), 11434)
        );
    }

    #[test]
    fn test_url_parsing_custom_port() {
        assert_eq!(
            parse_base_url("http://192.168.1.100:8080/"),
            ("http://192.168.1.100".to_string(), 8080)
        );
    }

    #[test]
    fn test_url_parsing_garbage() {
        assert_eq!(
            parse_base_url("localhost"),
            ("http://localhost".to_string(), 11434)
        );
    }
}
