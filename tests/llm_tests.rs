//! LLM provider tests against a wiremock server.
//!
//! Each test stands up a fake OpenAI or Ollama endpoint and checks how the
//! client maps replies and stream frames to text.

use delve::llm::{LLMClient, TokenStream};
use delve::types::Result;
use futures::StreamExt;

async fn collect(mut stream: TokenStream) -> Vec<Result<String>> {
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
    }
    items
}

#[cfg(feature = "openai")]
mod openai {
    use super::*;
    use delve::llm::openai::OpenAIClient;
    use delve::research::refiner::QueryRefiner;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new("sk-test".to_string(), server.uri(), "gpt-4o-mini".to_string())
    }

    fn completion(content: Value) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    fn chunk(content: &str) -> String {
        let frame = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "delta": { "content": content },
                "finish_reason": null
            }]
        });
        format!("data: {}\n\n", frame)
    }

    async fn mount_completion(server: &MockServer, content: Value) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_completion_returns_message_text() {
        let server = MockServer::start().await;
        mount_completion(&server, json!(r#"["a", "b"]"#)).await;

        let reply = client(&server)
            .generate_with_system("system", "user")
            .await
            .unwrap();
        assert_eq!(reply, r#"["a", "b"]"#);
    }

    #[tokio::test]
    async fn test_null_content_is_empty_reply() {
        let server = MockServer::start().await;
        mount_completion(&server, Value::Null).await;

        let reply = client(&server)
            .generate_with_system("system", "user")
            .await
            .unwrap();
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn test_refiner_falls_back_when_content_is_null() {
        let server = MockServer::start().await;
        mount_completion(&server, Value::Null).await;

        let refiner = QueryRefiner::new(Arc::new(client(&server)), 3);
        let queries = refiner.refine("rust vs go").await.unwrap();
        assert_eq!(queries, vec!["rust vs go".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_yields_delta_content_in_order() {
        let server = MockServer::start().await;

        let mut body = String::new();
        for text in ["Rust ", "offers ", "memory safety."] {
            body.push_str(&chunk(text));
        }
        body.push_str("data: [DONE]\n\n");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let stream = client(&server)
            .stream_with_system("system", "user")
            .await
            .unwrap();
        let fragments: Vec<String> = collect(stream)
            .await
            .into_iter()
            .map(|item| item.unwrap())
            .collect();

        assert_eq!(fragments, vec!["Rust ", "offers ", "memory safety."]);
    }

    #[tokio::test]
    async fn test_rejected_request_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "invalid_api_key"
                }
            })))
            .mount(&server)
            .await;

        let result = client(&server).generate_with_system("system", "user").await;
        assert!(matches!(result, Err(delve::types::AppError::Upstream(_))));
    }
}

#[cfg(feature = "ollama")]
mod ollama {
    use super::*;
    use delve::llm::ollama::OllamaClient;
    use delve::types::AppError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> OllamaClient {
        OllamaClient::new(server.uri(), "llama3.2:3b".to_string())
            .await
            .unwrap()
    }

    fn line(content: &str, done: bool) -> String {
        let frame = json!({
            "model": "llama3.2:3b",
            "created_at": "2024-01-01T00:00:00Z",
            "message": { "role": "assistant", "content": content },
            "done": done
        });
        format!("{}\n", frame)
    }

    #[tokio::test]
    async fn test_completion_returns_message_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                line(r#"["a", "b", "c"]"#, true),
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server)
            .await
            .generate_with_system("system", "user")
            .await
            .unwrap();
        assert_eq!(reply, r#"["a", "b", "c"]"#);
    }

    #[tokio::test]
    async fn test_stream_skips_empty_chunks() {
        let server = MockServer::start().await;

        let body = [
            line("Rust ", false),
            line("", false),
            line("wins.", false),
            line("", true),
        ]
        .concat();

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .expect(1)
            .mount(&server)
            .await;

        let stream = client(&server)
            .await
            .stream_with_system("system", "user")
            .await
            .unwrap();
        let fragments: Vec<String> = collect(stream)
            .await
            .into_iter()
            .map(|item| item.unwrap())
            .collect();

        assert_eq!(fragments, vec!["Rust ", "wins."]);
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let result = client(&server)
            .await
            .stream_with_system("system", "user")
            .await;
        match result {
            Err(AppError::Upstream(message)) => assert!(message.contains("model not found")),
            Err(other) => panic!("expected upstream error, got {:?}", other),
            Ok(_) => panic!("expected upstream error"),
        }
    }
}
