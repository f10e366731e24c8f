//! Completions client and reply generator against a wiremock endpoint

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use weatherbot::config::LlmConfig;
use weatherbot::llm::{
    ChatCompletion, GenerationRequest, LlmResponseGenerator, OpenAiClient, ResponseGenerator,
};
use weatherbot::security::{LEAKAGE_REPLACEMENT, ScreenThresholds, SecurityScreen};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn llm_config(base_url: &str, model: &str, with_key: bool) -> LlmConfig {
    let key_line = if with_key {
        "api_key = \"sk-test\""
    } else {
        ""
    };
    toml::from_str(&format!(
        "base_url = \"{}\"\nmodel = \"{}\"\napi_key_env = \"WEATHERBOT_TEST_UNSET_KEY\"\n{}\n",
        base_url, model, key_line
    ))
    .expect("llm config")
}

fn generator_for(config: &LlmConfig, timeout: Duration) -> LlmResponseGenerator {
    let client: Arc<dyn ChatCompletion> =
        Arc::new(OpenAiClient::new(config).expect("client should build"));
    let screen = Arc::new(SecurityScreen::new(ScreenThresholds::default()).expect("screen"));
    LlmResponseGenerator::new(client, screen, timeout).expect("generator")
}

fn completion(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn request(message: &str) -> GenerationRequest<'_> {
    GenerationRequest {
        message,
        weather: None,
        weather_error: None,
        history: &[],
        is_first_message: true,
        user_city: None,
    }
}

async fn sent_body(server: &MockServer) -> Value {
    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    serde_json::from_slice(&received[0].body).expect("json body")
}

#[tokio::test]
async fn test_reply_returned_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  ¡Hola! ☀️  ")))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator_for(
        &llm_config(&server.uri(), "gpt-3.5-turbo", true),
        Duration::from_secs(5),
    );
    let reply = generator.generate(request("Hola")).await.expect("reply");

    assert_eq!(reply.text, "¡Hola! ☀️");
    assert!(!reply.leakage_blocked);

    let body = sent_body(&server).await;
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["max_tokens"], 500);
    assert!(body.get("max_completion_tokens").is_none());
    assert!((body["temperature"].as_f64().expect("temperature") - 0.7).abs() < 1e-6);
    let messages = body["messages"].as_array().expect("messages");
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages.last().expect("user turn")["content"], "Hola");
}

#[tokio::test]
async fn test_newer_models_use_completion_token_budget() {
    for (model, budget, has_temperature) in [("gpt-4o-mini", 500, true), ("gpt-5-nano", 1500, false)] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        let generator = generator_for(&llm_config(&server.uri(), model, true), Duration::from_secs(5));
        generator.generate(request("Hola")).await.expect("reply");

        let body = sent_body(&server).await;
        assert_eq!(body["max_completion_tokens"], budget, "{}", model);
        assert!(body.get("max_tokens").is_none(), "{}", model);
        assert_eq!(body.get("temperature").is_some(), has_temperature, "{}", model);
    }
}

#[tokio::test]
async fn test_leaky_reply_is_replaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("Claro, usa Authorization: Bearer abc123")),
        )
        .mount(&server)
        .await;

    let generator = generator_for(
        &llm_config(&server.uri(), "gpt-3.5-turbo", true),
        Duration::from_secs(5),
    );
    let reply = generator.generate(request("Hola")).await.expect("reply");

    assert!(reply.leakage_blocked);
    assert_eq!(reply.text, LEAKAGE_REPLACEMENT);
}

#[tokio::test]
async fn test_provider_errors_are_translated() {
    let cases = [
        (
            429,
            Some("You exceeded your current quota, please check your plan and billing details."),
            "El servicio de IA ha alcanzado su límite de uso. Intenta más tarde o contacta al administrador.",
        ),
        (
            401,
            Some("Invalid API key provided"),
            "Error de autenticación con el servicio de IA. Contacta al administrador.",
        ),
        (
            400,
            Some("Unsupported parameter: 'max_tokens'"),
            "Configuración incompatible del servicio de IA. Contacta al administrador.",
        ),
        (
            429,
            Some("Rate limit reached for requests"),
            "El servicio de IA está muy ocupado. Intenta nuevamente en unos segundos.",
        ),
        (
            503,
            Some("The server is overloaded"),
            "El servicio de IA está experimentando problemas técnicos. Intenta más tarde.",
        ),
        (
            404,
            Some("The model does not exist"),
            "Error temporal del servicio de IA. Intenta nuevamente.",
        ),
        (500, None, "Servicio de IA temporalmente no disponible"),
    ];

    for (status, provider_message, expected) in cases {
        let server = MockServer::start().await;
        let template = match provider_message {
            Some(message) => ResponseTemplate::new(status)
                .set_body_json(json!({"error": {"message": message, "type": "error"}})),
            None => ResponseTemplate::new(status),
        };
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(template)
            .mount(&server)
            .await;

        let generator = generator_for(
            &llm_config(&server.uri(), "gpt-3.5-turbo", true),
            Duration::from_secs(5),
        );
        let err = generator
            .generate(request("Hola"))
            .await
            .expect_err("error status");
        assert_eq!(err.user_message, expected, "status {} {:?}", status, provider_message);
        assert!(err.detail.contains(&status.to_string()));
    }
}

#[tokio::test]
async fn test_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let generator = generator_for(
        &llm_config(&server.uri(), "gpt-3.5-turbo", true),
        Duration::from_secs(5),
    );
    let err = generator.generate(request("Hola")).await.expect_err("empty");
    assert_eq!(err.user_message, "Respuesta vacía del servicio de IA.");
}

#[tokio::test]
async fn test_slow_completion_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("tarde"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let generator = generator_for(
        &llm_config(&server.uri(), "gpt-3.5-turbo", true),
        Duration::from_millis(200),
    );
    let err = generator.generate(request("Hola")).await.expect_err("timeout");
    assert_eq!(
        err.user_message,
        "La consulta al servicio de IA está tardando demasiado. Intenta con un mensaje más corto."
    );
}

#[tokio::test]
async fn test_missing_key_never_calls_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(0)
        .mount(&server)
        .await;

    let generator = generator_for(
        &llm_config(&server.uri(), "gpt-3.5-turbo", false),
        Duration::from_secs(5),
    );
    let err = generator.generate(request("Hola")).await.expect_err("no key");
    assert_eq!(
        err.user_message,
        "API key de OpenAI no configurada. Por favor verifica tu configuración."
    );
}

#[tokio::test]
async fn test_model_input_is_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    let generator = generator_for(
        &llm_config(&server.uri(), "gpt-3.5-turbo", true),
        Duration::from_secs(5),
    );
    generator
        .generate(request("  clima\u{07}   en\n\nLima  "))
        .await
        .expect("reply");

    let body = sent_body(&server).await;
    let messages = body["messages"].as_array().expect("messages");
    assert_eq!(messages.last().expect("user turn")["content"], "clima en Lima");
}
