//! Inbound webhook HTTP server.
//!
//! The delivery platform posts every instance event here. The handler
//! validates the shared key, filters to message upserts, resolves the
//! conversation, and hands off to the gateway on a detached task so the
//! platform gets its acknowledgement immediately.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use maritaca_core::config::{MaintenanceConfig, WebhookConfig};
use maritaca_core::event::{Conversation, WebhookEnvelope, MESSAGES_UPSERT};

use crate::gateway::Gateway;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
    api_key: Option<String>,
    maintenance: MaintenanceConfig,
    uptime: Instant,
}

/// Constant-time string comparison to prevent timing attacks on key checks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// The platform sends the shared key either as an `apikey` header or as a
/// top-level `apikey` body field, depending on version.
fn check_key(headers: &HeaderMap, body: &Value, api_key: &Option<String>) -> bool {
    let Some(expected) = api_key else {
        return true; // No key configured — allow all.
    };

    let header_key = headers.get("apikey").and_then(|v| v.to_str().ok());
    let body_key = body.get("apikey").and_then(Value::as_str);

    header_key
        .or(body_key)
        .is_some_and(|got| constant_time_eq(got, expected))
}

/// `GET /health` — liveness with uptime.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
    }))
}

/// `POST /webhook/evolution` — one event per request.
///
/// Everything that is not an in-scope message acknowledges with 200 and a
/// status tag: the platform retries non-2xx deliveries, and there is
/// nothing to retry here.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !check_key(&headers, &body, &state.api_key) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid api key"})),
        ));
    }

    let envelope: WebhookEnvelope = match serde_json::from_value(body) {
        Ok(env) => env,
        Err(e) => {
            warn!("unparseable webhook payload: {e}");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "malformed payload"})),
            ));
        }
    };

    if envelope.event != MESSAGES_UPSERT {
        debug!("ignoring event {}", envelope.event);
        return Ok(Json(json!({"status": "ignored"})));
    }

    let Some(conversation) = envelope.data.conversation() else {
        debug!("ignoring message without a resolvable conversation");
        return Ok(Json(json!({"status": "ignored"})));
    };

    if state.maintenance.enabled {
        match &conversation {
            Conversation::Direct { phone, .. } if *phone == state.maintenance.allowed_number => {}
            Conversation::Direct { phone, .. } => {
                let gateway = state.gateway.clone();
                let phone = phone.clone();
                let notice = state.maintenance.notice.clone();
                tokio::spawn(async move {
                    if let Err(e) = gateway.transport.send_text(&phone, &notice, None).await {
                        warn!("maintenance notice failed: {e}");
                    }
                });
                return Ok(Json(json!({"status": "maintenance"})));
            }
            Conversation::Group { .. } => {
                return Ok(Json(json!({"status": "maintenance"})));
            }
        }
    }

    let gateway = state.gateway.clone();
    tokio::spawn(async move {
        gateway.process_event(conversation, envelope.data).await;
    });

    Ok(Json(json!({"status": "accepted"})))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/evolution", post(webhook))
        .layer(axum::extract::DefaultBodyLimit::max(4 * 1024 * 1024))
        .with_state(state)
}

/// Start the webhook server. Runs until the listener fails.
pub async fn serve(config: WebhookConfig, maintenance: MaintenanceConfig, gateway: Arc<Gateway>) {
    let api_key = if config.api_key.is_empty() {
        None
    } else {
        Some(config.api_key.clone())
    };

    let state = AppState {
        gateway,
        api_key,
        maintenance,
        uptime: Instant::now(),
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("webhook server failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("Webhook server listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("webhook server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    use maritaca_core::config::{
        BotConfig, Config, EvolutionConfig, IngestConfig, MemoryConfig, OpenRouterConfig,
        SchedulerConfig, TtsConfig,
    };
    use maritaca_core::error::MaritacaError;
    use maritaca_core::traits::{
        ChatRequest, ChatResponse, GroupInfo, ImageEngine, MediaDownload, Provider,
        SpeechSynthesizer, Transcriber, Transport,
    };
    use maritaca_store::Store;

    struct NullTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for NullTransport {
        async fn send_text(
            &self,
            _remote_id: &str,
            text: &str,
            _reply_to: Option<&str>,
        ) -> Result<(), MaritacaError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_audio(
            &self,
            _remote_id: &str,
            _audio_base64: &str,
            _reply_to: Option<&str>,
        ) -> Result<(), MaritacaError> {
            Ok(())
        }

        async fn send_image(
            &self,
            _remote_id: &str,
            _image_base64: &str,
            _caption: Option<&str>,
        ) -> Result<(), MaritacaError> {
            Ok(())
        }

        async fn send_sticker(
            &self,
            _remote_id: &str,
            _webp_base64: &str,
        ) -> Result<(), MaritacaError> {
            Ok(())
        }

        async fn download_media(
            &self,
            _message_id: &str,
        ) -> Result<MediaDownload, MaritacaError> {
            Err(MaritacaError::Transport("no media in tests".to_string()))
        }

        async fn get_group_info(
            &self,
            _group_remote_id: &str,
        ) -> Result<GroupInfo, MaritacaError> {
            Err(MaritacaError::Transport("no groups in tests".to_string()))
        }

        async fn profile_picture_url(
            &self,
            _jid: &str,
        ) -> Result<Option<String>, MaritacaError> {
            Ok(None)
        }
    }

    struct NullProvider;

    #[async_trait]
    impl Provider for NullProvider {
        fn name(&self) -> &str {
            "null"
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, MaritacaError> {
            Ok(ChatResponse::default())
        }
    }

    struct NullTranscriber;

    #[async_trait]
    impl Transcriber for NullTranscriber {
        async fn transcribe(&self, _audio_base64: &str) -> Result<ChatResponse, MaritacaError> {
            Ok(ChatResponse::default())
        }
    }

    struct NullImages;

    #[async_trait]
    impl ImageEngine for NullImages {
        async fn generate(
            &self,
            _prompt: &str,
            _source_base64: Option<&str>,
        ) -> Result<String, MaritacaError> {
            Ok(String::new())
        }

        async fn describe(
            &self,
            _image_base64: &str,
            _prompt: &str,
        ) -> Result<ChatResponse, MaritacaError> {
            Ok(ChatResponse::default())
        }

        async fn sticker(
            &self,
            _image_base64: &str,
            _top: Option<&str>,
            _bottom: Option<&str>,
        ) -> Result<String, MaritacaError> {
            Ok(String::new())
        }
    }

    struct NullSpeech;

    #[async_trait]
    impl SpeechSynthesizer for NullSpeech {
        async fn synthesize(&self, _text: &str, _english: bool) -> Result<String, MaritacaError> {
            Ok(String::new())
        }
    }

    fn test_config() -> Config {
        Config {
            bot: BotConfig {
                name: "Maritaca".to_string(),
                number: "5511999990000".to_string(),
                ready_notice: "ready".to_string(),
                deny_notice: "no".to_string(),
            },
            webhook: WebhookConfig::default(),
            maintenance: MaintenanceConfig::default(),
            evolution: EvolutionConfig {
                base_url: "http://localhost:8080".to_string(),
                instance: "main".to_string(),
                api_key: "k".to_string(),
            },
            openrouter: OpenRouterConfig {
                base_url: "http://localhost:9090".to_string(),
                api_key: "sk".to_string(),
                text_model: "t".to_string(),
                audio_model: "a".to_string(),
                image_model: "i".to_string(),
                classifier_model: "c".to_string(),
            },
            tts: TtsConfig::default(),
            memory: MemoryConfig::default(),
            scheduler: SchedulerConfig::default(),
            ingest: IngestConfig::default(),
        }
    }

    async fn test_router(api_key: Option<String>, maintenance: MaintenanceConfig) -> Router {
        let store = Store::in_memory().await.unwrap();
        let gateway = Arc::new(Gateway::new(
            Arc::new(NullTransport {
                sent: Mutex::new(Vec::new()),
            }),
            Arc::new(NullProvider),
            Arc::new(NullTranscriber),
            Arc::new(NullImages),
            Arc::new(NullSpeech),
            store,
            test_config(),
        ));
        build_router(AppState {
            gateway,
            api_key,
            maintenance,
            uptime: Instant::now(),
        })
    }

    fn webhook_request(body: Value) -> Request<Body> {
        Request::post("/webhook/evolution")
            .header("Content-Type", "application/json")
            .header("apikey", "hook-secret")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upsert_body() -> Value {
        json!({
            "event": "messages.upsert",
            "instance": "main",
            "data": {
                "key": {
                    "id": "MSG1",
                    "remoteJid": "5511988887777@s.whatsapp.net",
                    "remoteJidAlt": "111@lid",
                },
                "messageTimestamp": chrono::Utc::now().timestamp(),
                "messageType": "conversation",
                "message": { "conversation": "hello" },
            },
        })
    }

    async fn body_json(resp: axum::http::Response<Body>) -> Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let app = test_router(Some("hook-secret".to_string()), MaintenanceConfig::default()).await;
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_webhook_rejects_wrong_key() {
        let app = test_router(Some("other".to_string()), MaintenanceConfig::default()).await;
        let resp = app.oneshot(webhook_request(upsert_body())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_accepts_key_in_body() {
        let app = test_router(Some("hook-secret".to_string()), MaintenanceConfig::default()).await;
        let mut body = upsert_body();
        body["apikey"] = json!("hook-secret");
        let req = Request::post("/webhook/evolution")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "accepted");
    }

    #[tokio::test]
    async fn test_other_events_are_acknowledged_and_ignored() {
        let app = test_router(Some("hook-secret".to_string()), MaintenanceConfig::default()).await;
        let body = json!({
            "event": "connection.update",
            "data": {
                "key": { "id": "X", "remoteJid": "", "remoteJidAlt": "" },
                "messageTimestamp": 0,
            },
        });
        let resp = app.oneshot(webhook_request(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ignored");
    }

    #[tokio::test]
    async fn test_unresolvable_conversation_is_ignored() {
        let app = test_router(Some("hook-secret".to_string()), MaintenanceConfig::default()).await;
        let mut body = upsert_body();
        body["data"]["key"]["remoteJid"] = json!("status@broadcast");
        body["data"]["key"]["remoteJidAlt"] = json!("");
        let resp = app.oneshot(webhook_request(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ignored");
    }

    #[tokio::test]
    async fn test_maintenance_blocks_everyone_but_the_allowed_number() {
        let maintenance = MaintenanceConfig {
            enabled: true,
            allowed_number: "5511900009999".to_string(),
            notice: "back soon".to_string(),
        };
        let app = test_router(Some("hook-secret".to_string()), maintenance).await;
        let resp = app.oneshot(webhook_request(upsert_body())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "maintenance");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_client_error() {
        let app = test_router(None, MaintenanceConfig::default()).await;
        let resp = app
            .oneshot(webhook_request(json!({"not": "an envelope"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_constant_time_eq_basics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
