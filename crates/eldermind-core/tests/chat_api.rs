use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use eldermind_core::{
    ChatRole, ChatTransport, Conversation, EldermindClient, Persona, TransportError,
    SEND_FAILED_MESSAGE,
};

#[derive(Clone, Default)]
struct MockBackend {
    responses: Arc<Mutex<VecDeque<(u16, &'static str)>>>,
    requests: Arc<Mutex<Vec<Value>>>,
    content_types: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn chat_handler(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    backend.content_types.lock().unwrap().push(content_type);
    backend
        .requests
        .lock()
        .unwrap()
        .push(serde_json::from_str(&body).unwrap_or(Value::Null));

    let (status, body) = backend
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "no scripted response"));
    (StatusCode::from_u16(status).unwrap(), body).into_response()
}

async fn start_mock_backend(
    responses: Vec<(u16, &'static str)>,
) -> (String, MockBackend, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let backend = MockBackend {
        responses: Arc::new(Mutex::new(responses.into())),
        ..Default::default()
    };

    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (base_url, backend, shutdown_tx)
}

fn conversation_for(base_url: &str) -> Conversation {
    Conversation::new(Arc::new(EldermindClient::new(base_url)))
}

#[tokio::test]
async fn scholar_question_round_trip_sends_exact_body() {
    let (base_url, backend, shutdown_tx) = start_mock_backend(vec![(
        200,
        r#"{"reply":"Vivec is...","promptTokens":10,"completionTokens":4}"#,
    )])
    .await;

    let mut conversation = conversation_for(&base_url);
    conversation.send_user_message("Who is Vivec?").await;

    assert_eq!(
        backend.requests(),
        vec![json!({
            "persona": "scholar",
            "messages": [{"role": "user", "content": "Who is Vivec?"}]
        })]
    );
    assert_eq!(
        backend.content_types.lock().unwrap().clone(),
        vec!["application/json".to_string()]
    );

    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[0].content, "Who is Vivec?");
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[1].content, "Vivec is...");
    assert_eq!(conversation.error(), None);
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn server_error_keeps_only_user_message() {
    let (base_url, _backend, shutdown_tx) =
        start_mock_backend(vec![(500, "internal error")]).await;

    let mut conversation = conversation_for(&base_url);
    conversation.send_user_message("Who is Vivec?").await;

    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation.messages()[0].role, ChatRole::User);
    assert_eq!(conversation.error(), Some(SEND_FAILED_MESSAGE));
    assert!(!conversation.is_loading());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn client_surfaces_status_and_body_on_failure() {
    let (base_url, _backend, shutdown_tx) =
        start_mock_backend(vec![(500, "internal error")]).await;

    let client = EldermindClient::new(&base_url);
    let history = vec![eldermind_core::ChatMessage::user("hello")];
    let result = client.send(Persona::Npc, &history).await;

    match result {
        Err(TransportError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal error");
        }
        other => panic!("expected status error, got {:?}", other.map(|m| m.content)),
    }
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn second_send_carries_the_whole_first_exchange() {
    let (base_url, backend, shutdown_tx) = start_mock_backend(vec![
        (200, r#"{"reply":"The Tribunal's warrior-poet."}"#),
        (200, r#"{"reply":"He fought at Red Mountain."}"#),
    ])
    .await;

    let mut conversation = conversation_for(&base_url);
    conversation.set_persona(Persona::InCharacter);
    conversation.send_user_message("Who is Vivec?").await;
    conversation.send_user_message("What did he do?").await;

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1],
        json!({
            "persona": "in-character",
            "messages": [
                {"role": "user", "content": "Who is Vivec?"},
                {"role": "assistant", "content": "The Tribunal's warrior-poet."},
                {"role": "user", "content": "What did he do?"}
            ]
        })
    );
    assert_eq!(conversation.len(), 4);
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn reply_with_wrong_shape_is_a_failure() {
    let (base_url, _backend, shutdown_tx) = start_mock_backend(vec![(
        200,
        r#"{"role":"assistant","content":"old draft shape"}"#,
    )])
    .await;

    let client = EldermindClient::new(&base_url);
    let history = vec![eldermind_core::ChatMessage::user("hello")];
    let result = client.send(Persona::Scholar, &history).await;

    assert!(matches!(result, Err(TransportError::Decode(_))));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn non_json_reply_sets_generic_error() {
    let (base_url, _backend, shutdown_tx) =
        start_mock_backend(vec![(200, "<html>gateway</html>")]).await;

    let mut conversation = conversation_for(&base_url);
    conversation.send_user_message("hello").await;

    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation.error(), Some(SEND_FAILED_MESSAGE));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn unreachable_host_is_a_request_failure() {
    // Bind then drop to get a port nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = EldermindClient::new(&format!("http://{}", addr));
    let history = vec![eldermind_core::ChatMessage::user("anyone there?")];
    let result = client.send(Persona::Daedric, &history).await;
    assert!(matches!(result, Err(TransportError::Request(_))));

    let mut conversation = conversation_for(&format!("http://{}", addr));
    conversation.send_user_message("anyone there?").await;
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation.error(), Some(SEND_FAILED_MESSAGE));
    assert!(!conversation.is_loading());
}
