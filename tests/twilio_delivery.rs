//! Live delivery against a local stand-in for the Twilio Messages API.

use anyhow::{Context, Result};
use axum::{
    Extension, Form, Json, Router,
    body::{Body, to_bytes},
    extract::Path,
    http::{HeaderMap, Method, Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::post,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::Mutex};
use tower::ServiceExt;
use whatsdesigns::{
    api::{self, handlers::auth::{AuthConfig, AuthState}},
    auth::{
        Delivery, DeliveryError, DeliveryResult, TwilioOptions, TwilioSms,
        memory::{MemoryAccountStore, MemoryAttemptStore},
    },
};

const SENDER: &str = "+15550001111";
const PHONE: &str = "+15551234567";

#[derive(Debug, Clone)]
struct Captured {
    account_sid: String,
    authorization: Option<String>,
    form: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct Stub {
    captured: Arc<Mutex<Vec<Captured>>>,
    reject: bool,
}

async fn messages(
    Extension(stub): Extension<Stub>,
    Path(account_sid): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    stub.captured.lock().await.push(Captured {
        account_sid,
        authorization,
        form,
    });

    if stub.reject {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": 21211, "message": "The 'To' number is not a valid phone number." })),
        )
            .into_response()
    } else {
        (
            StatusCode::CREATED,
            Json(json!({ "sid": "SM0123456789abcdef", "status": "queued" })),
        )
            .into_response()
    }
}

async fn spawn_stub(stub: Stub) -> Result<SocketAddr> {
    let app = Router::new()
        .route("/2010-04-01/Accounts/:sid/Messages.json", post(messages))
        .layer(Extension(stub));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

fn options(addr: SocketAddr) -> Result<TwilioOptions> {
    TwilioOptions::from_parts(
        Some("AC123".to_string()),
        Some(SecretString::from("twilio-token")),
        Some(SENDER.to_string()),
        Some(format!("http://{addr}")),
    )?
    .context("credentials should be complete")
}

#[tokio::test]
async fn send_posts_form_with_basic_auth() -> Result<()> {
    let stub = Stub::default();
    let addr = spawn_stub(stub.clone()).await?;
    let sms = TwilioSms::new(options(addr)?)?;

    let sid = sms.send(PHONE, "hello").await?;
    assert_eq!(sid, "SM0123456789abcdef");

    let captured = stub.captured.lock().await.clone();
    assert_eq!(captured.len(), 1);
    let request = &captured[0];
    assert_eq!(request.account_sid, "AC123");
    assert_eq!(request.form.get("To").map(String::as_str), Some(PHONE));
    assert_eq!(request.form.get("From").map(String::as_str), Some(SENDER));
    assert_eq!(request.form.get("Body").map(String::as_str), Some("hello"));
    // base64("AC123:twilio-token")
    assert_eq!(
        request.authorization.as_deref(),
        Some("Basic QUMxMjM6dHdpbGlvLXRva2Vu")
    );
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_rejected() -> Result<()> {
    let stub = Stub {
        reject: true,
        ..Stub::default()
    };
    let addr = spawn_stub(stub).await?;
    let sms = TwilioSms::new(options(addr)?)?;

    match sms.send(PHONE, "hello").await {
        Err(DeliveryError::Rejected { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("21211"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_provider_is_transport_error() -> Result<()> {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let sms = TwilioSms::new(options(addr)?)?;
    assert!(matches!(
        sms.send(PHONE, "hello").await,
        Err(DeliveryError::Transport(_))
    ));
    Ok(())
}

#[tokio::test]
async fn delivered_link_is_not_echoed() -> Result<()> {
    let stub = Stub::default();
    let addr = spawn_stub(stub.clone()).await?;
    let delivery = Delivery::Live(TwilioSms::new(options(addr)?)?);

    let result = delivery
        .deliver(PHONE, "https://whatsdesigns.com/auth/verify-sms?token=abc")
        .await?;
    assert_eq!(
        result,
        DeliveryResult::Delivered {
            reference: "SM0123456789abcdef".to_string()
        }
    );
    assert!(result.echoed_link().is_none());

    let captured = stub.captured.lock().await.clone();
    let body = captured[0].form.get("Body").cloned().unwrap_or_default();
    assert_eq!(
        body,
        "Your WhatsDesigns login link (valid for 15 min): https://whatsdesigns.com/auth/verify-sms?token=abc"
    );
    Ok(())
}

async fn request_link(
    stub: Stub,
) -> Result<(StatusCode, Value, Arc<MemoryAttemptStore>)> {
    let addr = spawn_stub(stub).await?;
    let attempts = Arc::new(MemoryAttemptStore::new());
    let state = AuthState::new(
        AuthConfig::new("https://whatsdesigns.com".to_string()),
        &SecretString::from("delivery-test-secret"),
        attempts.clone(),
        Arc::new(MemoryAccountStore::new()),
        Delivery::Live(TwilioSms::new(options(addr)?)?),
    )?;
    let app = api::app(Arc::new(state))?;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/sms-magic-link")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "phone": PHONE }).to_string()))?,
        )
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?, attempts))
}

#[tokio::test]
async fn live_request_records_provider_reference() -> Result<()> {
    let (status, body, attempts) = request_link(Stub::default()).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Magic link sent via SMS");
    assert!(body.get("magicLink").is_none());

    let attempts = attempts.all().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].delivery_ref.as_deref(), Some("SM0123456789abcdef"));
    Ok(())
}

#[tokio::test]
async fn failed_delivery_records_nothing() -> Result<()> {
    let stub = Stub {
        reject: true,
        ..Stub::default()
    };
    let (status, body, attempts) = request_link(stub).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to send magic link");
    assert!(attempts.all().await.is_empty());
    Ok(())
}
