use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use registration_portal::auth::{AuthError, AuthService};
use registration_portal::config::ApiConfig;
use registration_portal::gateway::{
    GatewayError, HttpPortalClient, RegistrationGateway, VerifiedPayment,
};
use registration_portal::session::{AuthToken, MemorySessionStore, SessionStore};
use registration_portal::workflows::registration::{
    Attachment, AttachmentKind, BasicDetails, CheckoutResponse, Draft, SubmissionPayload,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

type Log = Arc<Mutex<Vec<Value>>>;

async fn serve(app: Router) -> ApiConfig {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub backend runs");
    });

    ApiConfig {
        base_url: Url::parse(&format!("http://{addr}/portal/")).expect("stub url"),
        request_timeout: Duration::from_secs(5),
        ..ApiConfig::default()
    }
}

fn client(api: ApiConfig) -> HttpPortalClient {
    HttpPortalClient::new(api).expect("client builds")
}

fn bearer(headers: &HeaderMap) -> Value {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(|value| Value::String(value.to_string()))
        .unwrap_or(Value::Null)
}

fn token() -> AuthToken {
    AuthToken::new("token-1")
}

fn logged(log: &Log) -> Vec<Value> {
    log.lock().expect("log mutex").clone()
}

fn draft() -> Draft {
    let basic: BasicDetails = serde_json::from_value(json!({
        "regcategory_id": "1",
        "nationality_id": "91",
        "f_name": "Asha",
        "l_name": "Rao",
        "gender": "Female",
        "father_name": "Venkat Rao",
        "mother_name": "Lakshmi Rao",
        "place": "Hyderabad",
        "dob": "1998-04-12",
        "category": "Open Category",
        "email": "asha.rao@example.in",
        "mobile_number": "9876543210",
        "address": "12-3-45, Banjara Hills, Hyderabad",
        "pan_number": "ABCDE1234F",
        "aadhaar_number": "123456789012",
        "regtype": "Regular (By Post - Fee includes postal charges)",
        "registrationCategory": "Regular"
    }))
    .expect("wire-format basic details");

    Draft {
        basic: Some(basic),
        attachments: AttachmentKind::REQUIRED
            .into_iter()
            .map(|kind| (kind, Attachment::pdf(format!("{kind}.pdf"), b"%PDF-1.4".to_vec())))
            .collect(),
        conditional: [("qualification", "BDS"), ("year_of_passing", "2023")]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        amount: Some(2000),
    }
}

fn verified() -> VerifiedPayment {
    VerifiedPayment {
        id: Some("7".to_string()),
        order_id: "order_1".to_string(),
        payment_id: "pay_1".to_string(),
        amount: Some(200_000),
        status: Some("captured".to_string()),
        currency: Some("INR".to_string()),
    }
}

#[tokio::test]
async fn create_order_posts_amount_with_bearer_token() {
    let log: Log = Arc::default();
    let app = Router::new()
        .route(
            "/portal/api/payments/create-order",
            post(
                |State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    log.lock()
                        .expect("log mutex")
                        .push(json!({ "auth": bearer(&headers), "body": body }));
                    Json(json!({
                        "success": true,
                        "order": { "id": "order_1", "amount": 200000, "currency": "INR", "receipt": "rcpt_1" }
                    }))
                },
            ),
        )
        .with_state(log.clone());
    let client = client(serve(app).await);

    let order = client
        .create_order(&token(), 2000, "INR")
        .await
        .expect("order created");

    assert_eq!(order.id, "order_1");
    assert_eq!(order.amount, 200_000);
    assert_eq!(
        logged(&log),
        vec![json!({
            "auth": "Bearer token-1",
            "body": { "amount": 2000, "currency": "INR" }
        })]
    );
}

#[tokio::test]
async fn create_order_declined_in_body_is_rejected() {
    let app = Router::new().route(
        "/portal/api/payments/create-order",
        post(|| async { Json(json!({ "success": false })) }),
    );
    let client = client(serve(app).await);

    let err = client
        .create_order(&token(), 2000, "INR")
        .await
        .expect_err("declined");
    assert_eq!(err, GatewayError::rejected("Failed to create order"));
}

#[tokio::test]
async fn verify_sends_signed_fields_and_maps_error_status() {
    let log: Log = Arc::default();
    let app = Router::new()
        .route(
            "/portal/api/payments/verify",
            post(|State(log): State<Log>, Json(body): Json<Value>| async move {
                log.lock().expect("log mutex").push(body);
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "error": "Invalid signature" })),
                )
            }),
        )
        .with_state(log.clone());
    let client = client(serve(app).await);
    let signed = CheckoutResponse::new("order_1", "pay_1", "sig_1")
        .into_signed()
        .expect("complete response");

    let err = client
        .verify_payment(&token(), &signed)
        .await
        .expect_err("signature rejected");

    assert_eq!(
        err,
        GatewayError::Rejected {
            status: Some(400),
            message: "Invalid signature".to_string(),
            missing: Vec::new(),
        }
    );
    assert_eq!(
        logged(&log),
        vec![json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "sig_1"
        })]
    );
}

#[tokio::test]
async fn register_sends_fields_then_named_pdf_parts() {
    let log: Log = Arc::default();
    let app = Router::new()
        .route(
            "/portal/api/users/register",
            post(
                |State(log): State<Log>, headers: HeaderMap, mut multipart: Multipart| async move {
                    log.lock().expect("log mutex").push(bearer(&headers));
                    while let Some(field) = multipart.next_field().await.expect("multipart field") {
                        let name = field.name().unwrap_or_default().to_string();
                        let file_name = field.file_name().map(str::to_string);
                        let content_type = field.content_type().map(str::to_string);
                        let text = field.text().await.expect("field body");
                        let entry = match file_name {
                            Some(file_name) => json!({
                                "part": name,
                                "file_name": file_name,
                                "content_type": content_type,
                            }),
                            None => json!({ "field": name, "value": text }),
                        };
                        log.lock().expect("log mutex").push(entry);
                    }
                    Json(json!({
                        "success": true,
                        "data": {
                            "application_id": "APP-1",
                            "temporary_id": "TMP123",
                            "payment_id": "pay_1",
                            "status": "pending",
                            "amount_paid": 2000
                        }
                    }))
                },
            ),
        )
        .with_state(log.clone());
    let client = client(serve(app).await);
    let payload = SubmissionPayload::assemble(&draft(), &verified()).expect("payload assembles");

    let confirmation = client
        .register(&token(), &payload)
        .await
        .expect("registration accepted");
    assert_eq!(confirmation.temporary_id, "TMP123");

    let entries = logged(&log);
    assert_eq!(entries[0], json!("Bearer token-1"));
    let fields: Vec<&Value> = entries.iter().filter(|entry| entry.get("field").is_some()).collect();
    assert_eq!(fields[0], &json!({ "field": "regcategory_id", "value": "1" }));
    assert!(fields.contains(&&json!({ "field": "payment_status", "value": "completed" })));
    assert!(fields.contains(&&json!({ "field": "order_id", "value": "order_1" })));
    assert!(fields.contains(&&json!({ "field": "year_of_passing", "value": "2023" })));

    let parts: Vec<&Value> = entries.iter().filter(|entry| entry.get("part").is_some()).collect();
    assert_eq!(
        parts,
        vec![
            &json!({ "part": "pan_upload", "file_name": "pan_upload.pdf", "content_type": "application/pdf" }),
            &json!({ "part": "aadhaar_upload", "file_name": "aadhaar_upload.pdf", "content_type": "application/pdf" }),
            &json!({ "part": "sign_upload", "file_name": "sign_upload.pdf", "content_type": "application/pdf" }),
        ]
    );
}

#[tokio::test]
async fn register_rejection_carries_missing_files() {
    let app = Router::new().route(
        "/portal/api/users/register",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "error": "Required documents missing",
                    "missing": ["sign_upload"]
                })),
            )
        }),
    );
    let client = client(serve(app).await);
    let payload = SubmissionPayload::assemble(&draft(), &verified()).expect("payload assembles");

    let err = client
        .register(&token(), &payload)
        .await
        .expect_err("rejected");
    assert_eq!(err.missing_fields(), ["sign_upload".to_string()]);
    assert_eq!(err.to_string(), "Required documents missing");
}

#[tokio::test]
async fn slow_backend_times_out() {
    let app = Router::new().route(
        "/portal/api/payments/create-order",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "success": true }))
        }),
    );
    let mut api = serve(app).await;
    api.request_timeout = Duration::from_millis(200);
    let client = client(api);

    let err = client
        .create_order(&token(), 2000, "INR")
        .await
        .expect_err("times out");
    assert_eq!(err, GatewayError::Timeout);
    assert!(err.is_transport());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    let client = client(ApiConfig {
        base_url: Url::parse(&format!("http://{addr}/")).expect("url"),
        ..ApiConfig::default()
    });

    let err = client
        .create_order(&token(), 2000, "INR")
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, GatewayError::Transport(_)));
}

#[tokio::test]
async fn login_stores_session_from_backend_grant() {
    let app = Router::new().route(
        "/portal/api/auth/login",
        post(|Json(body): Json<Value>| async move {
            if body["password"] == "Sup3r$ecret" {
                (
                    StatusCode::OK,
                    Json(json!({
                        "token": "jwt-123",
                        "user": { "name": "Asha Rao", "email": body["email"], "role": "applicant" }
                    })),
                )
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Invalid email or password" })),
                )
            }
        }),
    );
    let store = Arc::new(MemorySessionStore::default());
    let auth = AuthService::new(Arc::new(client(serve(app).await)), store.clone());

    let err = auth
        .login("asha.rao@example.in", "wrong")
        .await
        .expect_err("bad password");
    assert_eq!(err.user_message(), "Invalid email or password");

    let session = auth
        .login("asha.rao@example.in", "Sup3r$ecret")
        .await
        .expect("signed in");
    assert_eq!(session.token.expose(), "jwt-123");
    assert_eq!(session.display_name(), "Asha Rao");
    assert_eq!(store.load_session().expect("readable"), Some(session));
}

#[tokio::test]
async fn reset_password_puts_token_in_path() {
    let app = Router::new().route(
        "/portal/api/auth/reset-password/:token",
        post(|Path(token): Path<String>| async move {
            if token == "fresh" {
                (StatusCode::OK, Json(json!({ "message": "Password updated" })))
            } else {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": "Reset token is invalid or has expired" })),
                )
            }
        }),
    );
    let auth = AuthService::new(
        Arc::new(client(serve(app).await)),
        Arc::new(MemorySessionStore::default()),
    );

    auth.reset_password("fresh", "asha.rao@example.in", "N3w$ecret", "N3w$ecret")
        .await
        .expect("reset accepted");
    let err = auth
        .reset_password("stale", "asha.rao@example.in", "N3w$ecret", "N3w$ecret")
        .await
        .expect_err("stale link");
    assert!(matches!(err, AuthError::ResetLinkExpired));
}
