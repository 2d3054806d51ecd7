//! Router-level tests over in-memory stores.
//!
//! Exercises the bearer-token layer, the permission matrix, branch scoping,
//! conflict mapping and archive routing through real HTTP requests.

use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use lender_core::memory::MemoryStore;
use lender_core::models::customer::{status, Customer};
use lender_core::permission::Grant;
use lender_core::ports::Stores;
use lender_core::principal::{JwtClaims, Principal, ADMIN_GROUP};
use lender_core::validation::PhoneRules;
use lender_core::LenderService;
use lender_server::middleware::jwt::JwtConfig;
use lender_server::router::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Test JWT helpers ───────────────────────────────────────────

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

const ADMIN: i32 = 1;
const OFFICER: i32 = 20;
const OFFICER_GROUP: i32 = 4;

fn make_jwt(uid: i32, scope: &str) -> String {
    let claims = JwtClaims {
        uid,
        scope: vec![scope.to_string()],
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("failed to encode test JWT")
}

// ── Test app builder ───────────────────────────────────────────

fn staff(uid: i32, group: i32, branch: i32) -> Principal {
    Principal {
        uid,
        name: format!("Staff {uid}"),
        email: format!("staff{uid}@lender.test"),
        user_group: group,
        branch,
        status: 1,
    }
}

fn customer(mobile: &str, branch: i32) -> Customer {
    Customer {
        uid: 0,
        customer_code: String::new(),
        full_name: format!("Customer {mobile}"),
        primary_mobile: mobile.into(),
        phone_number_provider: 1,
        enc_phone: String::new(),
        email_address: String::new(),
        physical_address: "Kisumu".into(),
        geolocation: String::new(),
        town: 0,
        passport_photo: String::new(),
        national_id: String::new(),
        gender: "F".into(),
        dob: None,
        added_by: ADMIN,
        current_agent: ADMIN,
        added_date: None,
        branch,
        primary_product: 1,
        loan_limit: 0.0,
        flag: 0,
        total_loans: 0,
        status: status::ACTIVE,
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_principal(staff(ADMIN, ADMIN_GROUP, 1));
    store.add_principal(staff(OFFICER, OFFICER_GROUP, 2));
    store.set_group_name(ADMIN_GROUP, "Administrators");
    store
}

fn app_with(service: LenderService) -> axum::Router {
    build_router(Arc::new(service), JwtConfig::from_secret(TEST_JWT_SECRET))
}

fn app(store: &Arc<MemoryStore>) -> axum::Router {
    app_with(LenderService::new(
        Stores::from_shared(store.clone()),
        PhoneRules::default(),
    ))
}

fn new_customer_body(mobile: &str) -> Value {
    json!({
        "fullName": "Achieng Otieno",
        "primaryMobile": mobile,
        "physicalAddress": "Kisumu, Milimani",
        "gender": "F",
        "branch": 2,
        "primaryProduct": 1
    })
}

// ── Helper to send requests ────────────────────────────────────

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }));
    (status, json)
}

// ── Authentication ─────────────────────────────────────────────

#[tokio::test]
async fn ping_needs_no_token() {
    let store = seeded_store();
    let (status, body) = send(app(&store), "GET", "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn missing_token_is_401() {
    let store = seeded_store();
    let (status, body) = send(app(&store), "GET", "/customers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn token_signed_with_other_secret_is_401() {
    let store = seeded_store();
    let claims = JwtClaims {
        uid: ADMIN,
        scope: vec![],
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let forged = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other")).unwrap();
    let (status, _) = send(app(&store), "GET", "/customers", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_user_is_401() {
    let store = seeded_store();
    let token = make_jwt(999, "current");
    let (status, _) = send(app(&store), "GET", "/users/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_echoes_principal() {
    let store = seeded_store();
    let token = make_jwt(ADMIN, "current");
    let (status, body) = send(app(&store), "GET", "/users/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["uid"], ADMIN);
    assert_eq!(body["user"]["isAdmin"], true);
    assert_eq!(body["user"]["userGroupName"], "Administrators");
}

// ── Customers ──────────────────────────────────────────────────

#[tokio::test]
async fn admin_creates_customer_then_duplicate_conflicts() {
    let store = seeded_store();
    let token = make_jwt(ADMIN, "current");

    let (status, body) = send(
        app(&store),
        "POST",
        "/customers",
        Some(&token),
        Some(new_customer_body("0712345678")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Customer created successfully");
    assert_eq!(body["customer"]["primaryMobile"], "254712345678");

    let (status, body) = send(
        app(&store),
        "POST",
        "/customers",
        Some(&token),
        Some(new_customer_body("254712345678")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "Customer with the same primary mobile already exists"
    );
    assert_eq!(store.customer_count(), 1);
    assert!(store.audit_events().is_empty());
}

#[tokio::test]
async fn officer_without_grant_cannot_create() {
    let store = seeded_store();
    let token = make_jwt(OFFICER, "current");
    let (status, body) = send(
        app(&store),
        "POST",
        "/customers",
        Some(&token),
        Some(new_customer_body("0712345678")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You don't have permission to create customer!");
    assert_eq!(store.customer_count(), 0);
}

#[tokio::test]
async fn invalid_body_lists_field_errors() {
    let store = seeded_store();
    let token = make_jwt(ADMIN, "current");
    let mut body = new_customer_body("0712345678");
    body["gender"] = json!("X");
    let (status, body) = send(app(&store), "POST", "/customers", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "gender");
}

#[tokio::test]
async fn update_writes_one_audit_event() {
    let store = seeded_store();
    let uid = store.add_customer(customer("254712345678", 2));
    let token = make_jwt(ADMIN, "current");

    let mut body = new_customer_body("254712345678");
    body["uid"] = json!(uid);
    body["fullName"] = json!("Achieng A. Otieno");
    let (status, resp) = send(app(&store), "PUT", "/customers", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["message"], "Customer updated successfully");

    let events = store.audit_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tbl, "o_customers");
    assert_eq!(events[0].fld, uid);
    assert!(events[0].event_details.contains("fullName changed from"));
}

#[tokio::test]
async fn officer_list_is_branch_scoped() {
    let store = seeded_store();
    store.add_customer(customer("254700000002", 2));
    store.add_customer(customer("254700000005", 5));
    let token = make_jwt(OFFICER, "current");

    let (status, body) = send(app(&store), "GET", "/customers", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["customers"][0]["primaryMobile"], "254700000002");
}

#[tokio::test]
async fn read_grant_lifts_branch_scope() {
    let store = seeded_store();
    store.add_customer(customer("254700000002", 2));
    store.add_customer(customer("254700000005", 5));
    store.add_grant(Grant {
        group_id: OFFICER_GROUP,
        tbl: "o_customers".into(),
        read: true,
        ..Default::default()
    });
    let token = make_jwt(OFFICER, "current");

    let (_, body) = send(app(&store), "GET", "/customers?branch=0", Some(&token), None).await;
    assert_eq!(body["count"], 2);

    let (_, body) = send(app(&store), "GET", "/customers?branch=5", Some(&token), None).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn unknown_order_by_is_400() {
    let store = seeded_store();
    let token = make_jwt(ADMIN, "current");
    let (status, _) = send(
        app(&store),
        "GET",
        "/customers?orderBy=password",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_filter_means_no_filter() {
    let store = seeded_store();
    store.add_customer(customer("254700000002", 2));
    store.add_customer(customer("254700000005", 5));
    let token = make_jwt(ADMIN, "current");

    let (status, body) = send(
        app(&store),
        "GET",
        "/customers?branch=abc&status=",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn huge_page_number_is_an_empty_page() {
    let store = seeded_store();
    store.add_customer(customer("254700000002", 2));
    let token = make_jwt(ADMIN, "current");

    let (status, body) = send(
        app(&store),
        "GET",
        "/customers?pageNo=9223372036854775807",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 1);
    assert_eq!(body["customers"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn customer_lookup_by_mobile_when_uid_is_zero() {
    let store = seeded_store();
    let uid = store.add_customer(customer("254711111111", 2));
    let token = make_jwt(ADMIN, "current");

    let (status, body) = send(
        app(&store),
        "GET",
        "/customers/0?primary_mobile=254711111111",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["uid"], uid);

    let (status, body) = send(app(&store), "GET", "/customers/0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bad Request");
}

#[tokio::test]
async fn hidden_customer_is_404_for_officer() {
    let store = seeded_store();
    let uid = store.add_customer(customer("254700000005", 5));
    let token = make_jwt(OFFICER, "current");
    let (status, body) = send(
        app(&store),
        "GET",
        &format!("/customers/{uid}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Customer not found");
}

// ── Referees and interactions ──────────────────────────────────

#[tokio::test]
async fn referee_lookup_rejects_bad_id() {
    let store = seeded_store();
    let token = make_jwt(ADMIN, "current");
    let (status, body) = send(app(&store), "GET", "/referees/0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid ID");
}

#[tokio::test]
async fn interactions_are_branch_scoped() {
    let store = seeded_store();
    let near = store.add_customer(customer("254700000002", 2));
    let far = store.add_customer(customer("254700000005", 5));
    store.add_conversation(near, "called, promised to pay", None);
    store.add_conversation(far, "no answer", None);
    let token = make_jwt(OFFICER, "current");

    let (status, body) = send(app(&store), "GET", "/interactions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["transcript"], "called, promised to pay");
}

// ── Archive routing ────────────────────────────────────────────

#[tokio::test]
async fn archive_scope_reads_archive_stores() {
    let current = seeded_store();
    current.add_customer(customer("254700000001", 1));
    let archive = seeded_store();
    archive.add_customer(customer("254700000009", 1));
    archive.add_customer(customer("254700000008", 1));

    let service = LenderService::new(Stores::from_shared(current.clone()), PhoneRules::default())
        .with_archive(Stores::from_shared(archive.clone()));
    let app = app_with(service);

    let (_, body) = send(
        app.clone(),
        "GET",
        "/customers",
        Some(&make_jwt(ADMIN, "current")),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);

    let (_, body) = send(
        app,
        "GET",
        "/customers",
        Some(&make_jwt(ADMIN, "archive")),
        None,
    )
    .await;
    assert_eq!(body["count"], 2);
}
