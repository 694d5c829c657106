//! Transport client against an in-process HTTP stub.
//!
//! Covers the interceptor pipeline (bearer token, 401 handling), the auth
//! calls and the typed resources.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bid_review_link::{
    BidLinkError, BidReviewClient, BidStatus, ChannelNavigator, Customer, LinkTimeouts,
    RegisterRequest, RequestInterceptor, ResponseInterceptor, ReviewCompletion, TokenPair,
    TokenStorage,
};
use common::{unreachable_base_url, FailingStore, StubHttpServer, StubResponse};
use serde_json::json;

fn client_for(
    base_url: &str,
    tokens: &TokenStorage,
) -> (BidReviewClient, tokio::sync::mpsc::UnboundedReceiver<String>) {
    let (navigator, routes) = ChannelNavigator::shared();
    let client = BidReviewClient::builder()
        .base_url(base_url)
        .timeouts(LinkTimeouts::fast())
        .token_storage(tokens.clone())
        .navigator(navigator)
        .build()
        .unwrap();
    (client, routes)
}

fn logged_in() -> TokenStorage {
    let tokens = TokenStorage::in_memory();
    tokens.save(&TokenPair::new("access-1", "refresh-1")).unwrap();
    tokens
}

#[tokio::test]
async fn test_bearer_header_attached_when_token_stored() {
    let server = StubHttpServer::fixed(StubResponse::json(200, json!([]))).await;
    let (client, _routes) = client_for(&server.base_url, &logged_in());

    let bids = client.bids().list().await.unwrap();
    assert!(bids.is_empty());

    let request = server.last_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/bids/");
    assert_eq!(request.header("authorization"), Some("Bearer access-1"));
    assert_eq!(request.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = StubHttpServer::fixed(StubResponse::json(200, json!([]))).await;
    let (client, _routes) = client_for(&server.base_url, &TokenStorage::in_memory());

    client.customers().list().await.unwrap();

    let request = server.last_request();
    assert_eq!(request.header("authorization"), None);
}

#[tokio::test]
async fn test_unauthorized_clears_tokens_and_redirects_once() {
    let server = StubHttpServer::fixed(StubResponse::json(
        401,
        json!({ "detail": "Given token not valid for any token type" }),
    ))
    .await;
    let tokens = logged_in();
    let (client, mut routes) = client_for(&server.base_url, &tokens);

    let err = client.bids().get("7").await.unwrap_err();

    match err {
        BidLinkError::ServerError { status_code, message } => {
            assert_eq!(status_code, 401);
            assert_eq!(message, "Given token not valid for any token type");
        },
        other => panic!("expected 401 server error, got {:?}", other),
    }
    assert_eq!(tokens.access_token().unwrap(), None);
    assert_eq!(tokens.refresh_token().unwrap(), None);
    assert!(!client.is_authenticated());

    assert_eq!(routes.try_recv().unwrap(), "/login");
    assert!(routes.try_recv().is_err(), "exactly one redirect expected");
}

#[tokio::test]
async fn test_unauthorized_on_write_requests_too() {
    let server = StubHttpServer::fixed(StubResponse::empty(401)).await;
    let tokens = logged_in();
    let (client, mut routes) = client_for(&server.base_url, &tokens);

    let err = client
        .customers()
        .patch("c1", &json!({ "name": "Renamed" }))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(tokens.load().unwrap(), None);
    assert_eq!(routes.try_recv().unwrap(), "/login");
    assert!(routes.try_recv().is_err());
}

#[tokio::test]
async fn test_other_statuses_have_no_side_effects() {
    for status in [400u16, 403, 404, 500] {
        let server =
            StubHttpServer::fixed(StubResponse::json(status, json!({ "error": "nope" }))).await;
        let tokens = logged_in();
        let (client, mut routes) = client_for(&server.base_url, &tokens);

        let err = client.bids().list().await.unwrap_err();

        assert_eq!(err.status_code(), Some(status));
        assert_eq!(tokens.access_token().unwrap().as_deref(), Some("access-1"));
        assert_eq!(tokens.refresh_token().unwrap().as_deref(), Some("refresh-1"));
        assert!(routes.try_recv().is_err(), "no redirect for {}", status);
    }
}

#[tokio::test]
async fn test_network_failure_has_no_side_effects() {
    let base_url = unreachable_base_url().await;
    let tokens = logged_in();
    let (client, mut routes) = client_for(&base_url, &tokens);

    let err = client.bids().list().await.unwrap_err();

    assert!(
        matches!(err, BidLinkError::NetworkError(_) | BidLinkError::TimeoutError(_)),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(err.status_code(), None);
    assert!(client.is_authenticated());
    assert!(routes.try_recv().is_err());
}

struct RejectAll;

impl RequestInterceptor for RejectAll {
    fn on_request(&self, _request: &mut reqwest::Request) -> bid_review_link::Result<()> {
        Err(BidLinkError::RequestError("blocked by policy".to_string()))
    }
}

#[tokio::test]
async fn test_request_interceptor_error_is_returned_unchanged() {
    let server = StubHttpServer::fixed(StubResponse::json(200, json!([]))).await;
    let client = BidReviewClient::builder()
        .base_url(&server.base_url)
        .request_interceptor(Arc::new(RejectAll))
        .build()
        .unwrap();

    let err = client.bids().list().await.unwrap_err();

    match err {
        BidLinkError::RequestError(message) => assert_eq!(message, "blocked by policy"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_unreadable_token_store_fails_before_sending() {
    let server = StubHttpServer::fixed(StubResponse::json(200, json!([]))).await;
    let (navigator, mut routes) = ChannelNavigator::shared();
    let client = BidReviewClient::builder()
        .base_url(&server.base_url)
        .token_store(Arc::new(FailingStore))
        .navigator(navigator)
        .build()
        .unwrap();

    let err = client.get_json::<serde_json::Value>("bids/").await.unwrap_err();

    assert!(matches!(err, BidLinkError::StorageError(_)), "got {:?}", err);
    assert!(server.requests().is_empty());
    assert!(routes.try_recv().is_err());
}

#[derive(Default)]
struct CountingInterceptor {
    ok: AtomicUsize,
    errors: Mutex<Vec<Option<u16>>>,
}

impl ResponseInterceptor for CountingInterceptor {
    fn on_response(&self, response: reqwest::Response) -> bid_review_link::Result<reqwest::Response> {
        self.ok.fetch_add(1, Ordering::SeqCst);
        Ok(response)
    }

    fn on_error(&self, error: BidLinkError) -> BidLinkError {
        self.errors.lock().unwrap().push(error.status_code());
        error
    }
}

#[tokio::test]
async fn test_custom_response_interceptor_sees_every_outcome() {
    let server = StubHttpServer::start(|request| {
        if request.path.ends_with("/missing/") {
            StubResponse::empty(404)
        } else {
            StubResponse::json(200, json!({ "id": "c1", "name": "Acme" }))
        }
    })
    .await;
    let counter = Arc::new(CountingInterceptor::default());
    let client = BidReviewClient::builder()
        .base_url(&server.base_url)
        .response_interceptor(counter.clone())
        .build()
        .unwrap();

    let customer = client.customers().get("c1").await.unwrap();
    assert_eq!(customer.name, "Acme");
    client.customers().get("missing").await.unwrap_err();

    assert_eq!(counter.ok.load(Ordering::SeqCst), 1);
    assert_eq!(*counter.errors.lock().unwrap(), vec![Some(404)]);
}

#[tokio::test]
async fn test_login_stores_token_pair() {
    let server = StubHttpServer::fixed(StubResponse::json(
        200,
        json!({
            "user": { "id": 1, "email": "alice@example.com", "role": "bid_manager" },
            "access": "new-access",
            "refresh": "new-refresh",
        }),
    ))
    .await;
    let tokens = TokenStorage::in_memory();
    let (client, _routes) = client_for(&server.base_url, &tokens);

    let response = client.login("alice@example.com", "secret").await.unwrap();

    assert_eq!(response.user.email, "alice@example.com");
    assert_eq!(
        tokens.load().unwrap(),
        Some(TokenPair::new("new-access", "new-refresh"))
    );
    let request = server.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/auth/login/");
    assert_eq!(
        request.json(),
        json!({ "email": "alice@example.com", "password": "secret" })
    );
    assert_eq!(request.header("authorization"), None);
}

#[tokio::test]
async fn test_register_posts_sign_up_without_storing_tokens() {
    let server = StubHttpServer::fixed(StubResponse::json(
        201,
        json!({
            "email": "bob@example.com",
            "username": "bob",
            "first_name": "Bob",
            "last_name": "Stone",
            "role": "reviewer",
            "business_unit": "Rail",
        }),
    ))
    .await;
    let tokens = TokenStorage::in_memory();
    let (client, _routes) = client_for(&server.base_url, &tokens);

    let request = RegisterRequest::new("bob@example.com", "bob", "s3cret!")
        .with_name("Bob", "Stone")
        .with_role("reviewer");
    let user = client.register(&request).await.unwrap();

    assert_eq!(user.username, "bob");
    assert_eq!(user.role.as_deref(), Some("reviewer"));
    assert_eq!(user.extra["business_unit"], "Rail");
    assert_eq!(tokens.load().unwrap(), None);

    let recorded = server.last_request();
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path, "/api/auth/register/");
    assert_eq!(
        recorded.json(),
        json!({
            "email": "bob@example.com",
            "username": "bob",
            "first_name": "Bob",
            "last_name": "Stone",
            "password": "s3cret!",
            "password2": "s3cret!",
            "role": "reviewer",
        })
    );
}

#[tokio::test]
async fn test_login_rejected_is_authentication_error() {
    let server = StubHttpServer::fixed(StubResponse::json(
        400,
        json!({ "detail": "Invalid credentials" }),
    ))
    .await;
    let (client, _routes) = client_for(&server.base_url, &TokenStorage::in_memory());

    let err = client.login("alice@example.com", "wrong").await.unwrap_err();
    match err {
        BidLinkError::AuthenticationError(message) => {
            assert!(message.contains("Invalid credentials"), "{}", message)
        },
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_refresh_updates_access_token() {
    let server = StubHttpServer::fixed(StubResponse::json(200, json!({ "access": "access-2" }))).await;
    let tokens = logged_in();
    let (client, _routes) = client_for(&server.base_url, &tokens);

    let access = client.refresh_access_token().await.unwrap();

    assert_eq!(access, "access-2");
    assert_eq!(tokens.access_token().unwrap().as_deref(), Some("access-2"));
    assert_eq!(tokens.refresh_token().unwrap().as_deref(), Some("refresh-1"));
    let request = server.last_request();
    assert_eq!(request.path, "/api/auth/token/refresh/");
    assert_eq!(request.json(), json!({ "refresh": "refresh-1" }));
}

#[tokio::test]
async fn test_refresh_without_refresh_token_fails_locally() {
    let server = StubHttpServer::fixed(StubResponse::json(200, json!({}))).await;
    let (client, _routes) = client_for(&server.base_url, &TokenStorage::in_memory());

    let err = client.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, BidLinkError::AuthenticationError(_)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_logout_clears_tokens_even_if_server_fails() {
    let server = StubHttpServer::fixed(StubResponse::empty(500)).await;
    let tokens = logged_in();
    let (client, mut routes) = client_for(&server.base_url, &tokens);

    client.logout().await.unwrap();

    assert_eq!(tokens.load().unwrap(), None);
    assert!(routes.try_recv().is_err());
    let request = server.last_request();
    assert_eq!(request.path, "/api/auth/logout/");
    assert_eq!(request.json(), json!({ "refresh": "refresh-1" }));
}

#[tokio::test]
async fn test_list_accepts_paginated_envelope() {
    let server = StubHttpServer::fixed(StubResponse::json(
        200,
        json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [
                { "id": "b2", "code": "B-2", "title": "Second", "status": "under_review" },
                { "id": "b1", "code": "B-1", "title": "First", "status": "won" },
            ],
        }),
    ))
    .await;
    let (client, _routes) = client_for(&server.base_url, &logged_in());

    let bids = client.bids().list_filtered(&[("status", "under_review")]).await.unwrap();

    assert_eq!(bids.len(), 2);
    assert_eq!(bids[0].status, BidStatus::UnderReview);
    assert_eq!(bids[1].status, BidStatus::Won);
    assert_eq!(server.last_request().path, "/api/bids/?status=under_review");
}

#[tokio::test]
async fn test_create_and_delete_customer() {
    let server = StubHttpServer::start(|request| match request.method.as_str() {
        "POST" => StubResponse::json(201, json!({ "id": 9, "name": "Initech" })),
        "DELETE" => StubResponse::empty(204),
        _ => StubResponse::empty(405),
    })
    .await;
    let (client, _routes) = client_for(&server.base_url, &logged_in());

    let created: Customer = client
        .customers()
        .create(&json!({ "name": "Initech" }))
        .await
        .unwrap();
    assert_eq!(created.id, "9");

    client.customers().delete(&created.id).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/api/bids/customers/");
    assert_eq!(requests[0].json(), json!({ "name": "Initech" }));
    assert_eq!(requests[1].method, "DELETE");
    assert_eq!(requests[1].path, "/api/bids/customers/9/");
}

#[tokio::test]
async fn test_complete_review_posts_decision() {
    let server = StubHttpServer::fixed(StubResponse::json(
        200,
        json!({ "message": "Review completed successfully" }),
    ))
    .await;
    let (client, _routes) = client_for(&server.base_url, &logged_in());

    let completion = ReviewCompletion::new("approved")
        .with_comments("Pricing checked")
        .with_score(8);
    let ack = client.reviews().complete("12", &completion).await.unwrap();

    assert_eq!(ack.message, "Review completed successfully");
    let request = server.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/bids/reviews/12/complete/");
    assert_eq!(request.header("authorization"), Some("Bearer access-1"));
    assert_eq!(
        request.json(),
        json!({ "decision": "approved", "comments": "Pricing checked", "score": 8 })
    );
}

#[tokio::test]
async fn test_complete_review_without_decision_is_rejected() {
    let server = StubHttpServer::fixed(StubResponse::json(
        400,
        json!({ "error": "Decision is required" }),
    ))
    .await;
    let (client, _routes) = client_for(&server.base_url, &logged_in());

    let err = client
        .reviews()
        .complete("12", &ReviewCompletion::new(""))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("Decision is required"), "{}", err);
}

#[tokio::test]
async fn test_dashboard_aggregates() {
    let server = StubHttpServer::fixed(StubResponse::json(
        200,
        json!({
            "overview": {
                "total_bids": 12,
                "active_bids": 5,
                "urgent_bids": 2,
                "overdue_bids": 1,
                "total_value": 1250000.5,
                "avg_win_probability": 42.5,
            },
            "distributions": {
                "status": { "draft": 3, "submitted": 2 },
                "priority": { "high": 4 },
            },
            "insights": {
                "top_customers": [
                    { "customer__name": "Acme", "total_value": 900000.0, "bid_count": 3 },
                ],
                "upcoming_deadlines": [],
            },
        }),
    ))
    .await;
    let (client, _routes) = client_for(&server.base_url, &logged_in());

    let dashboard = client.dashboard().await.unwrap();

    assert_eq!(server.last_request().method, "GET");
    assert_eq!(server.last_request().path, "/api/bids/dashboard/");
    assert_eq!(dashboard.overview.total_bids, 12);
    assert_eq!(dashboard.overview.overdue_bids, 1);
    assert_eq!(dashboard.overview.total_value, 1250000.5);
    assert_eq!(dashboard.distributions.status.get("draft"), Some(&3));
    assert_eq!(dashboard.distributions.priority.get("high"), Some(&4));
    assert_eq!(dashboard.insights.top_customers[0]["customer__name"], "Acme");
    assert!(dashboard.insights.upcoming_deadlines.is_empty());
}
