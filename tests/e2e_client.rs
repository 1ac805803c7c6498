//! E2E tests for the request pipeline and client-level operations

mod common;

use common::{API_KEY, MockFeedService};
use serde_json::json;
use stream_feeds::auth::{HTTP_DATE_FORMAT, Signer};
use stream_feeds::{Activity, Feed, FeedError, FeedId, FeedReadOptions, FollowRelation};

#[tokio::test]
async fn test_every_request_carries_standard_params_and_headers() {
    let server = MockFeedService::new().await;
    let feed = server.client().flat_feed("flat", "bob").unwrap();

    feed.activities(&FeedReadOptions::new().limit(5)).await.unwrap();

    let request = server.single_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/v1.0/feed/flat/bob/");
    assert_eq!(request.query.get("api_key").map(String::as_str), Some(API_KEY));
    assert_eq!(request.query.get("location").map(String::as_str), Some(server.addr.as_str()));
    assert_eq!(request.query.get("limit").map(String::as_str), Some("5"));

    assert_eq!(request.header("x-api-key"), Some(API_KEY));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert!(
        request
            .header("x-stream-client")
            .is_some_and(|client| client.starts_with("stream-feeds-rust-"))
    );
    let date = request.header("date").expect("date header");
    assert!(chrono::NaiveDateTime::parse_from_str(date, HTTP_DATE_FORMAT).is_ok());
}

#[tokio::test]
async fn test_get_requests_have_no_body() {
    let server = MockFeedService::new().await;
    let feed = server.client().flat_feed("flat", "bob").unwrap();

    feed.followers(10, 0).await.unwrap();

    let request = server.single_request();
    assert_eq!(request.method, "GET");
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_error_envelope_becomes_api_error() {
    let server = MockFeedService::new().await;
    server.respond(
        400,
        json!({
            "code": 4,
            "status_code": 400,
            "duration": "36ms",
            "detail": "activity is missing actor",
            "exception": "InputException",
            "exception_fields": {"actor": ["This field is required."]}
        }),
    );
    let feed = server.client().flat_feed("flat", "bob").unwrap();

    let error = feed
        .add_activity(&Activity::new("", "like", "cake"))
        .await
        .expect_err("service rejected the activity");

    match error {
        FeedError::Api(api) => {
            assert_eq!(api.code, 4);
            assert_eq!(api.status_code, 400);
            assert_eq!(api.duration, std::time::Duration::from_millis(36));
            assert_eq!(api.exception, "InputException");
            let fields = api.exception_fields.as_ref().unwrap();
            assert_eq!(fields["actor"], vec!["This field is required.".to_string()]);
            assert_eq!(
                api.to_string(),
                "InputException (36ms): activity is missing actor"
            );
        }
        other => panic!("expected api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_error_body_is_json_error() {
    let server = MockFeedService::new().await;
    server.respond_raw(502, "<html>bad gateway</html>");
    let feed = server.client().flat_feed("flat", "bob").unwrap();

    let error = feed.activities(&FeedReadOptions::new()).await.unwrap_err();
    assert!(matches!(error, FeedError::Json(_)), "got: {error:?}");
}

#[tokio::test]
async fn test_add_activity_to_many_uses_http_signature() {
    let server = MockFeedService::new().await;
    let client = server.client();
    let feeds = vec![FeedId::from("flat:bob"), FeedId::from("user:alice")];

    let activity = Activity::new("bob", "like", "cake").with_to([FeedId::from("user:carol")]);

    client.add_activity_to_many(&activity, &feeds).await.unwrap();

    let request = server.single_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/v1.0/feed/add_to_many/");
    assert!(request.header("stream-auth-type").is_none());

    let date = request.header("date").unwrap();
    let expected = Signer::new(API_KEY, common::API_SECRET)
        .http_signature(date)
        .unwrap();
    assert_eq!(request.header("authorization"), Some(expected.as_str()));

    let body = request.json();
    assert_eq!(body["feeds"], json!(["flat:bob", "user:alice"]));
    assert_eq!(body["activity"]["actor"], "bob");
    assert_eq!(body["activity"]["verb"], "like");

    let carol_token = Signer::new(API_KEY, common::API_SECRET)
        .generate_token("usercarol")
        .unwrap();
    assert_eq!(
        body["activity"]["to"],
        json!([format!("user:carol {carol_token}")])
    );
}

#[tokio::test]
async fn test_follow_many() {
    let server = MockFeedService::new().await;
    let client = server.client();
    let timeline = Feed::new("timeline", "alice").unwrap();
    let relations = vec![
        FollowRelation::new(&timeline, &Feed::new("user", "bob").unwrap()),
        FollowRelation::new(&timeline, &Feed::new("user", "carol").unwrap()),
    ];

    client.follow_many(&relations).await.unwrap();
    client
        .follow_many_with_copy_limit(&relations, 20)
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.path, "/api/v1.0/follow_many/");
        assert!(request.header("authorization").unwrap().starts_with("Signature "));
        assert_eq!(
            request.json(),
            json!([
                {"source": "timeline:alice", "target": "user:bob"},
                {"source": "timeline:alice", "target": "user:carol"}
            ])
        );
    }
    assert!(!requests[0].query.contains_key("activity_copy_limit"));
    assert_eq!(
        requests[1].query.get("activity_copy_limit").map(String::as_str),
        Some("20")
    );
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Bind and drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = stream_feeds::Client::new(
        stream_feeds::ClientConfig::new(API_KEY, common::API_SECRET)
            .with_location(format!("http://{addr}")),
    )
    .unwrap();
    let feed = client.flat_feed("flat", "bob").unwrap();

    let error = feed.activities(&FeedReadOptions::new()).await.unwrap_err();
    assert!(matches!(error, FeedError::Transport(_)), "got: {error:?}");
}
