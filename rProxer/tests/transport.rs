//! The HTTP pipeline over real sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rproxer::{ChallengeSolver, Error, ProxerClient, ProxerClientBuilder, Request};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHALLENGE_PAGE: &str = "<html><form id=\"challenge-form\"></form></html>";

struct CountingSolver {
    calls: Arc<AtomicUsize>,
    succeed: bool,
}

#[async_trait]
impl ChallengeSolver for CountingSolver {
    async fn solve(&self, page: &str, _url: &Url) -> rproxer::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(page.contains("challenge-form"));
        if self.succeed {
            Ok("jschl_vc=abc&jschl_answer=42".into())
        } else {
            Err(Error::parse("no challenge script").into())
        }
    }
}

fn builder(server: &MockServer) -> ProxerClientBuilder {
    ProxerClient::builder()
        .base_url(format!("{}/", server.uri()))
        .challenge_delay(Duration::ZERO)
}

fn solver(succeed: bool) -> (Arc<AtomicUsize>, Arc<dyn ChallengeSolver>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let solver = Arc::new(CountingSolver {
        calls: calls.clone(),
        succeed,
    });
    (calls, solver)
}

#[tokio::test]
async fn test_ok_body_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/info/53"))
        .and(query_param("format", "raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Tom &amp; Jerry\r\n"))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let body = client
        .send(Request::get("info/53").query("format", "raw"))
        .await
        .unwrap();
    assert_eq!(body, "Tom & Jerry");
}

#[tokio::test]
async fn test_api_key_and_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/messenger/setmessage"))
        .and(header("proxer-api-key", "secret"))
        .and(body_string_contains("conference_id=3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"error":0,"message":"ok","data":null}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server).api_key("secret").build().unwrap();
    client
        .send(
            Request::api_post("messenger/setmessage")
                .form("conference_id", 3)
                .form("text", "hi"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/info/entry"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"error":1,"message":"bad","data":null}"#),
        )
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let failure = client
        .send(Request::api_get("info/entry").query("id", 1))
        .await
        .unwrap_err();

    match failure.first() {
        Some(Error::Api { message, .. }) => assert_eq!(message, "bad"),
        other => panic!("unexpected cause: {other:?}"),
    }
}

#[tokio::test]
async fn test_challenge_with_solving_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string(CHALLENGE_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let (calls, solver) = solver(true);
    let client = builder(&server)
        .solve_challenges(false)
        .challenge_solver(solver)
        .build()
        .unwrap();

    let failure = client.send(Request::get("page")).await.unwrap_err();
    assert!(matches!(failure.first(), Some(Error::Challenge)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_challenge_with_failing_solver() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string(CHALLENGE_PAGE))
        .mount(&server)
        .await;

    let (calls, solver) = solver(false);
    let client = builder(&server).challenge_solver(solver).build().unwrap();

    let failure = client.send(Request::get("page")).await.unwrap_err();
    assert!(matches!(failure.first(), Some(Error::Challenge)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unanswerable_challenge_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(503).set_body_string(CHALLENGE_PAGE))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cdn-cgi/l/chk_jschl"))
        .and(query_param("jschl_answer", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&server)
        .await;

    let (calls, solver) = solver(true);
    let client = builder(&server)
        .challenge_solver(solver)
        .max_challenge_attempts(2)
        .build()
        .unwrap();

    let failure = client.send(Request::get("page")).await.unwrap_err();
    assert!(matches!(
        failure.first(),
        Some(Error::ChallengeRetriesExhausted { attempts: 2 })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let failure = client.send(Request::get("page")).await.unwrap_err();
    match failure.first() {
        Some(Error::WrongResponse { status, body }) => {
            assert_eq!(*status, Some(404));
            assert_eq!(body, "gone");
        }
        other => panic!("unexpected cause: {other:?}"),
    }
}
