// reqwest transport against a local mock server.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use scan_dispatch::{
    Dispatcher, EngineConfig, HttpRequest, HttpTransport, RequestError, ScanStopError,
    SendOptions, Transport, TransportErrorKind,
};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> HttpTransport {
    HttpTransport::new(&EngineConfig::default()).expect("clients build")
}

fn get_request(url: &str) -> HttpRequest {
    HttpRequest::new(Method::GET, Url::parse(url).unwrap())
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_success_returns_body_and_rtt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *"))
        .mount(&server)
        .await;

    let response = transport()
        .do_request(&get_request(&format!("{}/robots.txt", server.uri())), TIMEOUT)
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "User-agent: *");
    assert!(response.rtt() > Duration::ZERO);
}

#[tokio::test]
async fn test_request_headers_and_body_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .and(header("x-scanner", "1"))
        .respond_with(ResponseTemplate::new(302))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("x-scanner", "1".parse().unwrap());
    let request = HttpRequest::new(
        Method::POST,
        Url::parse(&format!("{}/login.php", server.uri())).unwrap(),
    )
    .with_headers(headers)
    .with_body("user=admin");

    let response = transport().do_request(&request, TIMEOUT).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_error_status_fails_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = transport()
        .do_request(&get_request(&server.uri()), TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.reason().as_deref(), Some("HTTP error status 503"));
}

#[tokio::test]
async fn test_unauthorized_fails_as_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = transport()
        .do_request(&get_request(&server.uri()), TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::AuthFailure);
}

#[tokio::test]
async fn test_error_status_is_a_response_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = transport()
        .error_for_status(false)
        .do_request(&get_request(&server.uri()), TIMEOUT)
        .await
        .expect("503 is an answer");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_proxy_authentication_is_always_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(407))
        .mount(&server)
        .await;

    let err = transport()
        .error_for_status(false)
        .do_request(&get_request(&server.uri()), TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::ProxyFailure);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = transport()
        .do_request(&get_request(&server.uri()), Duration::from_millis(200))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::Timeout);
    assert_eq!(err.reason().as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_closed_port_is_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = transport()
        .do_request(&get_request(&format!("http://127.0.0.1:{port}/")), TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::ConnectionRefused);
}

#[tokio::test]
async fn test_redirects_follow_option() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .mount(&server)
        .await;

    let transport = transport();
    let url = format!("{}/old", server.uri());

    let not_followed = transport
        .do_request(&get_request(&url), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(not_followed.status(), StatusCode::MOVED_PERMANENTLY);

    let follow = get_request(&url).with_options(SendOptions {
        follow_redirects: true,
        ..Default::default()
    });
    let followed = transport.do_request(&follow, TIMEOUT).await.unwrap();
    assert_eq!(followed.status(), StatusCode::OK);
    assert_eq!(followed.url().path(), "/new");
    assert_eq!(followed.text(), "moved here");
}

#[tokio::test]
async fn test_cacheable_get_is_answered_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/static/app.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("var a = 1;"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport();
    let request = get_request(&format!("{}/static/app.js", server.uri())).with_options(SendOptions {
        cache: true,
        ..Default::default()
    });

    let first = transport.do_request(&request, TIMEOUT).await.unwrap();
    let second = transport.do_request(&request, TIMEOUT).await.unwrap();

    assert!(!first.from_cache());
    assert!(second.from_cache());
    assert_eq!(second.text(), "var a = 1;");
}

#[tokio::test]
async fn test_uncached_requests_always_hit_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let transport = transport();
    let request = get_request(&server.uri());
    let first = transport.do_request(&request, TIMEOUT).await.unwrap();
    let second = transport.do_request(&request, TIMEOUT).await.unwrap();
    assert!(!first.from_cache() && !second.from_cache());
}

#[tokio::test]
async fn test_target_answering_only_errors_stops_the_scan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = EngineConfig {
        max_retries: 0,
        ..Default::default()
    };
    let transport = std::sync::Arc::new(HttpTransport::new(&config).unwrap());
    let dispatcher = Dispatcher::builder(config, transport).build().unwrap();

    let mut last = None;
    for i in 0..10 {
        let url = format!("{}/page{i}.php", server.uri());
        last = Some(
            dispatcher
                .get(&url, None, HeaderMap::new(), SendOptions::default())
                .await
                .unwrap_err(),
        );
    }

    // The tenth failure confirms the stop with a request to the site root
    let stop = last
        .as_ref()
        .and_then(RequestError::stop_error)
        .expect("scan must stop")
        .clone();
    match stop.as_ref() {
        ScanStopError::KnownReason { reason, .. } => {
            assert_eq!(reason, "HTTP error status 500");
        }
        other => panic!("expected KnownReason, got {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 11);
    assert_eq!(requests[10].url.path(), "/");

    let err = dispatcher
        .get(&server.uri(), None, HeaderMap::new(), SendOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_scan_fatal());
}
