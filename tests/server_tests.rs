use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use vivogpt_gateway::config::{GatewayConfig, TemperatureConfig};
use vivogpt_gateway::retry::RetryPolicy;
use vivogpt_gateway::server::{MAX_BODY_BYTES, router};
use vivogpt_gateway::{GatewayClient, Orchestrator};

fn app(server: &MockServer) -> axum::Router
{   let config = GatewayConfig
    {   app_id: "app".to_string()
      , app_key: "secret".to_string()
      , domain: server.uri().trim_start_matches("http://").to_string()
      , scheme: "http".to_string()
      , ..GatewayConfig::default()
    };
    let gateway = GatewayClient::new(config, TemperatureConfig::default()).unwrap();
    let orchestrator = Orchestrator::new(
      gateway,
      RetryPolicy::new(2, 10),
      Duration::from_secs(5)
    );
    router(Arc::new(orchestrator))
}

fn post_query(body: Value) -> Request<Body>
{   Request::builder()
      .method("POST")
      .uri("/api/query")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value
{   let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health()
{   let server = MockServer::start().await;
    let response = app(&server)
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_query_success()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({
          "code": 0,
          "data": { "content": "HS 7318.15", "sessionId": "s1", "requestId": "r1" }
        }))
      )
      .mount(&server)
      .await;

    let response = app(&server)
      .oneshot(post_query(json!({ "type": "classification", "message": "steel bolts" })))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["msg"], "success");
    assert_eq!(body["data"]["content"], "HS 7318.15");
    assert_eq!(body["data"]["sessionId"], "s1");
    assert_eq!(body["data"]["requestId"], "r1");
}

#[tokio::test]
async fn test_query_missing_type_is_400()
{   let server = MockServer::start().await;
    let response = app(&server)
      .oneshot(post_query(json!({ "message": "hello" })))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], 400);
    assert_eq!(body["msg"], "missing request type");
}

#[tokio::test]
async fn test_query_upstream_failure_is_500()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(500).set_body_string("stack trace here"))
      .expect(2)
      .mount(&server)
      .await;

    let response = app(&server)
      .oneshot(post_query(json!({ "type": "valuation", "text": "used car" })))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["code"], 500);
    assert!(!body["msg"].as_str().unwrap().contains("stack trace"));
}

#[tokio::test]
async fn test_query_rejects_non_json_body()
{   let server = MockServer::start().await;
    let request = Request::builder()
      .method("POST")
      .uri("/api/query")
      .body(Body::from("type=terminology"))
      .unwrap();
    let response = app(&server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], 400);
}

fn file_query(file_len: usize) -> Request<Body>
{   post_query(json!({ "type": "terminology", "file": "a".repeat(file_len) }))
}

#[tokio::test]
async fn test_query_accepts_bodies_past_two_megabytes()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({
          "code": 0,
          "data": { "content": "done" }
        }))
      )
      .expect(1)
      .mount(&server)
      .await;

    let response = app(&server)
      .oneshot(file_query(3 * 1024 * 1024))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["content"], "done");
}

#[tokio::test]
async fn test_query_over_limit_is_413()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let response = app(&server)
      .oneshot(file_query(MAX_BODY_BYTES + 1))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = read_json(response).await;
    assert_eq!(body["code"], 413);
    assert_ne!(body["msg"], "request body must be a JSON object");
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin()
{   let server = MockServer::start().await;
    let request = Request::builder()
      .method("OPTIONS")
      .uri("/api/query")
      .header(header::ORIGIN, "http://ui.example.com")
      .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
      .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
      .body(Body::empty())
      .unwrap();
    let response = app(&server).oneshot(request).await.unwrap();

    assert!(response.status().is_success(), "{}", response.status());
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"), "{}", methods);
}

#[tokio::test]
async fn test_cors_header_on_simple_request()
{   let server = MockServer::start().await;
    let request = Request::get("/health")
      .header(header::ORIGIN, "http://ui.example.com")
      .body(Body::empty())
      .unwrap();
    let response = app(&server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
