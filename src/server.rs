//! HTTP surface: `POST /api/query` and `GET /health`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info, warn};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::request::{QueryRequest, QueryResponse, ResponseData};

/// Largest accepted query body; file contents arrive inline
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Routes of the query service, callable from any origin
pub fn router(orchestrator: Arc<Orchestrator>) -> Router
{   let cors = CorsLayer::new()
      .allow_origin(Any)
      .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
      .allow_headers(Any);
    Router::new()
      .route("/api/query", post(query))
      .route("/health", get(health))
      .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
      .layer(cors)
      .with_state(orchestrator)
}

fn rejected(status: StatusCode, msg: &str) -> (StatusCode, Json<QueryResponse>)
{   let body = QueryResponse
    {   code: status.as_u16()
      , msg: msg.to_string()
      , data: ResponseData
        {   content: "please check the request and try again".to_string()
          , ..ResponseData::default()
        }
    };
    (status, Json(body))
}

async fn query(
  State(orchestrator): State<Arc<Orchestrator>>
, payload: std::result::Result<Json<QueryRequest>, JsonRejection>
) -> (StatusCode, Json<QueryResponse>)
{   let Json(request) = match payload
    {   Ok(p) => p
      , Err(rejection) => {
          warn!("Rejected query body: {}", rejection.body_text());
          return if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE
          {   rejected(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body exceeds the 10 MB limit"
              )
          } else
          {   rejected(StatusCode::BAD_REQUEST, "request body must be a JSON object")
          };
        }
    };
    debug!("Query received: type={:?}", request.task_type);

    let response = orchestrator.handle(request).await;
    let status = if response.is_success()
    {   StatusCode::OK
    } else
    {   StatusCode::from_u16(response.code)
          .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    };
    (status, Json(response))
}

async fn health() -> Json<Value>
{   Json(json!({
      "status": "ok",
      "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Validate `config`, bind and serve until Ctrl-C or SIGTERM
pub async fn serve(config: AppConfig) -> Result<()>
{   config.validate()?;
    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    let listener = tokio::net::TcpListener::bind(&config.service.bind_addr)
      .await
      .map_err(|e| {
        Error::InvalidConfiguration(
          format!("cannot bind {}: {}", config.service.bind_addr, e)
        )
      })?;
    info!(
      "Listening on {}, gateway {}",
      config.service.bind_addr, config.gateway.endpoint()
    );

    axum::serve(listener, router(orchestrator))
      .with_graceful_shutdown(shutdown_signal())
      .await
      .map_err(|e| Error::Transport(e.to_string()))?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal()
{   let ctrl_c = async {
      if let Err(e) = tokio::signal::ctrl_c().await
      {   warn!("Cannot listen for Ctrl-C: {}", e);
          std::future::pending::<()>().await;
      }
    };

    #[cfg(unix)]
    let terminate = async {
      match tokio::signal::unix::signal(
        tokio::signal::unix::SignalKind::terminate()
      )
      {   Ok(mut sig) => { sig.recv().await; }
        , Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
          }
      }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select!
    { _ = ctrl_c => info!("Received Ctrl-C")
    , _ = terminate => info!("Received SIGTERM")
    }
}
