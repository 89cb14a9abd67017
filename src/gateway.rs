//! Signed completion calls to the VivoGPT gateway

use std::time::Duration;

use log::{debug, error, trace};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical::{QueryParams, canonical_query_string};
use crate::config::{GatewayConfig, TemperatureConfig};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::signing::GatewaySigner;
use crate::TaskKind;

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest
{   pub model: String
  , pub prompt: String
  , pub session_id: String
  , pub extra: CompletionExtra
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionExtra
{   pub temperature: f32
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse
{   pub code: i64
  , #[serde(default)]
    pub msg: Option<String>
  , #[serde(default)]
    pub data: Option<CompletionData>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData
{   #[serde(default)]
    pub content: String
  , #[serde(default)]
    pub session_id: Option<String>
  , #[serde(default)]
    pub request_id: Option<String>
}

/// Successful model answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReply
{   pub content: String
  , pub session_id: Option<String>
  , pub request_id: Option<String>
}

// ===== Gateway Client =====

/// Client for the completion endpoint.
/// Holds no per-call state; one instance serves concurrent requests.
#[derive(Debug, Clone)]
pub struct GatewayClient
{   config: GatewayConfig
  , temperatures: TemperatureConfig
  , signer: GatewaySigner
  , http_client: reqwest::Client
}

impl GatewayClient
{   pub fn new(
      config: GatewayConfig
    , temperatures: TemperatureConfig
    ) -> Result<Self>
    {   debug!("Creating GatewayClient for {}", config.endpoint());
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.http_timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          Error::InvalidConfiguration(format!("http client: {}", e))
        })?;
        Ok(GatewayClient::with_http_client(config, temperatures, http_client))
    }

    pub fn with_http_client(
      config: GatewayConfig
    , temperatures: TemperatureConfig
    , http_client: reqwest::Client
    ) -> Self
    {   let signer = GatewaySigner::from_config(&config);
        GatewayClient
        {   config
          , temperatures
          , signer
          , http_client
        }
    }

    /// One completion in a fresh session
    pub async fn complete(
      &self
    , prompt: &str
    , task: TaskKind
    ) -> Result<ModelReply>
    {   self.complete_in_session(prompt, task, None).await
    }

    /// One completion, reusing `session_id` when given
    pub async fn complete_in_session(
      &self
    , prompt: &str
    , task: TaskKind
    , session_id: Option<&str>
    ) -> Result<ModelReply>
    {   self.send_completion(prompt, task, session_id, None).await
    }

    /// One signed completion call. With a deadline, the call is refused
    /// once it has expired and the buffered answer is dropped if it
    /// arrived too late.
    pub async fn send_completion(
      &self
    , prompt: &str
    , task: TaskKind
    , session_id: Option<&str>
    , deadline: Option<&Deadline>
    ) -> Result<ModelReply>
    {   let request_id = Uuid::new_v4().to_string();
        let session_id = session_id
          .map(str::to_string)
          .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut query = QueryParams::new();
        query.insert("requestId", &request_id);

        let mut headers = self.signer
          .sign_request("POST", &self.config.uri, &query)?
          .to_header_map()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let temperature = self.temperatures.for_task(task);
        let body = CompletionRequest
        {   model: self.config.model.clone()
          , prompt: prompt.to_string()
          , session_id: session_id.clone()
          , extra: CompletionExtra { temperature }
        };

        let url = format!(
          "{}?{}",
          self.config.endpoint(),
          canonical_query_string(Some(&query))
        );
        debug!(
          "Gateway call: url={} task={} temperature={} request_id={} session_id={} prompt_len={}",
          url, task, temperature, request_id, session_id, prompt.chars().count()
        );
        trace!("Gateway request body: {:?}", body);

        if let Some(d) = deadline
        {   d.check()?;
        }

        let response = self.http_client
          .post(&url)
          .headers(headers)
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::Transport(e.to_string())
          })?;

        let status = response.status();
        let raw = response.text().await.map_err(|e| {
          error!("Failed to read gateway body: {}", e);
          Error::Transport(e.to_string())
        })?;
        debug!("Gateway response status: {}", status);
        trace!("Gateway raw response: {}", raw);

        if let Some(d) = deadline
        {   d.check()?;
        }

        parse_completion(status.as_u16(), &raw)
    }
}

/// Classify a buffered gateway answer
pub fn parse_completion(status: u16, raw: &str) -> Result<ModelReply>
{   if !(200..300).contains(&status)
    {   error!("Gateway HTTP {}: {}", status, raw);
        return Err(Error::UpstreamHttp
        {   status
          , body: raw.to_string()
        });
    }

    let parsed: CompletionResponse = serde_json::from_str(raw).map_err(|e| {
      error!("Unparsable gateway body ({}): {}", e, raw);
      Error::UpstreamFormat
      {   reason: e.to_string()
        , body: raw.to_string()
      }
    })?;

    if parsed.code != 0
    {   let message = parsed.msg
          .filter(|m| !m.is_empty())
          .unwrap_or_else(|| "model call failed".to_string());
        error!("Gateway code {}: {}", parsed.code, message);
        return Err(Error::UpstreamLogical
        {   code: parsed.code
          , message
        });
    }

    let data = parsed.data.ok_or_else(|| {
      error!("Gateway success without data: {}", raw);
      Error::UpstreamFormat
      {   reason: "missing data object".to_string()
        , body: raw.to_string()
      }
    })?;

    Ok(ModelReply
    {   content: data.content
      , session_id: data.session_id
      , request_id: data.request_id
    })
}
