//! Configuration for the gateway client, retries and the query service

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::TaskKind;

pub const DEFAULT_DOMAIN: &str = "api-ai.vivo.com.cn";
pub const DEFAULT_URI: &str = "/vivogpt/completions";
pub const DEFAULT_MODEL: &str = "vivo-BlueLM-TB-Pro";

/// Credentials and endpoint of the AI gateway
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig
{   /// Gateway application id
    pub app_id: String
  , /// Gateway application secret, used as the HMAC key
    pub app_key: String
  , /// Host (and optional port) of the gateway
    pub domain: String
  , /// Path component of the completion endpoint
    pub uri: String
  , /// Model identifier sent in every request body
    pub model: String
  , /// `https` in production
    pub scheme: String
  , /// Per-call HTTP timeout in seconds, none by default
    pub http_timeout_secs: Option<u64>
}

impl GatewayConfig
{   /// Full URL of the completion endpoint, without query
    pub fn endpoint(&self) -> String
    {   format!("{}://{}{}", self.scheme, self.domain, self.uri)
    }

    fn redacted_key(&self) -> String
    {   if self.app_key.is_empty()
        {   return "<unset>".to_string();
        }
        let prefix: String = self.app_key.chars().take(4).collect();
        format!("{}...", prefix)
    }
}

impl Default for GatewayConfig
{   fn default() -> Self
    {   GatewayConfig
        {   app_id: String::new()
          , app_key: String::new()
          , domain: DEFAULT_DOMAIN.to_string()
          , uri: DEFAULT_URI.to_string()
          , model: DEFAULT_MODEL.to_string()
          , scheme: "https".to_string()
          , http_timeout_secs: None
        }
    }
}

impl fmt::Debug for GatewayConfig
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("GatewayConfig")
          .field("app_id", &self.app_id)
          .field("app_key", &self.redacted_key())
          .field("domain", &self.domain)
          .field("uri", &self.uri)
          .field("model", &self.model)
          .field("scheme", &self.scheme)
          .field("http_timeout_secs", &self.http_timeout_secs)
          .finish()
    }
}

/// Model temperature per task kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig
{   /// Used for translation tasks
    pub translation: f32
  , /// Used for everything else
    pub default: f32
  , /// Explicit per-task values, checked first
    pub overrides: HashMap<TaskKind, f32>
}

impl TemperatureConfig
{   pub fn for_task(&self, task: TaskKind) -> f32
    {   if let Some(t) = self.overrides.get(&task)
        {   return *t;
        }
        if task.is_translation()
        {   self.translation
        } else
        {   self.default
        }
    }
}

impl Default for TemperatureConfig
{   fn default() -> Self
    {   TemperatureConfig
        {   translation: 0.1
          , default: 0.9
          , overrides: HashMap::new()
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Total attempts, including the first one
    pub max_attempts: usize
  , /// Constant pause between attempts in milliseconds
    pub delay_ms: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: 3
          , delay_ms: 1000
        }
    }
}

/// Query service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig
{   /// Hard wall-clock budget per inbound request
    pub deadline_ms: u64
  , /// Listen address of the HTTP server
    pub bind_addr: String
  , pub default_source_lang: String
  , pub default_target_lang: String
}

impl Default for ServiceConfig
{   fn default() -> Self
    {   ServiceConfig
        {   deadline_ms: 60_000
          , bind_addr: "0.0.0.0:3003".to_string()
          , default_source_lang: "zh".to_string()
          , default_target_lang: "en".to_string()
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig
{   pub gateway: GatewayConfig
  , pub temperatures: TemperatureConfig
  , pub retry: RetryConfig
  , pub service: ServiceConfig
}

impl AppConfig
{   /// Build from process environment on top of the defaults
    pub fn from_env() -> Result<Self>
    {   Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
      F: Fn(&str) -> Option<String>
    {   let mut config = AppConfig::default();
        let gw = &mut config.gateway;

        if let Some(v) = lookup("VIVO_APP_ID") { gw.app_id = v; }
        if let Some(v) = lookup("VIVO_APP_KEY") { gw.app_key = v; }
        if let Some(v) = lookup("VIVO_DOMAIN") { gw.domain = v; }
        if let Some(v) = lookup("VIVO_URI") { gw.uri = v; }
        if let Some(v) = lookup("VIVO_MODEL") { gw.model = v; }
        if let Some(v) = lookup("VIVO_SCHEME") { gw.scheme = v; }
        if let Some(v) = lookup("VIVO_HTTP_TIMEOUT_SECS")
        {   gw.http_timeout_secs
              = Some(parse_var("VIVO_HTTP_TIMEOUT_SECS", &v)?);
        }

        if let Some(v) = lookup("GATEWAY_MAX_RETRIES")
        {   config.retry.max_attempts
              = parse_var("GATEWAY_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("GATEWAY_RETRY_DELAY_MS")
        {   config.retry.delay_ms
              = parse_var("GATEWAY_RETRY_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("REQUEST_DEADLINE_MS")
        {   config.service.deadline_ms
              = parse_var("REQUEST_DEADLINE_MS", &v)?;
        }
        if let Some(v) = lookup("PORT")
        {   let port: u16 = parse_var("PORT", &v)?;
            config.service.bind_addr = format!("0.0.0.0:{}", port);
        }

        debug!("Loaded configuration from environment: {:?}", config);
        Ok(config)
    }

    /// Load the whole structure from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self>
    {   let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
          Error::InvalidConfiguration(
            format!("cannot read {}: {}", path.display(), e)
          )
        })?;
        serde_json::from_str(&raw).map_err(|e| {
          Error::InvalidConfiguration(
            format!("cannot parse {}: {}", path.display(), e)
          )
        })
    }

    /// Reject settings that can never produce a valid signed call
    pub fn validate(&self) -> Result<()>
    {   let gw = &self.gateway;
        if gw.app_id.is_empty()
        {   return Err(Error::InvalidConfiguration(
              "gateway app id is empty".to_string()
            ));
        }
        if gw.app_key.is_empty()
        {   return Err(Error::InvalidConfiguration(
              "gateway app key is empty".to_string()
            ));
        }
        if gw.domain.is_empty()
        {   return Err(Error::InvalidConfiguration(
              "gateway domain is empty".to_string()
            ));
        }
        if !gw.uri.starts_with('/')
        {   return Err(Error::InvalidConfiguration(
              format!("gateway uri must be a path: {}", gw.uri)
            ));
        }
        if self.retry.max_attempts == 0
        {   return Err(Error::InvalidConfiguration(
              "max_attempts must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
{   value.trim().parse().map_err(|_| {
      Error::InvalidConfiguration(
        format!("{} is not a valid number: {}", name, value)
      )
    })
}
