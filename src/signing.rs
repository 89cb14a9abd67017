//! Gateway request signing.
//!
//! The gateway authenticates every call with five headers. The signature
//! header carries a base64 HMAC-SHA256, keyed by the app secret, over the
//! signing string:
//!
//! ```text
//! POST
//! /vivogpt/completions
//! requestId=6f1c...
//! 2025880184
//! 1718000000
//! x-ai-gateway-app-id:2025880184
//! x-ai-gateway-timestamp:1718000000
//! x-ai-gateway-nonce:k3j9a0zq
//! ```
//!
//! Nonce and timestamp are drawn fresh for every call. Any change to the
//! query or to one of the signed values means signing again.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use hmac::{Hmac, Mac};
use log::trace;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha2::Sha256;

use crate::canonical::{QueryParams, canonical_query_string};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_APP_ID: &str = "X-AI-GATEWAY-APP-ID";
pub const HEADER_TIMESTAMP: &str = "X-AI-GATEWAY-TIMESTAMP";
pub const HEADER_NONCE: &str = "X-AI-GATEWAY-NONCE";
pub const HEADER_SIGNED_HEADERS: &str = "X-AI-GATEWAY-SIGNED-HEADERS";
pub const HEADER_SIGNATURE: &str = "X-AI-GATEWAY-SIGNATURE";

/// Value of the signed-headers header, same order as the signing string
pub const SIGNED_HEADER_NAMES: &str
  = "x-ai-gateway-app-id;x-ai-gateway-timestamp;x-ai-gateway-nonce";

/// Nonces use lowercase letters and digits only
pub const NONCE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const NONCE_LEN: usize = 8;

/// Base64 HMAC-SHA256 of `signing_string` keyed by `secret`
pub fn sign(secret: &[u8], signing_string: &str) -> Result<String>
{   if secret.is_empty()
    {   return Err(Error::Signature("secret key is empty".to_string()));
    }
    let mut mac = HmacSha256::new_from_slice(secret)
      .map_err(|e| Error::Signature(e.to_string()))?;
    mac.update(signing_string.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Fresh 8-character nonce from the thread-local RNG
pub fn generate_nonce() -> String
{   let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
      .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
      .collect()
}

/// Current unix time in whole seconds; a clock set before the epoch
/// is refused rather than signed as zero
pub fn unix_timestamp() -> Result<String>
{   seconds_since_epoch(SystemTime::now()).map(|secs| secs.to_string())
}

fn seconds_since_epoch(at: SystemTime) -> Result<u64>
{   at.duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs())
      .map_err(|e| Error::Signature(format!("system clock before unix epoch: {}", e)))
}

/// The three `name:value` lines covered by the signature
pub fn signed_headers_string(
  app_id: &str
, timestamp: &str
, nonce: &str
) -> String
{   format!(
      "x-ai-gateway-app-id:{}\nx-ai-gateway-timestamp:{}\nx-ai-gateway-nonce:{}",
      app_id, timestamp, nonce
    )
}

/// Exact text whose HMAC becomes the signature
pub fn signing_string(
  method: &str
, uri: &str
, canonical_query: &str
, app_id: &str
, timestamp: &str
, nonce: &str
) -> String
{   [
      method.to_uppercase().as_str()
    , uri
    , canonical_query
    , app_id
    , timestamp
    , signed_headers_string(app_id, timestamp, nonce).as_str()
    ].join("\n")
}

/// The authentication header bundle of one outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders
{   pub app_id: String
  , pub timestamp: String
  , pub nonce: String
  , pub signed_headers: &'static str
  , pub signature: String
}

impl AuthHeaders
{   /// Header name / value pairs in wire order
    pub fn pairs(&self) -> [(&'static str, &str); 5]
    {   [
          (HEADER_APP_ID, self.app_id.as_str())
        , (HEADER_TIMESTAMP, self.timestamp.as_str())
        , (HEADER_NONCE, self.nonce.as_str())
        , (HEADER_SIGNED_HEADERS, self.signed_headers)
        , (HEADER_SIGNATURE, self.signature.as_str())
        ]
    }

    pub fn to_header_map(&self) -> Result<HeaderMap>
    {   let mut map = HeaderMap::with_capacity(6);
        for (name, value) in self.pairs()
        {   let value = HeaderValue::from_str(value).map_err(|_| {
              Error::InvalidConfiguration(
                format!("{} is not a valid header value", name)
              )
            })?;
            let name = HeaderName::from_bytes(name.as_bytes())
              .map_err(|e| Error::Signature(e.to_string()))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

/// Signs outbound requests for one gateway application
#[derive(Clone)]
pub struct GatewaySigner
{   app_id: String
  , app_key: Vec<u8>
}

impl GatewaySigner
{   pub fn new(app_id: impl Into<String>, app_key: impl AsRef<[u8]>) -> Self
    {   GatewaySigner
        {   app_id: app_id.into()
          , app_key: app_key.as_ref().to_vec()
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self
    {   GatewaySigner::new(config.app_id.clone(), config.app_key.as_bytes())
    }

    /// Sign a call now, with a fresh nonce
    pub fn sign_request(
      &self
    , method: &str
    , uri: &str
    , query: &QueryParams
    ) -> Result<AuthHeaders>
    {   self.sign_request_at(
          method,
          uri,
          query,
          &unix_timestamp()?,
          &generate_nonce()
        )
    }

    /// Sign a call with caller-chosen timestamp and nonce
    pub fn sign_request_at(
      &self
    , method: &str
    , uri: &str
    , query: &QueryParams
    , timestamp: &str
    , nonce: &str
    ) -> Result<AuthHeaders>
    {   if !uri.starts_with('/') || uri.contains('?')
        {   return Err(Error::InvalidConfiguration(
              format!("signing uri must be a bare path: {}", uri)
            ));
        }
        let canonical = canonical_query_string(Some(query));
        let to_sign = signing_string(
          method,
          uri,
          &canonical,
          &self.app_id,
          timestamp,
          nonce
        );
        trace!("Signing string:\n{}", to_sign);
        let signature = sign(&self.app_key, &to_sign)?;

        Ok(AuthHeaders
        {   app_id: self.app_id.clone()
          , timestamp: timestamp.to_string()
          , nonce: nonce.to_string()
          , signed_headers: SIGNED_HEADER_NAMES
          , signature
        })
    }
}

impl fmt::Debug for GatewaySigner
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("GatewaySigner")
          .field("app_id", &self.app_id)
          .field("app_key", &"<redacted>")
          .finish()
    }
}
