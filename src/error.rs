//! Error type shared by the signer, the gateway client and the
//! orchestrator

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error type for gateway operations
/// Implements Clone so a failure can be logged and still returned
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error
{   /// Inbound request carried no `type` tag
    #[error("missing request type")]
    MissingType
  , /// Inbound `type` tag names no known task
    #[error("unknown request type: {0}")]
    UnknownTaskType(String)
  , /// No message, file or text could be resolved
    #[error("please provide input text or a file")]
    MissingInput
  , /// HMAC computation failed (misconfigured secret)
    #[error("signature error: {0}")]
    Signature(String)
  , /// Gateway answered with a non-2xx status
    #[error("gateway returned HTTP {status}")]
    UpstreamHttp
    {   status: u16
      , body: String
    }
  , /// Gateway body could not be parsed
    #[error("gateway response could not be parsed: {reason}")]
    UpstreamFormat
    {   reason: String
      , body: String
    }
  , /// Gateway parsed fine but reported `code != 0`
    #[error("gateway error {code}: {message}")]
    UpstreamLogical
    {   code: i64
      , message: String
    }
  , /// Connection or IO failure while talking to the gateway
    #[error("transport error: {0}")]
    Transport(String)
  , /// Orchestrator deadline elapsed
    #[error("request timed out after {elapsed_ms} ms")]
    Timeout
    {   elapsed_ms: u64
    }
  , /// Every attempt failed; carries the last failure
    #[error("operation failed after {attempts} attempts: {last}")]
    RetriesExhausted
    {   attempts: usize
      , last: Box<Error>
    }
  , /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String)
}

impl Error
{   /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool
    {   matches!(
          self,
          Error::UpstreamHttp { .. }
            | Error::UpstreamFormat { .. }
            | Error::UpstreamLogical { .. }
            | Error::Transport(_)
        )
    }

    /// Validation failures are the caller's fault
    pub fn is_validation(&self) -> bool
    {   matches!(
          self,
          Error::MissingType
            | Error::UnknownTaskType(_)
            | Error::MissingInput
        )
    }

    /// The failure at the bottom of a retry chain
    pub fn innermost(&self) -> &Error
    {   match self
        {   Error::RetriesExhausted { last, .. } => last.innermost()
          , other => other
        }
    }

    /// Message safe to show a user: no raw upstream bodies, no
    /// transport internals
    pub fn user_message(&self) -> String
    {   match self.innermost()
        {   Error::UpstreamHttp { status, .. } => {
              format!("model service returned HTTP {}", status)
            }
          , Error::UpstreamFormat { .. } => {
              "model service returned an unreadable response".to_string()
            }
          , Error::UpstreamLogical { message, .. } => {
              if message.is_empty()
              {   "model call failed".to_string()
              } else
              {   message.clone()
              }
            }
          , Error::Transport(_) => {
              "model service is unreachable".to_string()
            }
          , Error::Timeout { .. } => "request timed out".to_string()
          , Error::Signature(_) | Error::InvalidConfiguration(_) => {
              "model service is misconfigured".to_string()
            }
          , other => other.to_string()
        }
    }

    /// Inbound HTTP status for this failure
    pub fn status_code(&self) -> u16
    {   match self.innermost()
        {   e if e.is_validation() => 400
          , Error::Timeout { .. } => 504
          , _ => 500
        }
    }
}
