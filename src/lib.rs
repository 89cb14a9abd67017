pub mod error;
pub mod config;
pub mod canonical;
pub mod signing;
pub mod retry;
pub mod deadline;
pub mod request;
pub mod prompt;
pub mod gateway;
pub mod orchestrator;
pub mod server;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};
pub use config::AppConfig;
pub use gateway::{GatewayClient, ModelReply};
pub use orchestrator::Orchestrator;
pub use request::{QueryRequest, QueryResponse};

/*

vivogpt-gateway: a thin query service in front of the VivoGPT
(BlueLM) AI gateway. Every outbound call is signed with the gateway's
HMAC-SHA256 header scheme, retried at a fixed delay and bounded by a
per-request deadline.

src/
├── lib.rs          # Re-exports and the TaskKind enum
├── error.rs        # Error taxonomy
├── config.rs       # Gateway, retry, temperature and service settings
├── canonical.rs    # Canonical query string
├── signing.rs      # HMAC signature and auth headers
├── retry.rs        # Fixed-delay retry policy
├── deadline.rs     # Per-request wall-clock budget
├── request.rs      # Inbound request / response envelopes
├── prompt.rs       # Prompt templates per task
├── gateway.rs      # Signed POST to the model gateway
├── orchestrator.rs # Input selection, retry, deadline, envelope
├── server.rs       # axum routes
└── main.rs         # Binary entry point

*/

/// Kind of work the user asked for.
/// Selects the prompt template and the model temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind
{   /// Term / text translation between two languages
    Terminology
  , /// HS code classification of goods
    Classification
  , /// Customs valuation analysis
    Valuation
  , /// General customs consulting
    CustomsConsulting
}

impl TaskKind
{   /// All task kinds, in declaration order
    pub const ALL: [TaskKind; 4] = [
      TaskKind::Terminology
    , TaskKind::Classification
    , TaskKind::Valuation
    , TaskKind::CustomsConsulting
    ];

    /// Wire tag of this task kind
    pub fn as_str(&self) -> &'static str
    {   match self
        {   TaskKind::Terminology => "terminology"
          , TaskKind::Classification => "classification"
          , TaskKind::Valuation => "valuation"
          , TaskKind::CustomsConsulting => "customs-consulting"
        }
    }

    /// Translation tasks want deterministic output
    pub fn is_translation(&self) -> bool
    {   matches!(self, TaskKind::Terminology)
    }
}

impl std::fmt::Display for TaskKind
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self>
    {   TaskKind::ALL
          .iter()
          .copied()
          .find(|k| k.as_str() == s)
          .ok_or_else(|| Error::UnknownTaskType(s.to_string()))
    }
}
