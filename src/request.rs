//! Inbound request and response envelopes of the query endpoint

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::gateway::ModelReply;

/// Body of `POST /api/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest
{   /// Task tag, e.g. `terminology`
    #[serde(rename = "type")]
    pub task_type: Option<String>
  , /// Chat message typed by the user
    pub message: Option<String>
  , /// Decoded text of an uploaded file
    pub file: Option<String>
  , /// Plain text field used by older clients
    pub text: Option<String>
  , pub source_lang: Option<String>
  , pub target_lang: Option<String>
  , /// Session returned by an earlier reply, to continue a conversation
    pub session_id: Option<String>
}

impl QueryRequest
{   /// Input text: message, then file, then text. Empty strings
    /// count as absent.
    pub fn input_text(&self) -> Option<&str>
    {   [&self.message, &self.file, &self.text]
          .into_iter()
          .filter_map(|field| field.as_deref())
          .find(|s| !s.is_empty())
    }
}

/// Payload of a query response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData
{   pub content: String
  , pub session_id: Option<String>
  , pub request_id: Option<String>
}

/// Envelope returned by `POST /api/query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse
{   /// 0 on success, the HTTP status otherwise
    pub code: u16
  , pub msg: String
  , pub data: ResponseData
}

impl QueryResponse
{   pub fn success(reply: ModelReply) -> Self
    {   QueryResponse
        {   code: 0
          , msg: "success".to_string()
          , data: ResponseData
            {   content: reply.content
              , session_id: reply.session_id
              , request_id: reply.request_id
            }
        }
    }

    /// Failure envelope; only the user-facing message of `error`
    /// is exposed
    pub fn failure(error: &Error) -> Self
    {   let code = error.status_code();
        let content = match code
        {   400 => "please check the request and try again"
          , 504 => "the request timed out, please try again later"
          , _ => "an error occurred while processing the request"
        };
        QueryResponse
        {   code
          , msg: error.user_message()
          , data: ResponseData
            {   content: content.to_string()
              , session_id: None
              , request_id: None
            }
        }
    }

    pub fn is_success(&self) -> bool
    {   self.code == 0
    }
}
