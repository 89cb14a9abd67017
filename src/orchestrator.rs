//! From an inbound query to a response envelope: input selection,
//! prompt, retried gateway call, deadline

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::config::AppConfig;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::gateway::{GatewayClient, ModelReply};
use crate::prompt::{CustomsPromptBuilder, PromptBuilder};
use crate::request::{QueryRequest, QueryResponse};
use crate::retry::RetryPolicy;
use crate::TaskKind;

/// Handles one inbound query at a time per call; instances are shared
/// freely between concurrent requests.
#[derive(Clone)]
pub struct Orchestrator
{   gateway: GatewayClient
  , prompts: Arc<dyn PromptBuilder>
  , retry: RetryPolicy
  , deadline: Duration
  , default_source_lang: String
  , default_target_lang: String
}

impl Orchestrator
{   pub fn new(
      gateway: GatewayClient
    , retry: RetryPolicy
    , deadline: Duration
    ) -> Self
    {   Orchestrator
        {   gateway
          , prompts: Arc::new(CustomsPromptBuilder)
          , retry
          , deadline
          , default_source_lang: "zh".to_string()
          , default_target_lang: "en".to_string()
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self>
    {   let gateway = GatewayClient::new(
          config.gateway.clone(),
          config.temperatures.clone()
        )?;
        Ok(Orchestrator::new(
            gateway,
            RetryPolicy::from_config(&config.retry),
            Duration::from_millis(config.service.deadline_ms)
          )
          .with_default_languages(
            &config.service.default_source_lang,
            &config.service.default_target_lang
          ))
    }

    pub fn with_prompt_builder(
      mut self
    , prompts: impl PromptBuilder + 'static
    ) -> Self
    {   self.prompts = Arc::new(prompts);
        self
    }

    pub fn with_default_languages(mut self, source: &str, target: &str) -> Self
    {   self.default_source_lang = source.to_string();
        self.default_target_lang = target.to_string();
        self
    }

    /// Process `request` and fold the outcome into an envelope
    pub async fn handle(&self, request: QueryRequest) -> QueryResponse
    {   match self.process(request).await
        {   Ok(reply) => QueryResponse::success(reply)
          , Err(e) => QueryResponse::failure(&e)
        }
    }

    /// Process `request`, never running past the configured deadline
    pub async fn process(&self, request: QueryRequest) -> Result<ModelReply>
    {   let deadline = Deadline::after(self.deadline);
        let result = self.run(&request, &deadline).await;
        match &result
        {   Ok(reply) => {
              info!(
                "Request completed in {} ms ({} chars)",
                deadline.elapsed_ms(), reply.content.chars().count()
              );
            }
          , Err(e) if e.is_validation() => {
              warn!("Rejected request after {} ms: {}", deadline.elapsed_ms(), e);
            }
          , Err(e) => {
              error!("Request failed after {} ms: {}", deadline.elapsed_ms(), e);
            }
        }
        result
    }

    async fn run(
      &self
    , request: &QueryRequest
    , deadline: &Deadline
    ) -> Result<ModelReply>
    {   let task: TaskKind = request.task_type
          .as_deref()
          .filter(|t| !t.is_empty())
          .ok_or(Error::MissingType)?
          .parse()?;
        let text = request.input_text().ok_or(Error::MissingInput)?;
        let source = non_empty(&request.source_lang)
          .unwrap_or(self.default_source_lang.as_str());
        let target = non_empty(&request.target_lang)
          .unwrap_or(self.default_target_lang.as_str());

        info!(
          "Processing {} request ({} -> {}, {} chars)",
          task, source, target, text.chars().count()
        );
        let prompt = self.prompts.build(text, task, source, target);

        let gateway = &self.gateway;
        let prompt = prompt.as_str();
        let session = non_empty(&request.session_id);
        let attempt = move || async move {
          let reply = gateway
            .send_completion(prompt, task, session, Some(deadline))
            .await?;
          if reply.content.trim().is_empty()
          {   return Err(Error::UpstreamFormat
              {   reason: "empty content".to_string()
                , body: String::new()
              });
          }
          Ok(reply)
        };

        match tokio::time::timeout_at(
          deadline.expires_at(),
          self.retry.run_while(attempt, Error::is_retryable)
        ).await
        {   Ok(result) => result
          , Err(_) => Err(deadline.timeout_error())
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str>
{   field.as_deref().filter(|s| !s.is_empty())
}
