//! Fixed-delay retry policy for gateway calls

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Retry policy for failed requests.
/// The pause between attempts is constant; there is no backoff and no
/// timeout of its own, an enclosing deadline has to cut it short.
#[derive(Debug, Clone)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub delay: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(max_attempts: usize, delay_ms: u64) -> Self
    {   RetryPolicy
        {   max_attempts
          , delay: Duration::from_millis(delay_ms)
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self
    {   RetryPolicy::new(config.max_attempts, config.delay_ms)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    /// Every failure is retried.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
      F: FnMut() -> Fut
    , Fut: Future<Output = Result<T>>
    {   self.run_while(op, |_| true).await
    }

    /// Like [`RetryPolicy::run`], but a failure for which `should_retry`
    /// returns false is handed back at once, unwrapped.
    pub async fn run_while<T, F, Fut, P>(
      &self
    , mut op: F
    , should_retry: P
    ) -> Result<T>
    where
      F: FnMut() -> Fut
    , Fut: Future<Output = Result<T>>
    , P: Fn(&Error) -> bool
    {   let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop
        {   attempt += 1;
            match op().await
            {   Ok(value) => {
                  if attempt > 1
                  {   debug!("Succeeded on attempt {}/{}", attempt, attempts);
                  }
                  return Ok(value);
                }
              , Err(e) => {
                  warn!(
                    "Attempt {}/{} failed: {}",
                    attempt, attempts, e
                  );
                  if !should_retry(&e)
                  {   debug!("Error is not retryable, giving up");
                      return Err(e);
                  }
                  if attempt >= attempts
                  {   return Err(Error::RetriesExhausted
                      {   attempts
                        , last: Box::new(e)
                      });
                  }
                  tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(3, 1000)
    }
}
