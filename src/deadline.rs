//! Wall-clock budget of one inbound request

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

/// Fixed point in time after which a request is abandoned.
/// Passed down the call chain and checked around every suspend point.
#[derive(Debug, Clone, Copy)]
pub struct Deadline
{   started: Instant
  , expires_at: Instant
}

impl Deadline
{   /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self
    {   let started = Instant::now();
        Deadline
        {   started
          , expires_at: started + budget
        }
    }

    pub fn expires_at(&self) -> Instant
    {   self.expires_at
    }

    pub fn elapsed(&self) -> Duration
    {   self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64
    {   self.elapsed().as_millis() as u64
    }

    pub fn remaining(&self) -> Duration
    {   self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool
    {   Instant::now() >= self.expires_at
    }

    /// `Err(Timeout)` once the deadline has passed
    pub fn check(&self) -> Result<()>
    {   if self.is_expired()
        {   Err(self.timeout_error())
        } else
        {   Ok(())
        }
    }

    pub fn timeout_error(&self) -> Error
    {   Error::Timeout
        {   elapsed_ms: self.elapsed_ms()
        }
    }
}
