//! Global budget for requests sent to the search backend.
//!
//! A sliding one-minute window of send timestamps. Only searches that would
//! actually hit the backend are counted.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded; retry after {retry_after_secs}s")]
    Exceeded { retry_after_secs: u64 },
}

impl RateLimitError {
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            RateLimitError::Exceeded { retry_after_secs } => *retry_after_secs,
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests_per_minute: u32,
    window: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests_per_minute,
            window: VecDeque::new(),
        }
    }

    pub fn try_acquire(&mut self) -> Result<(), RateLimitError> {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&mut self, now: Instant) -> Result<(), RateLimitError> {
        while let Some(&first) = self.window.front() {
            if now.duration_since(first) >= WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }

        if self.window.len() >= self.max_requests_per_minute as usize {
            let oldest = self.window.front().copied().unwrap_or(now);
            let remaining = WINDOW.saturating_sub(now.duration_since(oldest));
            return Err(RateLimitError::Exceeded {
                retry_after_secs: remaining.as_secs().saturating_add(1),
            });
        }

        self.window.push_back(now);
        Ok(())
    }
}
