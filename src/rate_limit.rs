use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::{error::AppError, security};

/// In-memory sliding-window rate limiter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    max_attempts: usize,
    window: Duration,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, max_attempts: usize, window: Duration) -> Self {
        Self {
            name,
            max_attempts,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt for `key`, or return the seconds until one is allowed.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut map = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = map.entry(key.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < self.window);

        if entries.len() >= self.max_attempts {
            let oldest = entries.first().copied().unwrap_or(now);
            let elapsed = now.duration_since(oldest);
            let retry_after = self.window.saturating_sub(elapsed).as_secs();
            return Err(retry_after.max(1));
        }

        entries.push(now);
        Ok(())
    }

    /// Same as [`check`](Self::check), as a handler error.
    pub fn hit(&self, client: &str) -> Result<(), AppError> {
        self.check(client).map_err(|retry_after| {
            security::rate_limited(self.name, client);
            AppError::RateLimited { retry_after }
        })
    }

    /// Drop keys whose attempts have all left the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut map = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, entries| {
            entries.retain(|t| now.duration_since(*t) < self.window);
            !entries.is_empty()
        });
    }
}

/// Per-route limits for the public authentication endpoints.
#[derive(Debug)]
pub struct RateLimits {
    pub login: RateLimiter,
    pub register: RateLimiter,
    pub forgot_password: RateLimiter,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login: RateLimiter::new("login", 10, Duration::from_secs(60)),
            register: RateLimiter::new("register", 5, Duration::from_secs(3600)),
            forgot_password: RateLimiter::new("forgot_password", 3, Duration::from_secs(3600)),
        }
    }
}

impl RateLimits {
    pub fn cleanup(&self) {
        self.login.cleanup();
        self.register.cleanup();
        self.forgot_password.cleanup();
    }
}
