use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;

/// Token bucket shared by every surface that calls the generator.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Option<Self> {
        if rps == 0 {
            return None;
        }
        Some(Self {
            rps,
            state: Arc::new(Mutex::new(State {
                tokens: rps as f64,
                last: Instant::now(),
            })),
        })
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("RATE_LIMIT_RPS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .and_then(Self::new)
    }

    pub fn rps(&self) -> u32 {
        self.rps
    }

    pub async fn check(&self) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last);
        state.last = now;

        let rps = self.rps as f64;
        state.tokens = (state.tokens + elapsed.as_secs_f64() * rps).min(rps);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }

        let wait = Duration::from_secs_f64((1.0 - state.tokens) / rps);
        Err(AppError::RateLimited(format!(
            "rate limit exceeded (RATE_LIMIT_RPS={}): try again in ~{}ms",
            self.rps,
            wait.as_millis()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables_limiting() {
        assert!(RateLimiter::new(0).is_none());
    }

    #[tokio::test]
    async fn burst_is_capped_at_rps() {
        let limiter = RateLimiter::new(2).expect("non-zero rps");
        assert!(limiter.check().await.is_ok());
        assert!(limiter.check().await.is_ok());
        assert!(matches!(
            limiter.check().await,
            Err(AppError::RateLimited(msg)) if msg.contains("RATE_LIMIT_RPS=2")
        ));
    }
}
