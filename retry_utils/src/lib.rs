use config_manager::RetrySettings;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Classification of a failed external call for the retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableError {
    /// 429 Too Many Requests - retry with longer delays
    RateLimit,
    /// 5xx Server Error - retry with medium delays
    ServerError,
    /// Request timed out - retry with shorter delays
    Timeout,
    /// Anything else (4xx, decode errors, ...) - don't retry
    Other,
}

impl RetryableError {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => RetryableError::RateLimit,
            500..=599 => RetryableError::ServerError,
            408 => RetryableError::Timeout,
            _ => RetryableError::Other,
        }
    }

    /// Classify a transport failure that produced no response
    pub fn from_transport(is_timeout: bool, is_connect: bool) -> Self {
        if is_timeout {
            RetryableError::Timeout
        } else if is_connect {
            RetryableError::ServerError
        } else {
            RetryableError::Other
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, RetryableError::Other)
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including initial attempt)
    pub max_attempts: u32,
    /// Delays for rate limit errors (milliseconds)
    pub rate_limit_delays_ms: Vec<u64>,
    /// Delays for server errors (milliseconds)
    pub server_error_delays_ms: Vec<u64>,
    /// Delays for timeout errors (milliseconds)
    pub timeout_delays_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&config_manager::SystemConfig::default().retry)
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            rate_limit_delays_ms: settings.rate_limit_delays_ms.clone(),
            server_error_delays_ms: settings.server_error_delays_ms.clone(),
            timeout_delays_ms: settings.timeout_delays_ms.clone(),
        }
    }
}

impl RetryConfig {
    /// No retries at all; the first failure is returned
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            rate_limit_delays_ms: Vec::new(),
            server_error_delays_ms: Vec::new(),
            timeout_delays_ms: Vec::new(),
        }
    }

    /// Same schedule with the attempt count capped by a client-specific limit
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = self.max_attempts.min(max_attempts);
        self
    }

    /// Delay before retry number `attempt` (0-indexed), if one is configured
    fn delay_for(&self, attempt: u32, error_type: RetryableError) -> Option<Duration> {
        let delays = match error_type {
            RetryableError::RateLimit => &self.rate_limit_delays_ms,
            RetryableError::ServerError => &self.server_error_delays_ms,
            RetryableError::Timeout => &self.timeout_delays_ms,
            RetryableError::Other => return None,
        };

        delays
            .get(attempt as usize)
            .map(|&delay_ms| Duration::from_millis(delay_ms))
    }
}

/// Retry an async operation, waiting the configured delay for the error class between attempts.
///
/// Non-retryable errors and errors after the last configured delay are returned as-is.
///
/// ```ignore
/// let events = retry_with_backoff(
///     || client.fetch_page(wallet),
///     &RetryConfig::default(),
///     |e| e.retry_class(),
/// ).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
    classify_error: impl Fn(&E) -> RetryableError,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        let e = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Request succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        let error_type = classify_error(&e);
        if !error_type.is_retryable() {
            debug!("Request failed with non-retryable error: {}", e);
            return Err(e);
        }

        if attempt >= config.max_attempts {
            error!(
                "Request failed after {} attempts (retries exhausted): {}",
                attempt + 1,
                e
            );
            return Err(e);
        }

        let Some(delay) = config.delay_for(attempt, error_type) else {
            error!("No {:?} delay configured for retry {}, giving up: {}", error_type, attempt, e);
            return Err(e);
        };

        warn!(
            "Request failed (attempt {}/{}, {:?}): {} - retrying in {}ms",
            attempt + 1,
            config.max_attempts + 1,
            error_type,
            e,
            delay.as_millis()
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug)]
    struct HttpFailure(u16);

    impl std::fmt::Display for HttpFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "HTTP {}", self.0)
        }
    }

    fn short_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            rate_limit_delays_ms: vec![1000, 2000, 4000],
            server_error_delays_ms: vec![100, 200, 300],
            timeout_delays_ms: vec![50],
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(RetryableError::from_status(429), RetryableError::RateLimit);
        assert_eq!(RetryableError::from_status(503), RetryableError::ServerError);
        assert_eq!(RetryableError::from_status(408), RetryableError::Timeout);
        assert_eq!(RetryableError::from_status(404), RetryableError::Other);
        assert_eq!(RetryableError::from_status(401), RetryableError::Other);
        assert_eq!(RetryableError::from_transport(true, false), RetryableError::Timeout);
        assert_eq!(RetryableError::from_transport(false, false), RetryableError::Other);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = config_manager::SystemConfig::default().retry;
        let config = RetryConfig::from(&settings).with_max_attempts(1);

        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.rate_limit_delays_ms, settings.rate_limit_delays_ms);
        assert_eq!(RetryConfig::disabled().delay_for(0, RetryableError::RateLimit), None);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(HttpFailure(404)) }
            },
            &short_config(),
            |e| RetryableError::from_status(e.0),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_recovers_after_backoff() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = retry_with_backoff(
            || {
                let previous = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if previous < 2 {
                        Err(HttpFailure(429))
                    } else {
                        Ok("page")
                    }
                }
            },
            &short_config(),
            |e| RetryableError::from_status(e.0),
        )
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms + 2000ms of rate limit backoff
        assert!(started.elapsed() >= std::time::Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_exhaust_retries() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(HttpFailure(502)) }
            },
            &short_config(),
            |e| RetryableError::from_status(e.0),
        )
        .await;

        assert!(result.is_err());
        // initial attempt + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_delay_schedule_ends_retries() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(HttpFailure(408)) }
            },
            &short_config(),
            |e| RetryableError::from_status(e.0),
        )
        .await;

        assert!(result.is_err());
        // only one timeout delay is configured
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
