/// Resilience primitives shared by backend services
///
/// - **Retry**: bounded retries with fixed or exponential backoff
///
/// # Example: retry a batch once after one second
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::fixed(1, Duration::from_secs(1));
///
///     let result = with_retry(&config, |_attempt| async {
///         // Your fallible work here
///         Ok::<_, String>(())
///     })
///     .await;
/// }
/// ```

pub mod retry;

pub use retry::{with_retry, RetryConfig, RetryError};
