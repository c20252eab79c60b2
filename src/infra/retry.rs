use anyhow::Result;
use log::warn;
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

use super::api::with_cancel;
use crate::core::error::{is_bad_parameter_error, is_cancelled, ApiError};

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  /// Delay before the second attempt; grows linearly with each attempt.
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_millis(400),
    }
  }
}

/// Runs `op` until it succeeds, is cancelled, fails with a parameter error, or
/// runs out of attempts. The last error is returned.
pub async fn fetch_with_retry<T, F, Fut>(
  label: &str,
  policy: RetryPolicy,
  token: &CancellationToken,
  mut op: F,
) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt: u32 = 0;

  loop {
    attempt += 1;
    let err = match with_cancel(token, op()).await {
      Ok(value) => return Ok(value),
      Err(e) => e,
    };
    if is_cancelled(&err) || is_bad_parameter_error(&err) || attempt >= max_attempts {
      return Err(err);
    }

    warn!(
      "[Retry] {} failed (attempt {}/{}): {}",
      label, attempt, max_attempts, err
    );
    let delay = policy.base_delay * attempt;
    tokio::select! {
      _ = token.cancelled() => return Err(ApiError::Cancelled.into()),
      _ = tokio::time::sleep(delay) => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::anyhow;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn quick() -> RetryPolicy {
    RetryPolicy {
      max_attempts: 3,
      base_delay: Duration::from_millis(1),
    }
  }

  #[tokio::test]
  async fn test_retries_until_success() {
    let calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    let value = fetch_with_retry("flaky", quick(), &token, || async {
      if calls.fetch_add(1, Ordering::SeqCst) < 2 {
        Err(anyhow!("connection reset"))
      } else {
        Ok("done")
      }
    })
    .await
    .unwrap();
    assert_eq!(value, "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_gives_up_after_max_attempts() {
    let calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    let result: Result<()> = fetch_with_retry("broken", quick(), &token, || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(anyhow!("server error"))
    })
    .await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_bad_parameter_is_not_retried() {
    let calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    let result: Result<()> = fetch_with_retry("offset", quick(), &token, || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(ApiError::BadParameter("offset".into()).into())
    })
    .await;
    assert!(is_bad_parameter_error(&result.unwrap_err()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
