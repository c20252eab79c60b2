//! Error kinds the core needs to tell apart
//!
//! Everything else travels as a plain `anyhow::Error`.

use std::{error, fmt};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiError {
  /// Upstream rejected a request parameter, usually an offset past the servable range.
  BadParameter(String),
  NotLoggedIn,
  Cancelled,
  NotFound(String),
  Upstream(String),
}

impl error::Error for ApiError {}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::BadParameter(detail) => write!(f, "Bad parameter: {}", detail),
      Self::NotLoggedIn => write!(f, "Not logged in"),
      Self::Cancelled => write!(f, "Cancelled"),
      Self::NotFound(what) => write!(f, "Not found: {}", what),
      Self::Upstream(detail) => write!(f, "Upstream error: {}", detail),
    }
  }
}

/// Upstream sometimes reports a bad parameter only through the message text.
const BAD_PARAMETER_MARKERS: [&str; 3] = ["bad parameter", "invalid parameter", "参数错误"];

pub fn is_bad_parameter_error(e: &anyhow::Error) -> bool {
  if let Some(ApiError::BadParameter(_)) = e.downcast_ref::<ApiError>() {
    return true;
  }
  let message = e.to_string().to_lowercase();
  BAD_PARAMETER_MARKERS
    .iter()
    .any(|marker| message.contains(marker))
}

pub fn is_cancelled(e: &anyhow::Error) -> bool {
  matches!(e.downcast_ref::<ApiError>(), Some(ApiError::Cancelled))
}

pub fn is_not_logged_in(e: &anyhow::Error) -> bool {
  matches!(e.downcast_ref::<ApiError>(), Some(ApiError::NotLoggedIn))
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::anyhow;

  #[test]
  fn test_bad_parameter_detection() {
    let typed: anyhow::Error = ApiError::BadParameter("offset".into()).into();
    assert!(is_bad_parameter_error(&typed));
    assert!(is_bad_parameter_error(&anyhow!("code 400: 参数错误")));
    assert!(is_bad_parameter_error(&anyhow!("Invalid Parameter offset")));
    assert!(!is_bad_parameter_error(&anyhow!("connection reset")));
    assert!(!is_bad_parameter_error(&ApiError::Cancelled.into()));
  }

  #[test]
  fn test_cancelled_detection_survives_context() {
    let err = anyhow::Error::from(ApiError::Cancelled).context("loading album 7");
    assert!(is_cancelled(&err));
    assert!(!is_not_logged_in(&err));
  }
}
