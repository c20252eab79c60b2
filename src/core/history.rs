//! Back-navigation bookkeeping
//!
//! The stack itself is plain data. Loading views is left to the coordinator,
//! which peeks, restores, verifies and only then pops.

use std::time::{Duration, Instant};

use super::models::ListRow;
use super::snapshot::ViewSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
  Pushed,
  /// The top described the same view and was replaced, keeping the newer selection.
  Merged,
  /// Nothing was on screen worth returning to.
  Skipped,
}

#[derive(Default, Debug)]
pub struct NavigationHistory {
  stack: Vec<ViewSnapshot>,
}

impl NavigationHistory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_or_merge(&mut self, snapshot: ViewSnapshot) -> PushOutcome {
    if let Some(top) = self.stack.last_mut() {
      if top.is_same_view(&snapshot) {
        *top = snapshot;
        return PushOutcome::Merged;
      }
    }
    self.stack.push(snapshot);
    PushOutcome::Pushed
  }

  pub fn peek(&self) -> Option<&ViewSnapshot> {
    self.stack.last()
  }

  pub fn pop(&mut self) -> Option<ViewSnapshot> {
    self.stack.pop()
  }

  pub fn depth(&self) -> usize {
    self.stack.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stack.is_empty()
  }

  pub fn clear(&mut self) {
    self.stack.clear();
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackDecision {
  Proceed,
  /// Too soon after the previous back request.
  Debounced,
  /// Another back navigation is running; it will be retried when that one ends.
  Deferred,
}

/// Debounce plus single-flight for back requests.
#[derive(Debug)]
pub struct BackGate {
  min_interval: Duration,
  last_back: Option<Instant>,
  navigating: bool,
  pending: bool,
}

impl BackGate {
  pub fn new(min_interval: Duration) -> Self {
    Self {
      min_interval,
      last_back: None,
      navigating: false,
      pending: false,
    }
  }

  pub fn try_begin(&mut self, now: Instant, bypass_debounce: bool) -> BackDecision {
    if !bypass_debounce {
      if let Some(last) = self.last_back {
        if now.saturating_duration_since(last) < self.min_interval {
          return BackDecision::Debounced;
        }
      }
    }
    if self.navigating {
      self.pending = true;
      return BackDecision::Deferred;
    }
    self.last_back = Some(now);
    self.navigating = true;
    BackDecision::Proceed
  }

  /// Ends the running navigation. Returns whether a deferred request is waiting.
  pub fn finish(&mut self) -> bool {
    self.navigating = false;
    std::mem::take(&mut self.pending)
  }

  pub fn is_navigating(&self) -> bool {
    self.navigating
  }
}

/// Picks the row to focus after a restore: the saved position if it still
/// exists, else the row carrying the saved data index, else the nearest row.
pub fn resolve_selection(snapshot: &ViewSnapshot, rows: &[ListRow]) -> Option<usize> {
  if rows.is_empty() {
    return None;
  }
  if let Some(index) = snapshot.selected_index {
    if index < rows.len() {
      return Some(index);
    }
  }
  if let Some(data_index) = snapshot.selected_data_index {
    if let Some(position) = rows.iter().position(|row| row.data_index == data_index) {
      return Some(position);
    }
  }
  Some(snapshot.selected_index.unwrap_or(0).min(rows.len() - 1))
}
