//! Per-request lifecycle.
//!
//! ```text
//! Received ─▶ Rendering ─▶ Writing ─▶ Archiving ─▶ Streaming ─▶ CleanedUp
//!                 │            │           │            │            ▲
//!                 └────────────┴─────┬─────┴────────────┘            │
//!                                    ▼                               │
//!                                 Failed ────────────────────────────┘
//! ```
//!
//! There is no retry edge: a request that reaches `Failed` is cleaned up and
//! reported once.

use crate::error::ConvertError;
use std::fmt;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Where a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Rendering,
    Writing,
    Archiving,
    Streaming,
    CleanedUp,
    Failed,
}

impl RequestPhase {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_advance_to(self, next: RequestPhase) -> bool {
        use RequestPhase::*;
        matches!(
            (self, next),
            (Received, Rendering)
                | (Rendering, Writing)
                | (Writing, Archiving)
                | (Archiving, Streaming)
                | (Streaming, CleanedUp)
                | (Rendering, Failed)
                | (Writing, Failed)
                | (Archiving, Failed)
                | (Streaming, Failed)
                | (Failed, CleanedUp)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == RequestPhase::CleanedUp
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestPhase::Received => "received",
            RequestPhase::Rendering => "rendering",
            RequestPhase::Writing => "writing",
            RequestPhase::Archiving => "archiving",
            RequestPhase::Streaming => "streaming",
            RequestPhase::CleanedUp => "cleaned-up",
            RequestPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Tracks and logs phase changes for one request.
#[derive(Debug)]
pub struct PhaseTracker {
    request_id: Uuid,
    phase: RequestPhase,
    entered_at: Instant,
}

impl PhaseTracker {
    pub fn new(request_id: Uuid) -> Self {
        debug!(%request_id, phase = %RequestPhase::Received, "request received");
        Self {
            request_id,
            phase: RequestPhase::Received,
            entered_at: Instant::now(),
        }
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Move to `next`, logging how long the previous phase took.
    pub fn advance(&mut self, next: RequestPhase) -> Result<(), ConvertError> {
        if !self.phase.can_advance_to(next) {
            return Err(ConvertError::Internal(format!(
                "illegal phase transition {} -> {} for request {}",
                self.phase, next, self.request_id
            )));
        }
        debug!(
            request_id = %self.request_id,
            from = %self.phase,
            to = %next,
            elapsed_ms = self.entered_at.elapsed().as_millis() as u64,
            "phase change"
        );
        self.phase = next;
        self.entered_at = Instant::now();
        Ok(())
    }

    /// Record a failure in the current phase. Phases that cannot fail
    /// (`Received`, `CleanedUp`, `Failed`) are left untouched.
    pub fn fail(&mut self) {
        if self.phase.can_advance_to(RequestPhase::Failed) {
            let _ = self.advance(RequestPhase::Failed);
        }
    }
}
