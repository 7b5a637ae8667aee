//! Per-request lifecycle.
//!
//! ```text
//! Received → GloballyProcessed → Validated → AuthChecked → Handled → Responded
//!                  │                 │            │           │
//!                  └─────────────────┴────────────┴───────────┴──→ Failed → Responded
//! ```
//!
//! States only move forward. Stages may skip ahead (a public route without
//! validators goes straight from `GloballyProcessed` to `Handled`), any
//! non-terminal state may fail or respond, and `Responded` is terminal.

use thiserror::Error;

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Accepted by the server; no stage has run yet.
    Received,
    /// Global middleware finished; dispatching to a route.
    GloballyProcessed,
    /// The route's validator chain passed.
    Validated,
    /// The Auth Gate allowed the request.
    AuthChecked,
    /// The controller resolved.
    Handled,
    /// A fault was raised and is being classified.
    Failed,
    /// A response has been written. Terminal.
    Responded,
}

impl RequestState {
    /// Position along the happy path.
    const fn rank(self) -> u8 {
        match self {
            Self::Received => 0,
            Self::GloballyProcessed => 1,
            Self::Validated => 2,
            Self::AuthChecked => 3,
            Self::Handled => 4,
            Self::Failed => 5,
            Self::Responded => 6,
        }
    }

    /// Returns true if `self → next` is a legal transition.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        match (self, next) {
            (Self::Responded, _) => false,
            (_, Self::Responded | Self::Failed) => !matches!(self, Self::Failed) || matches!(next, Self::Responded),
            (Self::Failed, _) => false,
            _ => next.rank() > self.rank(),
        }
    }

    /// Stable lowercase name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::GloballyProcessed => "globally_processed",
            Self::Validated => "validated",
            Self::AuthChecked => "auth_checked",
            Self::Handled => "handled",
            Self::Failed => "failed",
            Self::Responded => "responded",
        }
    }
}

/// An illegal lifecycle transition was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal request state transition {} -> {}", .from.name(), .to.name())]
pub struct InvalidTransition {
    /// State the request was in.
    pub from: RequestState,
    /// State that was requested.
    pub to: RequestState,
}
