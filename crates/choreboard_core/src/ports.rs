//! crates/choreboard_core/src/ports.rs
//!
//! Defines the service contract between the core and the ChoreBoard backend.
//! The bridge provides an HTTP implementation; tests provide in-memory fakes.

use async_trait::async_trait;
use crate::domain::{ArcadeSession, Chore, ChoreAction, ChoreLeaderboard, Completion, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Network failures, timeouts and 5xx responses. Worth retrying on the next poll.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// Credentials were refused even after minting a fresh token.
    #[error("Unauthorized")]
    Unauthorized,
    /// The backend refused a request (4xx other than 401/404).
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ChoreBoardService: Send + Sync {
    // --- Chores ---
    async fn outstanding_chores(&self) -> PortResult<Vec<Chore>>;

    async fn late_chores(&self) -> PortResult<Vec<Chore>>;

    // --- Users and history ---
    async fn users(&self) -> PortResult<Vec<User>>;

    async fn recent_completions(&self, limit: usize) -> PortResult<Vec<Completion>>;

    /// The site's name for points ("points", "stars", ...).
    async fn points_label(&self) -> PortResult<String>;

    // --- Arcade mode ---
    async fn chore_leaderboards(&self) -> PortResult<Vec<ChoreLeaderboard>>;

    /// The user's running arcade session, if any.
    async fn arcade_session(&self, user: &User) -> PortResult<Option<ArcadeSession>>;

    // --- Writes ---
    async fn perform(&self, action: &ChoreAction) -> PortResult<()>;
}
