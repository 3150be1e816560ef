//! Authentication decision engine.
//!
//! The engine runs the ordered policy pipeline for one login attempt:
//! exclusion list, cache lookup, group-membership check, remote
//! verification, cache registration. It owns the configured cache backend
//! and is constructed with its directory collaborator passed in; nothing is
//! resolved from process-wide state.

pub mod engine;
pub mod gate;

pub use engine::AuthDecisionEngine;
pub use gate::GroupMembershipGate;

/// Terminal outcome of one authentication attempt.
///
/// Consumed immediately by the host adapter and translated into the host's
/// own result vocabulary; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The credential was accepted.
    Success,
    /// Authentication or authorization was denied. The caller only learns
    /// of a generic failure; operator logs record the specific cause.
    Rejected,
    /// Not our concern; defer to the next authentication mechanism.
    Ignored,
    /// A collaborator misbehaved unexpectedly. Mapped to a rejection at the
    /// host boundary so an unexpected failure is never mistaken for success.
    ServiceError,
}
