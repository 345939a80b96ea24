//! Error types for host operations

use stashbuff_types::BuffId;
use thiserror::Error;

use super::SignalSource;

/// Failures reported by the host. None of these are fatal to the engine;
/// the affected operation is abandoned and bookkeeping stays consistent.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("player is not available")]
    NoPlayer,

    #[error("buff {0} is not applied")]
    BuffNotApplied(BuffId),

    #[error("host rejected buff {id}: {reason}")]
    Rejected { id: BuffId, reason: String },

    #[error("duration fields are not available on buff {0}")]
    DurationFieldsMissing(BuffId),

    #[error("cannot subscribe to {0:?}: object no longer exists")]
    StaleSource(SignalSource),

    #[error("unknown {kind} {id}")]
    UnknownHandle { kind: &'static str, id: u64 },
}
