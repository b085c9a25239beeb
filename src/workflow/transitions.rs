//! The appeal status transition table.
//!
//! Every status change, from either side of the workflow, is answered here
//! and nowhere else: handlers ask `allowed_targets` whether a move is
//! legal and `stored_status` what actually lands in the status column.

use crate::orm::appeals::AppealStatus;

/// Which side of the workflow an actor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorTier {
    /// Staff of the appeal's assigned organization
    Organization,
    /// Higher-authority staff (admin/ceo)
    Authority,
}

/// Statuses from which no further transition is accepted.
pub fn is_terminal(status: AppealStatus) -> bool {
    matches!(status, AppealStatus::SuccessDone | AppealStatus::TextDone)
}

/// The successor set for a status, per actor tier. An empty slice means the
/// tier has no legal move from that status.
pub fn allowed_targets(current: AppealStatus, tier: ActorTier) -> &'static [AppealStatus] {
    use AppealStatus::*;

    match (current, tier) {
        (Waiting, ActorTier::Organization) => &[InProgress, Decline],
        (Waiting, ActorTier::Authority) => &[Archive],

        (Decline, ActorTier::Organization) => &[InProgress],
        (Decline, ActorTier::Authority) => &[Archive, InProgress],

        (InProgress, ActorTier::Organization) => &[TimeRequest, Confirm50, Confirm],

        // Waiting on the authority's extension verdict, but the organization
        // may still finish the work instead.
        (TimeRequest, ActorTier::Organization) => &[Confirm50, Confirm],
        (TimeRequest, ActorTier::Authority) => &[TimeExtended, TimeDenied],

        (Confirm | Confirm50, ActorTier::Authority) => {
            &[Success50, SuccessDone, TextDone, Rejected]
        }

        (Rejected, ActorTier::Organization) => &[Confirm, Confirm50, InProgress, TimeRequest],

        _ => &[],
    }
}

/// The status actually written when a target is accepted. A few targets are
/// verdicts rather than resting states and resolve back to `in_progress`:
/// a half-acceptance and both extension verdicts put the appeal back into
/// active work.
pub fn stored_status(target: AppealStatus) -> AppealStatus {
    use AppealStatus::*;

    match target {
        Success50 | TimeExtended | TimeDenied => InProgress,
        other => other,
    }
}

/// True when the move is legal for this tier from this status.
pub fn is_allowed(current: AppealStatus, tier: ActorTier, target: AppealStatus) -> bool {
    !is_terminal(current) && allowed_targets(current, tier).contains(&target)
}
