// crates/warden-events/src/channel.rs
// ============================================================================
// Module: Channel Routing
// Description: Maps an event type (or an explicit target) to the fan-out
//              channel(s) a published envelope is delivered on (§4.I).
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! Every published envelope lands in the broadcast log (the full audit
//! trail) and, unless addressed directly, in exactly one type-prefix
//! channel derived from its [`EventType`]'s dotted-prefix convention
//! (`mission.*`, `task.*`, `ethics.*`, `system.*`, `ir.*`,
//! `execution_graph.*`). A `target` on the envelope always wins: it is
//! delivered to that subscriber's private inbox instead of the prefix
//! channel.

use warden_core::EventType;
use warden_core::SubscriberName;

/// A fan-out destination for published envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// The full, unfiltered event log every consumer may subscribe to.
    Broadcast,
    /// `mission.*` events.
    Missions,
    /// `task.*` events.
    Tasks,
    /// `ethics.*` events.
    Ethics,
    /// `system.*` events.
    System,
    /// `ir.*` events.
    Ir,
    /// `execution_graph*` events.
    ExecutionGraph,
    /// A named subscriber's private inbox, used when `target` is set.
    Inbox(SubscriberName),
}

/// Returns the type-prefix channel an event type routes to absent an
/// explicit target.
#[must_use]
pub const fn prefix_channel(event_type: EventType) -> Channel {
    match event_type {
        EventType::MissionSubmitted | EventType::MissionValidated | EventType::MissionCompleted => {
            Channel::Missions
        }
        EventType::TaskStarted | EventType::TaskCompleted | EventType::TaskFailed | EventType::TaskRolledBack => {
            Channel::Tasks
        }
        EventType::EthicsEscalated | EventType::EthicsApprovalDecided => Channel::Ethics,
        EventType::SystemDegraded | EventType::SystemRecovered => Channel::System,
        EventType::IrSubmitted
        | EventType::IrRejected
        | EventType::IrValidatedPass
        | EventType::IrValidatedEscalate
        | EventType::IrValidatedReject
        | EventType::IrApprovalCreated
        | EventType::IrApprovalConsumed
        | EventType::IrApprovalExpired
        | EventType::IrApprovalInvalid
        | EventType::IrDagDiffOk
        | EventType::IrDagDiffFailed => Channel::Ir,
        EventType::ExecutionGraphCompiled
        | EventType::ExecutionGraphAuditFailed
        | EventType::ExecutionGraphStarted
        | EventType::ExecutionGraphNodeDegraded
        | EventType::ExecutionGraphNodeFailed
        | EventType::ExecutionGraphRollbackStarted
        | EventType::ExecutionGraphRollbackCompleted
        | EventType::ExecutionGraphCompleted => Channel::ExecutionGraph,
    }
}

/// Resolves the destination channel for a published envelope: `target` wins
/// over type-prefix routing.
#[must_use]
pub fn destination_channel(event_type: EventType, target: Option<&str>) -> Channel {
    match target {
        Some(name) => Channel::Inbox(SubscriberName::new(name)),
        None => prefix_channel(event_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_wins_over_prefix() {
        let channel = destination_channel(EventType::TaskStarted, Some("agent-7"));
        assert_eq!(channel, Channel::Inbox(SubscriberName::new("agent-7")));
    }

    #[test]
    fn prefix_routes_without_target() {
        assert_eq!(destination_channel(EventType::EthicsEscalated, None), Channel::Ethics);
        assert_eq!(destination_channel(EventType::SystemDegraded, None), Channel::System);
        assert_eq!(destination_channel(EventType::MissionCompleted, None), Channel::Missions);
    }
}
