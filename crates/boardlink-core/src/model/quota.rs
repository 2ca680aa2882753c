// ── Correlation tickets ──
//
// The agent never echoes a request id. Each outbound command that expects
// an answer leaves a ticket in state; handlers consume tickets in arrival
// order and callers remove their own on completion or timeout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Sent,
    Pending,
    Success,
    Error,
}

impl TicketStatus {
    /// Still waiting for a terminal download status.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Sent | Self::Pending)
    }

    pub fn is_settled(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub batch_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub status: Option<TicketStatus>,
}

impl Ticket {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id: None,
            timestamp: Utc::now(),
            status: None,
        }
    }

    /// A download ticket belonging to `batch_id`, starting at `sent`.
    pub fn for_batch(batch_id: Uuid) -> Self {
        Self {
            batch_id: Some(batch_id),
            status: Some(TicketStatus::Sent),
            ..Self::new()
        }
    }
}

impl Default for Ticket {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop the ticket with `id` from a quota. `false` if it was already gone.
pub fn remove_ticket(quota: &mut Vec<Ticket>, id: Uuid) -> bool {
    let before = quota.len();
    quota.retain(|t| t.id != id);
    quota.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_tickets_start_sent() {
        let batch = Uuid::new_v4();
        let ticket = Ticket::for_batch(batch);
        assert_eq!(ticket.batch_id, Some(batch));
        assert_eq!(ticket.status, Some(TicketStatus::Sent));
        assert!(ticket.status.is_some_and(TicketStatus::is_open));
        assert!(Ticket::new().status.is_none());
    }

    #[test]
    fn removes_only_the_named_ticket() {
        let keep = Ticket::new();
        let drop = Ticket::new();
        let mut quota = vec![keep.clone(), drop.clone()];

        assert!(remove_ticket(&mut quota, drop.id));
        assert!(!remove_ticket(&mut quota, drop.id));
        assert_eq!(quota, vec![keep]);
    }
}
