use crate::models::{BloodGroup, DonationProgress, RequestStatus, Role};

use super::state::AppState;

/// Side effects of a request reaching `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub blood_type: BloodGroup,
    pub units: u32,
    /// Whether the signed-in donor was credited with the donation.
    pub credited: bool,
}

/// Result of a status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied { completion: Option<Completion> },
    /// No request has that id; nothing changed.
    NotFound,
    /// The request cannot make that transition from where it is.
    Rejected { status: RequestStatus },
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied { .. })
    }

    pub fn completion(&self) -> Option<Completion> {
        match self {
            UpdateOutcome::Applied { completion } => *completion,
            _ => None,
        }
    }
}

/// One committed mutation. Observers receive exactly one event per mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    RoleChanged(Option<Role>),
    DonorProfileUpdated,
    AdminProfileUpdated,
    RequestAdded {
        id: String,
    },
    RequestUpdated {
        id: String,
        status: RequestStatus,
        progress: Option<DonationProgress>,
        completion: Option<Completion>,
    },
    NotificationAdded {
        id: String,
    },
    NotificationRemoved {
        id: String,
        expired: bool,
    },
    DemoStarted,
    DemoFinished,
    Reset {
        demo_cancelled: bool,
    },
}

/// Something that wants to hear about every committed mutation, such as the
/// snapshot writer or a view that re-renders.
pub trait StoreObserver: Send {
    fn on_change(&mut self, event: &StoreEvent, state: &AppState);
}

impl<F> StoreObserver for F
where
    F: FnMut(&StoreEvent, &AppState) + Send,
{
    fn on_change(&mut self, event: &StoreEvent, state: &AppState) {
        self(event, state)
    }
}
