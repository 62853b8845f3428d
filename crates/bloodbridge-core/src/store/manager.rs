use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::demo::{DemoAction, DemoSequencer, DemoStep, DEMO_ANNOUNCEMENT, DEMO_DONOR};
use crate::ids::IdGenerator;
use crate::models::{
    resolve_progress, AdminProfile, AdminProfilePatch, BloodRequest, DonationProgress,
    DonorProfile, DonorProfilePatch, DonorRef, NewRequest, Notification, RequestStatus, Role,
    Severity,
};
use crate::scheduler::{Task, TaskId, TimerQueue};

use super::events::{Completion, StoreEvent, StoreObserver, UpdateOutcome};
use super::state::AppState;

/// How long a notification stays up unless dismissed.
pub const NOTIFICATION_TTL_MS: i64 = 5_000;

/// Points credited to the signed-in donor for each completed donation.
pub const COMPLETION_REWARD_POINTS: u32 = 100;

/// Single source of truth for the app.
///
/// The store is an owned value: every operation takes `&mut self` and runs to
/// completion before the next one can start, so there is one writer and no
/// intermediate state is ever observable. Timed work (notification expiry,
/// demo steps) sits in a timer queue and runs when the driver calls
/// [`Store::run_due`].
pub struct Store {
    state: AppState,
    clock: Arc<dyn Clock>,
    timers: TimerQueue,
    demo: DemoSequencer,
    ids: IdGenerator,
    /// Pending expiry task for each live notification.
    expiries: HashMap<String, TaskId>,
    observers: Vec<Box<dyn StoreObserver>>,
}

impl Store {
    /// Fresh store with seed data.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let state = AppState::initial(clock.now());
        Self::from_state(clock, state)
    }

    /// Store resumed from a saved snapshot.
    ///
    /// Timers do not survive a restart: a demo that was running is marked
    /// stopped, and every restored notification gets a fresh expiry.
    pub fn from_state(clock: Arc<dyn Clock>, mut state: AppState) -> Self {
        if state.is_demo_running {
            debug!("Clearing demo flag left over from previous session");
            state.is_demo_running = false;
        }

        let mut store = Self {
            state,
            clock,
            timers: TimerQueue::new(),
            demo: DemoSequencer::default(),
            ids: IdGenerator::from_entropy(),
            expiries: HashMap::new(),
            observers: Vec::new(),
        };

        let ids: Vec<String> = store.state.notifications.iter().map(|n| n.id.clone()).collect();
        for id in ids {
            store.schedule_expiry(id);
        }
        store
    }

    /// Replace the id generator, e.g. with a seeded one for reproducible tests.
    pub fn with_ids(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_demo_running(&self) -> bool {
        self.state.is_demo_running
    }

    /// Id of the request the running demo is driving, once it has been created.
    pub fn demo_request_id(&self) -> Option<&str> {
        self.demo.running().and_then(|run| run.request_id.as_deref())
    }

    fn emit(&mut self, event: StoreEvent) {
        for observer in self.observers.iter_mut() {
            observer.on_change(&event, &self.state);
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn set_role(&mut self, role: Option<Role>) {
        debug!(?role, "Role set");
        self.state.role = role;
        self.emit(StoreEvent::RoleChanged(role));
    }

    pub fn update_donor_profile(&mut self, patch: DonorProfilePatch) {
        let mut profile = self.state.donor_profile.clone();
        patch.apply(&mut profile);
        self.state.donor_profile = profile;
        debug!("Donor profile updated");
        self.emit(StoreEvent::DonorProfileUpdated);
    }

    pub fn update_admin_profile(&mut self, patch: AdminProfilePatch) {
        let mut profile = self.state.admin_profile.clone();
        patch.apply(&mut profile);
        self.state.admin_profile = profile;
        debug!("Admin profile updated");
        self.emit(StoreEvent::AdminProfileUpdated);
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Broadcast a new request. It lands at the front of the list as
    /// `Pending`; the generated id is returned.
    pub fn add_request(&mut self, input: NewRequest) -> String {
        let id = self.fresh_id(|state, id| state.request(id).is_some());
        let request = BloodRequest::from_new(id.clone(), self.clock.now(), input);
        info!(
            id = %id,
            blood_type = %request.blood_type,
            units = request.units,
            urgency = %request.urgency,
            "Request broadcast"
        );

        let mut requests = Vec::with_capacity(self.state.requests.len() + 1);
        requests.push(request);
        requests.extend(self.state.requests.iter().cloned());
        self.state.requests = requests;

        self.emit(StoreEvent::RequestAdded { id: id.clone() });
        id
    }

    /// Move a request to `status`.
    ///
    /// `donor` records who the transition is for and sets the display name;
    /// `progress` overrides the stage implied by `status` (see
    /// [`resolve_progress`]). Completing a request logs its units into
    /// inventory and, if the signed-in donor did the donation, credits their
    /// ledger. Terminal requests reject every write.
    pub fn update_request_status(
        &mut self,
        id: &str,
        status: RequestStatus,
        donor: Option<DonorRef>,
        progress: Option<DonationProgress>,
    ) -> UpdateOutcome {
        let Some(index) = self.state.requests.iter().position(|r| r.id == id) else {
            debug!(id = %id, "Status update for unknown request ignored");
            return UpdateOutcome::NotFound;
        };

        let original = &self.state.requests[index];
        if original.status.is_terminal() {
            warn!(
                id = %id,
                current = %original.status,
                requested = %status,
                "Refusing transition out of terminal status"
            );
            return UpdateOutcome::Rejected {
                status: original.status,
            };
        }

        let donor_name = self.state.donor_profile.name.clone();
        let mut updated = original.clone();
        updated.status = status;
        updated.progress = resolve_progress(original.progress, status, progress);
        updated.accepted_by = match &donor {
            Some(DonorRef::CurrentSession) => Some(donor_name.clone()),
            Some(DonorRef::Id(donor_id)) => Some(donor_id.clone()),
            None => original.accepted_by.clone(),
        };
        if let Some(ref donor) = donor {
            updated.donor_id = Some(donor.clone());
        }

        let mut completion = None;
        if status == RequestStatus::Completed {
            let credited = donor.as_ref().is_some_and(DonorRef::is_current_session)
                || original
                    .donor_id
                    .as_ref()
                    .is_some_and(DonorRef::is_current_session)
                || original.accepted_by.as_deref() == Some(donor_name.as_str());

            let mut inventory = self.state.inventory.clone();
            inventory.add(original.blood_type, original.units);

            let donor_profile = if credited {
                Some(self.credited_profile())
            } else {
                None
            };

            info!(
                id = %id,
                blood_type = %original.blood_type,
                units = original.units,
                credited,
                "Donation completed"
            );

            completion = Some(Completion {
                blood_type: original.blood_type,
                units: original.units,
                credited,
            });
            self.state.inventory = inventory;
            if let Some(profile) = donor_profile {
                self.state.donor_profile = profile;
            }
        } else {
            debug!(id = %id, %status, progress = ?updated.progress, "Request updated");
        }

        let event = StoreEvent::RequestUpdated {
            id: id.to_string(),
            status,
            progress: updated.progress,
            completion,
        };
        self.state.requests[index] = updated;
        self.emit(event);

        UpdateOutcome::Applied { completion }
    }

    /// Step an accepted request to the next stage of its mission, completing
    /// it after `Donating`. Acts on behalf of whichever donor accepted it.
    pub fn advance_request(&mut self, id: &str) -> UpdateOutcome {
        let Some(request) = self.state.request(id) else {
            debug!(id = %id, "Advance for unknown request ignored");
            return UpdateOutcome::NotFound;
        };

        if request.status != RequestStatus::Accepted {
            debug!(id = %id, status = %request.status, "Only accepted requests can advance");
            return UpdateOutcome::Rejected {
                status: request.status,
            };
        }

        let current = request.progress.unwrap_or(DonationProgress::Accepted);
        let Some(next) = current.next() else {
            return UpdateOutcome::Rejected {
                status: request.status,
            };
        };
        let status = if next.is_final() {
            RequestStatus::Completed
        } else {
            RequestStatus::Accepted
        };
        let donor = request
            .donor_id
            .clone()
            .or_else(|| request.accepted_by.clone().map(DonorRef::Id));

        self.update_request_status(id, status, donor, Some(next))
    }

    fn credited_profile(&self) -> DonorProfile {
        let mut profile = self.state.donor_profile.clone();
        profile.points = profile.points.saturating_add(COMPLETION_REWARD_POINTS);
        profile.donations_count = profile.donations_count.saturating_add(1);
        profile.last_donation = self.clock.today();
        profile
    }

    fn fresh_id(&mut self, taken: impl Fn(&AppState, &str) -> bool) -> String {
        loop {
            let id = self.ids.next_id();
            if !taken(&self.state, &id) {
                return id;
            }
            debug!(id = %id, "Generated id collided, drawing again");
        }
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Show a toast. It is removed automatically after
    /// [`NOTIFICATION_TTL_MS`].
    pub fn add_notification(&mut self, message: impl Into<String>, severity: Severity) -> String {
        let id = self.fresh_id(|state, id| state.notifications.iter().any(|n| n.id == id));
        let notification = Notification {
            id: id.clone(),
            message: message.into(),
            severity,
        };
        debug!(id = %id, %severity, message = %notification.message, "Notification added");

        let mut notifications = self.state.notifications.clone();
        notifications.push(notification);
        self.state.notifications = notifications;
        self.schedule_expiry(id.clone());

        self.emit(StoreEvent::NotificationAdded { id: id.clone() });
        id
    }

    /// Dismiss a toast early. Returns false if it was already gone.
    pub fn remove_notification(&mut self, id: &str) -> bool {
        if let Some(task) = self.expiries.remove(id) {
            self.timers.cancel(task);
        }
        self.drop_notification(id, false)
    }

    fn schedule_expiry(&mut self, id: String) {
        let due = self.clock.now() + Duration::milliseconds(NOTIFICATION_TTL_MS);
        let task = self.timers.schedule(due, Task::ExpireNotification(id.clone()));
        self.expiries.insert(id, task);
    }

    fn drop_notification(&mut self, id: &str, expired: bool) -> bool {
        if !self.state.notifications.iter().any(|n| n.id == id) {
            return false;
        }
        self.state.notifications = self
            .state
            .notifications
            .iter()
            .filter(|n| n.id != id)
            .cloned()
            .collect();
        debug!(id = %id, expired, "Notification removed");
        self.emit(StoreEvent::NotificationRemoved {
            id: id.to_string(),
            expired,
        });
        true
    }

    // =========================================================================
    // Demo
    // =========================================================================

    /// Start the scripted demo. Returns false, and does nothing, if one is
    /// already running.
    pub fn run_system_demo(&mut self) -> bool {
        if self.demo.is_running() {
            debug!("Demo already running, ignoring start");
            return false;
        }

        let started_at = self.clock.now();
        let task = self
            .timers
            .schedule(started_at + DemoStep::FIRST.offset(), Task::Demo(DemoStep::FIRST));
        self.demo.start(started_at, task);
        self.state.is_demo_running = true;
        info!("System demo started");
        self.emit(StoreEvent::DemoStarted);

        self.add_notification(DEMO_ANNOUNCEMENT, Severity::Info);
        true
    }

    fn run_demo_step(&mut self, step: DemoStep) {
        let Some(run) = self.demo.running() else {
            warn!(?step, "Demo step fired with no demo running");
            return;
        };
        let started_at = run.started_at;
        let request_id = run.request_id.clone();

        match step.action() {
            DemoAction::Broadcast(input) => {
                let id = self.add_request(input);
                self.demo.set_request(id);
            }
            DemoAction::Transition { status, progress } => match request_id {
                Some(id) => {
                    let outcome = self.update_request_status(
                        &id,
                        status,
                        Some(DonorRef::id(DEMO_DONOR)),
                        Some(progress),
                    );
                    if !outcome.is_applied() {
                        warn!(id = %id, ?step, ?outcome, "Demo transition did not apply");
                    }
                }
                None => warn!(?step, "Demo request was never created"),
            },
        }
        self.add_notification(step.message(), step.severity());

        match step.next() {
            Some(next) => {
                let task = self
                    .timers
                    .schedule(started_at + next.offset(), Task::Demo(next));
                self.demo.advance(task);
            }
            None => {
                self.demo.finish();
                self.state.is_demo_running = false;
                info!("System demo finished");
                self.emit(StoreEvent::DemoFinished);
            }
        }
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Sign out: role, profiles and requests go back to their defaults and a
    /// running demo is stopped. Inventory and notifications are kept.
    pub fn reset_app(&mut self) {
        let demo_cancelled = match self.demo.cancel() {
            Some(task) => {
                self.timers.cancel(task);
                info!("Cancelled running demo on reset");
                true
            }
            None => false,
        };

        self.state.role = None;
        self.state.donor_profile = DonorProfile::default();
        self.state.admin_profile = AdminProfile::default();
        self.state.requests = AppState::seed_requests(self.clock.now());
        self.state.is_demo_running = false;
        info!("App reset");
        self.emit(StoreEvent::Reset { demo_cancelled });
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Run every timer that is due, in due order. Returns how many fired.
    pub fn run_due(&mut self) -> usize {
        let mut fired = 0;
        while let Some((_, task)) = self.timers.pop_due(self.clock.now()) {
            fired += 1;
            match task {
                Task::ExpireNotification(id) => {
                    self.expiries.remove(&id);
                    self.drop_notification(&id, true);
                }
                Task::Demo(step) => self.run_demo_step(step),
            }
        }
        fired
    }

    /// When the next timer is due, so a driver can sleep until then.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod proptests {
    use std::collections::HashSet;

    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{BloodGroup, Coordinates, Urgency};

    proptest! {
        #[test]
        fn test_requests_newest_first_with_unique_ids(
            batches in proptest::collection::vec((0usize..8, 1u32..10, 0i64..5_000), 1..40),
            seed in any::<u64>(),
        ) {
            let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
            let mut store = Store::new(clock.clone()).with_ids(IdGenerator::seeded(seed));

            let mut added = Vec::new();
            for (group, units, gap) in batches {
                clock.advance_ms(gap);
                added.push(store.add_request(NewRequest {
                    blood_type: BloodGroup::ALL[group],
                    units,
                    hospital: "X".to_string(),
                    location: "Y".to_string(),
                    coordinates: Coordinates::default(),
                    urgency: Urgency::Normal,
                }));
            }

            let requests = &store.state().requests;
            let ids: Vec<&str> = requests.iter().map(|r| r.id.as_str()).collect();
            let expected: Vec<&str> = added.iter().rev().map(String::as_str).chain(["1"]).collect();
            prop_assert_eq!(ids.clone(), expected);

            let unique: HashSet<&str> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());
            prop_assert!(requests.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        }
    }
}
