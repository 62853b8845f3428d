//! The front end's side of the store: role gating, form checks and the
//! confirmation toasts each screen shows after acting.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bloodbridge_core::models::{
    AdminProfilePatch, BloodGroup, Coordinates, DonationProgress, DonorProfilePatch, DonorRef,
    NewRequest, RequestStatus, Role, Severity,
};
use bloodbridge_core::{
    Clock, Config, PersistOnChange, SnapshotStore, Store, SystemClock, UpdateOutcome,
};
use tracing::{debug, info};

use crate::render;

/// Map position used for requests broadcast from the admin console.
pub const HOSPITAL_COORDINATES: Coordinates = Coordinates::new(40.7128, -74.006);

/// One user intent, from a subcommand or a console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Status,
    Role(Role),
    OnboardDonor {
        name: String,
        phone: String,
        blood_group: BloodGroup,
        location: Option<String>,
    },
    /// Change a verified donor's details; absent fields stay as they are.
    EditProfile {
        name: Option<String>,
        phone: Option<String>,
        blood_group: Option<BloodGroup>,
        location: Option<String>,
    },
    OnboardAdmin {
        name: String,
        hospital: String,
        admin_id: String,
    },
    Broadcast(NewRequest),
    Accept(String),
    Decline(String),
    Advance(String),
    Dismiss(String),
    Demo,
    Reset,
}

pub struct App {
    store: Store,
}

impl App {
    /// Build the store for this run, resuming from the snapshot when
    /// persistence is on.
    pub fn open(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        if !config.persist {
            debug!("Persistence disabled, starting from seed state");
            return Ok(Self::from_store(Store::new(clock)));
        }

        let dir = config.data_dir()?;
        let snapshots = SnapshotStore::new(dir.clone())
            .with_context(|| format!("Failed to open data directory: {}", dir.display()))?;
        let mut store = snapshots.restore(clock.clone());
        info!(path = %snapshots.path().display(), "State loaded");
        store.subscribe(PersistOnChange::new(snapshots, clock));
        Ok(Self::from_store(store))
    }

    pub fn from_store(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Perform one action. Returns text to show, if the action produces any
    /// beyond its notifications.
    pub fn execute(&mut self, action: Action) -> Result<Option<String>> {
        debug!(?action, "Executing");
        match action {
            Action::Status => {
                return Ok(Some(render::status(self.store.state(), self.store.now())));
            }
            Action::Role(role) => self.store.set_role(Some(role)),
            Action::OnboardDonor {
                name,
                phone,
                blood_group,
                location,
            } => self.onboard_donor(name, phone, blood_group, location)?,
            Action::EditProfile {
                name,
                phone,
                blood_group,
                location,
            } => self.edit_profile(name, phone, blood_group, location)?,
            Action::OnboardAdmin {
                name,
                hospital,
                admin_id,
            } => self.onboard_admin(name, hospital, admin_id)?,
            Action::Broadcast(input) => self.broadcast(input)?,
            Action::Accept(id) => self.accept(&id)?,
            Action::Decline(id) => self.decline(&id)?,
            Action::Advance(id) => self.advance(&id)?,
            Action::Dismiss(id) => {
                if !self.store.remove_notification(&id) {
                    bail!("No notification with id {}", id);
                }
            }
            Action::Demo => {
                if !self.store.run_system_demo() {
                    bail!("The system demo is already running");
                }
            }
            Action::Reset => self.store.reset_app(),
        }
        Ok(None)
    }

    fn require_role(&self, role: Role) -> Result<()> {
        if self.store.state().role != Some(role) {
            bail!(
                "This needs the {} role. Run `bloodbridge role {}` first.",
                role,
                role
            );
        }
        Ok(())
    }

    fn require_verified(&self, role: Role) -> Result<()> {
        self.require_role(role)?;
        if !self.store.state().is_onboarded() {
            bail!(
                "Complete verification first with `bloodbridge onboard-{}`.",
                role
            );
        }
        Ok(())
    }

    /// The donor may only answer alerts for their own group or the universal
    /// group.
    fn matching_alert(&self, id: &str) -> Result<()> {
        let state = self.store.state();
        match state.request(id) {
            None => bail!("No request with id {}", id),
            Some(request) if !request.is_pending() => {
                bail!("Request {} is {} and no longer open", id, request.status)
            }
            Some(request) if !state.matching_alerts().iter().any(|r| r.id == id) => bail!(
                "Request {} needs {} blood; your group is {}",
                id,
                request.blood_type,
                state.donor_profile.blood_group
            ),
            Some(_) => Ok(()),
        }
    }

    fn onboard_donor(
        &mut self,
        name: String,
        phone: String,
        blood_group: BloodGroup,
        location: Option<String>,
    ) -> Result<()> {
        self.require_role(Role::Donor)?;
        if name.trim().is_empty() || phone.trim().is_empty() {
            bail!("Name and phone are required for verification");
        }

        let message = format!("Welcome {}! Profile verified.", name);
        self.store.update_donor_profile(DonorProfilePatch {
            name: Some(name),
            phone: Some(phone),
            blood_group: Some(blood_group),
            location: location.filter(|l| !l.trim().is_empty()),
            onboarded: Some(true),
            ..Default::default()
        });
        self.store.add_notification(message, Severity::Success);
        Ok(())
    }

    fn edit_profile(
        &mut self,
        name: Option<String>,
        phone: Option<String>,
        blood_group: Option<BloodGroup>,
        location: Option<String>,
    ) -> Result<()> {
        self.require_verified(Role::Donor)?;
        let keep = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let patch = DonorProfilePatch {
            name: keep(name),
            phone: keep(phone),
            blood_group,
            location: keep(location),
            ..Default::default()
        };
        if patch == DonorProfilePatch::default() {
            bail!("Nothing to update: give at least one of name, phone, blood group or location");
        }

        self.store.update_donor_profile(patch);
        self.store
            .add_notification("Profile updated successfully!", Severity::Success);
        Ok(())
    }

    fn onboard_admin(&mut self, name: String, hospital: String, admin_id: String) -> Result<()> {
        self.require_role(Role::Admin)?;
        if [&name, &hospital, &admin_id].iter().any(|v| v.trim().is_empty()) {
            bail!("Name, hospital and admin id are required for verification");
        }

        self.store.update_admin_profile(AdminProfilePatch {
            name: Some(name),
            hospital_name: Some(hospital),
            admin_id: Some(admin_id),
            onboarded: Some(true),
        });
        self.store
            .add_notification("Hospital credentials verified.", Severity::Success);
        Ok(())
    }

    fn broadcast(&mut self, input: NewRequest) -> Result<()> {
        self.require_verified(Role::Admin)?;
        if let Err(e) = input.validate() {
            debug!(error = %e, "Broadcast form incomplete");
            self.store.add_notification(e.to_string(), Severity::Alert);
            return Ok(());
        }
        self.store.add_request(input);
        self.store
            .add_notification("Emergency broadcast initiated!", Severity::Success);
        Ok(())
    }

    fn accept(&mut self, id: &str) -> Result<()> {
        self.require_verified(Role::Donor)?;
        self.matching_alert(id)?;
        let outcome = self.store.update_request_status(
            id,
            RequestStatus::Accepted,
            Some(DonorRef::CurrentSession),
            Some(DonationProgress::Accepted),
        );
        check_outcome(id, outcome)?;
        self.store.add_notification(
            "Emergency request accepted. Proceed to hospital.",
            Severity::Success,
        );
        Ok(())
    }

    fn decline(&mut self, id: &str) -> Result<()> {
        self.require_verified(Role::Donor)?;
        self.matching_alert(id)?;
        let outcome = self
            .store
            .update_request_status(id, RequestStatus::Cancelled, None, None);
        check_outcome(id, outcome)?;
        self.store.add_notification("Alert dismissed.", Severity::Info);
        Ok(())
    }

    fn advance(&mut self, id: &str) -> Result<()> {
        self.require_verified(Role::Admin)?;
        let outcome = self.store.advance_request(id);
        check_outcome(id, outcome)?;

        let stage = self
            .store
            .state()
            .request(id)
            .and_then(|r| r.progress)
            .context("Advanced request has no stage")?;
        if let Some((message, severity)) = advance_message(stage) {
            self.store.add_notification(message, severity);
        }
        Ok(())
    }
}

/// Toast the admin sees after moving a donor to `stage`.
pub fn advance_message(stage: DonationProgress) -> Option<(&'static str, Severity)> {
    match stage {
        DonationProgress::Accepted => None,
        DonationProgress::Traveling => Some(("Pickup request assigned to donor.", Severity::Info)),
        DonationProgress::AtHospital => Some((
            "Donor status updated to: Arrived at Facility.",
            Severity::Info,
        )),
        DonationProgress::Donating => Some(("Blood extraction process started.", Severity::Info)),
        DonationProgress::Completed => Some((
            "Donation MISSION COMPLETED. Point awarded.",
            Severity::Success,
        )),
    }
}

fn check_outcome(id: &str, outcome: UpdateOutcome) -> Result<()> {
    match outcome {
        UpdateOutcome::Applied { .. } => Ok(()),
        UpdateOutcome::NotFound => bail!("No request with id {}", id),
        UpdateOutcome::Rejected { status } => {
            bail!("Request {} is {} and cannot make that change", id, status)
        }
    }
}
