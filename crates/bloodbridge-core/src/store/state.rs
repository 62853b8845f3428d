use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AdminProfile, BloodGroup, BloodRequest, Coordinates, DonorProfile, DonorRef, Inventory,
    MockDonor, Notification, RequestStatus, Role, Urgency,
};

/// Age of the seed request when the state is built.
const SEED_REQUEST_AGE_MS: i64 = 120_000;

/// Everything the store holds. This is also the persisted snapshot shape.
///
/// Fields are public for reading; the store hands out `&AppState` only, so
/// all writes go through its operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub role: Option<Role>,
    pub donor_profile: DonorProfile,
    pub admin_profile: AdminProfile,
    /// Newest first.
    pub requests: Vec<BloodRequest>,
    pub inventory: Inventory,
    /// Oldest first.
    pub notifications: Vec<Notification>,
    pub mock_donors: Vec<MockDonor>,
    pub is_demo_running: bool,
}

impl AppState {
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            role: None,
            donor_profile: DonorProfile::default(),
            admin_profile: AdminProfile::default(),
            requests: Self::seed_requests(now),
            inventory: Inventory::seed(),
            notifications: Vec::new(),
            mock_donors: MockDonor::seed(),
            is_demo_running: false,
        }
    }

    pub fn seed_requests(now: DateTime<Utc>) -> Vec<BloodRequest> {
        vec![BloodRequest {
            id: "1".to_string(),
            blood_type: BloodGroup::OPositive,
            units: 2,
            hospital: "City General Hospital".to_string(),
            location: "Downtown".to_string(),
            coordinates: Coordinates::new(40.7128, -74.006),
            urgency: Urgency::Critical,
            status: RequestStatus::Pending,
            created_at: now - Duration::milliseconds(SEED_REQUEST_AGE_MS),
            donor_id: None,
            accepted_by: None,
            progress: None,
        }]
    }

    // ===== Derived queries =====

    pub fn request(&self, id: &str) -> Option<&BloodRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn requests_with_status(&self, status: RequestStatus) -> Vec<&BloodRequest> {
        self.requests.iter().filter(|r| r.status == status).collect()
    }

    /// Pending alerts the signed-in donor can answer: their own group, or the
    /// universal group.
    pub fn matching_alerts(&self) -> Vec<&BloodRequest> {
        let group = self.donor_profile.blood_group;
        self.requests
            .iter()
            .filter(|r| r.is_pending())
            .filter(|r| r.blood_type == group || r.blood_type == BloodGroup::UNIVERSAL)
            .collect()
    }

    /// The mission the signed-in donor is currently on, if any.
    pub fn active_donation(&self) -> Option<&BloodRequest> {
        let name = self.donor_profile.name.as_str();
        self.requests.iter().find(|r| {
            r.status == RequestStatus::Accepted
                && match &r.donor_id {
                    Some(DonorRef::CurrentSession) => true,
                    Some(DonorRef::Id(id)) => !name.is_empty() && id == name,
                    None => false,
                }
        })
    }

    pub fn mock_donor_named(&self, name: &str) -> Option<&MockDonor> {
        self.mock_donors.iter().find(|d| d.name == name)
    }

    /// Whether the active role has finished onboarding.
    pub fn is_onboarded(&self) -> bool {
        match self.role {
            Some(Role::Donor) => self.donor_profile.onboarded,
            Some(Role::Admin) => self.admin_profile.onboarded,
            None => false,
        }
    }
}
