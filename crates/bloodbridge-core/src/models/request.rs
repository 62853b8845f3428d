use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::blood::{BloodGroup, Coordinates, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub enum RequestStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Completed and cancelled requests accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Accepted => write!(f, "Accepted"),
            RequestStatus::Completed => write!(f, "Completed"),
            RequestStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Donor-facing mission stage once a request has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub enum DonationProgress {
    Accepted,
    Traveling,
    #[serde(rename = "At Hospital")]
    AtHospital,
    Donating,
    Completed,
}

impl DonationProgress {
    pub const STAGES: [DonationProgress; 5] = [
        DonationProgress::Accepted,
        DonationProgress::Traveling,
        DonationProgress::AtHospital,
        DonationProgress::Donating,
        DonationProgress::Completed,
    ];

    pub fn next(&self) -> Option<Self> {
        match self {
            DonationProgress::Accepted => Some(DonationProgress::Traveling),
            DonationProgress::Traveling => Some(DonationProgress::AtHospital),
            DonationProgress::AtHospital => Some(DonationProgress::Donating),
            DonationProgress::Donating => Some(DonationProgress::Completed),
            DonationProgress::Completed => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, DonationProgress::Completed)
    }

    /// Zero-based position in the mission timeline.
    pub fn step_index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            DonationProgress::Accepted => "Accepted",
            DonationProgress::Traveling => "Traveling",
            DonationProgress::AtHospital => "At Hospital",
            DonationProgress::Donating => "Donating",
            DonationProgress::Completed => "Completed",
        }
    }
}

impl fmt::Display for DonationProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve the progress stage a request ends up in after a status write.
///
/// Precedence: an explicit stage always wins; otherwise `Accepted` and
/// `Completed` statuses imply the matching stage; any other status keeps
/// whatever stage the request already had.
pub fn resolve_progress(
    current: Option<DonationProgress>,
    status: RequestStatus,
    explicit: Option<DonationProgress>,
) -> Option<DonationProgress> {
    explicit.or(match status {
        RequestStatus::Accepted => Some(DonationProgress::Accepted),
        RequestStatus::Completed => Some(DonationProgress::Completed),
        RequestStatus::Pending | RequestStatus::Cancelled => current,
    })
}

/// Who a transition is performed on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub enum DonorRef {
    /// The donor signed in to this session; resolves to the donor profile.
    CurrentSession,
    /// Any other donor, identified by a literal id that doubles as display name.
    Id(String),
}

impl DonorRef {
    pub fn id(id: impl Into<String>) -> Self {
        DonorRef::Id(id.into())
    }

    pub fn is_current_session(&self) -> bool {
        matches!(self, DonorRef::CurrentSession)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct BloodRequest {
    pub id: String,
    pub blood_type: BloodGroup,
    pub units: u32,
    pub hospital: String,
    pub location: String,
    pub coordinates: Coordinates,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_id: Option<DonorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<DonationProgress>,
}

impl BloodRequest {
    pub fn from_new(id: String, created_at: DateTime<Utc>, input: NewRequest) -> Self {
        Self {
            id,
            blood_type: input.blood_type,
            units: input.units,
            hospital: input.hospital,
            location: input.location,
            coordinates: input.coordinates,
            urgency: input.urgency,
            status: RequestStatus::Pending,
            created_at,
            donor_id: None,
            accepted_by: None,
            progress: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Caller-supplied fields of a broadcast. The store fills in id, timestamp and
/// status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct NewRequest {
    pub blood_type: BloodGroup,
    pub units: u32,
    pub hospital: String,
    pub location: String,
    pub coordinates: Coordinates,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFormError {
    #[error("Please fill all fields: {0} is required")]
    MissingField(&'static str),

    #[error("Units needed must be at least 1")]
    NoUnits,
}

impl NewRequest {
    /// Form-level check run by front ends before broadcasting. The store itself
    /// accepts any value.
    pub fn validate(&self) -> Result<(), RequestFormError> {
        if self.hospital.trim().is_empty() {
            return Err(RequestFormError::MissingField("hospital"));
        }
        if self.location.trim().is_empty() {
            return Err(RequestFormError::MissingField("location"));
        }
        if self.units == 0 {
            return Err(RequestFormError::NoUnits);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> NewRequest {
        NewRequest {
            blood_type: BloodGroup::OPositive,
            units: 3,
            hospital: "X".to_string(),
            location: "Y".to_string(),
            coordinates: Coordinates::new(40.7128, -74.006),
            urgency: Urgency::Critical,
        }
    }

    // -------------------------------------------------------------------------
    // Progress resolution
    // -------------------------------------------------------------------------

    #[test]
    fn test_resolve_progress_explicit_wins() {
        assert_eq!(
            resolve_progress(None, RequestStatus::Accepted, Some(DonationProgress::Traveling)),
            Some(DonationProgress::Traveling)
        );
        assert_eq!(
            resolve_progress(
                Some(DonationProgress::Donating),
                RequestStatus::Cancelled,
                Some(DonationProgress::Accepted)
            ),
            Some(DonationProgress::Accepted)
        );
    }

    #[test]
    fn test_resolve_progress_defaults_from_status() {
        assert_eq!(
            resolve_progress(None, RequestStatus::Accepted, None),
            Some(DonationProgress::Accepted)
        );
        assert_eq!(
            resolve_progress(Some(DonationProgress::Donating), RequestStatus::Completed, None),
            Some(DonationProgress::Completed)
        );
        // An accept without an explicit stage resets the mission to its start
        assert_eq!(
            resolve_progress(Some(DonationProgress::AtHospital), RequestStatus::Accepted, None),
            Some(DonationProgress::Accepted)
        );
    }

    #[test]
    fn test_resolve_progress_keeps_current_otherwise() {
        assert_eq!(resolve_progress(None, RequestStatus::Cancelled, None), None);
        assert_eq!(
            resolve_progress(Some(DonationProgress::Traveling), RequestStatus::Pending, None),
            Some(DonationProgress::Traveling)
        );
    }

    // -------------------------------------------------------------------------
    // Stage ordering
    // -------------------------------------------------------------------------

    #[test]
    fn test_progress_next_walks_all_stages() {
        let mut stage = DonationProgress::Accepted;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, DonationProgress::STAGES.to_vec());
        assert!(stage.is_final());
    }

    #[test]
    fn test_progress_step_index() {
        assert_eq!(DonationProgress::Accepted.step_index(), 0);
        assert_eq!(DonationProgress::AtHospital.step_index(), 2);
        assert_eq!(DonationProgress::Completed.step_index(), 4);
    }

    #[test]
    fn test_progress_serializes_with_space() {
        let json = serde_json::to_string(&DonationProgress::AtHospital).unwrap();
        assert_eq!(json, "\"At Hospital\"");
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Accepted.is_terminal());
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
    }

    // -------------------------------------------------------------------------
    // Form validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_accepts_complete_form() {
        assert_eq!(sample_input().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut input = sample_input();
        input.hospital = "  ".to_string();
        assert_eq!(input.validate(), Err(RequestFormError::MissingField("hospital")));

        let mut input = sample_input();
        input.location.clear();
        assert_eq!(input.validate(), Err(RequestFormError::MissingField("location")));

        let mut input = sample_input();
        input.units = 0;
        assert_eq!(input.validate(), Err(RequestFormError::NoUnits));
    }
}
