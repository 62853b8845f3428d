use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::blood::{BloodGroup, Coordinates};

/// Which side of the app the session is signed in as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub enum Role {
    Donor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Donor => write!(f, "donor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "donor" => Ok(Role::Donor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Signed-in donor: identity plus reward ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct DonorProfile {
    pub name: String,
    pub phone: String,
    pub blood_group: BloodGroup,
    pub location: String,
    pub coordinates: Coordinates,
    pub points: u32,
    pub last_donation: NaiveDate,
    pub donations_count: u32,
    pub onboarded: bool,
}

impl Default for DonorProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            blood_group: BloodGroup::OPositive,
            location: "Downtown".to_string(),
            coordinates: Coordinates::new(40.7128, -74.006),
            points: 1250,
            last_donation: NaiveDate::from_ymd_opt(2023, 10, 15).unwrap_or_default(),
            donations_count: 9,
            onboarded: false,
        }
    }
}

/// Editable donor fields. Ledger fields are credited by the store only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct DonorProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub onboarded: Option<bool>,
}

impl DonorProfilePatch {
    pub fn apply(self, profile: &mut DonorProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(phone) = self.phone {
            profile.phone = phone;
        }
        if let Some(group) = self.blood_group {
            profile.blood_group = group;
        }
        if let Some(location) = self.location {
            profile.location = location;
        }
        if let Some(coordinates) = self.coordinates {
            profile.coordinates = coordinates;
        }
        if let Some(onboarded) = self.onboarded {
            profile.onboarded = onboarded;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct AdminProfile {
    pub name: String,
    pub hospital_name: String,
    pub admin_id: String,
    pub onboarded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct AdminProfilePatch {
    pub name: Option<String>,
    pub hospital_name: Option<String>,
    pub admin_id: Option<String>,
    pub onboarded: Option<bool>,
}

impl AdminProfilePatch {
    pub fn apply(self, profile: &mut AdminProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(hospital_name) = self.hospital_name {
            profile.hospital_name = hospital_name;
        }
        if let Some(admin_id) = self.admin_id {
            profile.admin_id = admin_id;
        }
        if let Some(onboarded) = self.onboarded {
            profile.onboarded = onboarded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_donor_patch_merges_only_given_fields() {
        let mut profile = DonorProfile::default();
        DonorProfilePatch {
            name: Some("Priya".to_string()),
            blood_group: Some(BloodGroup::BNegative),
            ..Default::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.name, "Priya");
        assert_eq!(profile.blood_group, BloodGroup::BNegative);
        assert_eq!(profile.location, "Downtown");
        assert_eq!(profile.points, 1250);
        assert!(!profile.onboarded);
    }

    #[test]
    fn test_admin_patch_merges_only_given_fields() {
        let mut profile = AdminProfile {
            name: "Admin User".to_string(),
            ..Default::default()
        };
        AdminProfilePatch {
            hospital_name: Some("City General".to_string()),
            onboarded: Some(true),
            ..Default::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.name, "Admin User");
        assert_eq!(profile.hospital_name, "City General");
        assert!(profile.admin_id.is_empty());
        assert!(profile.onboarded);
    }

    #[test]
    fn test_default_donor_last_donation() {
        let profile = DonorProfile::default();
        assert_eq!(profile.last_donation.to_string(), "2023-10-15");
        assert_eq!(profile.donations_count, 9);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Donor".parse::<Role>(), Ok(Role::Donor));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("nurse".parse::<Role>().is_err());
    }
}
