use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::blood::{BloodGroup, Coordinates};

/// Nearby donor shown on the admin map. Seed data only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct MockDonor {
    pub id: String,
    pub name: String,
    pub blood_group: BloodGroup,
    pub coordinates: Coordinates,
    pub distance: String,
}

impl MockDonor {
    fn new(id: &str, name: &str, blood_group: BloodGroup, lat: f64, lng: f64, distance: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            blood_group,
            coordinates: Coordinates::new(lat, lng),
            distance: distance.to_string(),
        }
    }

    pub fn seed() -> Vec<MockDonor> {
        vec![
            MockDonor::new("d1", "Alice Smith", BloodGroup::OPositive, 40.7242, -74.0012, "1.2 km"),
            MockDonor::new("d2", "Bob Johnson", BloodGroup::ANegative, 40.7012, -74.0122, "2.5 km"),
            MockDonor::new("d3", "Cody Miller", BloodGroup::OPositive, 40.7312, -73.9922, "0.8 km"),
            MockDonor::new("d4", "Diana Ross", BloodGroup::BPositive, 40.7092, -73.9822, "3.1 km"),
        ]
    }
}
