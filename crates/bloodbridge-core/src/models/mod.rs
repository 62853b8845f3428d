//! Data models for Blood Bridge entities.
//!
//! This module contains all the data structures the store holds:
//!
//! - `BloodGroup`, `Urgency`, `Coordinates`: shared value types
//! - `BloodRequest`, `RequestStatus`, `DonationProgress`: emergency broadcasts
//!   and their mission lifecycle
//! - `DonorProfile`, `AdminProfile`, `Role`: the signed-in session
//! - `Inventory`, `StockLevel`: blood bank stock per group
//! - `Notification`, `MockDonor`: toasts and seed map data

pub mod blood;
pub mod donor;
pub mod inventory;
pub mod notification;
pub mod profile;
pub mod request;

pub use blood::{BloodGroup, Coordinates, ParseBloodGroupError, ParseUrgencyError, Urgency};
pub use donor::MockDonor;
pub use inventory::{Inventory, MissingGroupError, StockLevel, CRITICAL_STOCK_THRESHOLD, LOW_STOCK_THRESHOLD};
pub use notification::{Notification, Severity};
pub use profile::{AdminProfile, AdminProfilePatch, DonorProfile, DonorProfilePatch, Role};
pub use request::{
    resolve_progress, BloodRequest, DonationProgress, DonorRef, NewRequest, RequestFormError,
    RequestStatus,
};
