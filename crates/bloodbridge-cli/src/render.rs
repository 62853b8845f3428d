//! Plain-text views over the store state.

use bloodbridge_core::models::{
    BloodRequest, DonationProgress, Notification, RequestStatus, Role, StockLevel,
};
use bloodbridge_core::{AppState, StoreEvent};
use chrono::{DateTime, Utc};

use crate::format::{format_age, format_date, or_placeholder, truncate_string};

const PLACE_WIDTH: usize = 40;

pub fn notification_line(notification: &Notification) -> String {
    format!(
        "[{}] {}  ({})",
        notification.severity, notification.message, notification.id
    )
}

pub fn request_line(request: &BloodRequest, now: DateTime<Utc>) -> String {
    let place = format!("{}, {}", request.hospital, request.location);
    let mut line = format!(
        "{:<10} {:<3} {:>2}u  {:<8} {:<9} {:<width$} {}",
        request.id,
        request.blood_type.to_string(),
        request.units,
        request.urgency.to_string(),
        request.status.to_string(),
        truncate_string(&place, PLACE_WIDTH),
        format_age(request.created_at, now),
        width = PLACE_WIDTH,
    );
    if let Some(progress) = request.progress.filter(|_| request.status == RequestStatus::Accepted) {
        line.push_str(&format!("  [{}]", progress));
    }
    if let Some(ref donor) = request.accepted_by {
        line.push_str(&format!("  donor: {}", or_placeholder(donor, "(unnamed)")));
    }
    line
}

/// Full dashboard for the `status` command.
pub fn status(state: &AppState, now: DateTime<Utc>) -> String {
    let mut lines = Vec::new();

    match state.role {
        Some(role) => {
            let onboarded = if state.is_onboarded() {
                "verified"
            } else {
                "not verified"
            };
            lines.push(format!("Signed in as {} ({})", role, onboarded));
        }
        None => lines.push("Signed out".to_string()),
    }
    if state.is_demo_running {
        lines.push("System demo in progress".to_string());
    }

    match state.role {
        Some(Role::Donor) => donor_section(state, &mut lines),
        Some(Role::Admin) => admin_section(state, &mut lines),
        None => {}
    }

    lines.push(String::new());
    lines.push(format!("Requests ({})", state.requests.len()));
    if state.requests.is_empty() {
        lines.push("  none".to_string());
    }
    for request in &state.requests {
        lines.push(format!("  {}", request_line(request, now)));
    }

    lines.push(String::new());
    lines.push(format!("Inventory ({} units)", state.inventory.total()));
    for (group, units) in state.inventory.iter() {
        let level = state.inventory.level(group);
        let marker = match level {
            StockLevel::Stable => "",
            StockLevel::Low => "  low",
            StockLevel::Critical => "  CRITICAL",
        };
        lines.push(format!("  {:<3} {:>4}{}", group.to_string(), units, marker));
    }

    if !state.notifications.is_empty() {
        lines.push(String::new());
        lines.push("Notifications".to_string());
        for notification in &state.notifications {
            lines.push(format!("  {}", notification_line(notification)));
        }
    }

    lines.join("\n")
}

fn donor_section(state: &AppState, lines: &mut Vec<String>) {
    let profile = &state.donor_profile;
    lines.push(format!(
        "{}  {}  {}  {}",
        or_placeholder(&profile.name, "(no name)"),
        profile.blood_group,
        or_placeholder(&profile.phone, "(no phone)"),
        profile.location
    ));
    lines.push(format!(
        "{} points, {} donations, last on {}",
        profile.points,
        profile.donations_count,
        format_date(profile.last_donation)
    ));

    match state.active_donation() {
        Some(mission) => {
            let stage = mission.progress.unwrap_or(DonationProgress::Accepted);
            lines.push(format!(
                "Active mission: {} at {} - {} (step {} of {})",
                mission.id,
                mission.hospital,
                stage,
                stage.step_index() + 1,
                DonationProgress::STAGES.len()
            ));
        }
        None => {
            let alerts = state.matching_alerts();
            lines.push(format!("{} matching alert(s)", alerts.len()));
        }
    }
}

fn admin_section(state: &AppState, lines: &mut Vec<String>) {
    let profile = &state.admin_profile;
    lines.push(format!(
        "{} at {} (id {})",
        or_placeholder(&profile.name, "(no name)"),
        or_placeholder(&profile.hospital_name, "(no hospital)"),
        or_placeholder(&profile.admin_id, "-")
    ));

    let low = state.inventory.low_stock();
    if !low.is_empty() {
        let groups: Vec<String> = low
            .iter()
            .map(|(group, units, level)| format!("{} {} ({})", group, units, level))
            .collect();
        lines.push(format!("Low stock: {}", groups.join(", ")));
    }

    lines.push(format!("Nearby donors ({})", state.mock_donors.len()));
    for donor in &state.mock_donors {
        lines.push(format!(
            "  {:<12} {:<3} {}",
            donor.name,
            donor.blood_group.to_string(),
            donor.distance
        ));
    }

    for request in state.requests_with_status(RequestStatus::Accepted) {
        if let Some(donor) = request
            .accepted_by
            .as_deref()
            .and_then(|name| state.mock_donor_named(name))
        {
            lines.push(format!(
                "Request {} is covered by {} ({} away)",
                request.id, donor.name, donor.distance
            ));
        }
    }
}

/// Live feed for the console and demo: echo each change as it commits.
pub fn print_event(event: &StoreEvent, state: &AppState) {
    match event {
        StoreEvent::NotificationAdded { id } => {
            if let Some(notification) = state.notifications.iter().find(|n| &n.id == id) {
                println!("{}", notification_line(notification));
            }
        }
        StoreEvent::RequestAdded { id } => {
            if let Some(request) = state.request(id) {
                println!(
                    "  + request {}: {} x{} at {}",
                    request.id, request.blood_type, request.units, request.hospital
                );
            }
        }
        StoreEvent::RequestUpdated {
            id,
            status,
            progress,
            completion,
        } => {
            let stage = progress.map(|p| format!(" [{}]", p)).unwrap_or_default();
            println!("  ~ request {}: {}{}", id, status, stage);
            if let Some(done) = completion {
                let credit = if done.credited { ", donor credited" } else { "" };
                println!(
                    "  ~ inventory {} +{} -> {}{}",
                    done.blood_type,
                    done.units,
                    state.inventory.get(done.blood_type),
                    credit
                );
            }
        }
        StoreEvent::DemoFinished => println!("System demo finished"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodbridge_core::models::{DonorRef, Severity};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_status_signed_out() {
        let text = status(&AppState::initial(now()), now());
        assert!(text.starts_with("Signed out"));
        assert!(text.contains("Requests (1)"));
        assert!(text.contains("Inventory (360 units)"));
        assert!(text.contains("  AB-    8  CRITICAL"));
        assert!(text.contains("  O+   110\n"));
        assert!(!text.contains("Notifications"));
    }

    #[test]
    fn test_request_line_shows_mission() {
        let mut request = AppState::seed_requests(now()).remove(0);
        assert!(request_line(&request, now()).ends_with("2m ago"));

        request.status = RequestStatus::Accepted;
        request.progress = Some(DonationProgress::Traveling);
        request.donor_id = Some(DonorRef::id("Alice Smith"));
        request.accepted_by = Some("Alice Smith".to_string());
        let line = request_line(&request, now());
        assert!(line.contains("[Traveling]"));
        assert!(line.contains("donor: Alice Smith"));
    }

    #[test]
    fn test_admin_status_lists_low_stock_and_coverage() {
        let mut state = AppState::initial(now());
        state.role = Some(Role::Admin);
        state.requests[0].status = RequestStatus::Accepted;
        state.requests[0].accepted_by = Some("Bob Johnson".to_string());

        let text = status(&state, now());
        assert!(text.contains("Signed in as admin (not verified)"));
        assert!(text.contains("Low stock: B- 15 (Critical), O- 12 (Critical)"));
        assert!(text.contains("Request 1 is covered by Bob Johnson (2.5 km away)"));
    }

    #[test]
    fn test_notification_line() {
        let notification = Notification {
            id: "n1".to_string(),
            message: "Alert dismissed.".to_string(),
            severity: Severity::Info,
        };
        assert_eq!(notification_line(&notification), "[info] Alert dismissed.  (n1)");
    }
}
