//! Scripted end-to-end demo.
//!
//! The demo walks one request from broadcast to completion without user input.
//! It is a small state machine: the store holds at most one running sequence,
//! and that sequence has exactly one timer pending for its next step. Each
//! step is scheduled relative to the demo's start time, so a late tick replays
//! the missed steps in order instead of drifting.

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    BloodGroup, Coordinates, DonationProgress, NewRequest, RequestStatus, Severity, Urgency,
};
use crate::scheduler::TaskId;

/// Donor the demo pretends accepted the request.
pub const DEMO_DONOR: &str = "Rahul Sharma";

pub const DEMO_ANNOUNCEMENT: &str = "DEMO: Admin broadcasting emergency alert...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoStep {
    Broadcast,
    Accept,
    Travel,
    Arrive,
    Complete,
}

/// The store mutation a step performs.
#[derive(Debug, Clone, PartialEq)]
pub enum DemoAction {
    Broadcast(NewRequest),
    Transition {
        status: RequestStatus,
        progress: DonationProgress,
    },
}

impl DemoStep {
    pub const FIRST: DemoStep = DemoStep::Broadcast;

    /// Delay from the start of the demo.
    pub fn offset(&self) -> Duration {
        Duration::milliseconds(match self {
            DemoStep::Broadcast => 500,
            DemoStep::Accept => 3_000,
            DemoStep::Travel => 5_000,
            DemoStep::Arrive => 8_000,
            DemoStep::Complete => 12_000,
        })
    }

    pub fn next(&self) -> Option<DemoStep> {
        match self {
            DemoStep::Broadcast => Some(DemoStep::Accept),
            DemoStep::Accept => Some(DemoStep::Travel),
            DemoStep::Travel => Some(DemoStep::Arrive),
            DemoStep::Arrive => Some(DemoStep::Complete),
            DemoStep::Complete => None,
        }
    }

    pub fn action(&self) -> DemoAction {
        let transition = |status, progress| DemoAction::Transition { status, progress };
        match self {
            DemoStep::Broadcast => DemoAction::Broadcast(demo_request()),
            DemoStep::Accept => transition(RequestStatus::Accepted, DonationProgress::Accepted),
            DemoStep::Travel => transition(RequestStatus::Accepted, DonationProgress::Traveling),
            DemoStep::Arrive => transition(RequestStatus::Accepted, DonationProgress::AtHospital),
            DemoStep::Complete => transition(RequestStatus::Completed, DonationProgress::Completed),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DemoStep::Broadcast => "DEMO: Emergency signal broadcasted!",
            DemoStep::Accept => "DEMO: Donor Rahul Sharma (O+) has accepted!",
            DemoStep::Travel => "DEMO: Donor is traveling to facility",
            DemoStep::Arrive => "DEMO: Donor reached hospital. Verification complete.",
            DemoStep::Complete => "DEMO: Donation complete! Donor rewarded +100 pts.",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DemoStep::Accept | DemoStep::Complete => Severity::Success,
            DemoStep::Broadcast | DemoStep::Travel | DemoStep::Arrive => Severity::Info,
        }
    }
}

/// The emergency the demo broadcasts.
pub fn demo_request() -> NewRequest {
    NewRequest {
        blood_type: BloodGroup::OPositive,
        units: 3,
        hospital: "Central Mercy Hospital".to_string(),
        location: "Sector 5".to_string(),
        coordinates: Coordinates::new(40.7128, -74.006),
        urgency: Urgency::Critical,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningDemo {
    pub started_at: DateTime<Utc>,
    /// Timer for the step that fires next.
    pub task: TaskId,
    /// Set once the broadcast step has created the request.
    pub request_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct DemoSequencer {
    running: Option<RunningDemo>,
}

impl DemoSequencer {
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn running(&self) -> Option<&RunningDemo> {
        self.running.as_ref()
    }

    pub fn start(&mut self, started_at: DateTime<Utc>, task: TaskId) {
        self.running = Some(RunningDemo {
            started_at,
            task,
            request_id: None,
        });
    }

    pub fn set_request(&mut self, request_id: String) {
        if let Some(run) = self.running.as_mut() {
            run.request_id = Some(request_id);
        }
    }

    /// Record the timer scheduled for the following step.
    pub fn advance(&mut self, task: TaskId) {
        if let Some(run) = self.running.as_mut() {
            run.task = task;
        }
    }

    pub fn finish(&mut self) {
        self.running = None;
    }

    /// Stop the sequence, handing back the timer that still needs cancelling.
    pub fn cancel(&mut self) -> Option<TaskId> {
        self.running.take().map(|run| run.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_steps() -> Vec<DemoStep> {
        std::iter::successors(Some(DemoStep::FIRST), |step| step.next()).collect()
    }

    #[test]
    fn test_steps_run_in_script_order() {
        assert_eq!(
            all_steps(),
            vec![
                DemoStep::Broadcast,
                DemoStep::Accept,
                DemoStep::Travel,
                DemoStep::Arrive,
                DemoStep::Complete,
            ]
        );
    }

    #[test]
    fn test_offsets_strictly_increase() {
        let offsets: Vec<i64> = all_steps().iter().map(|s| s.offset().num_milliseconds()).collect();
        assert_eq!(offsets, vec![500, 3_000, 5_000, 8_000, 12_000]);
    }

    #[test]
    fn test_progress_never_moves_backwards() {
        let stages: Vec<DonationProgress> = all_steps()
            .iter()
            .filter_map(|step| match step.action() {
                DemoAction::Transition { progress, .. } => Some(progress),
                DemoAction::Broadcast(_) => None,
            })
            .collect();
        assert!(stages.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(stages.last(), Some(&DonationProgress::Completed));
    }

    #[test]
    fn test_only_final_step_completes() {
        for step in all_steps() {
            if let DemoAction::Transition { status, .. } = step.action() {
                assert_eq!(status == RequestStatus::Completed, step == DemoStep::Complete);
            }
        }
    }

    #[test]
    fn test_sequencer_lifecycle() {
        let mut queue = crate::scheduler::TimerQueue::new();
        let first = queue.schedule(Utc::now(), crate::scheduler::Task::Demo(DemoStep::FIRST));
        let mut demo = DemoSequencer::default();
        assert!(!demo.is_running());

        demo.start(Utc::now(), first);
        demo.set_request("abc".to_string());
        assert_eq!(demo.running().and_then(|r| r.request_id.as_deref()), Some("abc"));

        let second = queue.schedule(Utc::now(), crate::scheduler::Task::Demo(DemoStep::Accept));
        demo.advance(second);
        assert_eq!(demo.running().map(|r| r.task), Some(second));

        assert_eq!(demo.cancel(), Some(second));
        assert!(!demo.is_running());
        assert_eq!(demo.cancel(), None);
    }

    #[test]
    fn test_finish_clears_run() {
        let mut queue = crate::scheduler::TimerQueue::new();
        let task = queue.schedule(Utc::now(), crate::scheduler::Task::Demo(DemoStep::FIRST));
        let mut demo = DemoSequencer::default();
        demo.start(Utc::now(), task);

        demo.finish();
        assert!(!demo.is_running());
        assert!(demo.running().is_none());
    }
}
