//! Interactive session: read commands from stdin while store timers keep
//! firing in the background.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration as StdDuration;

use anyhow::Result;
use bloodbridge_core::models::{BloodGroup, NewRequest, Role, Urgency};
use bloodbridge_core::Store;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::{Action, App, HOSPITAL_COORDINATES};

/// Channel buffer size for lines read from stdin.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// How long the loop sleeps when no timer is pending.
const IDLE_WAIT: StdDuration = StdDuration::from_secs(3600);

pub const HELP: &str = "\
Commands:
  status                                   show the dashboard
  role <donor|admin>                       sign in
  onboard-donor <group> <phone> <name>     verify as donor
  edit-profile <name|phone|group|location> <value>
  onboard-admin <admin-id> <name> | <hospital>
  broadcast <group> <units> <urgency> <hospital> | <location>
  accept <id>  decline <id>                answer an alert (donor)
  advance <id>                             move a mission forward (admin)
  dismiss <id>                             close a notification
  demo                                     run the scripted demo
  reset                                    sign out
  help  quit";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Empty,
    Help,
    Quit,
    Action(Action),
}

/// Split off the first whitespace-delimited word.
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(format!("missing {}", what))
    } else {
        Ok(value)
    }
}

/// Split `left | right` into its two trimmed halves.
fn split_pair<'a>(s: &'a str, what: &str) -> Result<(&'a str, &'a str), String> {
    s.split_once('|')
        .map(|(left, right)| (left.trim(), right.trim()))
        .ok_or_else(|| format!("expected `{}`", what))
}

pub fn parse_line(line: &str) -> Result<Line, String> {
    let (verb, rest) = next_word(line);
    let action = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(Line::Empty),
        "help" | "?" => return Ok(Line::Help),
        "quit" | "exit" | "q" => return Ok(Line::Quit),
        "status" | "s" => Action::Status,
        "role" => Action::Role(required(rest, "role")?.parse::<Role>()?),
        "accept" => Action::Accept(required(rest, "request id")?.to_string()),
        "decline" => Action::Decline(required(rest, "request id")?.to_string()),
        "advance" => Action::Advance(required(rest, "request id")?.to_string()),
        "dismiss" => Action::Dismiss(required(rest, "notification id")?.to_string()),
        "demo" => Action::Demo,
        "reset" => Action::Reset,
        "onboard-donor" => {
            let (group, rest) = next_word(rest);
            let (phone, name) = next_word(rest);
            Action::OnboardDonor {
                blood_group: parse_group(required(group, "blood group")?)?,
                phone: required(phone, "phone")?.to_string(),
                name: required(name, "name")?.to_string(),
                location: None,
            }
        }
        "edit-profile" => {
            let (field, value) = next_word(rest);
            let value = required(value, "value")?.to_string();
            let (mut name, mut phone, mut blood_group, mut location) = (None, None, None, None);
            match field.to_ascii_lowercase().as_str() {
                "name" => name = Some(value),
                "phone" => phone = Some(value),
                "group" | "blood-group" => blood_group = Some(parse_group(&value)?),
                "location" => location = Some(value),
                other => return Err(format!("unknown profile field: {}", other)),
            }
            Action::EditProfile {
                name,
                phone,
                blood_group,
                location,
            }
        }
        "onboard-admin" => {
            let (admin_id, rest) = next_word(rest);
            let (name, hospital) = split_pair(rest, "<name> | <hospital>")?;
            Action::OnboardAdmin {
                admin_id: required(admin_id, "admin id")?.to_string(),
                name: name.to_string(),
                hospital: hospital.to_string(),
            }
        }
        "broadcast" => {
            let (group, rest) = next_word(rest);
            let (units, rest) = next_word(rest);
            let (urgency, rest) = next_word(rest);
            let (hospital, location) = split_pair(rest, "<hospital> | <location>")?;
            Action::Broadcast(NewRequest {
                blood_type: parse_group(required(group, "blood group")?)?,
                units: required(units, "units")?
                    .parse()
                    .map_err(|_| format!("invalid units: {}", units))?,
                urgency: required(urgency, "urgency")?
                    .parse::<Urgency>()
                    .map_err(|e| e.to_string())?,
                hospital: hospital.to_string(),
                location: location.to_string(),
                coordinates: HOSPITAL_COORDINATES,
            })
        }
        other => return Err(format!("unknown command: {} (try `help`)", other)),
    };
    Ok(Line::Action(action))
}

fn parse_group(s: &str) -> Result<BloodGroup, String> {
    s.parse::<BloodGroup>().map_err(|e| e.to_string())
}

/// Time left until `deadline`, zero if it has passed.
pub fn wait_for(deadline: DateTime<Utc>, now: DateTime<Utc>) -> StdDuration {
    (deadline - now).to_std().unwrap_or(StdDuration::ZERO)
}

fn next_wait(store: &Store) -> StdDuration {
    store
        .next_deadline()
        .map(|deadline| wait_for(deadline, store.now()))
        .unwrap_or(IDLE_WAIT)
}

/// Stdin is read on a plain thread so a blocked read never holds up runtime
/// shutdown.
fn spawn_stdin_reader(tx: mpsc::Sender<String>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
        debug!("Stdin reader finished");
    });
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub async fn run(app: &mut App) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<String>(CHANNEL_BUFFER_SIZE);
    spawn_stdin_reader(tx);

    println!("{}", HELP);
    prompt();

    loop {
        let wait = next_wait(app.store());
        tokio::select! {
            line = rx.recv() => {
                let Some(line) = line else { break };
                match parse_line(&line) {
                    Ok(Line::Empty) => {}
                    Ok(Line::Help) => println!("{}", HELP),
                    Ok(Line::Quit) => break,
                    Ok(Line::Action(action)) => match app.execute(action) {
                        Ok(Some(output)) => println!("{}", output),
                        Ok(None) => {}
                        Err(e) => eprintln!("error: {:#}", e),
                    },
                    Err(msg) => eprintln!("error: {}", msg),
                }
                prompt();
            }
            _ = tokio::time::sleep(wait) => {
                let ran = app.store_mut().run_due();
                debug!(ran, "Timers fired");
            }
        }
    }
    Ok(())
}

/// Start the demo and drive its timers until it finishes.
pub async fn run_demo(app: &mut App) -> Result<()> {
    app.execute(Action::Demo)?;
    while app.store().is_demo_running() {
        if app.store().next_deadline().is_none() {
            warn!("Demo running with nothing scheduled");
            break;
        }
        tokio::time::sleep(next_wait(app.store())).await;
        app.store_mut().run_due();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodbridge_core::ManualClock;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn parse_action(line: &str) -> Action {
        match parse_line(line) {
            Ok(Line::Action(action)) => action,
            other => panic!("expected an action for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_parse_control_lines() {
        assert_eq!(parse_line("   "), Ok(Line::Empty));
        assert_eq!(parse_line("help"), Ok(Line::Help));
        assert_eq!(parse_line("EXIT"), Ok(Line::Quit));
    }

    #[test]
    fn test_parse_simple_verbs() {
        assert_eq!(parse_action("status"), Action::Status);
        assert_eq!(parse_action("role Admin"), Action::Role(Role::Admin));
        assert_eq!(parse_action("accept 1"), Action::Accept("1".to_string()));
        assert_eq!(
            parse_action("  advance   k3x9a0b2c "),
            Action::Advance("k3x9a0b2c".to_string())
        );
        assert_eq!(parse_action("demo"), Action::Demo);
    }

    #[test]
    fn test_parse_onboarding() {
        assert_eq!(
            parse_action("onboard-donor B- 555-0100 Priya Patel"),
            Action::OnboardDonor {
                name: "Priya Patel".to_string(),
                phone: "555-0100".to_string(),
                blood_group: BloodGroup::BNegative,
                location: None,
            }
        );
        assert_eq!(
            parse_action("onboard-admin ADM-7 Dr. Rao | City General Hospital"),
            Action::OnboardAdmin {
                name: "Dr. Rao".to_string(),
                hospital: "City General Hospital".to_string(),
                admin_id: "ADM-7".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_edit_profile() {
        assert_eq!(
            parse_action("edit-profile name Priya R. Patel"),
            Action::EditProfile {
                name: Some("Priya R. Patel".to_string()),
                phone: None,
                blood_group: None,
                location: None,
            }
        );
        assert_eq!(
            parse_action("edit-profile group AB-"),
            Action::EditProfile {
                name: None,
                phone: None,
                blood_group: Some(BloodGroup::AbNegative),
                location: None,
            }
        );
        assert!(parse_line("edit-profile").is_err());
        assert!(parse_line("edit-profile location").is_err());
        assert!(parse_line("edit-profile points 5000").is_err());
        assert!(parse_line("edit-profile group X+").is_err());
    }

    #[test]
    fn test_parse_broadcast() {
        let action = parse_action("broadcast AB+ 4 critical Mercy West | Sector 9");
        assert_eq!(
            action,
            Action::Broadcast(NewRequest {
                blood_type: BloodGroup::AbPositive,
                units: 4,
                hospital: "Mercy West".to_string(),
                location: "Sector 9".to_string(),
                coordinates: HOSPITAL_COORDINATES,
                urgency: Urgency::Critical,
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("fly away").is_err());
        assert!(parse_line("accept").is_err());
        assert!(parse_line("role nurse").is_err());
        assert!(parse_line("broadcast O+ two normal A | B").is_err());
        assert!(parse_line("broadcast O+ 2 normal no separator").is_err());
        assert!(parse_line("onboard-donor Z+ 555 Priya").is_err());
    }

    #[test]
    fn test_wait_for_clamps_past_deadlines() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            wait_for(now + Duration::milliseconds(1500), now),
            StdDuration::from_millis(1500)
        );
        assert_eq!(wait_for(now - Duration::seconds(3), now), StdDuration::ZERO);
    }

    #[test]
    fn test_next_wait_idles_without_timers() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let mut store = Store::new(clock);
        assert_eq!(next_wait(&store), IDLE_WAIT);

        store.add_notification("hello", bloodbridge_core::models::Severity::Info);
        assert_eq!(next_wait(&store), StdDuration::from_secs(5));
    }
}
