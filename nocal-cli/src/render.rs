//! Terminal rendering for nocal types.
//!
//! Extension traits that add colored output to nocal-core types using
//! owo_colors. Times are shown in local time.

use chrono::{DateTime, Local, NaiveDate};
use nocal_core::{BatchReport, Event, Invite, InviteScope};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

fn local_time(timestamp: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&Local))
}

/// "Today", "Tomorrow", "Yesterday" or e.g. "Wed Feb 25"
fn format_date_label(date: NaiveDate) -> String {
    let today = Local::now().date_naive();

    match (date - today).num_days() {
        -1 => "Yesterday".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

fn format_time(timestamp: i64) -> String {
    match local_time(timestamp) {
        Some(dt) => format!("{:>7}", dt.format("%H:%M")),
        None => format!("{:>7}", "??:??"),
    }
}

fn repeat_tag(event: &Event) -> Option<String> {
    match event.delta {
        d if !event.is_regular || d <= 0 => None,
        1 => Some("daily".to_string()),
        7 => Some("weekly".to_string()),
        d => Some(format!("every {d} days")),
    }
}

impl Render for Event {
    fn render(&self) -> String {
        let when = match local_time(self.timestamp) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => self.timestamp.to_string(),
        };

        let mut line = format!("{} {}", when.bold(), self.title);
        if let Some(tag) = repeat_tag(self) {
            line.push_str(&format!(" {}", format!("[{tag}]").cyan()));
        }
        if !self.description.is_empty() {
            line.push_str(&format!("\n  {}", self.description));
        }

        let waiting: Vec<&str> = self
            .members
            .iter()
            .filter(|m| !self.is_active_member(m))
            .map(String::as_str)
            .collect();
        line.push_str(&format!(
            "\n  {} {}",
            "with".dimmed(),
            self.active_members.join(", ")
        ));
        if !waiting.is_empty() {
            line.push_str(&format!(" {}", format!("(waiting on {})", waiting.join(", ")).yellow()));
        }
        line.push_str(&format!("\n  {}", self.id.dimmed()));
        line
    }
}

impl Render for Invite {
    fn render(&self) -> String {
        let scope = match self.scope {
            InviteScope::Series => "series",
            InviteScope::Occurrence => "once",
        };
        format!("{} {}", "?".yellow(), format!("[{scope}]").dimmed())
    }
}

impl Render for BatchReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "  {} processed, {} changed",
            self.processed,
            self.changed.green()
        )];
        for failure in &self.failures {
            lines.push(format!("  {} {}: {}", "✗".red(), failure.id, failure.reason.red()));
        }
        lines.join("\n")
    }
}

/// Occurrences grouped by day, one line each.
pub fn agenda(events: &[Event]) -> String {
    let mut out = String::new();
    let mut current_date: Option<String> = None;

    for event in events {
        let date_label = match local_time(event.timestamp) {
            Some(dt) => format_date_label(dt.date_naive()),
            None => "Unknown date".to_string(),
        };

        if current_date.as_ref() != Some(&date_label) {
            if current_date.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("{}\n", date_label.bold()));
            current_date = Some(date_label);
        }

        let mut line = format!("  {} {}", format_time(event.timestamp), event.title);
        if let Some(tag) = repeat_tag(event) {
            line.push_str(&format!(" {}", format!("[{tag}]").dimmed()));
        }
        out.push_str(&format!("{line} {}\n", event.id.dimmed()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(is_regular: bool, delta: i64) -> Event {
        Event {
            id: "e1".to_string(),
            title: "Standup".to_string(),
            description: String::new(),
            timestamp: 1_700_000_000,
            members: vec!["alice".to_string(), "bob".to_string()],
            active_members: vec!["alice".to_string()],
            author: "alice".to_string(),
            is_regular,
            delta,
        }
    }

    #[test]
    fn test_repeat_tag() {
        assert_eq!(repeat_tag(&make_event(false, 0)), None);
        assert_eq!(repeat_tag(&make_event(true, 0)), None);
        assert_eq!(repeat_tag(&make_event(true, 7)).as_deref(), Some("weekly"));
        assert_eq!(repeat_tag(&make_event(true, 3)).as_deref(), Some("every 3 days"));
    }

    #[test]
    fn test_agenda_groups_by_day() {
        let morning = make_event(false, 0);
        let mut later = make_event(false, 0);
        later.id = "e2".to_string();
        later.timestamp += 60;
        let mut next_week = make_event(false, 0);
        next_week.id = "e3".to_string();
        next_week.timestamp += 7 * 24 * 60 * 60;

        let rendered = agenda(&[morning, later, next_week]);
        assert_eq!(rendered.matches("Standup").count(), 3);
        assert_eq!(rendered.lines().filter(|l| l.is_empty()).count(), 1);
    }

    #[test]
    fn test_event_render_lists_waiting_members() {
        let rendered = make_event(true, 7).render();
        assert!(rendered.contains("bob"));
        assert!(rendered.contains("e1"));
    }
}
