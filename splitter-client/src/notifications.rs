//! Transient user-facing notices (toasts).

use chrono::{DateTime, Utc};
use splitter_core::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Single-line rendering: `title: description`, or just the title.
    pub fn text(&self) -> String {
        match &self.description {
            Some(description) if !description.is_empty() => {
                format!("{}: {}", self.title, description)
            }
            _ => self.title.clone(),
        }
    }

    /// Notice to show for a realtime event, if the event warrants one.
    pub fn for_event(event: &ServerEvent) -> Option<Self> {
        match event {
            ServerEvent::ExpenseCreated { description } => {
                let notice = Notice::new(NoticeLevel::Info, "New expense added");
                Some(match description {
                    Some(description) => notice.with_description(description.clone()),
                    None => notice,
                })
            }
            ServerEvent::SettlementCreated => Some(
                Notice::new(NoticeLevel::Info, "Settlement recorded")
                    .with_description("A payment has been recorded"),
            ),
            ServerEvent::GroupMemberJoined { display_name } => {
                let notice = Notice::new(NoticeLevel::Info, "New member joined");
                Some(match display_name {
                    Some(name) => notice.with_description(format!("{} joined the group", name)),
                    None => notice,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_notice_names_the_expense() {
        let notice = Notice::for_event(&ServerEvent::ExpenseCreated {
            description: Some("Lunch".to_string()),
        })
        .unwrap();
        assert_eq!(notice.text(), "New expense added: Lunch");
    }

    #[test]
    fn expense_notice_without_description_uses_title() {
        let notice = Notice::for_event(&ServerEvent::ExpenseCreated { description: None }).unwrap();
        assert_eq!(notice.text(), "New expense added");
    }

    #[test]
    fn member_notice_names_the_member() {
        let notice = Notice::for_event(&ServerEvent::GroupMemberJoined {
            display_name: Some("Bea".to_string()),
        })
        .unwrap();
        assert_eq!(notice.text(), "New member joined: Bea joined the group");
    }

    #[test]
    fn silent_events_produce_no_notice() {
        for event in [
            ServerEvent::ExpenseUpdated,
            ServerEvent::ExpenseDeleted,
            ServerEvent::SettlementConfirmed,
            ServerEvent::GroupUpdated,
            ServerEvent::Notification,
            ServerEvent::Heartbeat,
            ServerEvent::Unknown("PING".to_string()),
        ] {
            assert!(Notice::for_event(&event).is_none(), "{:?}", event);
        }
    }
}
