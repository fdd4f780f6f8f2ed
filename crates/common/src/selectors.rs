//! Selector table
//!
//! Single source of truth for how the suite finds elements in the
//! application's markup. Scenarios refer to a [`Role`]; the query behind a
//! role can be overridden from configuration without touching scenarios.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Semantic UI role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    UploadInput,
    SubmitButton,
    FileRow,
    DeleteButton,
    ProcessButton,
    StatusBadge,
    UploadProgress,
    ChatTextarea,
    AskButton,
    ChatMessages,
    UserBubble,
    BotBubble,
    ErrorIndicator,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::UploadInput,
        Role::SubmitButton,
        Role::FileRow,
        Role::DeleteButton,
        Role::ProcessButton,
        Role::StatusBadge,
        Role::UploadProgress,
        Role::ChatTextarea,
        Role::AskButton,
        Role::ChatMessages,
        Role::UserBubble,
        Role::BotBubble,
        Role::ErrorIndicator,
    ];

    /// snake_case key used in config files and generated scripts
    pub fn key(&self) -> &'static str {
        match self {
            Role::UploadInput => "upload_input",
            Role::SubmitButton => "submit_button",
            Role::FileRow => "file_row",
            Role::DeleteButton => "delete_button",
            Role::ProcessButton => "process_button",
            Role::StatusBadge => "status_badge",
            Role::UploadProgress => "upload_progress",
            Role::ChatTextarea => "chat_textarea",
            Role::AskButton => "ask_button",
            Role::ChatMessages => "chat_messages",
            Role::UserBubble => "user_bubble",
            Role::BotBubble => "bot_bubble",
            Role::ErrorIndicator => "error_indicator",
        }
    }

    fn default_query(&self) -> &'static str {
        match self {
            Role::UploadInput => r#"input[type="file"]"#,
            Role::SubmitButton => "button.inline-flex.items-center.justify-center",
            Role::FileRow => "span.text-sm.truncate",
            Role::DeleteButton => r#"button[aria-label="Delete file"]"#,
            Role::ProcessButton => r#"button[aria-label="Process file"]"#,
            Role::StatusBadge => "div.inline-flex.items-center.rounded-md",
            Role::UploadProgress => "progress, .upload-progress, .spinner",
            Role::ChatTextarea => "textarea",
            Role::AskButton => r#"button:has-text("Ask Question")"#,
            Role::ChatMessages => r#"[data-testid="chat-messages"], .chat-messages, [role="log"]"#,
            Role::UserBubble => r#"[data-testid="msg-user"], .message.user, .bubble.user"#,
            Role::BotBubble => r#"[data-testid="msg-bot"], .message.bot, .bubble.bot"#,
            Role::ErrorIndicator => r#"[role="alert"], .toast-error, [data-testid="upload-error"]"#,
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.key() == s)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Mapping from role to DOM query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorTable {
    queries: BTreeMap<Role, String>,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            queries: Role::ALL
                .iter()
                .map(|role| (*role, role.default_query().to_string()))
                .collect(),
        }
    }
}

impl SelectorTable {
    /// Defaults with overrides keyed by role name
    pub fn from_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut table = Self::default();
        for (key, query) in overrides {
            table = table.with_override(key.parse()?, query.clone());
        }
        Ok(table)
    }

    pub fn with_override(mut self, role: Role, query: impl Into<String>) -> Self {
        self.queries.insert(role, query.into());
        self
    }

    pub fn get(&self, role: Role) -> &str {
        // every role is seeded in Default and never removed
        self.queries
            .get(&role)
            .map(String::as_str)
            .unwrap_or_else(|| role.default_query())
    }

    /// Row query narrowed to rows whose text contains `name`
    pub fn row_with_name(&self, name: &str) -> String {
        format!("{}:has-text({})", self.get(Role::FileRow), quote(name))
    }

    pub fn all(&self) -> impl Iterator<Item = (Role, &str)> {
        self.queries.iter().map(|(role, query)| (*role, query.as_str()))
    }

    /// Table keyed by role name, the shape generated scripts consume
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .all()
            .map(|(role, query)| (role.key().to_string(), serde_json::Value::from(query)))
            .collect();
        serde_json::Value::Object(map)
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_a_query() {
        let table = SelectorTable::default();
        assert_eq!(table.all().count(), Role::ALL.len());
        for role in Role::ALL {
            assert!(!table.get(role).is_empty(), "{:?} has no query", role);
        }
    }

    #[test]
    fn test_role_keys_are_unique_and_round_trip() {
        let mut keys: Vec<&str> = Role::ALL.iter().map(Role::key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), Role::ALL.len());

        for role in Role::ALL {
            assert_eq!(role.key().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_override_replaces_one_role() {
        let mut overrides = BTreeMap::new();
        overrides.insert("bot_bubble".to_string(), ".answer".to_string());
        let table = SelectorTable::from_overrides(&overrides).unwrap();

        assert_eq!(table.get(Role::BotBubble), ".answer");
        assert_eq!(table.get(Role::FileRow), "span.text-sm.truncate");
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("send_button".to_string(), "button".to_string());
        assert!(matches!(
            SelectorTable::from_overrides(&overrides),
            Err(Error::UnknownRole(_))
        ));
    }

    #[test]
    fn test_row_with_name_quotes_text() {
        let table = SelectorTable::default();
        assert_eq!(
            table.row_with_name("sample1.txt"),
            r#"span.text-sm.truncate:has-text("sample1.txt")"#
        );
        assert_eq!(
            table.row_with_name(r#"a"b.txt"#),
            r#"span.text-sm.truncate:has-text("a\"b.txt")"#
        );
    }

    #[test]
    fn test_json_uses_role_keys() {
        let json = SelectorTable::default().to_json();
        assert_eq!(json["ask_button"], r#"button:has-text("Ask Question")"#);
    }
}
