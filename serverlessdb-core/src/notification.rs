//! Shape of the messages published by `notify_event()`.
//!
//! Listeners on the `events` channel receive payloads such as
//! `{"table":"products","action":"INSERT","data":{"id":1,"name":"lamp"}}`.

use serde::{Deserialize, Serialize};

/// Row operation reported in `action` (PostgreSQL's `TG_OP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowAction {
    /// Row inserted; `data` holds the new row
    Insert,
    /// Row updated; `data` holds the new row
    Update,
    /// Row deleted; `data` holds the old row
    Delete,
}

impl std::fmt::Display for RowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => f.write_str("INSERT"),
            Self::Update => f.write_str("UPDATE"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Unqualified table name (`TG_TABLE_NAME`)
    pub table: String,
    /// Operation that fired the trigger
    pub action: RowAction,
    /// `row_to_json` of the affected row image
    pub data: serde_json::Value,
}

impl NotificationPayload {
    /// Parses a raw notification payload.
    ///
    /// # Errors
    /// Returns the `serde_json` error if the text is not a payload object.
    ///
    /// # Example
    /// ```rust
    /// use serverlessdb_core::notification::{NotificationPayload, RowAction};
    ///
    /// let payload = NotificationPayload::parse(
    ///     r#"{"table":"products","action":"DELETE","data":{"id":7}}"#,
    /// )?;
    /// assert_eq!(payload.action, RowAction::Delete);
    /// assert_eq!(payload.data["id"], 7);
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}
