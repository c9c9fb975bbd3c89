//! SQL text for the notify function and the per-table trigger.
//!
//! Table and trigger names are always emitted as quoted identifiers, so they
//! match case-sensitively and cannot inject SQL.

use crate::error::ProvisionStage;
use crate::{Result, ServerlessDbError};

/// Name of the shared trigger function.
pub const NOTIFY_FUNCTION_NAME: &str = "notify_event";

/// Channel the function publishes on.
pub const NOTIFY_CHANNEL: &str = "events";

/// Table used when `--table` is not given.
pub const DEFAULT_TABLE: &str = "products";

/// Appended to the table name to derive the trigger name.
pub const TRIGGER_NAME_SUFFIX: &str = "_notify_event";

/// PostgreSQL's NAMEDATALEN - 1.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Creates (or replaces) `notify_event()`.
///
/// Publishes `{"table": TG_TABLE_NAME, "action": TG_OP, "data": <row>}` on
/// the `events` channel, where `<row>` is `OLD` for DELETE and `NEW`
/// otherwise. Returns NULL since it only runs as an AFTER trigger.
pub const NOTIFY_FUNCTION_SQL: &str = r#"CREATE OR REPLACE FUNCTION notify_event() RETURNS TRIGGER AS $$
DECLARE
    data json;
    notification json;
BEGIN
    IF (TG_OP = 'DELETE') THEN
        data = row_to_json(OLD);
    ELSE
        data = row_to_json(NEW);
    END IF;

    notification = json_build_object(
        'table', TG_TABLE_NAME,
        'action', TG_OP,
        'data', data);

    PERFORM pg_notify('events', notification::text);

    RETURN NULL;
END;
$$ LANGUAGE plpgsql;"#;

/// A validated, unqualified PostgreSQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    /// Validates `name` as an identifier.
    ///
    /// # Errors
    /// Empty names, names longer than 63 bytes and names containing NUL are
    /// rejected.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(ServerlessDbError::invalid_identifier(
                name,
                "identifier cannot be empty",
            ));
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(ServerlessDbError::invalid_identifier(
                name,
                format!("identifier exceeds {} bytes", MAX_IDENTIFIER_LEN),
            ));
        }
        if name.contains('\0') {
            return Err(ServerlessDbError::invalid_identifier(
                name,
                "identifier cannot contain NUL",
            ));
        }
        Ok(Self(name.to_string()))
    }

    /// The raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form with embedded quotes doubled.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A table name, optionally schema-qualified (`schema.table`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<Identifier>,
    table: Identifier,
}

impl TableName {
    /// Parses `table` or `schema.table`. Dots inside names are not supported.
    ///
    /// # Errors
    /// Returns an identifier error for more than one dot or an invalid part.
    pub fn parse(name: &str) -> Result<Self> {
        let mut parts = name.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(table), None, _) => Ok(Self {
                schema: None,
                table: Identifier::new(table)?,
            }),
            (Some(schema), Some(table), None) => Ok(Self {
                schema: Some(Identifier::new(schema)?),
                table: Identifier::new(table)?,
            }),
            _ => Err(ServerlessDbError::invalid_identifier(
                name,
                "expected `table` or `schema.table`",
            )),
        }
    }

    /// Unqualified table name, as reported by `TG_TABLE_NAME`.
    pub const fn table(&self) -> &Identifier {
        &self.table
    }

    /// Quoted, possibly schema-qualified name for use in SQL.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema.quoted(), self.table.quoted()),
            None => self.table.quoted(),
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// Which table to attach the trigger to, and what to call it.
///
/// # Example
/// ```rust
/// use serverlessdb_core::provision::TriggerRequest;
///
/// let request = TriggerRequest::new(None, Some("orders"))?;
/// assert_eq!(request.trigger().as_str(), "orders_notify_event");
/// assert!(request.create_trigger_sql().contains(r#"ON "orders""#));
/// # Ok::<(), serverlessdb_core::ServerlessDbError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    trigger: Identifier,
    table: TableName,
}

impl Default for TriggerRequest {
    fn default() -> Self {
        Self {
            trigger: Identifier(format!("{}{}", DEFAULT_TABLE, TRIGGER_NAME_SUFFIX)),
            table: TableName {
                schema: None,
                table: Identifier(DEFAULT_TABLE.to_string()),
            },
        }
    }
}

impl TriggerRequest {
    /// Builds a request from optional `--trigger` / `--table` values.
    ///
    /// Empty strings count as absent. The table defaults to `products`; the
    /// trigger defaults to `<table>_notify_event`.
    ///
    /// # Errors
    /// Returns an identifier error when a name is invalid, including a
    /// derived trigger name that would exceed 63 bytes.
    pub fn new(trigger: Option<&str>, table: Option<&str>) -> Result<Self> {
        let table = match table.filter(|t| !t.is_empty()) {
            Some(name) => TableName::parse(name)?,
            None => TableName::parse(DEFAULT_TABLE)?,
        };

        let trigger = match trigger.filter(|t| !t.is_empty()) {
            Some(name) => Identifier::new(name)?,
            None => {
                let derived = format!("{}{}", table.table().as_str(), TRIGGER_NAME_SUFFIX);
                Identifier::new(&derived).map_err(|_| {
                    ServerlessDbError::invalid_identifier(
                        derived.as_str(),
                        "derived trigger name is too long; pass --trigger",
                    )
                })?
            }
        };

        Ok(Self { trigger, table })
    }

    /// Trigger name.
    pub const fn trigger(&self) -> &Identifier {
        &self.trigger
    }

    /// Target table.
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    /// `CREATE TRIGGER` statement binding `notify_event()` to the table.
    pub fn create_trigger_sql(&self) -> String {
        format!(
            "CREATE TRIGGER {}\nAFTER INSERT OR UPDATE OR DELETE ON {}\n    FOR EACH ROW EXECUTE PROCEDURE {}();",
            self.trigger.quoted(),
            self.table.quoted(),
            NOTIFY_FUNCTION_NAME
        )
    }

    /// Statements in execution order.
    pub fn statements(&self) -> [(ProvisionStage, String); 2] {
        [
            (
                ProvisionStage::FunctionCreation,
                NOTIFY_FUNCTION_SQL.to_string(),
            ),
            (ProvisionStage::TriggerCreation, self.create_trigger_sql()),
        ]
    }
}
