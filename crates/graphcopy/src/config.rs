//! Run configuration for schema copies and permission syncs.

use std::collections::BTreeSet;

use graphcopy_sql::Placeholders;

/// Tables that are ordered but never copied unless configured otherwise.
pub const DEFAULT_EXCLUDED_TABLES: &[&str] = &["version"];

/// Settings for one schema copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyConfig {
    /// Schema read on the source connection.
    pub source_schema: String,
    /// Schema written on the destination connection.
    pub destination_schema: String,
    /// Requested rows per insert; `None` uses the default.
    pub batch_size: Option<usize>,
    /// Tables that take part in ordering but are not copied.
    pub excluded_tables: BTreeSet<String>,
    pub placeholders: Placeholders,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            source_schema: "public".to_string(),
            destination_schema: String::new(),
            batch_size: None,
            excluded_tables: DEFAULT_EXCLUDED_TABLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            placeholders: Placeholders::Dollar,
        }
    }
}

impl CopyConfig {
    /// Copy from `public` into `destination_schema` with default settings.
    pub fn new(destination_schema: impl Into<String>) -> Self {
        Self {
            destination_schema: destination_schema.into(),
            ..Self::default()
        }
    }

    pub fn source_schema(mut self, schema: impl Into<String>) -> Self {
        self.source_schema = schema.into();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Add a table to the excluded set.
    pub fn exclude(mut self, table: impl Into<String>) -> Self {
        self.excluded_tables.insert(table.into());
        self
    }

    /// Replace the excluded set, dropping the defaults.
    pub fn excluded_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn is_excluded(&self, table: &str) -> bool {
        self.excluded_tables.contains(table)
    }
}

/// Settings for a permissions sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionsConfig {
    pub destination_schema: String,
    pub batch_size: Option<usize>,
}

impl PermissionsConfig {
    pub fn new(destination_schema: impl Into<String>) -> Self {
        Self {
            destination_schema: destination_schema.into(),
            batch_size: None,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}
