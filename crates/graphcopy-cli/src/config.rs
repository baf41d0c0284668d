//! Turns command line arguments into run configurations.

use graphcopy::{CopyConfig, PermissionsConfig};
use thiserror::Error;

/// Arguments that fail validation before any connection is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--{flag} must not be empty")]
    EmptySchema { flag: &'static str },

    #[error("--batch-size must be at least 1")]
    ZeroBatchSize,

    #[error("source and destination are both schema '{schema}' of the same database")]
    SameTarget { schema: String },
}

/// Connection URLs for both sides of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub source: String,
    pub destination: String,
}

/// Build the copy configuration, refusing to copy a schema onto itself.
///
/// `exclude` adds to the default exclusions unless `keep_default_excludes`
/// is false, in which case it replaces them.
pub fn copy_config(
    endpoints: &Endpoints,
    source_schema: &str,
    destination_schema: &str,
    batch_size: Option<usize>,
    exclude: &[String],
    keep_default_excludes: bool,
) -> Result<CopyConfig, ConfigError> {
    let source_schema = non_empty("source-schema", source_schema)?;
    let destination_schema = non_empty("destination-schema", destination_schema)?;

    if endpoints.source == endpoints.destination && source_schema == destination_schema {
        return Err(ConfigError::SameTarget {
            schema: source_schema.to_string(),
        });
    }

    let mut config = CopyConfig::new(destination_schema).source_schema(source_schema);
    if let Some(size) = check_batch_size(batch_size)? {
        config = config.batch_size(size);
    }
    if keep_default_excludes {
        for table in exclude {
            config = config.exclude(table.as_str());
        }
    } else {
        config = config.excluded_tables(exclude.iter().map(String::as_str));
    }
    Ok(config)
}

pub fn permissions_config(
    destination_schema: &str,
    batch_size: Option<usize>,
) -> Result<PermissionsConfig, ConfigError> {
    let mut config = PermissionsConfig::new(non_empty("destination-schema", destination_schema)?);
    if let Some(size) = check_batch_size(batch_size)? {
        config = config.batch_size(size);
    }
    Ok(config)
}

fn non_empty<'s>(flag: &'static str, value: &'s str) -> Result<&'s str, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ConfigError::EmptySchema { flag })
    } else {
        Ok(value)
    }
}

fn check_batch_size(batch_size: Option<usize>) -> Result<Option<usize>, ConfigError> {
    match batch_size {
        Some(0) => Err(ConfigError::ZeroBatchSize),
        other => Ok(other),
    }
}

/// Mask password in database URL for display
pub fn mask_password(url: &str) -> String {
    // Simple masking: replace password between :// and the last @
    if let Some(start) = url.find("://") {
        if let Some(at) = url.rfind('@') {
            if at > start + 3 {
                let prefix = &url[..start + 3];
                let suffix = &url[at..];
                if let Some(colon) = url[start + 3..at].find(':') {
                    let user = &url[start + 3..start + 3 + colon];
                    return format!("{}{}:***{}", prefix, user, suffix);
                }
            }
        }
    }
    url.to_string()
}
