//! Named credential sections stored in a YAML file.
//!
//! ```yaml
//! default:
//!   pool_token: "abc123"
//! staging:
//!   pool_token: "def456"
//! ```

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable selecting the credential section.
pub const CREDENTIAL_ENV: &str = "FLEETRUN_CREDENTIAL";

const DEFAULT_SECTION: &str = "default";

/// Returns one credential section from `path` as a string map.
///
/// The section comes from `FLEETRUN_CREDENTIAL` when set, otherwise from
/// `credential`, otherwise `default`.
pub fn parse_credentials_file(
    path: &Path,
    credential: Option<&str>,
) -> Result<BTreeMap<String, String>> {
    let section = env::var(CREDENTIAL_ENV).ok();
    let section = section
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(credential)
        .unwrap_or(DEFAULT_SECTION);

    if !path.exists() {
        return Err(Error::Config(format!(
            "Credentials file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path)?;
    parse_credentials(&contents, section)
        .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
}

/// Extracts `section` from credential YAML.
pub fn parse_credentials(contents: &str, section: &str) -> Result<BTreeMap<String, String>> {
    if contents.trim().is_empty() {
        return Err(Error::Config("credentials file is empty".to_string()));
    }

    let doc: Value = serde_yaml::from_str(contents)
        .map_err(|e| Error::Config(format!("credentials file has a syntax error: {}", e)))?;

    let sections = doc
        .as_mapping()
        .ok_or_else(|| Error::Config("credentials file is not a mapping of sections".to_string()))?;

    let found = sections
        .iter()
        .find(|(key, _)| key_name(key).as_deref() == Some(section))
        .map(|(_, value)| value)
        .ok_or_else(|| {
            Error::Config(format!("credentials file has no '{}' section", section))
        })?;

    let entries = found.as_mapping().ok_or_else(|| {
        Error::Config(format!("credential section '{}' is not a mapping", section))
    })?;

    let mut credentials = BTreeMap::new();
    for (key, value) in entries {
        let key = key_name(key).ok_or_else(|| {
            Error::Config(format!("non-string key in credential section '{}'", section))
        })?;
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(Error::Config(format!(
                    "credential '{}' in section '{}' is not a scalar",
                    key, section
                )))
            }
        };
        credentials.insert(key, value);
    }

    Ok(credentials)
}

/// Section and entry keys may be written as `name` or `:name`.
fn key_name(key: &Value) -> Option<String> {
    key.as_str()
        .map(|s| s.strip_prefix(':').unwrap_or(s).to_string())
}
