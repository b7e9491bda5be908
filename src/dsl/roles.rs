//! Turning host references into concrete host lists.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::host::{Host, HostRef};

/// Designates one host, an explicit list of hosts, or a role tag.
#[derive(Debug, Clone)]
pub enum HostSpecifier {
    Single(HostRef),
    List(Vec<HostRef>),
    Role(String),
}

impl HostSpecifier {
    /// Creates a role specifier; `:master` and `master` are the same tag.
    pub fn role(tag: impl Into<String>) -> Self {
        HostSpecifier::Role(tag.into())
    }

    /// Single-host specifiers produce a bare result instead of a sequence.
    pub fn is_single(&self) -> bool {
        matches!(self, HostSpecifier::Single(_))
    }
}

impl From<HostRef> for HostSpecifier {
    fn from(host: HostRef) -> Self {
        HostSpecifier::Single(host)
    }
}

impl From<&HostRef> for HostSpecifier {
    fn from(host: &HostRef) -> Self {
        HostSpecifier::Single(Arc::clone(host))
    }
}

impl From<Vec<HostRef>> for HostSpecifier {
    fn from(hosts: Vec<HostRef>) -> Self {
        HostSpecifier::List(hosts)
    }
}

impl From<&Vec<HostRef>> for HostSpecifier {
    fn from(hosts: &Vec<HostRef>) -> Self {
        HostSpecifier::List(hosts.clone())
    }
}

impl From<&[HostRef]> for HostSpecifier {
    fn from(hosts: &[HostRef]) -> Self {
        HostSpecifier::List(hosts.to_vec())
    }
}

impl From<&str> for HostSpecifier {
    fn from(tag: &str) -> Self {
        HostSpecifier::role(tag)
    }
}

impl From<String> for HostSpecifier {
    fn from(tag: String) -> Self {
        HostSpecifier::role(tag)
    }
}

/// Resolves a specifier against the inventory, preserving order.
///
/// An empty explicit list is a caller error. A role that no host carries
/// resolves to an empty list.
pub fn resolve_hosts(spec: &HostSpecifier, inventory: &[HostRef]) -> Result<Vec<HostRef>> {
    match spec {
        HostSpecifier::Single(host) => Ok(vec![Arc::clone(host)]),
        HostSpecifier::List(hosts) => {
            if hosts.is_empty() {
                return Err(Error::InvalidArgument(
                    "expected a host, a non-empty list of hosts, or a role tag; got an empty host list"
                        .to_string(),
                ));
            }
            Ok(hosts.clone())
        }
        HostSpecifier::Role(tag) => {
            let tag = tag.strip_prefix(':').unwrap_or(tag);
            Ok(inventory
                .iter()
                .filter(|host| host.has_role(tag))
                .cloned()
                .collect())
        }
    }
}

/// Names of a host list, for logging.
pub fn host_names(hosts: &[HostRef]) -> Vec<&str> {
    hosts.iter().map(|h| h.name()).collect()
}
