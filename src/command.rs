//! Command descriptors dispatched to hosts.
//!
//! A [`Command`] is an immutable description of a command line: the
//! command itself, its positional arguments and an environment overlay.
//! Dispatch never mutates a caller's descriptor; environment overrides
//! produce a new descriptor via [`Command::with_environment`].

use serde::Serialize;
use std::collections::BTreeMap;

/// A command line plus the environment it should run under.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Command {
    /// The command (may itself contain arguments, e.g. `ls ~/.bin`)
    pub command: String,
    /// Positional arguments appended after the command
    pub args: Vec<String>,
    /// Environment variables exported before running the command
    pub environment: BTreeMap<String, String>,
    /// Transport-specific options (`SshHost` honours `pty`)
    pub options: BTreeMap<String, String>,
}

impl Command {
    /// Creates a descriptor with no arguments and an empty environment.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Builder method to append positional arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Builder method to set a transport option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with `overlay` merged over the bound environment.
    ///
    /// Merge is key by key: overlay values win, keys only present in the
    /// bound environment are kept.
    pub fn with_environment(&self, overlay: &BTreeMap<String, String>) -> Self {
        let mut merged = self.clone();
        for (key, value) in overlay {
            merged.environment.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Builder variant of [`Command::with_environment`] for a single variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Renders the full shell command line, environment first.
    pub fn cmd_line(&self) -> String {
        let mut parts = Vec::new();

        if !self.environment.is_empty() {
            parts.push("env".to_string());
            for (key, value) in &self.environment {
                parts.push(format!("{}={}", key, shell_quote(value)));
            }
        }

        parts.push(self.command.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl From<&str> for Command {
    fn from(command: &str) -> Self {
        Command::new(command)
    }
}

impl From<String> for Command {
    fn from(command: String) -> Self {
        Command::new(command)
    }
}

impl From<&String> for Command {
    fn from(command: &String) -> Self {
        Command::new(command.clone())
    }
}

impl From<&Command> for Command {
    fn from(command: &Command) -> Self {
        command.clone()
    }
}

/// Quotes a value for a POSIX shell when it contains anything unusual.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
