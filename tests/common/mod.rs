//! In-memory hosts and loggers shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use fleetrun::error::{Error, Result};
use fleetrun::{Command, ExecutionResult, Host, HostRef, Logger, Protocol};

/// One recorded upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub protocol: Protocol,
    pub local_path: PathBuf,
    pub remote_path: String,
    pub contents: Option<String>,
}

/// A host that records what it is asked to do.
pub struct FakeHost {
    name: String,
    roles: Vec<String>,
    delay: Duration,
    fail_uploads: bool,
    users: BTreeSet<String>,
    groups: BTreeSet<String>,
    exit_codes: Mutex<VecDeque<i32>>,
    failing: Mutex<Vec<(String, i32)>>,
    executed: Mutex<Vec<Command>>,
    remote_dirs: Mutex<BTreeSet<String>>,
    tmpdirs: Mutex<BTreeSet<String>>,
    uploads: Mutex<Vec<Upload>>,
    downloads: Mutex<Vec<(String, PathBuf)>>,
    counter: AtomicUsize,
}

impl FakeHost {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            roles: Vec::new(),
            delay: Duration::ZERO,
            fail_uploads: false,
            users: ["root".to_string()].into_iter().collect(),
            groups: ["root".to_string()].into_iter().collect(),
            exit_codes: Mutex::new(VecDeque::new()),
            failing: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            remote_dirs: Mutex::new(["/tmp".to_string()].into_iter().collect()),
            tmpdirs: Mutex::new(BTreeSet::new()),
            uploads: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    /// Every upload fails on the remote side.
    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.users.insert(user.to_string());
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.insert(group.to_string());
        self
    }

    /// Exit codes handed out, in order, to the next commands run.
    pub fn with_exit_codes(self, codes: &[i32]) -> Self {
        self.exit_codes
            .lock()
            .unwrap()
            .extend(codes.iter().copied());
        self
    }

    /// Any command whose line contains `needle` exits with `code`.
    pub fn failing_on(self, needle: &str, code: i32) -> Self {
        self.failing.lock().unwrap().push((needle.to_string(), code));
        self
    }

    pub fn into_ref(self) -> Arc<FakeHost> {
        Arc::new(self)
    }

    pub fn executed(&self) -> Vec<Command> {
        self.executed.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.executed().iter().map(Command::cmd_line).collect()
    }

    pub fn tmpdirs(&self) -> BTreeSet<String> {
        self.tmpdirs.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }

    fn exit_code_for(&self, line: &str) -> i32 {
        if let Some(code) = self.exit_codes.lock().unwrap().pop_front() {
            return code;
        }
        self.failing
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0)
    }

    fn forget_dir(&self, line: &str) {
        let path = line.rsplit(' ').next().unwrap_or_default();
        self.tmpdirs.lock().unwrap().remove(path);
        self.remote_dirs.lock().unwrap().remove(path);
    }

    fn lookup(&self, known: &BTreeSet<String>, db: &str, name: &str) -> ExecutionResult {
        let command = Command::new("getent").with_args([db, name]);
        if known.contains(name) {
            ExecutionResult::new(&self.name, command, format!("{}:x:1000", name), "", 0)
        } else {
            ExecutionResult::new(&self.name, command, "", "", 2)
        }
    }
}

impl Host for FakeHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn exec(&self, command: &Command) -> Result<ExecutionResult> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.executed.lock().unwrap().push(command.clone());

        let line = command.cmd_line();
        let exit_code = self.exit_code_for(&line);
        if exit_code == 0 && (line.starts_with("rmdir ") || line.starts_with("rm -rf ")) {
            self.forget_dir(&line);
        }

        Ok(ExecutionResult::new(
            &self.name,
            command.clone(),
            format!("{} ran {}", self.name, line),
            if exit_code == 0 { "" } else { "boom" },
            exit_code,
        ))
    }

    fn transfer_to(
        &self,
        local_path: &Path,
        remote_path: &str,
        protocol: Protocol,
    ) -> Result<ExecutionResult> {
        if !local_path.exists() {
            return Err(Error::LocalFileNotFound(local_path.to_path_buf()));
        }

        let command = Command::new(protocol.to_string())
            .with_args([local_path.display().to_string(), remote_path.to_string()]);
        let parent = Path::new(remote_path)
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if self.fail_uploads {
            let result = ExecutionResult::new(
                &self.name,
                command,
                "",
                format!("{}: Permission denied", remote_path),
                1,
            );
            return result.ensure_success();
        }
        if !self.remote_dirs.lock().unwrap().contains(&parent) {
            let result = ExecutionResult::new(
                &self.name,
                command,
                "",
                format!("{}: No such file or directory", remote_path),
                1,
            );
            return result.ensure_success();
        }

        self.uploads.lock().unwrap().push(Upload {
            protocol,
            local_path: local_path.to_path_buf(),
            remote_path: remote_path.to_string(),
            contents: fs::read_to_string(local_path).ok(),
        });
        Ok(ExecutionResult::new(&self.name, command, "", "", 0))
    }

    fn transfer_from(
        &self,
        remote_path: &str,
        local_path: &Path,
        protocol: Protocol,
    ) -> Result<ExecutionResult> {
        self.downloads
            .lock()
            .unwrap()
            .push((remote_path.to_string(), local_path.to_path_buf()));
        let command = Command::new(protocol.to_string())
            .with_args([remote_path.to_string(), local_path.display().to_string()]);
        Ok(ExecutionResult::new(&self.name, command, "", "", 0))
    }

    fn tmpdir(&self, prefix: &str) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/{}.{}", prefix, n);
        self.tmpdirs.lock().unwrap().insert(path.clone());
        self.remote_dirs.lock().unwrap().insert(path.clone());
        Ok(path)
    }

    fn user_get(&self, name: &str) -> Result<ExecutionResult> {
        Ok(self.lookup(&self.users, "passwd", name))
    }

    fn group_get(&self, name: &str) -> Result<ExecutionResult> {
        Ok(self.lookup(&self.groups, "group", name))
    }
}

/// Upcasts a fake for use in a fleet or specifier.
pub fn host_ref(host: &Arc<FakeHost>) -> HostRef {
    Arc::clone(host) as HostRef
}

/// A logger that keeps every result it sees.
#[derive(Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<ExecutionResult>>,
}

impl RecordingLogger {
    pub fn records(&self) -> Vec<ExecutionResult> {
        self.records.lock().unwrap().clone()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.host).collect()
    }
}

impl Logger for RecordingLogger {
    fn record(&self, result: &ExecutionResult) {
        self.records.lock().unwrap().push(result.clone());
    }
}
