// SSH Tunnel Launcher - System Probes
// Read-only queries against the loopback alias table and the process table

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::command::is_tunnel_process;
use crate::error::{Error, Result};
use crate::network::parse_loopback_aliases;
use crate::types::TunnelState;

/// OS state the action list builder consults
#[cfg_attr(test, automock)]
pub trait SystemProbe {
    /// Addresses currently aliased on the loopback interface
    fn loopback_aliases(&self) -> Result<BTreeSet<String>>;

    /// Number of tunnel processes bound to `bind_address`
    fn tunnel_process_count(&self, bind_address: &str) -> Result<usize>;
}

/// Probe the tunnel's process state.
///
/// The process table is advisory: a failed query reports the tunnel as
/// stopped instead of aborting the invocation.
pub fn tunnel_state(probe: &dyn SystemProbe, bind_address: &str) -> TunnelState {
    match probe.tunnel_process_count(bind_address) {
        Ok(0) => TunnelState::Stopped,
        Ok(count) => {
            debug!("{} tunnel process(es) bound to {}", count, bind_address);
            TunnelState::Running
        }
        Err(e) => {
            warn!(
                "Process probe for {} failed, assuming stopped: {}",
                bind_address, e
            );
            TunnelState::Stopped
        }
    }
}

/// Probe backed by `ifconfig` and `ps`
#[derive(Debug, Clone, Default)]
pub struct OsProbe {
    extra_path: Vec<PathBuf>,
}

impl OsProbe {
    /// `extra_path` directories are appended to PATH for the queries
    pub fn new(extra_path: Vec<PathBuf>) -> Self {
        Self { extra_path }
    }

    fn search_path(&self) -> Option<OsString> {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let mut dirs: Vec<PathBuf> = std::env::split_paths(&current).collect();
        for dir in &self.extra_path {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        std::env::join_paths(dirs).ok()
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(path) = self.search_path() {
            cmd.env("PATH", path);
        }

        let output = cmd
            .output()
            .map_err(|e| Error::Probe(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(Error::Probe(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| Error::Probe(format!("{} produced non UTF-8 output", program)))
    }
}

impl SystemProbe for OsProbe {
    fn loopback_aliases(&self) -> Result<BTreeSet<String>> {
        let output = self.run("ifconfig", &[])?;
        let aliases = parse_loopback_aliases(&output)?;
        debug!("Loopback aliases: {:?}", aliases);
        Ok(aliases)
    }

    fn tunnel_process_count(&self, bind_address: &str) -> Result<usize> {
        let listing = self.run("ps", &["-A", "-ww", "-o", "command="])?;
        Ok(count_tunnel_processes(&listing, bind_address))
    }
}

/// Count the lines of a `ps -o command=` listing that belong to the tunnel
pub fn count_tunnel_processes(listing: &str, bind_address: &str) -> usize {
    listing
        .lines()
        .filter(|line| is_tunnel_process(line.trim_start(), bind_address))
        .count()
}
