//! Freeing the UDP port from a previous run.
//!
//! A bridge left over from an earlier simulation keeps the port bound and
//! makes the new bind fail. Holders are found with `lsof` and killed.
//! Nothing here is fatal: every failure is logged and startup continues.

use log::{info, warn};
use std::process::Command;

/// Kill every other process holding `port` over UDP.
///
/// # Returns
///
/// Number of processes signalled.
pub fn reclaim_port(port: u16) -> usize {
    let output = match Command::new("lsof").args(["-t", "-i", &format!("UDP:{}", port)]).output() {
        Ok(output) => output,
        Err(err) => {
            warn!("Could not run lsof to free port {}: {}", port, err);
            return 0;
        }
    };

    let own_pid = std::process::id();
    let mut killed = 0;
    for pid in parse_pids(&String::from_utf8_lossy(&output.stdout)) {
        if pid == own_pid {
            continue;
        }
        match Command::new("kill").args(["-9", &pid.to_string()]).status() {
            Ok(status) if status.success() => {
                info!("Killed process {} using port {}", pid, port);
                killed += 1;
            }
            Ok(status) => warn!("kill {} exited with {}", pid, status),
            Err(err) => warn!("Error killing process {} using port {}: {}", pid, port, err),
        }
    }
    killed
}

/// Process ids from `lsof -t` output, one per line; anything else is ignored.
fn parse_pids(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output.lines().filter_map(|line| line.trim().parse().ok()).collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}
