//! Handler for the `status` command.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use crate::app::status_file::StatusFile;

/// Default path for the status file, mirrored from [`crate::app::Config::status_file`]'s
/// default documentation.
const DEFAULT_STATUS_PATH: &str = "/var/run/arbitrex/status.json";

pub fn execute(status_path: Option<&Path>) {
    let version = env!("CARGO_PKG_VERSION");
    let path = status_path.unwrap_or(Path::new(DEFAULT_STATUS_PATH));

    match try_read_status_file(path) {
        Some(status) => print_rich_status(&status, version),
        None => {
            println!();
            println!("arbitrex v{version}");
            println!("Status:      ○ not running (no fresh status file at {})", path.display());
            println!();
        }
    }
}

fn try_read_status_file(path: &Path) -> Option<StatusFile> {
    let content = fs::read_to_string(path).ok()?;
    let status: StatusFile = serde_json::from_str(&content).ok()?;
    if status.updated_at < Utc::now() - Duration::minutes(5) {
        return None;
    }
    Some(status)
}

fn format_uptime(started_at: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(started_at);
    let total_minutes = duration.num_minutes();
    if total_minutes < 0 {
        return "just started".to_string();
    }
    let days = duration.num_days();
    let hours = duration.num_hours() % 24;
    let minutes = total_minutes % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

fn print_rich_status(status: &StatusFile, version: &str) {
    let uptime = format_uptime(status.started_at);
    println!();
    println!("arbitrex v{version}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Status:      ● running (pid {})", status.pid);
    println!("Uptime:      {uptime}");
    println!("Venues:      {}", status.venues.join(", "));
    println!();
    println!("Breaker:     {}", if status.breaker.global_tripped { "tripped (global)" } else { "closed" });
    println!("Scoped trips: {}", status.breaker.scopes_tripped);
    println!();
    println!("Active opportunities: {}", status.runtime.active_opportunities);
    if let Some(last_scan) = status.runtime.last_scan_at {
        println!("Last scan:   {} ({} found)", last_scan.to_rfc3339(), status.runtime.last_scan_found);
    }
    println!();
}
