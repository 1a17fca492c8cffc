//! Host environment snapshot.
//!
//! Taken once when the session starts so the system instructions stay stable
//! for the whole session.

use chrono::Local;
use std::path::PathBuf;

/// What the model is told about the machine it is generating commands for.
#[derive(Debug, Clone)]
pub struct Environment {
    pub cwd: PathBuf,
    pub shell: String,
    pub os: String,
    pub distro: Option<String>,
    /// Local time at startup, e.g. `09:15 AM on Monday, March 03, 2025`.
    pub local_time: String,
}

impl Environment {
    /// Capture the current environment.
    pub fn capture() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            shell: std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string()),
            os: os_info(),
            distro: distro_info(),
            local_time: Local::now().format("%I:%M %p on %A, %B %d, %Y").to_string(),
        }
    }

    /// Multi-line description appended to the command-mode instruction.
    pub fn describe(&self) -> String {
        let mut out = format!("Context:\nOS: {}", self.os);
        if let Some(distro) = &self.distro {
            out.push_str(&format!("\nDistro: {}", distro));
        }
        out.push_str(&format!(
            "\nShell: {}\nCWD: {}",
            self.shell,
            self.cwd.display()
        ));
        out
    }
}

fn os_info() -> String {
    #[cfg(unix)]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("uname").arg("-srm").output() {
            if output.status.success() {
                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

fn distro_info() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = std::fs::read_to_string("/etc/os-release") {
            return pretty_name(&contents);
        }
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("sw_vers").arg("-productVersion").output() {
            if output.status.success() {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                return Some(format!("macOS {}", version));
            }
        }
    }

    None
}

/// Extract `PRETTY_NAME` from os-release contents.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
