//! External tool detection and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::ToolCommand;

/// Longest a version query may take.
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Information about an external tool.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

impl ToolInfo {
    fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        }
    }
}

/// Run `program version_arg` and report whether it answered successfully.
///
/// The first stdout line becomes the version string.
pub fn check_tool_at(name: &str, program: &Path, version_arg: &str) -> ToolInfo {
    let result = ToolCommand::new(program.to_path_buf())
        .arg(version_arg)
        .timeout(VERSION_TIMEOUT)
        .execute_blocking();

    match result {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path: Some(program.to_path_buf()),
            }
        }
        Err(e) => {
            tracing::debug!(tool = name, error = %e, "tool check failed");
            ToolInfo::missing(name)
        }
    }
}

/// Check the tools reelprobe can use.
///
/// Currently only `ffprobe`, located the same way the fallback prober
/// locates it.
pub fn check_tools(ffprobe_path: Option<&Path>) -> Vec<ToolInfo> {
    let ffprobe = match locate_tool("ffprobe", ffprobe_path) {
        Some(path) => check_tool_at("ffprobe", &path, "-version"),
        None => ToolInfo::missing("ffprobe"),
    };
    vec![ffprobe]
}

/// Find a tool executable.
///
/// Lookup order: the configured path if it exists, then a binary of that
/// name next to the running executable, then `PATH`.
pub fn locate_tool(name: &str, config_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), tool = name, "configured tool path does not exist");
    }

    let exe_name = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    if let Some(local) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&exe_name)))
        .filter(|p| p.is_file())
    {
        return Some(local);
    }

    which::which(name).ok()
}
