//! External tool detection.

use discforge_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
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

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use discforge_av::check_tool;
///
/// let info = check_tool("ffprobe", "-version");
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, version_arg: &str) -> ToolInfo {
    let path = which::which(name).ok();
    let result = Command::new(name).arg(version_arg).output();

    match result {
        Ok(output) => {
            let text = if output.stdout.is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            let version = String::from_utf8_lossy(&text)
                .lines()
                .next()
                .map(|s| s.to_string());

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        Err(_) => ToolInfo {
            name: name.to_string(),
            available: path.is_some(),
            version: None,
            path,
        },
    }
}

/// Check the prober, disc lister and mount tools by their configured names.
pub fn check_tools(prober: &Path, lister: &Path, mount: &Path, umount: &Path) -> Vec<ToolInfo> {
    vec![
        check_tool(&prober.to_string_lossy(), "-version"),
        check_tool(&lister.to_string_lossy(), "--help"),
        check_tool(&mount.to_string_lossy(), "--version"),
        check_tool(&umount.to_string_lossy(), "--version"),
    ]
}

/// Require that a tool is available, returning its path.
///
/// Absolute or relative paths must exist; bare names are looked up on `PATH`.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if the tool is not found.
pub fn require_tool(tool: &Path) -> Result<PathBuf> {
    if tool.components().count() > 1 {
        if tool.exists() {
            return Ok(tool.to_path_buf());
        }
        return Err(Error::tool_not_found(tool.display().to_string()));
    }

    which::which(tool).map_err(|_| Error::tool_not_found(tool.display().to_string()))
}
