//! CakePHP project layout: framework root, console script, version probe.

use crate::errors::ConsoleError;
use std::fmt;
use std::path::{Path, PathBuf};

pub const SCRIPT_NAME_LONG: &str = "cake.php";

/// 1.x console location, relative to the CakePHP root.
const SCRIPT_DIRECTORY: &str = "cake/console";
/// 2.x console location, relative to the CakePHP root.
const SCRIPT_DIRECTORY_2: &str = "app/Console";

const VERSION_FILES: [&str; 2] = ["cake/VERSION.txt", "lib/Cake/VERSION.txt"];

/// Where shell scripts live in 1.x layouts, in tagging precedence order.
pub const SHELL_DIRECTORIES: [(ShellPlace, &str); 3] = [
    (ShellPlace::Core, "cake/console/libs"),
    (ShellPlace::Vendor, "vendors/shells"),
    (ShellPlace::AppVendor, "app/vendors/shells"),
];

/// Origin label for shells found by directory enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellPlace {
    Core,
    Vendor,
    AppVendor,
}

impl ShellPlace {
    pub fn label(&self) -> &'static str {
        match self {
            ShellPlace::Core => "CORE",
            ShellPlace::Vendor => "VENDOR",
            ShellPlace::AppVendor => "APP VENDOR",
        }
    }
}

impl fmt::Display for ShellPlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Framework version read from `VERSION.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CakeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl CakeVersion {
    /// Parse the contents of a `VERSION.txt` file.
    ///
    /// The file carries a license banner of `//` comment lines followed by the
    /// version on the last non-empty line.
    pub fn parse(content: &str) -> Option<Self> {
        let line = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("//"))
            .next_back()?;

        let mut parts = line
            .split(|c: char| c == '.' || c == '-')
            .map(|p| p.trim().parse::<u32>());

        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(|p| p.ok()).unwrap_or(0);
        let patch = parts.next().and_then(|p| p.ok()).unwrap_or(0);
        Some(Self {
            major,
            minor,
            patch,
        })
    }

    pub fn is_major(&self, major: u32) -> bool {
        self.major == major
    }
}

impl fmt::Display for CakeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A CakePHP application on disk.
#[derive(Debug, Clone)]
pub struct CakeProject {
    name: String,
    cake_dir: PathBuf,
}

impl CakeProject {
    /// `cake_dir` is resolved against `project_dir` unless absolute.
    pub fn new(project_dir: &Path, cake_dir: Option<&Path>, name: Option<String>) -> Self {
        let cake_dir = match cake_dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => project_dir.join(dir),
            None => project_dir.to_path_buf(),
        };
        let name = name.unwrap_or_else(|| {
            project_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "project".to_string())
        });
        Self { name, cake_dir }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Framework root; also the working directory for every console run.
    pub fn cake_dir(&self) -> &Path {
        &self.cake_dir
    }

    /// Find the console script, 1.x layout first.
    pub fn locate_script(&self) -> Option<PathBuf> {
        [SCRIPT_DIRECTORY, SCRIPT_DIRECTORY_2]
            .iter()
            .map(|dir| self.cake_dir.join(dir).join(SCRIPT_NAME_LONG))
            .find(|p| p.is_file())
    }

    /// Resolve an explicit script override against the framework root.
    pub fn resolve_script(&self, script: &Path) -> PathBuf {
        if script.is_absolute() {
            script.to_path_buf()
        } else {
            self.cake_dir.join(script)
        }
    }

    pub fn version(&self) -> Option<CakeVersion> {
        VERSION_FILES
            .iter()
            .map(|f| self.cake_dir.join(f))
            .filter_map(|p| std::fs::read_to_string(p).ok())
            .find_map(|content| CakeVersion::parse(&content))
    }

    pub fn shell_directories(&self) -> Vec<(ShellPlace, PathBuf)> {
        SHELL_DIRECTORIES
            .iter()
            .map(|(place, dir)| (*place, self.cake_dir.join(dir)))
            .collect()
    }

    /// Title used for console runs: `"<project> (<command>)"`.
    pub fn display_name(&self, command: &str) -> String {
        format!("{} ({})", self.name, command)
    }
}

/// Check that `script` can be launched.
///
/// With an interpreter the script only needs to be a readable file; without
/// one it must carry an executable bit (unix).
pub fn validate_script(script: &Path, interpreter: Option<&str>) -> Result<(), ConsoleError> {
    let metadata = std::fs::metadata(script)
        .map_err(|e| ConsoleError::invalid_executable(script, format!("cannot access file: {}", e)))?;

    if !metadata.is_file() {
        return Err(ConsoleError::invalid_executable(script, "not a file"));
    }

    if interpreter.is_some() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConsoleError::invalid_executable(script, "file is not executable"));
        }
    }

    Ok(())
}
