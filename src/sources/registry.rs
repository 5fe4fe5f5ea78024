//! Installed-program registry and per-app path table.

use crate::error::ScanError;
use crate::model::{LaunchDescriptor, Provenance, RawCandidate};
use crate::normalize::normalize_name;
use crate::sources::exe::{exe_from_command_line, executable_stem, expand_env, find_main_executable, icon_path, is_executable};
use crate::sources::Source;
use log::{debug, info};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

const UNINSTALL_ROOTS: &[&str] = &[
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
    r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
];

const APP_PATHS_ROOT: &str = r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows\CurrentVersion\App Paths";

static VALUE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(.*?)\s{4}(REG_[A-Z_]+)(?:\s{4}(.*))?$").unwrap());

/// One registry key with its values. Value names are lowercased; the default value is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryKey {
    pub path: String,
    pub values: HashMap<String, String>,
}

impl RegistryKey {
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn default_value(&self) -> Option<&str> {
        self.value("")
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('\\').next().unwrap_or(&self.path)
    }

    fn is_child_of(&self, root: &str) -> bool {
        match self.path.rsplit_once('\\') {
            Some((parent, _)) => parent.eq_ignore_ascii_case(root),
            None => false,
        }
    }
}

/// Read access to a registry subtree.
pub trait RegistryReader: Send + Sync {
    /// Every key under `root`, recursively, including `root` itself.
    fn query(&self, root: &str) -> Result<Vec<RegistryKey>, ScanError>;
}

/// Reads the registry through `reg query <key> /s`.
pub struct RegExe;

impl RegistryReader for RegExe {
    #[cfg(windows)]
    fn query(&self, root: &str) -> Result<Vec<RegistryKey>, ScanError> {
        let output = std::process::Command::new("reg")
            .args(["query", root, "/s"])
            .output()
            .map_err(|err| ScanError::Io { source_name: "registry", err })?;
        if !output.status.success() {
            return Err(ScanError::Command {
                source_name: "registry",
                command: format!("reg query {}", root),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(parse_reg_output(&String::from_utf8_lossy(&output.stdout)))
    }

    #[cfg(not(windows))]
    fn query(&self, _root: &str) -> Result<Vec<RegistryKey>, ScanError> {
        Err(ScanError::Unsupported { source_name: "registry" })
    }
}

/// Parses the text printed by `reg query /s`.
pub fn parse_reg_output(text: &str) -> Vec<RegistryKey> {
    let mut keys = Vec::new();
    let mut current: Option<RegistryKey> = None;

    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.starts_with("HKEY_") {
            if let Some(key) = current.take() {
                keys.push(key);
            }
            current = Some(RegistryKey {
                path: trimmed.to_string(),
                values: HashMap::new(),
            });
            continue;
        }

        let Some(key) = current.as_mut() else { continue };
        if let Some(caps) = VALUE_LINE.captures(trimmed) {
            let name = caps.get(1).map_or("", |m| m.as_str()).trim();
            // "(Default)" is localized, so any parenthesised name is the default value
            let name = if name.starts_with('(') && name.ends_with(')') {
                String::new()
            } else {
                name.to_lowercase()
            };
            let kind = &caps[2];
            let mut data = caps.get(3).map_or("", |m| m.as_str()).to_string();
            if kind == "REG_EXPAND_SZ" {
                data = expand_env(&data);
            }
            key.values.insert(name, data);
        }
    }
    if let Some(key) = current {
        keys.push(key);
    }
    keys
}

fn query_children<R: RegistryReader>(reader: &R, root: &str) -> Result<Vec<RegistryKey>, ScanError> {
    let keys = reader.query(root)?;
    Ok(keys.into_iter().filter(|k| k.is_child_of(root)).collect())
}

/// Scans the installed-programs (uninstall) hives.
pub struct UninstallSource<R> {
    reader: R,
    max_depth: usize,
}

impl<R: RegistryReader> UninstallSource<R> {
    pub fn new(reader: R, max_depth: usize) -> Self {
        Self { reader, max_depth }
    }

    fn executable_for(&self, key: &RegistryKey, app_name: &str) -> Option<PathBuf> {
        if let Some(icon) = key.value("DisplayIcon").and_then(icon_path) {
            if is_executable(&icon) {
                return Some(icon);
            }
        }

        if let Some(location) = key.value("InstallLocation") {
            let location = PathBuf::from(expand_env(location.trim().trim_matches('"')));
            if let Some(found) = find_main_executable(&location, app_name, self.max_depth) {
                return Some(found);
            }
        }

        let uninstaller = key.value("UninstallString").and_then(exe_from_command_line)?;
        if !uninstaller.exists() {
            return None;
        }
        if let Some(dir) = uninstaller.parent() {
            if let Some(found) = find_main_executable(dir, app_name, self.max_depth) {
                return Some(found);
            }
        }
        None
    }
}

impl<R: RegistryReader> Source for UninstallSource<R> {
    fn kind(&self) -> Provenance {
        Provenance::Registry
    }

    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError> {
        let mut entries = Vec::new();
        let mut last_error = None;
        let mut any_root = false;

        for root in UNINSTALL_ROOTS {
            let keys = match query_children(&self.reader, root) {
                Ok(keys) => keys,
                Err(e) => {
                    debug!("Registry root {} unreadable: {}", root, e);
                    last_error = Some(e);
                    continue;
                }
            };
            any_root = true;
            debug!("Scanning {} uninstall keys under {}", keys.len(), root);

            for key in keys {
                let Some(display_name) = key.value("DisplayName") else { continue };
                let Some(clean) = normalize_name(display_name) else { continue };
                if let Some(exe) = self.executable_for(&key, &clean) {
                    entries.push(RawCandidate::classic(display_name, exe, Provenance::Registry));
                }
            }
        }

        if !any_root {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        info!("UninstallSource: found {} candidates", entries.len());
        Ok(entries)
    }
}

/// Scans the per-application path table.
pub struct AppPathsSource<R> {
    reader: R,
}

impl<R: RegistryReader> AppPathsSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: RegistryReader> Source for AppPathsSource<R> {
    fn kind(&self) -> Provenance {
        Provenance::AppPaths
    }

    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError> {
        let mut entries = Vec::new();
        for key in query_children(&self.reader, APP_PATHS_ROOT)? {
            let Some(raw_path) = key.default_value() else { continue };
            let path = PathBuf::from(expand_env(raw_path.trim().trim_matches('"')));
            if !is_executable(&path) {
                continue;
            }
            let image = key.name().to_string();
            let name = executable_stem(std::path::Path::new(&image))
                .map(|stem| stem.trim_end_matches(".exe").to_string())
                .unwrap_or_else(|| image.clone());
            entries.push(RawCandidate::new(
                name,
                LaunchDescriptor::Classic(path),
                image,
                Provenance::AppPaths,
            ));
        }
        info!("AppPathsSource: found {} candidates", entries.len());
        Ok(entries)
    }
}
