//! Packaged (sandboxed store) applications.

use crate::error::ScanError;
use crate::model::{LaunchDescriptor, Provenance, RawCandidate};
use crate::sources::Source;
use log::{debug, info};
use serde::Deserialize;

/// System packages that are never user-facing applications.
const EXCLUDED_PACKAGES: &[&str] = &["microsoft.windows", "windows.immersivecontrolpanel"];

#[cfg(windows)]
const LIST_COMMAND: &str = r#"Get-AppxPackage | Where-Object { $_.Name -ne $null -and $_.InstallLocation -ne $null } | ForEach-Object { [PSCustomObject]@{ Name = $_.Name; PackageFullName = $_.PackageFullName; InstallLocation = $_.InstallLocation; DisplayName = (Get-AppxPackageManifest $_).Package.Properties.DisplayName } } | ConvertTo-Json"#;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PackageRecord {
    pub name: Option<String>,
    pub package_full_name: Option<String>,
    pub install_location: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Option<PackageRecord>>),
    One(PackageRecord),
}

/// Something that can enumerate installed packages as JSON.
pub trait PackageLister: Send + Sync {
    fn list_json(&self) -> Result<String, ScanError>;
}

/// Enumerates packages through PowerShell's `Get-AppxPackage`.
pub struct PowerShell;

impl PackageLister for PowerShell {
    #[cfg(windows)]
    fn list_json(&self) -> Result<String, ScanError> {
        let output = std::process::Command::new("powershell")
            .args(["-NoProfile", "-Command", LIST_COMMAND])
            .output()
            .map_err(|err| ScanError::Io { source_name: "packaged", err })?;
        if !output.status.success() {
            return Err(ScanError::Command {
                source_name: "packaged",
                command: "Get-AppxPackage".to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    #[cfg(not(windows))]
    fn list_json(&self) -> Result<String, ScanError> {
        Err(ScanError::Unsupported { source_name: "packaged" })
    }
}

/// Parses `ConvertTo-Json` output, which is a bare object when only one package exists.
pub fn parse_packages(json: &str) -> Result<Vec<PackageRecord>, ScanError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: OneOrMany = serde_json::from_str(json).map_err(|e| ScanError::Malformed {
        source_name: "packaged",
        detail: e.to_string(),
    })?;
    Ok(match parsed {
        OneOrMany::Many(records) => records.into_iter().flatten().collect(),
        OneOrMany::One(record) => vec![record],
    })
}

fn candidate_from(record: PackageRecord) -> Option<RawCandidate> {
    let name = record.name.filter(|n| !n.trim().is_empty())?;
    let lower = name.to_lowercase();
    if EXCLUDED_PACKAGES.iter().any(|ex| lower.contains(ex)) {
        return None;
    }
    if record.install_location.as_deref().is_none_or(|l| l.trim().is_empty()) {
        return None;
    }
    // Unresolved resource references are useless as display names
    let display = record
        .display_name
        .filter(|d| !d.trim().is_empty() && !d.starts_with("ms-resource:"))
        .unwrap_or_else(|| name.clone());
    let id = record.package_full_name.filter(|f| !f.trim().is_empty()).unwrap_or_else(|| name.clone());
    Some(RawCandidate::new(display, LaunchDescriptor::Packaged(id), name, Provenance::Packaged))
}

pub struct PackagedSource<L> {
    lister: L,
}

impl<L: PackageLister> PackagedSource<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }
}

impl<L: PackageLister> Source for PackagedSource<L> {
    fn kind(&self) -> Provenance {
        Provenance::Packaged
    }

    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError> {
        let records = parse_packages(&self.lister.list_json()?)?;
        debug!("PackagedSource: {} package records", records.len());
        let entries: Vec<RawCandidate> = records.into_iter().filter_map(candidate_from).collect();
        info!("PackagedSource: found {} candidates", entries.len());
        Ok(entries)
    }
}
