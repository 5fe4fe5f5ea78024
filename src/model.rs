use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// How an application is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchDescriptor {
    /// Direct path to an executable on disk.
    Classic(PathBuf),
    /// Identifier of a packaged (sandboxed) application.
    Packaged(String),
}

impl LaunchDescriptor {
    #[cfg(test)]
    pub fn is_packaged(&self) -> bool {
        matches!(self, LaunchDescriptor::Packaged(_))
    }
}

impl fmt::Display for LaunchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchDescriptor::Classic(path) => write!(f, "{}", path.display()),
            LaunchDescriptor::Packaged(id) => write!(f, "packaged:{}", id),
        }
    }
}

/// Which scanner produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Registry,
    AppPaths,
    StartMenu,
    InstallDir,
    Packaged,
    SearchPath,
    Curated,
}

impl Provenance {
    pub const ALL: [Provenance; 7] = [
        Provenance::Registry,
        Provenance::AppPaths,
        Provenance::StartMenu,
        Provenance::InstallDir,
        Provenance::Packaged,
        Provenance::SearchPath,
        Provenance::Curated,
    ];

    /// Merge priority. Higher wins, ties keep the incumbent.
    pub fn priority(self) -> u8 {
        match self {
            Provenance::Curated => 5,
            Provenance::AppPaths => 4,
            Provenance::StartMenu | Provenance::Packaged => 3,
            Provenance::Registry => 2,
            Provenance::InstallDir | Provenance::SearchPath => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Registry => "registry",
            Provenance::AppPaths => "app_paths",
            Provenance::StartMenu => "start_menu",
            Provenance::InstallDir => "install_dir",
            Provenance::Packaged => "packaged",
            Provenance::SearchPath => "search_path",
            Provenance::Curated => "curated",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pre-merge record straight out of a scanner. Never persisted.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub raw_name: String,
    pub launch: LaunchDescriptor,
    pub process_name: String,
    pub source: Provenance,
}

impl RawCandidate {
    pub fn new(raw_name: impl Into<String>, launch: LaunchDescriptor, process_name: impl Into<String>, source: Provenance) -> Self {
        Self {
            raw_name: raw_name.into(),
            launch,
            process_name: process_name.into(),
            source,
        }
    }

    /// Classic candidate whose process name is the executable's file name.
    pub fn classic(raw_name: impl Into<String>, path: PathBuf, source: Provenance) -> Self {
        let process_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(raw_name, LaunchDescriptor::Classic(path), process_name, source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(skip)]
    pub key: String,               // Normalized lowercase name, filled from the map key on load
    pub display_name: String,      // Name as found at the source
    pub launch: LaunchDescriptor,
    pub process_name: String,      // Image name, for lookup/termination
    pub provenance: Provenance,
    pub aliases: BTreeSet<String>, // Lowercase spoken phrases, never empty
}

/// Which resolver stage produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    ExactAlias,
    /// `synonym` is set when the curated synonym table produced the hit.
    Substring { synonym: bool },
    TokenFuzzy,
    LengthFuzzy,
    Oracle,
}

impl MatchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStage::ExactAlias => "exact-alias",
            MatchStage::Substring { .. } => "substring",
            MatchStage::TokenFuzzy => "token-fuzzy",
            MatchStage::LengthFuzzy => "length-fuzzy",
            MatchStage::Oracle => "oracle",
        }
    }
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStage::Substring { synonym: true } => f.write_str("substring (synonym)"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<'a> {
    Found { entry: &'a CatalogEntry, stage: MatchStage },
    NoMatch,
}
