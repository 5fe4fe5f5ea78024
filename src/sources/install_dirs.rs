use crate::error::ScanError;
use crate::model::{Provenance, RawCandidate};
use crate::normalize::normalize_name;
use crate::sources::exe::find_main_executable;
use crate::sources::Source;
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

/// Looks one level deep under each install root for application folders.
pub struct InstallDirSource {
    roots: Vec<PathBuf>,
    max_depth: usize,
}

impl InstallDirSource {
    pub fn new(roots: Vec<PathBuf>, max_depth: usize) -> Self {
        Self { roots, max_depth }
    }
}

impl Source for InstallDirSource {
    fn kind(&self) -> Provenance {
        Provenance::InstallDir
    }

    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError> {
        let mut entries = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                continue;
            }
            debug!("Scanning install root {:?}", root);
            let read_dir = match fs::read_dir(root) {
                Ok(rd) => rd,
                Err(e) => {
                    debug!("Cannot read {:?}: {}", root, e);
                    continue;
                }
            };

            let mut folders: Vec<PathBuf> = read_dir
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            folders.sort();

            for folder in folders {
                let Some(folder_name) = folder.file_name().and_then(|s| s.to_str()) else { continue };
                // Folder names need more than two characters
                let Some(clean) = normalize_name(folder_name) else { continue };
                if clean.chars().count() <= 2 {
                    continue;
                }
                if let Some(exe) = find_main_executable(&folder, folder_name, self.max_depth) {
                    entries.push(RawCandidate::classic(folder_name, exe, Provenance::InstallDir));
                }
            }
        }

        info!("InstallDirSource: found {} candidates", entries.len());
        Ok(entries)
    }
}
