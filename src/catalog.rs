//! The deduplicated application catalog, its build pipeline and its on-disk form.

use crate::aliases::generate_aliases;
use crate::config::Config;
use crate::error::CatalogError;
use crate::merger::{merge, MergeStats};
use crate::model::{CatalogEntry, Provenance};
use crate::sources::{enabled_sources, scan_all, ScanReport, Source};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Immutable map from key to entry. Iteration is in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

/// What a rebuild saw, for the summary printed after `scan`.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub scan: ScanReport,
    pub merge: MergeStats,
}

impl Catalog {
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key.clone(), e)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    #[cfg(test)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display names for enumeration commands.
    pub fn list_entries(&self, limit: usize) -> Vec<&str> {
        self.entries.values().take(limit).map(|e| e.display_name.as_str()).collect()
    }

    pub fn count_by_provenance(&self) -> BTreeMap<Provenance, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.provenance).or_insert(0) += 1;
        }
        counts
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|err| CatalogError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        let raw: BTreeMap<String, CatalogEntry> =
            serde_json::from_str(&content).map_err(|err| CatalogError::Corrupt {
                path: path.to_path_buf(),
                err,
            })?;

        let entries = raw
            .into_iter()
            .map(|(key, mut entry)| {
                entry.key = key.clone();
                if entry.aliases.is_empty() {
                    entry.aliases.insert(key.clone());
                }
                (key, entry)
            })
            .collect();
        Ok(Self { entries })
    }

    /// Writes the catalog next to its final location, then renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let save_err = |detail: String| CatalogError::Save {
            path: path.to_path_buf(),
            detail,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.entries).map_err(|e| save_err(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| save_err(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| save_err(e.to_string()))?;
        info!("Saved {} catalog entries to {:?}", self.entries.len(), path);
        Ok(())
    }
}

/// Scan, merge and annotate with aliases.
pub fn build_from_sources(sources: &[Box<dyn Source>], config: &Config) -> Result<(Catalog, BuildReport), CatalogError> {
    if sources.is_empty() {
        return Err(CatalogError::RebuildFailed("no sources are enabled".to_string()));
    }

    let mut scan = scan_all(sources, config.general.scan_workers);
    if scan.all_failed() {
        return Err(CatalogError::RebuildFailed(format!(
            "all {} sources failed",
            scan.failures.len()
        )));
    }

    let candidates = std::mem::take(&mut scan.candidates);
    let (merged, merge_stats) = merge(candidates, &config.catalog);

    let entries = merged.into_iter().map(|(key, m)| CatalogEntry {
        aliases: generate_aliases(&m.normalized),
        key,
        display_name: m.candidate.raw_name,
        launch: m.candidate.launch,
        process_name: m.candidate.process_name,
        provenance: m.candidate.source,
    });
    let catalog = Catalog::from_entries(entries);
    info!("Catalog built with {} entries", catalog.len());

    Ok((catalog, BuildReport { scan, merge: merge_stats }))
}

pub fn build(config: &Config) -> Result<(Catalog, BuildReport), CatalogError> {
    build_from_sources(&enabled_sources(config), config)
}

/// Loads the persisted catalog, rebuilding and saving a fresh one if it is missing or corrupt.
pub fn load_or_rebuild(path: &Path, config: &Config) -> Result<Catalog, CatalogError> {
    match Catalog::load(path) {
        Ok(catalog) => {
            info!("Loaded {} catalog entries from {:?}", catalog.len(), path);
            Ok(catalog)
        }
        Err(e) => {
            warn!("{}; rebuilding", e);
            let (catalog, _) = build(config)?;
            if let Err(e) = catalog.save(path) {
                warn!("{}", e);
            }
            Ok(catalog)
        }
    }
}
