use crate::config::Config;
use crate::error::ScanError;
use crate::model::{Provenance, RawCandidate};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

pub mod curated;
pub mod exe;
pub mod install_dirs;
pub mod packaged;
pub mod path;
pub mod registry;
pub mod shortcut;

/// An independent, read-only enumerator of installed applications.
pub trait Source: Send + Sync {
    fn kind(&self) -> Provenance;
    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError>;
}

/// Outcome of running every enabled scanner.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Candidates in scanner order, ready for the merge.
    pub candidates: Vec<RawCandidate>,
    pub counts: BTreeMap<Provenance, usize>,
    pub failures: Vec<(Provenance, String)>,
}

impl ScanReport {
    pub fn sources_run(&self) -> usize {
        self.counts.len() + self.failures.len()
    }

    pub fn all_failed(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Enabled scanners in their fixed iteration order.
pub fn enabled_sources(config: &Config) -> Vec<Box<dyn Source>> {
    let sc = &config.sources;
    let depth = sc.max_search_depth;
    let mut sources: Vec<Box<dyn Source>> = Vec::new();

    if sc.registry {
        sources.push(Box::new(registry::UninstallSource::new(registry::RegExe, depth)));
    }
    if sc.app_paths {
        sources.push(Box::new(registry::AppPathsSource::new(registry::RegExe)));
    }
    if sc.start_menu {
        sources.push(Box::new(shortcut::StartMenuSource::new(sc.start_menu_dirs.clone())));
    }
    if sc.install_dirs {
        sources.push(Box::new(install_dirs::InstallDirSource::new(sc.install_roots.clone(), depth)));
    }
    if sc.packaged {
        sources.push(Box::new(packaged::PackagedSource::new(packaged::PowerShell)));
    }
    if sc.search_path {
        sources.push(Box::new(path::SearchPathSource::from_env()));
    }
    if sc.curated {
        sources.push(Box::new(curated::CuratedSource::with_extras(&sc.extra_curated)));
    }
    sources
}

/// Runs scanners on a small worker pool and joins their output in scanner order.
///
/// A failing scanner is logged and skipped; it never aborts the others.
pub fn scan_all(sources: &[Box<dyn Source>], workers: usize) -> ScanReport {
    let results: Vec<(Provenance, Result<Vec<RawCandidate>, ScanError>)> =
        match rayon::ThreadPoolBuilder::new().num_threads(workers.max(1)).build() {
            Ok(pool) => pool.install(|| sources.par_iter().map(|s| (s.kind(), s.scan())).collect()),
            Err(e) => {
                warn!("Scan pool unavailable ({}), scanning sequentially", e);
                sources.iter().map(|s| (s.kind(), s.scan())).collect()
            }
        };

    let mut report = ScanReport::default();
    for (kind, result) in results {
        match result {
            Ok(mut candidates) => {
                *report.counts.entry(kind).or_insert(0) += candidates.len();
                report.candidates.append(&mut candidates);
            }
            Err(e) => {
                warn!("Source {} failed: {}", kind, e);
                report.failures.push((kind, e.to_string()));
            }
        }
    }
    info!(
        "Scan finished: {} candidates from {} sources ({} failed)",
        report.candidates.len(),
        report.sources_run(),
        report.failures.len()
    );
    report
}
