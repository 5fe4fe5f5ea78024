//! Reduces raw scanner output to one record per normalized key.

use crate::config::CatalogConfig;
use crate::error::RejectReason;
use crate::model::{LaunchDescriptor, Provenance, RawCandidate};
use crate::normalize::{catalog_key, normalize_name};
use crate::sources::exe::is_executable;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// The winning record for a key.
#[derive(Debug, Clone)]
pub struct Merged {
    pub normalized: String,
    pub candidate: RawCandidate,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub accepted: usize,
    pub replaced: usize,
    pub shadowed: usize,
    pub pruned: usize,
    pub rejected: HashMap<RejectReason, usize>,
}

impl MergeStats {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    fn reject(&mut self, reason: RejectReason) {
        *self.rejected.entry(reason).or_insert(0) += 1;
    }
}

/// User-level entry filtering.
struct EntryFilter {
    blacklist: Vec<Regex>,
    whitelist: Option<Vec<String>>,
}

impl EntryFilter {
    fn new(config: &CatalogConfig) -> Self {
        let blacklist = config
            .blacklist
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid blacklist pattern {:?}: {}", pattern, e);
                    None
                }
            })
            .collect();
        let whitelist = config
            .whitelist
            .as_ref()
            .map(|items| items.iter().map(|w| w.to_lowercase()).collect());
        Self { blacklist, whitelist }
    }

    fn allows(&self, key: &str, raw_name: &str) -> bool {
        if let Some(whitelist) = &self.whitelist {
            if !whitelist.iter().any(|w| key.contains(w.as_str())) {
                return false;
            }
        }
        !self.blacklist.iter().any(|re| re.is_match(key) || re.is_match(raw_name))
    }
}

fn launch_is_valid(launch: &LaunchDescriptor) -> bool {
    match launch {
        LaunchDescriptor::Classic(path) => is_executable(path),
        // Packaged ids are vouched for by the package enumeration itself
        LaunchDescriptor::Packaged(_) => true,
    }
}

pub struct Merger {
    filter: EntryFilter,
    entries: BTreeMap<String, Merged>,
    stats: MergeStats,
}

impl Merger {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            filter: EntryFilter::new(config),
            entries: BTreeMap::new(),
            stats: MergeStats::default(),
        }
    }

    pub fn push(&mut self, candidate: RawCandidate) {
        let Some(normalized) = normalize_name(&candidate.raw_name) else {
            debug!("Dropping {:?}: {}", candidate.raw_name, RejectReason::NameRejected);
            self.stats.reject(RejectReason::NameRejected);
            return;
        };
        let key = catalog_key(&normalized);
        if key.trim().is_empty() {
            debug!("Dropping {:?}: {} (empty key)", candidate.raw_name, RejectReason::NameRejected);
            self.stats.reject(RejectReason::NameRejected);
            return;
        }
        if !self.filter.allows(&key, &candidate.raw_name) {
            debug!("Dropping {:?}: {}", key, RejectReason::Filtered);
            self.stats.reject(RejectReason::Filtered);
            return;
        }

        if let Some(existing) = self.entries.get(&key) {
            let incumbent: Provenance = existing.candidate.source;
            if candidate.source.priority() <= incumbent.priority() {
                debug!("{:?} from {} shadowed by {}", key, candidate.source, incumbent);
                self.stats.shadowed += 1;
                return;
            }
        }

        if !launch_is_valid(&candidate.launch) {
            debug!("Dropping {:?}: {} ({})", key, RejectReason::MissingExecutable, candidate.launch);
            self.stats.reject(RejectReason::MissingExecutable);
            return;
        }

        let replaced = self.entries.insert(key, Merged { normalized, candidate });
        if replaced.is_some() {
            self.stats.replaced += 1;
        } else {
            self.stats.accepted += 1;
        }
    }

    /// Drops classic entries whose executable vanished since it was validated.
    pub fn finish(mut self) -> (BTreeMap<String, Merged>, MergeStats) {
        let before = self.entries.len();
        self.entries.retain(|key, merged| {
            let keep = launch_is_valid(&merged.candidate.launch);
            if !keep {
                debug!("Pruning {:?}: executable removed", key);
            }
            keep
        });
        self.stats.pruned = before - self.entries.len();
        info!(
            "Merge: {} entries ({} accepted, {} replaced, {} shadowed, {} rejected, {} pruned)",
            self.entries.len(),
            self.stats.accepted,
            self.stats.replaced,
            self.stats.shadowed,
            self.stats.rejected_total(),
            self.stats.pruned
        );
        (self.entries, self.stats)
    }
}

/// Merges candidates in the order given.
pub fn merge(candidates: impl IntoIterator<Item = RawCandidate>, config: &CatalogConfig) -> (BTreeMap<String, Merged>, MergeStats) {
    let mut merger = Merger::new(config);
    for candidate in candidates {
        merger.push(candidate);
    }
    merger.finish()
}
