use crate::catalog::{self, BuildReport, Catalog};
use crate::config::Config;
use crate::error::CatalogError;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Shared handle to the current catalog.
///
/// Queries take a snapshot and never block a rebuild; a rebuild builds a new
/// catalog off to the side and swaps the pointer.
pub struct CatalogState {
    pub config: Config,
    pub catalog_path: PathBuf,
    current: RwLock<Arc<Catalog>>,
}

impl CatalogState {
    pub fn new(config: Config, catalog: Catalog) -> Self {
        let catalog_path = config.general.resolved_catalog_path();
        Self {
            config,
            catalog_path,
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Loads the persisted catalog, rebuilding it when it is missing or corrupt.
    pub fn open(config: Config) -> Result<Self, CatalogError> {
        let path = config.general.resolved_catalog_path();
        let catalog = catalog::load_or_rebuild(&path, &config)?;
        Ok(Self::new(config, catalog))
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, catalog: Catalog) {
        let next = Arc::new(catalog);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Re-runs every scanner, persists the result, then swaps it in.
    pub fn rebuild(&self) -> Result<BuildReport, CatalogError> {
        let (fresh, report) = catalog::build(&self.config)?;
        fresh.save(&self.catalog_path)?;
        self.replace(fresh);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testutil::sample_entry;
    use crate::config::CuratedApp;
    use crate::model::MatchResult;
    use crate::resolver::Resolver;
    use crate::sources::exe::testutil::make_exe;
    use std::fs;
    use std::path::Path;

    /// Only the curated source, extended with one app living under `dir`.
    fn curated_only(dir: &Path) -> Config {
        let mut config = Config::default();
        config.general.catalog_path = Some(dir.join("catalog.json"));
        config.oracle.enabled = false;
        let sources = &mut config.sources;
        sources.registry = false;
        sources.app_paths = false;
        sources.start_menu = false;
        sources.install_dirs = false;
        sources.packaged = false;
        sources.search_path = false;
        sources.extra_curated = vec![CuratedApp {
            name: "VLC media player".to_string(),
            paths: vec![make_exe(&dir.join("VideoLAN"), "vlc")],
        }];
        config
    }

    #[test]
    fn snapshots_survive_a_swap() {
        let state = CatalogState::new(
            Config::default(),
            Catalog::from_entries([sample_entry("chrome", "Google Chrome", &["chrome"])]),
        );
        let before = state.snapshot();

        state.replace(Catalog::from_entries([sample_entry("vlc", "VLC", &["vlc"])]));

        assert!(before.contains_key("chrome"));
        let after = state.snapshot();
        assert!(after.contains_key("vlc"));
        assert!(!after.contains_key("chrome"));
    }

    #[test]
    fn concurrent_readers_see_whole_catalogs() {
        let state = Arc::new(CatalogState::new(Config::default(), Catalog::default()));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let snap = state.snapshot();
                        assert!(snap.is_empty() || snap.len() == 2);
                    }
                })
            })
            .collect();
        state.replace(Catalog::from_entries([
            sample_entry("a", "A", &["a"]),
            sample_entry("b", "B", &["b"]),
        ]));
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(state.snapshot().len(), 2);
    }

    #[test]
    fn corrupt_catalog_is_rebuilt_and_queries_still_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let config = curated_only(dir.path());
        let path = config.general.resolved_catalog_path();
        fs::write(&path, r#"{"vlc media player": {"display_name": "VLC"#).unwrap();
        assert!(Catalog::load(&path).is_err());

        let state = CatalogState::open(config).unwrap();
        let catalog = state.snapshot();
        let resolver = Resolver::new(&catalog, &state.config.matching, None, &state.config.oracle);
        let MatchResult::Found { entry, .. } = resolver.resolve("lance vlc") else {
            panic!("vlc did not resolve after the rebuild");
        };
        assert_eq!(entry.key, "vlc media player");

        // the rebuilt catalog replaced the corrupt file
        assert_eq!(Catalog::load(&path).unwrap(), *catalog);
    }

    #[test]
    fn rebuild_overwrites_the_persisted_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let config = curated_only(dir.path());
        let stale = Catalog::from_entries([sample_entry("old tool", "Old Tool", &["old tool"])]);
        stale.save(&config.general.resolved_catalog_path()).unwrap();

        let state = CatalogState::open(config).unwrap();
        assert!(state.snapshot().contains_key("old tool"));

        let report = state.rebuild().unwrap();
        assert!(report.scan.failures.is_empty());

        let on_disk = Catalog::load(&state.catalog_path).unwrap();
        assert!(on_disk.contains_key("vlc media player"));
        assert!(!on_disk.contains_key("old tool"));
        assert_eq!(on_disk, *state.snapshot());
    }
}
