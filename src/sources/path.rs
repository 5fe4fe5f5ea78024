use crate::error::ScanError;
use crate::model::{Provenance, RawCandidate};
use crate::normalize::normalize_name;
use crate::sources::exe::{executable_name, is_executable};
use crate::sources::Source;
use log::{debug, info};
use std::env;
use std::ffi::OsString;
use std::fs;

/// Executables found one level deep in every directory of the search path.
pub struct SearchPathSource {
    path_var: Option<OsString>,
}

impl SearchPathSource {
    pub fn from_env() -> Self {
        Self { path_var: env::var_os("PATH") }
    }

    #[cfg(test)]
    pub fn with_path(path_var: impl Into<OsString>) -> Self {
        Self { path_var: Some(path_var.into()) }
    }
}

impl Source for SearchPathSource {
    fn kind(&self) -> Provenance {
        Provenance::SearchPath
    }

    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError> {
        let mut entries = Vec::new();
        let Some(path_var) = &self.path_var else {
            return Ok(entries);
        };

        for dir in env::split_paths(path_var) {
            if !dir.is_dir() {
                continue;
            }
            debug!("Scanning binaries in {:?}", dir);
            let Ok(read_dir) = fs::read_dir(&dir) else { continue };

            let mut files: Vec<_> = read_dir.flatten().map(|e| e.path()).collect();
            files.sort();
            for path in files {
                if !is_executable(&path) {
                    continue;
                }
                let Some(name) = executable_name(&path) else { continue };
                if normalize_name(name).is_none() {
                    continue;
                }
                entries.push(RawCandidate::classic(name, path.clone(), Provenance::SearchPath));
            }
        }

        info!("SearchPathSource: found {} candidates", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::exe::testutil::make_exe;

    #[test]
    fn scans_each_path_directory_once_deep() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        make_exe(a.path(), "gimp");
        make_exe(a.path(), "x");
        make_exe(&a.path().join("nested"), "hidden");
        make_exe(b.path(), "vlc");
        make_exe(b.path(), "some-updater");
        fs::write(b.path().join("notes.txt"), b"").unwrap();

        let path_var = env::join_paths([a.path(), b.path(), std::path::Path::new("/missing/dir")]).unwrap();
        let found = SearchPathSource::with_path(path_var).scan().unwrap();

        let names: Vec<&str> = found.iter().map(|c| c.raw_name.as_str()).collect();
        assert_eq!(names, vec!["gimp", "vlc"]);
        assert!(found.iter().all(|c| c.source == Provenance::SearchPath));
    }

    #[test]
    fn dotted_names_keep_their_full_stem() {
        let dir = tempfile::tempdir().unwrap();
        make_exe(dir.path(), "python3");
        make_exe(dir.path(), "python3.12");
        make_exe(dir.path(), "Blender");

        let found = SearchPathSource::with_path(dir.path()).scan().unwrap();

        let mut names: Vec<&str> = found.iter().map(|c| c.raw_name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Blender", "python3", "python3.12"]);
    }
}
