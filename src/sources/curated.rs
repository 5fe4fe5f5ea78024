//! Hard-coded well-known applications: the highest-confidence source.

use crate::config::CuratedApp;
use crate::error::ScanError;
use crate::model::{Provenance, RawCandidate};
use crate::sources::exe::{expand_env, is_executable};
use crate::sources::Source;
use log::info;
use std::path::PathBuf;

const KNOWN_APPS: &[(&str, &[&str])] = &[
    ("Google Chrome", &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
    ]),
    ("Mozilla Firefox", &[
        r"C:\Program Files\Mozilla Firefox\firefox.exe",
        r"C:\Program Files (x86)\Mozilla Firefox\firefox.exe",
    ]),
    ("Microsoft Edge", &[
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
    ]),
    ("VLC media player", &[
        r"C:\Program Files\VideoLAN\VLC\vlc.exe",
        r"C:\Program Files (x86)\VideoLAN\VLC\vlc.exe",
    ]),
    ("Notepad++", &[
        r"C:\Program Files\Notepad++\notepad++.exe",
        r"C:\Program Files (x86)\Notepad++\notepad++.exe",
    ]),
    ("Visual Studio Code", &[
        r"%LOCALAPPDATA%\Programs\Microsoft VS Code\Code.exe",
        r"C:\Program Files\Microsoft VS Code\Code.exe",
    ]),
];

pub struct CuratedSource {
    apps: Vec<CuratedApp>,
}

impl CuratedSource {
    pub fn new(apps: Vec<CuratedApp>) -> Self {
        Self { apps }
    }

    /// Built-in table followed by user additions from the config.
    pub fn with_extras(extra: &[CuratedApp]) -> Self {
        let mut apps: Vec<CuratedApp> = KNOWN_APPS
            .iter()
            .map(|(name, paths)| CuratedApp {
                name: name.to_string(),
                paths: paths.iter().map(|p| PathBuf::from(expand_env(p))).collect(),
            })
            .collect();
        apps.extend(extra.iter().cloned());
        Self::new(apps)
    }
}

impl Source for CuratedSource {
    fn kind(&self) -> Provenance {
        Provenance::Curated
    }

    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError> {
        let entries: Vec<RawCandidate> = self
            .apps
            .iter()
            .filter_map(|app| {
                // First existing location wins
                let path = app.paths.iter().find(|p| is_executable(p))?;
                Some(RawCandidate::classic(app.name.clone(), path.clone(), Provenance::Curated))
            })
            .collect();
        info!("CuratedSource: found {} candidates", entries.len());
        Ok(entries)
    }
}
