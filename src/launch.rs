use crate::error::LaunchError;
use crate::model::{CatalogEntry, LaunchDescriptor};
use log::{debug, info};
use std::path::Path;
use std::process::{Command, Stdio};

/// Publisher suffixes for packages whose stored id tends to lack them.
const FAMILY_HINTS: &[(&str, &str, &str)] = &[
    // (key fragment, family suffix, entry point)
    ("netflix", "_mcm4njqhnhss8", "Netflix.App"),
];

/// Identifier spellings to try, in order, for a packaged application.
pub fn packaged_id_variants(id: &str, key: &str) -> Vec<String> {
    let key = key.to_lowercase();
    let hint = FAMILY_HINTS.iter().find(|(fragment, _, _)| key.contains(fragment));
    let mut variants = vec![id.to_string()];

    if let Some((_, suffix, entry)) = hint {
        if !id.contains(suffix) {
            variants.push(format!("{id}{suffix}"));
            if !id.contains('!') {
                variants.push(format!("{id}{suffix}!{entry}"));
            }
        } else if !id.contains('!') {
            variants.push(format!("{id}!{entry}"));
        }
    } else if !id.contains('!') {
        variants.push(format!("{id}!App"));
    }

    let mut segments = id.split('.');
    if let (Some(first), Some(second)) = (segments.next(), segments.next()) {
        variants.push(format!("{first}.{second}"));
    }

    let mut unique = Vec::with_capacity(variants.len());
    for variant in variants {
        if !unique.contains(&variant) {
            unique.push(variant);
        }
    }
    unique
}

fn spawn_classic(path: &Path) -> Result<(), LaunchError> {
    Command::new(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| LaunchError::Spawn {
            path: path.to_path_buf(),
            err,
        })?;
    Ok(())
}

#[cfg(windows)]
fn start_packaged(variant: &str) -> bool {
    let target = format!("shell:appsfolder\\{variant}");
    Command::new("powershell")
        .args(["-NoProfile", "-Command", &format!("Start-Process \"{target}\"")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(windows)]
fn launch_packaged(id: &str, key: &str) -> Result<(), LaunchError> {
    let variants = packaged_id_variants(id, key);
    for variant in &variants {
        debug!("Trying packaged id {}", variant);
        if start_packaged(variant) {
            info!("Started packaged application {}", variant);
            return Ok(());
        }
    }
    Err(LaunchError::PackagedExhausted {
        id: id.to_string(),
        tried: variants.len(),
    })
}

#[cfg(not(windows))]
fn launch_packaged(id: &str, key: &str) -> Result<(), LaunchError> {
    debug!("Would try {:?}", packaged_id_variants(id, key));
    Err(LaunchError::Unsupported)
}

pub fn launch(entry: &CatalogEntry) -> Result<(), LaunchError> {
    match &entry.launch {
        LaunchDescriptor::Classic(path) => {
            spawn_classic(path)?;
            info!("Started {} ({})", entry.display_name, path.display());
            Ok(())
        }
        LaunchDescriptor::Packaged(id) => launch_packaged(id, &entry.key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testutil::sample_entry;

    #[test]
    fn netflix_variants_follow_hint() {
        assert_eq!(
            packaged_id_variants("4DF9E0F8.Netflix", "4df9e0f8.netflix"),
            vec![
                "4DF9E0F8.Netflix",
                "4DF9E0F8.Netflix_mcm4njqhnhss8",
                "4DF9E0F8.Netflix_mcm4njqhnhss8!Netflix.App",
            ]
        );
    }

    #[test]
    fn family_already_present_only_adds_entry_point() {
        assert_eq!(
            packaged_id_variants("4DF9E0F8.Netflix_mcm4njqhnhss8", "netflix"),
            vec!["4DF9E0F8.Netflix_mcm4njqhnhss8", "4DF9E0F8.Netflix_mcm4njqhnhss8!Netflix.App"]
        );
    }

    #[test]
    fn generic_package_gets_default_entry_point_and_short_name() {
        assert_eq!(
            packaged_id_variants("SpotifyAB.SpotifyMusic_1.2.3.0_x64__zpdnekdrzrea0", "spotify"),
            vec![
                "SpotifyAB.SpotifyMusic_1.2.3.0_x64__zpdnekdrzrea0",
                "SpotifyAB.SpotifyMusic_1.2.3.0_x64__zpdnekdrzrea0!App",
                "SpotifyAB.SpotifyMusic_1",
            ]
        );
        assert_eq!(packaged_id_variants("Foo!App", "foo"), vec!["Foo!App"]);
    }

    #[test]
    fn missing_classic_executable_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut entry = sample_entry("ghost", "Ghost", &["ghost"]);
        entry.launch = LaunchDescriptor::Classic(dir.path().join("ghost"));
        assert!(matches!(launch(&entry), Err(LaunchError::Spawn { .. })));
    }

    #[cfg(not(windows))]
    #[test]
    fn packaged_launch_is_unsupported_off_windows() {
        let mut entry = sample_entry("netflix", "Netflix", &["netflix"]);
        entry.launch = LaunchDescriptor::Packaged("4DF9E0F8.Netflix".into());
        assert!(matches!(launch(&entry), Err(LaunchError::Unsupported)));
    }
}
