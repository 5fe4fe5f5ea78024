//! Executable discovery shared by the registry, install-directory and shortcut scanners.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// File names containing these are never the "main" executable of a folder.
const AUXILIARY: &[&str] = &["uninstall", "unins0", "setup", "installer", "updater", "launcher", "helper", "crashpad", "crashreporter"];

static QUOTED_EXE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)"([^"]+\.exe)""#).unwrap());
static BARE_EXE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\S+\.exe)").unwrap());
static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%([^%]+)%").unwrap());

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("exe"))
}

/// File name without the platform executable suffix, case preserved.
pub fn executable_name(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    let suffix = std::env::consts::EXE_SUFFIX;
    let cut = name.len().checked_sub(suffix.len()).filter(|_| !suffix.is_empty());
    match cut {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(suffix) => Some(&name[..cut]),
        _ => Some(name),
    }
}

/// Lowercased [`executable_name`].
pub fn executable_stem(path: &Path) -> Option<String> {
    executable_name(path).map(str::to_lowercase)
}

fn is_auxiliary(stem: &str) -> bool {
    AUXILIARY.iter().any(|skip| stem.contains(skip))
}

/// Finds the most plausible main executable under `dir`.
///
/// Files whose stem matches a variant of `app_name` win; otherwise the first
/// executable that is not an installer, updater or helper is returned.
pub fn find_main_executable(dir: &Path, app_name: &str, max_depth: usize) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }

    let lower = app_name.to_lowercase();
    let mut preferred: Vec<String> = Vec::new();
    if !lower.trim().is_empty() {
        preferred.push(lower.chars().filter(|c| c.is_ascii_alphanumeric()).collect());
        preferred.push(lower.replace(' ', ""));
        if let Some(first) = lower.split_whitespace().next() {
            preferred.push(first.to_string());
        }
        preferred.retain(|p| !p.is_empty());
    }

    let mut executables: Vec<(PathBuf, String)> = WalkDir::new(dir)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_executable(e.path()))
        .filter_map(|e| {
            let stem = executable_stem(e.path())?;
            Some((e.into_path(), stem))
        })
        .collect();

    // Shallow files before deep ones
    executables.sort_by_key(|(path, _)| path.components().count());

    for pattern in &preferred {
        if let Some((path, _)) = executables.iter().find(|(_, stem)| stem == pattern) {
            return Some(path.clone());
        }
    }

    executables
        .into_iter()
        .find(|(_, stem)| !is_auxiliary(stem))
        .map(|(path, _)| path)
}

/// Pulls an executable path out of an uninstall-style command line.
pub fn exe_from_command_line(command: &str) -> Option<PathBuf> {
    let command = expand_env(command);
    let captured = QUOTED_EXE
        .captures(&command)
        .or_else(|| BARE_EXE.captures(&command))?;
    Some(PathBuf::from(captured.get(1)?.as_str()))
}

/// Cleans a `DisplayIcon`-style value: quotes and `,index` suffix removed.
pub fn icon_path(value: &str) -> Option<PathBuf> {
    let value = expand_env(value.trim());
    let value = value.trim_matches('"');
    let value = match value.rsplit_once(',') {
        Some((path, index)) if index.trim().trim_start_matches('-').chars().all(|c| c.is_ascii_digit()) => path,
        _ => value,
    };
    let value = value.trim().trim_matches('"');
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Expands `%VAR%` references from the process environment.
pub fn expand_env(value: &str) -> String {
    expand_env_with(value, |name| std::env::var(name).ok())
}

pub fn expand_env_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_VAR
        .replace_all(value, |caps: &regex::Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}


#[cfg(test)]
mod tests {
    use super::testutil::make_exe;
    use super::*;

    #[test]
    fn prefers_executable_named_after_app() {
        let dir = tempfile::tempdir().unwrap();
        make_exe(dir.path(), "aaa_tool");
        make_exe(&dir.path().join("bin"), "videolan");
        let expected = make_exe(&dir.path().join("bin"), "vlc");

        let found = find_main_executable(dir.path(), "VLC", 4).unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn skips_installers_when_no_name_matches() {
        let dir = tempfile::tempdir().unwrap();
        make_exe(dir.path(), "setup");
        make_exe(dir.path(), "uninstall");
        let expected = make_exe(dir.path(), "editor");

        let found = find_main_executable(dir.path(), "Something Else", 4).unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn none_when_only_auxiliary_executables() {
        let dir = tempfile::tempdir().unwrap();
        make_exe(dir.path(), "updater");
        assert_eq!(find_main_executable(dir.path(), "", 4), None);
        assert_eq!(find_main_executable(&dir.path().join("missing"), "x", 4), None);
    }

    #[test]
    fn ignores_non_executable_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), b"hi").unwrap();
        assert_eq!(find_main_executable(dir.path(), "readme", 4), None);
    }

    #[test]
    fn extracts_exe_from_uninstall_strings() {
        assert_eq!(
            exe_from_command_line(r#""C:\Program Files\App\uninst.exe" /S"#),
            Some(PathBuf::from(r"C:\Program Files\App\uninst.exe"))
        );
        assert_eq!(
            exe_from_command_line(r"C:\Tools\remove.EXE --quiet"),
            Some(PathBuf::from(r"C:\Tools\remove.EXE"))
        );
        assert_eq!(exe_from_command_line("MsiExec.exe /X{1234}"), Some(PathBuf::from("MsiExec.exe")));
        assert_eq!(exe_from_command_line("rundll32 foo"), None);
    }

    #[test]
    fn icon_path_drops_index_and_quotes() {
        assert_eq!(icon_path(r#""C:\App\app.exe",0"#), Some(PathBuf::from(r"C:\App\app.exe")));
        assert_eq!(icon_path(r"C:\App\app.exe,-101"), Some(PathBuf::from(r"C:\App\app.exe")));
        assert_eq!(icon_path(r"C:\App\app.ico"), Some(PathBuf::from(r"C:\App\app.ico")));
        assert_eq!(icon_path("  "), None);
    }

    #[test]
    fn expands_known_variables_only() {
        let expanded = expand_env_with(r"%ProgramFiles%\App\%MISSING%", |name| {
            (name == "ProgramFiles").then(|| r"C:\Program Files".to_string())
        });
        assert_eq!(expanded, r"C:\Program Files\App\%MISSING%");
    }
}
