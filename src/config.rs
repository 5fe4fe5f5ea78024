use serde::Deserialize;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use anyhow::Result;
use std::fs;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sources: SourceConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "lanceur", "lanceur")
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    #[serde(default = "default_scan_workers")]
    pub scan_workers: usize,
}

fn default_scan_workers() -> usize { 4 }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            scan_workers: default_scan_workers(),
        }
    }
}

impl GeneralConfig {
    pub fn resolved_catalog_path(&self) -> PathBuf {
        if let Some(path) = &self.catalog_path {
            return path.clone();
        }
        match project_dirs() {
            Some(dirs) => dirs.data_dir().join("catalog.json"),
            None => PathBuf::from("catalog.json"),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub registry: bool,
    #[serde(default = "default_true")]
    pub app_paths: bool,
    #[serde(default = "default_true")]
    pub start_menu: bool,
    #[serde(default = "default_true")]
    pub install_dirs: bool,
    #[serde(default = "default_true")]
    pub packaged: bool,
    #[serde(default = "default_true")]
    pub search_path: bool,
    #[serde(default = "default_true")]
    pub curated: bool,
    #[serde(default = "default_install_roots")]
    pub install_roots: Vec<PathBuf>,
    #[serde(default = "default_start_menu_dirs")]
    pub start_menu_dirs: Vec<PathBuf>,
    #[serde(default = "default_max_search_depth")]
    pub max_search_depth: usize,
    #[serde(default)]
    pub extra_curated: Vec<CuratedApp>,
}

/// A well-known application and the places it is usually installed.
#[derive(Deserialize, Debug, Clone)]
pub struct CuratedApp {
    pub name: String,
    pub paths: Vec<PathBuf>,
}

fn default_true() -> bool { true }
fn default_max_search_depth() -> usize { 4 }

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf())
}

fn default_install_roots() -> Vec<PathBuf> {
    let mut roots = vec![
        PathBuf::from(r"C:\Program Files"),
        PathBuf::from(r"C:\Program Files (x86)"),
    ];
    if let Some(home) = home_dir() {
        roots.push(home.join("AppData").join("Local"));
        roots.push(home.join("AppData").join("Roaming"));
    }
    roots.push(PathBuf::from(r"C:\Windows\System32"));
    roots.push(PathBuf::from(r"C:\Windows\SysWOW64"));
    roots
}

fn default_start_menu_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = home_dir() {
        dirs.push(home.join(r"AppData\Roaming\Microsoft\Windows\Start Menu\Programs"));
    }
    dirs.push(PathBuf::from(r"C:\ProgramData\Microsoft\Windows\Start Menu\Programs"));
    dirs
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            registry: true,
            app_paths: true,
            start_menu: true,
            install_dirs: true,
            packaged: true,
            search_path: true,
            curated: true,
            install_roots: default_install_roots(),
            start_menu_dirs: default_start_menu_dirs(),
            max_search_depth: default_max_search_depth(),
            extra_curated: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Regexes; entries whose key or display name match are dropped.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Substrings; when set, only entries containing one survive.
    pub whitelist: Option<Vec<String>>,
}

/// Resolver thresholds. Empirically tuned; pinned by tests rather than derived.
#[derive(Deserialize, Debug, Clone)]
pub struct MatchConfig {
    #[serde(default = "default_substring_min_len")]
    pub substring_min_len: usize,
    #[serde(default = "default_word_min_len")]
    pub word_min_len: usize,
    #[serde(default = "default_word_len_slack")]
    pub word_len_slack: usize,
    #[serde(default = "default_fuzzy_min_len")]
    pub fuzzy_min_len: usize,
}

fn default_substring_min_len() -> usize { 4 }
fn default_word_min_len() -> usize { 3 }
fn default_word_len_slack() -> usize { 3 }
fn default_fuzzy_min_len() -> usize { 3 }

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            substring_min_len: default_substring_min_len(),
            word_min_len: default_word_min_len(),
            word_len_slack: default_word_len_slack(),
            fuzzy_min_len: default_fuzzy_min_len(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_oracle_url")]
    pub url: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_important_limit")]
    pub important_limit: usize,
    #[serde(default = "default_other_limit")]
    pub other_limit: usize,
    #[serde(default = "default_no_match_token")]
    pub no_match_token: String,
}

fn default_oracle_url() -> String { "http://127.0.0.1:11434".to_string() }
fn default_oracle_model() -> String { "mistral:instruct".to_string() }
fn default_oracle_timeout() -> u64 { 30 }
fn default_important_limit() -> usize { 20 }
fn default_other_limit() -> usize { 40 }
fn default_no_match_token() -> String { "aucune".to_string() }

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_oracle_url(),
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout(),
            important_limit: default_important_limit(),
            other_limit: default_other_limit(),
            no_match_token: default_no_match_token(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
