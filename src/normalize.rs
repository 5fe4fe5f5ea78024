//! Display-name cleanup shared by every scanner.

use regex::Regex;
use std::sync::LazyLock;

static PARENTHESES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());
static BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\[[^\]]*\]").unwrap());
static VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[vV]?\d+(?:\.\d+)*\b").unwrap());
static BITNESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:x64|x86|32-bit|64-bit|win32|win64)\b").unwrap());
static PATCH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:update|hotfix|patch)\s*$").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Vendor variants that collapse to one spelling.
const CANONICAL_NAMES: &[(&str, &str)] = &[
    ("google chrome", "Google Chrome"),
    ("mozilla firefox", "Mozilla Firefox"),
    ("microsoft edge", "Microsoft Edge"),
];

/// Names containing any of these are tooling, not applications.
const DENYLIST: &[&str] = &[
    "uninstall",
    "setup",
    "installer",
    "updater",
    "helper",
    "service",
    "driver",
    "runtime",
    "redistributable",
    "microsoft visual c++",
    "vcredist",
    ".net framework",
];

/// Cleans a raw display name. `None` means the candidate must be discarded.
pub fn normalize_name(raw: &str) -> Option<String> {
    let cleaned = PARENTHESES.replace_all(raw, "");
    let cleaned = BRACKETS.replace_all(&cleaned, "");
    let cleaned = BITNESS.replace_all(&cleaned, "");
    let cleaned = VERSION.replace_all(&cleaned, "");
    let cleaned = PATCH_SUFFIX.replace_all(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim().trim_end_matches([' ', '-', ',', ':']).trim();

    let lower = cleaned.to_lowercase();
    for (needle, canonical) in CANONICAL_NAMES {
        if lower.contains(needle) {
            return Some((*canonical).to_string());
        }
    }

    if is_valid_application(cleaned) {
        Some(cleaned.to_string())
    } else {
        None
    }
}

pub fn is_valid_application(name: &str) -> bool {
    if name.chars().count() < 2 {
        return false;
    }
    let lower = name.to_lowercase();
    !DENYLIST.iter().any(|pattern| lower.contains(pattern))
}

/// Catalog key for a normalized name.
pub fn catalog_key(normalized: &str) -> String {
    normalized.to_lowercase()
}
