//! Spoken-phrase aliases and the curated synonym table.

use std::collections::BTreeSet;

/// Alternates for well-known products. `pattern` is matched as a substring of
/// the lowercase normalized name; `keywords` are what people actually say.
pub struct SynonymGroup {
    pub pattern: &'static str,
    pub keywords: &'static [&'static str],
}

pub const SYNONYMS: &[SynonymGroup] = &[
    SynonymGroup { pattern: "google chrome", keywords: &["chrome", "navigateur google", "navigateur"] },
    SynonymGroup { pattern: "mozilla firefox", keywords: &["firefox", "navigateur mozilla"] },
    SynonymGroup { pattern: "microsoft edge", keywords: &["edge", "navigateur microsoft"] },
    SynonymGroup { pattern: "vlc media player", keywords: &["vlc", "lecteur video", "lecteur vidéo"] },
    SynonymGroup { pattern: "visual studio code", keywords: &["vscode", "vs code"] },
    SynonymGroup { pattern: "notepad++", keywords: &["notepad plus plus", "editeur texte", "éditeur de texte"] },
    SynonymGroup { pattern: "microsoft word", keywords: &["word", "winword", "traitement texte", "traitement de texte"] },
    SynonymGroup { pattern: "microsoft excel", keywords: &["excel", "tableur"] },
    SynonymGroup { pattern: "microsoft powerpoint", keywords: &["powerpoint", "presentation", "présentation"] },
    SynonymGroup { pattern: "microsoft outlook", keywords: &["outlook", "courrier", "mail"] },
    SynonymGroup { pattern: "netflix", keywords: &["netflix", "streaming"] },
    SynonymGroup { pattern: "notepad", keywords: &["bloc-notes", "bloc notes"] },
    SynonymGroup { pattern: "calc", keywords: &["calculatrice", "calculator"] },
    SynonymGroup { pattern: "paint", keywords: &["peinture"] },
    SynonymGroup { pattern: "spotify", keywords: &["spotify", "musique"] },
    SynonymGroup { pattern: "discord", keywords: &["discord"] },
    SynonymGroup { pattern: "skype", keywords: &["skype"] },
    SynonymGroup { pattern: "steam", keywords: &["steam", "jeux"] },
    SynonymGroup { pattern: "photoshop", keywords: &["photoshop", "retouche photo"] },
];

/// Major applications favoured when several entries compete.
const IMPORTANT: &[&str] = &["netflix", "chrome", "firefox", "edge", "vlc", "spotify", "word", "excel"];

pub fn is_important(key: &str) -> bool {
    IMPORTANT.iter().any(|k| key.contains(k))
}

fn significant_words(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_string)
        .collect()
}

/// Aliases for a normalized name. Always contains the lowercase name itself.
pub fn generate_aliases(normalized: &str) -> BTreeSet<String> {
    let name = normalized.to_lowercase();
    let mut aliases = BTreeSet::new();

    let words = significant_words(&name);
    if words.len() > 1 {
        let acronym: String = words.iter().filter_map(|w| w.chars().next()).collect();
        if acronym.chars().count() >= 2 {
            aliases.insert(acronym);
        }
    }
    aliases.extend(words);

    for group in SYNONYMS {
        if name.contains(group.pattern) {
            aliases.extend(group.keywords.iter().map(|k| k.to_string()));
        }
    }

    aliases.insert(name);
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn full_name_words_and_acronym() {
        let aliases = generate_aliases("Visual Studio Code");
        assert_eq!(
            aliases,
            set(&["visual studio code", "visual", "studio", "code", "vsc", "vscode", "vs code"])
        );
    }

    #[test]
    fn short_words_are_not_aliases() {
        let aliases = generate_aliases("VLC media player");
        assert!(aliases.contains("vlc media player"));
        assert!(aliases.contains("vmp"));
        assert!(aliases.contains("lecteur video"));
        assert!(!aliases.contains("vl"));

        let single = generate_aliases("Git");
        assert_eq!(single, set(&["git"]));
    }

    #[test]
    fn browser_gets_generic_synonym() {
        let aliases = generate_aliases("Google Chrome");
        assert!(aliases.contains("chrome"));
        assert!(aliases.contains("navigateur"));
        assert!(aliases.contains("gc"));
    }

    #[test]
    fn name_is_always_present() {
        for name in ["Qt", "7-Zip", "Notepad++", "Bloc-notes"] {
            assert!(generate_aliases(name).contains(&name.to_lowercase()));
        }
    }

    #[test]
    fn important_allow_list_matches_by_substring() {
        assert!(is_important("google chrome"));
        assert!(is_important("4df9e0f8.netflix"));
        assert!(!is_important("gimp"));
    }
}
