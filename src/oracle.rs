//! Last-resort phrase mapping through a local text-generation service.

use crate::aliases::is_important;
use crate::catalog::Catalog;
use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::model::CatalogEntry;
use crate::resolver::length_bounded_contains;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// The only capability required from the text-generation service.
pub trait Oracle: Send + Sync {
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, OracleError>;
}

/// Non-streaming `/api/generate` client for an Ollama-compatible server.
pub struct OllamaOracle {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .build()
            .map_err(|err| OracleError::Transport(format!("client build failed: {err}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }
}

impl Oracle for OllamaOracle {
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, OracleError> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&payload)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Transport(err.to_string())
                }
            })?;
        if !response.status().is_success() {
            return Err(OracleError::Status(response.status().as_u16()));
        }
        let body: GenerateResponse = response
            .json()
            .map_err(|err| OracleError::Payload(err.to_string()))?;
        Ok(body.response)
    }
}

fn candidate_line(entry: &CatalogEntry) -> String {
    format!("- {} ({})", entry.display_name, entry.key)
}

/// Prompt with the phrase, a bounded candidate list (major applications
/// first) and worked examples of the expected answer.
pub fn build_prompt(phrase: &str, catalog: &Catalog, config: &OracleConfig) -> String {
    let (important, others): (Vec<&CatalogEntry>, Vec<&CatalogEntry>) =
        catalog.iter().partition(|e| is_important(&e.key));
    let lines: Vec<String> = important
        .into_iter()
        .take(config.important_limit)
        .chain(others.into_iter().take(config.other_limit))
        .map(candidate_line)
        .collect();
    let token = config.no_match_token.to_uppercase();

    format!(
        r#"ANALYSE DE LA DEMANDE UTILISATEUR

PHRASE COMPLÈTE: "{phrase}"

APPLICATIONS DISPONIBLES (nom affiché (clé)):
{apps}

INSTRUCTIONS:
1. Identifie EXACTEMENT quelle application l'utilisateur veut ouvrir.
2. Exemples:
   - "je veux que tu ouvres Netflix" -> "4df9e0f8.netflix"
   - "lance le navigateur" -> "google chrome"
   - "je veux regarder un film" -> "vlc media player"
   - "ouvre Word" -> "microsoft word"
3. Réponds UNIQUEMENT avec la clé exacte (ce qui est entre parenthèses).
4. Si aucune application ne correspond, réponds "{token}".

RÉPONSE:"#,
        phrase = phrase.trim(),
        apps = lines.join("\n"),
    )
}

/// Maps a raw answer back onto the catalog.
pub fn map_answer<'c>(answer: &str, catalog: &'c Catalog, no_match_token: &str, min_len: usize) -> Option<&'c CatalogEntry> {
    let answer = answer.trim().to_lowercase();
    let answer = answer.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '«' | '»' | '.' | '!' | ',' | ';' | ':')
    });

    if answer.is_empty() || answer == no_match_token.to_lowercase() {
        return None;
    }
    if let Some(entry) = catalog.get(answer) {
        return Some(entry);
    }
    catalog.iter().find(|e| length_bounded_contains(answer, &e.key, min_len))
}

/// Asks the oracle and validates its answer. Transport failures degrade to `None`.
pub fn consult<'c>(
    oracle: &dyn Oracle,
    phrase: &str,
    catalog: &'c Catalog,
    config: &OracleConfig,
    min_len: usize,
    timeout: Duration,
) -> Option<&'c CatalogEntry> {
    let prompt = build_prompt(phrase, catalog, config);
    let answer = match oracle.generate(&prompt, timeout) {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Oracle unavailable for {:?}: {}", phrase, e);
            return None;
        }
    };
    debug!("Oracle answered {:?}", answer);
    map_answer(&answer, catalog, &config.no_match_token, min_len)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed answer and records what it was asked.
    pub struct ScriptedOracle {
        pub answer: Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
        pub timeouts: Mutex<Vec<Duration>>,
    }

    impl ScriptedOracle {
        pub fn answering(answer: &str) -> Self {
            Self::with(Ok(answer.to_string()))
        }

        pub fn failing(detail: &str) -> Self {
            Self::with(Err(detail.to_string()))
        }

        fn with(answer: Result<String, String>) -> Self {
            Self {
                answer,
                prompts: Mutex::new(Vec::new()),
                timeouts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl Oracle for ScriptedOracle {
        fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, OracleError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.timeouts.lock().unwrap().push(timeout);
            self.answer.clone().map_err(OracleError::Transport)
        }
    }
}
