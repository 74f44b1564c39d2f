//! Aho-Corasick scrubber for secrets in error text.
//!
//! Transport errors can echo request details back; the password and the
//! session token must never reach stdout or the log.

use aho_corasick::AhoCorasick;

const REPLACEMENT: &str = "[REDACTED]";

/// Shorter values would mangle ordinary words in the message.
const MIN_SECRET_LEN: usize = 4;

/// Replaces every occurrence of the registered secret values.
#[derive(Default)]
pub struct SecretRedactor {
    secrets: Vec<String>,
    automaton: Option<AhoCorasick>,
}

impl SecretRedactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret value. Values under four bytes are ignored.
    pub fn add(&mut self, secret: &str) {
        if secret.len() < MIN_SECRET_LEN || self.secrets.iter().any(|s| s == secret) {
            return;
        }
        self.secrets.push(secret.to_string());
        self.automaton = AhoCorasick::builder()
            .match_kind(aho_corasick::MatchKind::LeftmostLongest)
            .build(&self.secrets)
            .ok();
    }

    pub fn redact(&self, text: &str) -> String {
        match &self.automaton {
            Some(ac) => {
                let replacements = vec![REPLACEMENT; self.secrets.len()];
                ac.replace_all(text, &replacements)
            }
            None => text.to_string(),
        }
    }
}
