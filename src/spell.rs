//! Dictionary-backed spelling suggestions for search queries.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

const MAX_SUGGESTIONS: usize = 5;
const MIN_SCORE: f64 = 70.0;
const MAX_LEN_DELTA: usize = 3;

/// Anything that can propose alternate spellings for a query.
pub trait Suggester: Send + Sync {
    fn suggest(&self, query: &str) -> Vec<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum SpellError {
    #[error("Failed to read dictionary: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse affix rules: {0}")]
    Affix(String),
}

pub struct SpellChecker {
    words: HashSet<String>,
    sorted: Vec<String>,
    /// Hunspell rules for inflected forms, when an `.aff` file was found.
    affixed: Option<spellbook::Dictionary>,
}

impl SpellChecker {
    /// Load `path`, plus the `.aff` file beside it if there is one.
    pub fn load(path: &Path) -> Result<Self, SpellError> {
        let dic = std::fs::read_to_string(path)?;
        let aff_path = path.with_extension("aff");
        let checker = match std::fs::read_to_string(&aff_path) {
            Ok(aff) => Self::from_hunspell(&aff, &dic)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No affix file at {}; inflected words will not be recognized", aff_path.display());
                Self::from_dictionary(&dic)
            }
            Err(e) => return Err(e.into()),
        };
        info!("Loaded {} dictionary words from {}", checker.len(), path.display());
        Ok(checker)
    }

    /// A hunspell `.aff`/`.dic` pair. Stems are suggestion candidates and the
    /// affix rules decide which inflected forms are correct.
    pub fn from_hunspell(aff: &str, dic: &str) -> Result<Self, SpellError> {
        let affixed = spellbook::Dictionary::new(aff, dic).map_err(|e| SpellError::Affix(e.to_string()))?;
        let mut checker = Self::from_dictionary(dic);
        checker.affixed = Some(affixed);
        Ok(checker)
    }

    /// Parse a hunspell `.dic` file or a plain word-per-line list.
    ///
    /// The leading word count of a `.dic` file and any `/FLAGS` suffixes are
    /// ignored. Inflected forms need the affix rules, see `from_hunspell`.
    pub fn from_dictionary(content: &str) -> Self {
        let mut words = HashSet::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if lineno == 0 && !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let stem = line.split('/').next().unwrap_or("").trim();
            if stem.is_empty() || stem.starts_with('#') {
                continue;
            }
            words.insert(stem.to_lowercase());
        }

        let mut sorted: Vec<String> = words.iter().cloned().collect();
        sorted.sort();

        Self {
            words,
            sorted,
            affixed: None,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn correct(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        if self.words.contains(&lower) {
            return true;
        }
        match self.affixed {
            Some(ref dict) => dict.check(word) || dict.check(&lower),
            None => false,
        }
    }

    /// Closest dictionary words to `word`, best first.
    pub fn suggest_word(&self, word: &str) -> Vec<String> {
        let word = word.to_lowercase();
        if word.is_empty() || self.correct(&word) {
            return Vec::new();
        }

        let len = word.chars().count();
        let mut scored: Vec<(f64, &String)> = self
            .sorted
            .iter()
            .filter(|candidate| candidate.chars().count().abs_diff(len) <= MAX_LEN_DELTA)
            .map(|candidate| (rapidfuzz::fuzz::ratio(word.chars(), candidate.chars()), candidate))
            .filter(|(score, _)| *score >= MIN_SCORE)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, w)| w.clone())
            .collect()
    }

    /// Alternate queries for a phrase: each misspelled word swapped for its
    /// candidates in turn, the rest of the phrase left as typed.
    fn suggest_phrase(&self, words: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for (i, word) in words.iter().enumerate() {
            for replacement in self.suggest_word(word) {
                let mut alternate: Vec<&str> = words.to_vec();
                alternate[i] = &replacement;
                out.push(alternate.join(" "));
                if out.len() == MAX_SUGGESTIONS {
                    return out;
                }
            }
        }
        out
    }
}

impl Suggester for SpellChecker {
    fn suggest(&self, query: &str) -> Vec<String> {
        let words: Vec<&str> = query.split_whitespace().collect();
        match words.len() {
            0 => Vec::new(),
            1 => self.suggest_word(words[0]),
            _ => self.suggest_phrase(&words),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> SpellChecker {
        SpellChecker::from_dictionary("6\nhello/S\nhelp\nhell\nmatrix/M\nalien\nworld\n")
    }

    #[test]
    fn test_dictionary_parsing() {
        let checker = checker();
        assert_eq!(checker.len(), 6);
        assert!(checker.correct("Hello"));
        assert!(checker.correct("matrix"));
        assert!(!checker.correct("6"));
    }

    #[test]
    fn test_correct_word_has_no_suggestions() {
        assert!(checker().suggest("hello").is_empty());
        assert!(checker().suggest("   ").is_empty());
    }

    #[test]
    fn test_misspelled_word() {
        let suggestions = checker().suggest("helo");
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
        assert!(suggestions.contains(&"hello".to_string()));
        assert!(!suggestions.contains(&"matrix".to_string()));
    }

    #[test]
    fn test_phrase_keeps_correct_words() {
        let suggestions = checker().suggest("hello wrld");
        assert!(suggestions.contains(&"hello world".to_string()));
        assert!(suggestions.iter().all(|s| s.starts_with("hello ")));
    }

    const AFFIXES: &str = "SET UTF-8\n\nSFX S Y 1\nSFX S   0     s          .\n";

    #[test]
    fn test_affixed_forms_are_correct() {
        let checker = SpellChecker::from_hunspell(AFFIXES, "3\nmovie/S\nheat\nalien/S\n").unwrap();
        assert!(checker.correct("movie"));
        assert!(checker.correct("movies"));
        assert!(checker.correct("aliens"));
        assert!(!checker.correct("heats"));
        assert!(checker.suggest("movies").is_empty());
        assert!(checker.suggest("aliens movies").is_empty());

        let suggestions = checker.suggest("moveis");
        assert_eq!(suggestions.first().map(String::as_str), Some("movie"));
    }

    #[test]
    fn test_plain_list_does_not_inflect() {
        let checker = SpellChecker::from_dictionary("3\nmovie/S\nheat\nalien/S\n");
        assert!(checker.correct("movie"));
        assert!(!checker.correct("movies"));
    }

    #[test]
    fn test_load_picks_up_affix_file() {
        let dir = tempfile::tempdir().unwrap();
        let dic = dir.path().join("en_US.dic");
        std::fs::write(&dic, "1\nmovie/S\n").unwrap();
        assert!(!SpellChecker::load(&dic).unwrap().correct("movies"));

        std::fs::write(dir.path().join("en_US.aff"), AFFIXES).unwrap();
        assert!(SpellChecker::load(&dic).unwrap().correct("movies"));
    }
}
