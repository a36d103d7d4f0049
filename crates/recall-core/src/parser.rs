//! TOML deck parser.
//!
//! Loads vocabulary decks from TOML files and directories, and validates
//! them before import.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{NewItem, OwnerId};

pub use crate::model::MAX_FIELD_CHARS;

/// A named list of words to import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    /// Default language for words that do not set their own.
    pub language: Option<String>,
    pub words: Vec<DeckWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckWord {
    pub original: String,
    pub translation: String,
    pub part_of_speech: Option<String>,
    pub example: Option<String>,
    pub language: Option<String>,
}

impl DeckWord {
    /// Whether the word can become an item: both sides present and no
    /// field over [`MAX_FIELD_CHARS`].
    pub fn is_importable(&self) -> bool {
        let within = |s: &str| s.chars().count() <= MAX_FIELD_CHARS;
        !self.original.trim().is_empty()
            && !self.translation.trim().is_empty()
            && within(&self.original)
            && within(&self.translation)
            && self.example.as_deref().map_or(true, within)
    }
}

impl Deck {
    /// Convert the importable words into insert payloads for `owner`.
    pub fn to_new_items(&self, owner: OwnerId) -> Vec<NewItem> {
        self.words
            .iter()
            .filter(|w| w.is_importable())
            .map(|w| {
                let mut item = NewItem::new(owner, w.original.trim(), w.translation.trim());
                if let Some(language) = w.language.as_ref().or(self.language.as_ref()) {
                    item = item.with_language(language.as_str());
                }
                if let Some(pos) = &w.part_of_speech {
                    item = item.with_part_of_speech(pos.as_str());
                }
                if let Some(example) = &w.example {
                    item = item.with_example(example.as_str());
                }
                item
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct TomlDeckFile {
    deck: TomlDeckHeader,
    #[serde(default)]
    words: Vec<TomlWord>,
}

#[derive(Debug, Deserialize)]
struct TomlDeckHeader {
    id: String,
    name: String,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlWord {
    original: String,
    translation: String,
    #[serde(default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

/// Parse a single TOML file into a `Deck`.
pub fn parse_deck(path: &Path) -> Result<Deck> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read deck file: {}", path.display()))?;

    parse_deck_str(&content, path)
}

/// Parse a TOML string into a `Deck`.
pub fn parse_deck_str(content: &str, source_path: &Path) -> Result<Deck> {
    let parsed: TomlDeckFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let words = parsed
        .words
        .into_iter()
        .map(|w| DeckWord {
            original: w.original,
            translation: w.translation,
            part_of_speech: w.part_of_speech,
            example: w.example,
            language: w.language,
        })
        .collect();

    Ok(Deck {
        id: parsed.deck.id,
        name: parsed.deck.name,
        language: parsed.deck.language,
        words,
    })
}

/// Recursively load all `.toml` decks from a directory.
pub fn load_deck_directory(dir: &Path) -> Result<Vec<Deck>> {
    let mut decks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            decks.extend(load_deck_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_deck(&path) {
                Ok(deck) => decks.push(deck),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(decks)
}

/// A problem found in a deck.
#[derive(Debug, Clone)]
pub struct DeckWarning {
    /// Index of the word in the deck, if the warning is about one word.
    pub word_index: Option<usize>,
    pub message: String,
}

impl DeckWarning {
    fn word(index: usize, message: impl Into<String>) -> Self {
        Self {
            word_index: Some(index),
            message: message.into(),
        }
    }
}

/// Validate a deck for common issues.
pub fn validate_deck(deck: &Deck) -> Vec<DeckWarning> {
    let mut warnings = Vec::new();

    if deck.words.is_empty() {
        warnings.push(DeckWarning {
            word_index: None,
            message: "deck has no words".into(),
        });
    }

    let mut seen = HashSet::new();
    for (i, word) in deck.words.iter().enumerate() {
        let original = word.original.trim();
        let translation = word.translation.trim();

        if original.is_empty() {
            warnings.push(DeckWarning::word(i, "original is empty"));
        }
        if translation.is_empty() {
            warnings.push(DeckWarning::word(i, "translation is empty"));
        }

        let fields = [
            ("original", Some(&word.original)),
            ("translation", Some(&word.translation)),
            ("example", word.example.as_ref()),
        ];
        for (name, value) in fields {
            if value.is_some_and(|v| v.chars().count() > MAX_FIELD_CHARS) {
                warnings.push(DeckWarning::word(
                    i,
                    format!("{name} is longer than {MAX_FIELD_CHARS} characters"),
                ));
            }
        }

        if !original.is_empty() && !seen.insert(original.to_lowercase()) {
            warnings.push(DeckWarning::word(i, format!("duplicate word: {original}")));
        }

        if !original.is_empty() && original.to_lowercase() == translation.to_lowercase() {
            warnings.push(DeckWarning::word(
                i,
                format!("translation is identical to the original: {original}"),
            ));
        }
    }

    warnings
}
