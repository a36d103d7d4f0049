pub mod add;
pub mod cleanup;
pub mod delete;
pub mod due;
pub mod import;
pub mod init;
pub mod review;
pub mod stats;
pub mod validate;
pub mod words;

use std::path::Path;

use anyhow::Result;
use recall_core::parser::{self, Deck};

/// Load one deck file, or every deck under a directory.
pub fn load_decks(path: &Path) -> Result<Vec<Deck>> {
    if path.is_dir() {
        parser::load_deck_directory(path)
    } else {
        Ok(vec![parser::parse_deck(path)?])
    }
}
