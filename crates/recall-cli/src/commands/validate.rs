//! The `recall validate` command.

use std::path::PathBuf;

use anyhow::Result;

use recall_core::parser::validate_deck;

pub fn execute(deck_path: PathBuf) -> Result<()> {
    let decks = super::load_decks(&deck_path)?;

    let mut total_warnings = 0;

    for deck in &decks {
        println!("Deck: {} ({} words)", deck.name, deck.words.len());

        let warnings = validate_deck(deck);
        for w in &warnings {
            let prefix = w
                .word_index
                .map(|i| format!("  [word {}]", i + 1))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All decks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
