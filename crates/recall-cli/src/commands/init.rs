//! The `recall init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create recall.toml
    if std::path::Path::new("recall.toml").exists() {
        println!("recall.toml already exists, skipping.");
    } else {
        std::fs::write("recall.toml", SAMPLE_CONFIG)?;
        println!("Created recall.toml");
    }

    // Create example deck
    std::fs::create_dir_all("decks")?;
    let example_path = std::path::Path::new("decks/example.toml");
    if example_path.exists() {
        println!("decks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_DECK)?;
        println!("Created decks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: recall validate --deck decks/example.toml");
    println!("  2. Run: recall import --deck decks/example.toml --owner 1");
    println!("  3. Run: recall review --owner 1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# recall configuration

default_session_limit = 10
session_max_age_hours = 24
sweep_interval_secs = 3600

[storage]
type = "sqlite"
# Relative paths are resolved against this file's directory.
path = "recall.db"
"#;

const EXAMPLE_DECK: &str = r#"[deck]
id = "spanish-starter"
name = "Spanish starter"
language = "es"

[[words]]
original = "perro"
translation = "dog"
part_of_speech = "noun"
example = "El perro duerme en el sofá."

[[words]]
original = "gato"
translation = "cat"
part_of_speech = "noun"

[[words]]
original = "casa"
translation = "house"
part_of_speech = "noun"

[[words]]
original = "comer"
translation = "to eat"
part_of_speech = "verb"
example = "Vamos a comer juntos."

[[words]]
original = "rápido"
translation = "fast"
part_of_speech = "adjective"
"#;
