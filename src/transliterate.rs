//! Cyrillic to ASCII transliteration for file names.
//!
//! The table covers the Russian and Ukrainian alphabets plus a block of
//! punctuation that is unsafe or awkward in file names. Every letter is
//! registered in both cases; punctuation maps to `_` one character at a time.
//!
//! # Examples
//!
//! ```
//! use foldersort::transliterate::normalize;
//!
//! assert_eq!(normalize("фото"), "foto");
//! assert_eq!(normalize("Щука"), "SCHuka");
//! assert_eq!(normalize("my file(1)"), "my_file_1_");
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

/// Source letters, paired position by position with `LETTER_REPLACEMENTS`.
const LETTERS: &str = "абвгдеёжзийклмнопрстуфхцчшщъыьэюяєіїґ";

const LETTER_REPLACEMENTS: [&str; 37] = [
    "a", "b", "v", "g", "d", "e", "e", "j", "z", "i", "j", "k", "l", "m", "n", "o", "p", "r", "s",
    "t", "u", "f", "h", "ts", "ch", "sh", "sch", "", "y", "", "e", "yu", "ya", "je", "i", "ji", "g",
];

/// Symbols replaced by a single underscore each.
const SYMBOLS: &str = "!@$%^&*()-+=:;' ";

static STANDARD: LazyLock<Transliterator> = LazyLock::new(Transliterator::new);

/// Immutable character substitution table.
///
/// Built once and shared read-only; `normalize` takes `&self` so any number of
/// worker threads can use the same instance.
#[derive(Debug, Clone)]
pub struct Transliterator {
    table: HashMap<char, String>,
}

impl Transliterator {
    /// Builds the standard table.
    pub fn new() -> Self {
        let mut table = HashMap::new();

        for (letter, replacement) in LETTERS.chars().zip(LETTER_REPLACEMENTS) {
            table.insert(letter, replacement.to_string());
            let mut upper = letter.to_uppercase();
            if let (Some(upper_letter), None) = (upper.next(), upper.next()) {
                table.insert(upper_letter, replacement.to_uppercase());
            }
        }

        for symbol in SYMBOLS.chars() {
            table.insert(symbol, "_".to_string());
        }

        Self { table }
    }

    /// Replaces every mapped character of `name`; everything else passes through.
    pub fn normalize(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            match self.table.get(&c) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        out
    }
}

impl Default for Transliterator {
    fn default() -> Self {
        Self::new()
    }
}

/// Transliterates `name` with the process-wide standard table.
pub fn normalize(name: &str) -> String {
    STANDARD.normalize(name)
}
