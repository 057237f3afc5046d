// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tag tokenizer.
//!
//! Extract a base name, and an ordered list of tags from a display string.
//! Tokenization never fails. A name without any tag group simply yields no
//! tags.

use regex::Regex;
use std::{path::Path, sync::LazyLock};

static TAG_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^/)]+)\)").expect("tag group pattern is valid"));

/// Base name and tags of a display string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tokens {
    pub base_name: String,
    pub tags: Vec<String>,
}

/// Tokenize display string into base name and tags.
///
/// The base name is everything before the first ` (` delimiter, normalized
/// with [`normalize_name`]. Tags are taken from every parenthesized group in
/// the whole string, split at commas, and trimmed. Groups holding a `/` are
/// skipped, as are nested ones.
pub fn tokenize(display: &str) -> Tokens {
    // INVARIANT: A leading delimiter does not count, the name would be empty.
    let start = match display.find(" (") {
        Some(start) if start > 0 => start,
        _ => {
            return Tokens {
                base_name: normalize_name(display),
                tags: Vec::new(),
            }
        }
    };

    let tags = TAG_GROUP
        .captures_iter(display)
        .filter_map(|caps| caps.get(1))
        .flat_map(|group| group.as_str().split(','))
        .map(|tag| tag.trim().to_string())
        .collect();

    Tokens {
        base_name: normalize_name(&display[..start]),
        tags,
    }
}

/// Tokenize file stem of path.
pub fn tokenize_path(path: impl AsRef<Path>) -> Tokens {
    let stem = path
        .as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    tokenize(&stem)
}

/// Normalize a name for grouping.
///
/// Replaces `&` with `and`, lower-cases, and strips ASCII punctuation.
pub fn normalize_name(name: &str) -> String {
    name.replace('&', "and")
        .to_lowercase()
        .chars()
        .filter(|ch| !ch.is_ascii_punctuation())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(
        "Sonic & Knuckles (USA, Rev 1)",
        "sonic and knuckles",
        &["USA", "Rev 1"];
        "ampersand and two tags"
    )]
    #[test_case("Tetris", "tetris", &[]; "no tags")]
    #[test_case(
        "Dr. Mario (Japan, USA) (Rev A)",
        "dr mario",
        &["Japan", "USA", "Rev A"];
        "multiple groups"
    )]
    #[test_case("(Unl) Homebrew", "unl homebrew", &[]; "leading group is not a delimiter")]
    #[test_case("Mega Man X (USA)(Beta)", "mega man x", &["USA", "Beta"]; "adjacent groups")]
    #[test_case("Pac-Man (USA) (Namco/Tengen)", "pacman", &["USA"]; "slash groups are skipped")]
    #[test]
    fn tokenize_display_names(display: &str, base_name: &str, tags: &[&str]) {
        let result = tokenize(display);
        let expect = Tokens {
            base_name: base_name.into(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        };
        assert_eq!(result, expect);
    }

    #[test]
    fn tokenize_path_uses_file_stem() {
        let result = tokenize_path("/roms/snes/Super Metroid (Japan, USA) (En,Ja).zip");
        assert_eq!(result.base_name, "super metroid");
        assert_eq!(result.tags, vec!["Japan", "USA", "En", "Ja"]);
    }
}
