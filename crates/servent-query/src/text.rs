//! Query text compaction.
//!
//! Applied before a query is forwarded, to shrink the bytes we push
//! further into the network: collapse whitespace runs, drop words too
//! short to be useful search terms, and strip a leading UTF-8 BOM some
//! clients still emit. The result is never longer than the input —
//! compaction only removes characters — which matters because any GGEP
//! trailer after the search text has to shift left by exactly the number
//! of bytes dropped, never right.

/// Words shorter than this (in characters) are dropped unless doing so
/// would leave nothing at all.
pub const MIN_WORD_LEN: usize = 3;

const UTF8_BOM: &str = "\u{feff}";

/// Compact `text` in place, returning the number of bytes removed.
pub fn compact(text: &mut String) -> usize {
    let before = text.len();

    let stripped = text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string();

    let words: Vec<&str> = stripped.split_whitespace().collect();
    let kept: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .collect();

    let result = if kept.is_empty() {
        words.join(" ")
    } else {
        kept.join(" ")
    };

    *text = result;
    before - text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        let mut s = "foo   bar\tbaz".to_string();
        compact(&mut s);
        assert_eq!(s, "foo bar baz");
    }

    #[test]
    fn drops_short_words() {
        let mut s = "to be or not to be hamlet".to_string();
        compact(&mut s);
        assert_eq!(s, "not hamlet");
    }

    #[test]
    fn keeps_short_words_if_nothing_else_survives() {
        let mut s = "to be".to_string();
        compact(&mut s);
        assert_eq!(s, "to be");
    }

    #[test]
    fn strips_leading_bom() {
        let mut s = format!("{UTF8_BOM}hello world");
        compact(&mut s);
        assert_eq!(s, "hello world");
    }

    #[test]
    fn never_grows() {
        for input in ["", "a", "hello world", "   ", "\u{feff}x"] {
            let mut s = input.to_string();
            let before_len = s.len();
            compact(&mut s);
            assert!(s.len() <= before_len);
        }
    }
}
