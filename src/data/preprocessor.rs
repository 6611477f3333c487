// ============================================================
// Layer 4 — Utterance Preprocessor
// ============================================================
// Normalises a single chat utterance before tokenisation.
//
// Exported spreadsheets and terminal input often carry:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - Byte order marks at the start of the first cell
//   - Stray tabs, carriage returns or embedded newlines
//   - Runs of spaces from manual editing
//
// A question or answer is one line of conversation, so every
// kind of whitespace collapses to a single space and the
// result is trimmed.
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one utterance. Returns an owned, single-line String.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true; // swallows leading whitespace

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space can be left behind
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("안녕   하세요"), "안녕 하세요");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello world  "), "hello world");
    }

    #[test]
    fn test_flattens_newlines_and_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\r\nworld\x01!"), "hello world !");
    }

    #[test]
    fn test_strips_invisible_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("\u{FEFF}12시\u{00A0}땡!"), "12시 땡!");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert_eq!(p.clean(" \t "), "");
    }
}
