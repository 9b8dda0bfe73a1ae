//! Lexical analysis: splitting one raw input line into argument tokens.
//!
//! The tokenizer is a character-at-a-time state machine. Quoting state is an
//! explicit enum; the two single-character lookaheads (a pending unquoted
//! escape and a pending double-quote escape) are boolean flags so the
//! precedence between the escape rules stays auditable.

use std::ops::Range;

/// One argument-sized unit of the command line after quote and escape
/// processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Resolved text, with quote delimiters and consumed escapes removed.
    pub text: String,
    /// Byte range the token occupies in the raw line.
    pub span: Range<usize>,
}

/// Result of tokenizing one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    /// The raw line with the state-toggling quote characters stripped.
    /// Used for history listing, never for execution.
    pub display: String,
    /// Ordered tokens; `tokens[0]` is the command name.
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Unquoted,
    SingleQuote,
    DoubleQuote,
}

struct LineLexer {
    state: QuoteState,
    /// An unquoted backslash was seen: the next character is literal,
    /// unconditionally.
    pending_escape: bool,
    /// A backslash inside double quotes was seen: only `$`, `\`, `"` and
    /// backtick are escaped; any other character keeps the backslash.
    pending_dquote_escape: bool,
    buffer: String,
    start: Option<usize>,
    tokens: Vec<Token>,
    display: String,
}

impl LineLexer {
    fn new() -> Self {
        LineLexer {
            state: QuoteState::Unquoted,
            pending_escape: false,
            pending_dquote_escape: false,
            buffer: String::new(),
            start: None,
            tokens: Vec::new(),
            display: String::new(),
        }
    }

    fn run(mut self, raw: &str) -> Tokenized {
        for (at, ch) in raw.char_indices() {
            self.step(at, ch);
        }
        // An unterminated quote implicitly closes at end of input; a trailing
        // unquoted backslash is dropped. Neither is an error.
        self.flush(raw.len());
        Tokenized {
            display: self.display,
            tokens: self.tokens,
        }
    }

    fn step(&mut self, at: usize, ch: char) {
        if self.pending_escape {
            self.append(at, ch);
            self.display.push(ch);
            self.pending_escape = false;
            return;
        }

        if self.pending_dquote_escape {
            match ch {
                '$' | '\\' | '"' | '`' => self.append(at, ch),
                other => {
                    // The escape is not consumed by ordinary characters.
                    self.append(at, '\\');
                    self.buffer.push(other);
                }
            }
            self.display.push(ch);
            self.pending_dquote_escape = false;
            return;
        }

        match (self.state, ch) {
            (QuoteState::Unquoted, '\'') => {
                self.mark(at);
                self.state = QuoteState::SingleQuote;
            }
            (QuoteState::Unquoted, '"') => {
                self.mark(at);
                self.state = QuoteState::DoubleQuote;
            }
            (QuoteState::SingleQuote, '\'') | (QuoteState::DoubleQuote, '"') => {
                self.state = QuoteState::Unquoted;
            }
            (QuoteState::Unquoted, '\\') => {
                self.mark(at);
                self.pending_escape = true;
                self.display.push('\\');
            }
            (QuoteState::DoubleQuote, '\\') => {
                self.pending_dquote_escape = true;
                self.display.push('\\');
            }
            (QuoteState::Unquoted, ' ' | '\t') => {
                self.flush(at);
                self.display.push(ch);
            }
            // Everything else is literal, including the other quote character
            // inside a quote and backslashes inside single quotes.
            (_, other) => {
                self.append(at, other);
                self.display.push(other);
            }
        }
    }

    fn mark(&mut self, at: usize) {
        if self.start.is_none() {
            self.start = Some(at);
        }
    }

    fn append(&mut self, at: usize, ch: char) {
        self.mark(at);
        self.buffer.push(ch);
    }

    fn flush(&mut self, end: usize) {
        if self.buffer.is_empty() {
            // Runs of unquoted spaces (and empty quote pairs) produce no
            // empty tokens.
            self.start = None;
            return;
        }
        let start = self.start.take().unwrap_or(end);
        self.tokens.push(Token {
            text: std::mem::take(&mut self.buffer),
            span: start..end,
        });
    }
}

/// Split a raw input line into tokens, honoring quoting and escaping.
///
/// Tokenization never fails: malformed quoting is treated as if the quote
/// closed at end of input. A blank line yields zero tokens.
///
/// ```
/// let parsed = minish::lexer::tokenize("echo 'a b' c");
/// let words: Vec<&str> = parsed.tokens.iter().map(|t| t.text.as_str()).collect();
/// assert_eq!(words, ["echo", "a b", "c"]);
/// ```
pub fn tokenize(raw: &str) -> Tokenized {
    LineLexer::new().run(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(raw: &str) -> Vec<String> {
        tokenize(raw).tokens.into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn plain_input_splits_on_whitespace_runs() {
        assert_eq!(words("echo hello   world"), ["echo", "hello", "world"]);
        assert_eq!(words("  a\tb  "), ["a", "b"]);
    }

    #[test]
    fn blank_line_yields_no_tokens() {
        assert!(words("").is_empty());
        assert!(words("   ").is_empty());
    }

    #[test]
    fn single_quotes_preserve_spaces() {
        assert_eq!(words("'a b' c"), ["a b", "c"]);
    }

    #[test]
    fn double_quotes_preserve_spaces_and_strip_delimiters() {
        let parsed = tokenize("echo \"hello   world\"");
        let texts: Vec<&str> = parsed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["echo", "hello   world"]);
        assert_eq!(parsed.display, "echo hello   world");
    }

    #[test]
    fn escaped_quote_inside_double_quotes() {
        assert_eq!(words("\"a\\\"b\""), ["a\"b"]);
    }

    #[test]
    fn dquote_escape_keeps_backslash_for_ordinary_chars() {
        // Only $, \, " and backtick are consumed by a backslash inside
        // double quotes.
        assert_eq!(words("\"a\\nb\""), ["a\\nb"]);
        assert_eq!(words("\"a\\$b\""), ["a$b"]);
        assert_eq!(words("\"a\\\\b\""), ["a\\b"]);
    }

    #[test]
    fn unquoted_backslash_escapes_anything() {
        assert_eq!(words("a\\ b"), ["a b"]);
        assert_eq!(words("a\\'b"), ["a'b"]);
        assert_eq!(words("a\\\\b"), ["a\\b"]);
    }

    #[test]
    fn concatenated_quote_segments_merge_into_one_token() {
        assert_eq!(words("echo 'it'\\''s'"), ["echo", "it's"]);
    }

    #[test]
    fn other_quote_character_is_literal_inside_quotes() {
        assert_eq!(words("'say \"hi\"'"), ["say \"hi\""]);
        assert_eq!(words("\"it's\""), ["it's"]);
    }

    #[test]
    fn backslash_is_literal_inside_single_quotes() {
        assert_eq!(words("'a\\nb'"), ["a\\nb"]);
    }

    #[test]
    fn unterminated_quote_closes_at_end_of_input() {
        assert_eq!(words("echo 'abc"), ["echo", "abc"]);
        assert_eq!(words("echo \"abc"), ["echo", "abc"]);
    }

    #[test]
    fn trailing_unquoted_backslash_is_dropped() {
        assert_eq!(words("echo \\"), ["echo"]);
    }

    #[test]
    fn empty_quote_pair_produces_no_token() {
        assert!(words("''").is_empty());
        assert_eq!(words("echo '' x"), ["echo", "x"]);
    }

    #[test]
    fn spans_cover_token_positions_in_raw_line() {
        let parsed = tokenize("echo hi");
        assert_eq!(parsed.tokens[0].span, 0..4);
        assert_eq!(parsed.tokens[1].span, 5..7);
    }

    #[test]
    fn span_of_quoted_token_includes_quote_delimiters() {
        let parsed = tokenize("echo 'a b'");
        assert_eq!(parsed.tokens[1].span, 5..10);
        assert_eq!(&"echo 'a b'"[5..10], "'a b'");
    }

    #[test]
    fn display_keeps_escapes_but_strips_quote_delimiters() {
        assert_eq!(tokenize("echo 'a b'").display, "echo a b");
        assert_eq!(tokenize("echo a\\ b").display, "echo a\\ b");
    }
}
