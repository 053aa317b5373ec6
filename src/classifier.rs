//! Token classifier: separates meaningful tokens from structural and subword noise.

use crate::types::Token;

/// Prefix of structural tokens such as `[CLS]`, `[SEP]`, `[PAD]`.
pub const SPECIAL_PREFIX: &str = "[";
/// WordPiece subword-continuation marker.
pub const CONTINUATION_MARKER: &str = "##";
/// Punctuation marks that never become nodes on their own.
pub const BARE_PUNCTUATION: [&str; 4] = [".", ",", "!", "?"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Content,
    Special,
    Continuation,
    Punctuation,
    Empty,
}

pub fn token_kind(raw: &str) -> TokenKind {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        TokenKind::Empty
    } else if trimmed.starts_with(SPECIAL_PREFIX) {
        TokenKind::Special
    } else if trimmed.starts_with(CONTINUATION_MARKER) {
        TokenKind::Continuation
    } else if BARE_PUNCTUATION.contains(&trimmed) {
        TokenKind::Punctuation
    } else {
        TokenKind::Content
    }
}

pub fn is_meaningful(raw: &str) -> bool {
    token_kind(raw) == TokenKind::Content
}

/// Display text: continuation markers stripped, surrounding whitespace trimmed.
pub fn clean_token(raw: &str) -> String {
    raw.replace(CONTINUATION_MARKER, "").trim().to_string()
}

/// Filters a raw token sequence down to the tokens worth drawing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenClassifier {
    /// Keep structural markers as nodes (flagged `is_special`).
    pub keep_special: bool,
}

impl TokenClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_special(mut self) -> Self {
        self.keep_special = true;
        self
    }

    /// Ordered subsequence of kept tokens, each tagged with its original index.
    ///
    /// An empty result means there is nothing to visualize.
    pub fn classify<S: AsRef<str>>(&self, raw: &[S]) -> Vec<Token> {
        let mut kept = Vec::new();
        for (original_index, token) in raw.iter().enumerate() {
            let token = token.as_ref();
            let display_index = kept.len();
            match token_kind(token) {
                TokenKind::Content => {
                    kept.push(Token::new(clean_token(token), original_index, display_index));
                }
                TokenKind::Special if self.keep_special => {
                    kept.push(Token::new(token.trim(), original_index, display_index).special());
                }
                _ => {}
            }
        }
        kept
    }
}
