use crate::bytecode::disasm::listing;
use crate::frontend::token::Token;

/// The token stream has no derivation from the start symbol.
///
/// `position` indexes the token that could not be shifted. When the input
/// ran out before a scope was complete, `position` equals the token count
/// and `token` is `None`. The full token list is kept so callers can print
/// the section that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub position: usize,
    pub token: Option<Token>,
    tokens: Vec<Token>,
}

impl ParseError {
    pub fn new(position: usize, tokens: &[Token]) -> Self {
        Self {
            position,
            token: tokens.get(position).cloned(),
            tokens: tokens.to_vec(),
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Every token of the failed scope, one per line.
    pub fn listing(&self) -> String {
        listing(&self.tokens)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.token {
            Some(token) => write!(
                f,
                "syntax error at or near `{}` token at offset {}",
                token.kind, token.offset
            ),
            None => write!(f, "syntax error at end of instructions"),
        }
    }
}

impl std::error::Error for ParseError {}
