//! Pipeline errors

use thiserror::Error;

use crate::bytecode::DecodeError;
use crate::parser_error::ParseError;
use crate::rewrite::RewriteError;

/// Pipeline result type
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a decompilation. There is no partial output.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("syntax tree nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("cannot generate source: {0}")]
    Generate(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("in {name}: {source}")]
    Scope {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the name of the scope being generated.
    pub fn in_scope(self, name: &str) -> Self {
        Error::Scope {
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any scope context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Scope { source, .. } => source.root(),
            other => other,
        }
    }
}
