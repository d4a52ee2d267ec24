use thiserror::Error;

/// A parsed tree that does not have the shape its scope requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("tuple parameter {param} is never unpacked in the body")]
    MissingTupleUnpack { param: String },

    #[error("lambda body is not a single return")]
    LambdaBody,

    #[error("malformed list comprehension: {0}")]
    Comprehension(&'static str),
}
