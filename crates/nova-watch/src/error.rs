use thiserror::Error;

/// Failure to evaluate a condition or value expression. Fatal to the session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("cannot read `{member}` of null")]
    NullReference { member: String },
    #[error("{type_name} has no member `{member}`")]
    NoSuchMember { type_name: String, member: String },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("type error: {0}")]
    Type(String),
    #[error("{0}")]
    Other(String),
}

/// Failure to render a single value. Isolated to the field being rendered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("rendered output exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("expand depth {expand} exceeds the maximum of {max}")]
    TooDeep { expand: u32, max: u32 },
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchConfigError {
    #[error("invalid line range `{0}`")]
    InvalidLineRange(String),
    #[error("{field} must be >= 1")]
    ZeroLimit { field: &'static str },
    #[error("expand must be <= {max}, got {expand}")]
    ExpandTooDeep { expand: u32, max: u32 },
    #[error("failed to parse watch config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for WatchConfigError {
    fn from(err: toml::de::Error) -> Self {
        WatchConfigError::Toml(err.message().to_owned())
    }
}

/// A channel value whose shape does not match what the channel expects.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ShapeError {
    #[error("channel `{channel}` expected {expected}, found {found}")]
    UnexpectedShape {
        channel: &'static str,
        expected: &'static str,
        found: String,
    },
}
