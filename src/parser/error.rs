use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, got {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: u32,
        column: u32,
    },
    #[error("Unknown class '{name}' at line {line}, column {column}")]
    UnknownClass { name: String, line: u32, column: u32 },
}

pub type ParseResult<T> = Result<T, ParseError>;
