use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unterminated string literal at line {line}")]
    UnterminatedString { line: u32 },
    #[error("Invalid number literal '{literal}' at line {line}")]
    InvalidNumber { literal: String, line: u32 },
    #[error("Indentation must be a multiple of two spaces, got {width} at line {line}")]
    OddIndentation { width: usize, line: u32 },
    #[error("Tabs are not supported for indentation at line {line}")]
    TabIndentation { line: u32 },
    #[error("Expected '=' after '!' at line {line}, column {column}")]
    LoneBang { line: u32, column: u32 },
}

pub type LexResult<T> = Result<T, LexError>;
