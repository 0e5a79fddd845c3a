use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("'{name}' is not a class instance")]
    NotAnInstance { name: String },
    #[error("Class {class} has no method '{method}' taking {arity} arguments")]
    UnknownMethod {
        class: String,
        method: String,
        arity: usize,
    },
    #[error("Operation '{operation}' is not supported for types {lhs} and {rhs}")]
    UnsupportedOperation {
        operation: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Cannot compare values of types {lhs} and {rhs}")]
    NotComparable {
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Return outside of method")]
    ReturnOutsideMethod,
    #[error("Failed to write program output")]
    Output(#[from] std::fmt::Error),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
