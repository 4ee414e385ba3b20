use thiserror::Error;

use super::value::ValueKind;
use crate::ast::{InfixOp, PrefixOp};

/// Failures raised while evaluating. These travel through evaluation as `Value::Error`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("identifier not found: {0}")]
    UnboundIdentifier(String),
    #[error("unknown operator: {op}{right}")]
    UnknownPrefixOperator { op: PrefixOp, right: ValueKind },
    #[error("unknown operator: {left} {op} {right}")]
    UnknownInfixOperator {
        left: ValueKind,
        op: InfixOp,
        right: ValueKind,
    },
    #[error("type mismatch: {left} {op} {right}")]
    TypeMismatch {
        left: ValueKind,
        op: InfixOp,
        right: ValueKind,
    },
    #[error("division by zero")]
    DivideByZero,
    #[error("not a function: {0}")]
    NotAFunction(ValueKind),
    #[error("index operator not supported: {0}")]
    IndexNotSupported(ValueKind),
    #[error("unusable as hash key: {0}")]
    UnusableHashKey(ValueKind),
    #[error("wrong number of arguments. got={got}, want={want}")]
    ArityMismatch { got: usize, want: usize },
    #[error("argument to `{builtin}` not supported, got {got}")]
    UnsupportedArgument {
        builtin: &'static str,
        got: ValueKind,
    },
    #[error("argument to `{builtin}` must be {expected}, got {got}")]
    ArgumentType {
        builtin: &'static str,
        expected: ValueKind,
        got: ValueKind,
    },
}
