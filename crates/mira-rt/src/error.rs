//! Dispatch errors.
//!
//! Every failure in the runtime is reported synchronously at the access
//! site that triggered it. Nothing is retried and nothing is downgraded to
//! a default value; callers let these propagate to their own top-level
//! error handling.
//!
//! Receivers are carried in their rendered form so the error stays
//! `Send + Sync` even though runtime values are not.

use std::fmt;

use serde::Serialize;

/// A failed field read/write, method call, or positional access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum DispatchError {
    /// No registered predicate accepts the receiver.
    UnclassifiedReceiver { receiver: String, member: String },
    /// The receiver's class is known but declares no such field.
    UnknownField {
        class: String,
        receiver: String,
        field: String,
    },
    /// The receiver's class is known but declares no such method.
    UnknownMethod {
        class: String,
        receiver: String,
        method: String,
    },
    /// The field exists but was declared without a mutator.
    ReadOnlyFieldWrite {
        class: String,
        receiver: String,
        field: String,
    },
    /// Registration under the identity reserved for generic objects.
    ReservedClass { class: String },
    /// Positional access on something that is neither an array nor text.
    IndexedAccessOnNonIndexable { receiver: String },
    /// A member name or access path that is not structurally valid.
    MalformedAccessExpression { expression: String, reason: String },
    /// A position outside `0..len`.
    IndexOutOfRange { index: i64, len: usize },
    /// Positional access takes between one and three subscripts.
    IndexArity { found: usize },
    /// A method was called with the wrong number of arguments.
    ArityMismatch {
        member: String,
        expected: String,
        found: usize,
    },
    /// An argument or subscript had the wrong shape.
    WrongArgumentType {
        member: String,
        expected: String,
        found: String,
    },
}

impl DispatchError {
    pub(crate) fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        DispatchError::MalformedAccessExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn arity(member: &str, expected: &str, found: usize) -> Self {
        DispatchError::ArityMismatch {
            member: member.to_string(),
            expected: expected.to_string(),
            found,
        }
    }

    pub(crate) fn wrong_type(member: &str, expected: &str, found: impl fmt::Display) -> Self {
        DispatchError::WrongArgumentType {
            member: member.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// The member name the failing access asked for, when there is one.
    pub fn member(&self) -> Option<&str> {
        match self {
            DispatchError::UnclassifiedReceiver { member, .. } => Some(member),
            DispatchError::UnknownField { field, .. } => Some(field),
            DispatchError::UnknownMethod { method, .. } => Some(method),
            DispatchError::ReadOnlyFieldWrite { field, .. } => Some(field),
            DispatchError::ArityMismatch { member, .. } => Some(member),
            DispatchError::WrongArgumentType { member, .. } => Some(member),
            _ => None,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnclassifiedReceiver { receiver, member } => {
                write!(
                    f,
                    "cannot access `{}`: no registered class accepts {}",
                    member, receiver
                )
            }
            DispatchError::UnknownField {
                class,
                receiver,
                field,
            } => {
                write!(f, "class `{}` has no field `{}` (receiver {})", class, field, receiver)
            }
            DispatchError::UnknownMethod {
                class,
                receiver,
                method,
            } => {
                write!(
                    f,
                    "class `{}` has no method `{}` (receiver {})",
                    class, method, receiver
                )
            }
            DispatchError::ReadOnlyFieldWrite {
                class,
                receiver,
                field,
            } => {
                write!(
                    f,
                    "field `{}` of class `{}` is read-only (receiver {})",
                    field, class, receiver
                )
            }
            DispatchError::ReservedClass { class } => {
                write!(f, "class name `{}` is reserved for generic objects", class)
            }
            DispatchError::IndexedAccessOnNonIndexable { receiver } => {
                write!(f, "positional access requires an array or text, found {}", receiver)
            }
            DispatchError::MalformedAccessExpression { expression, reason } => {
                write!(f, "malformed access expression `{}`: {}", expression, reason)
            }
            DispatchError::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for length {}", index, len)
            }
            DispatchError::IndexArity { found } => {
                write!(f, "positional access takes 1 to 3 indices, found {}", found)
            }
            DispatchError::ArityMismatch {
                member,
                expected,
                found,
            } => {
                write!(
                    f,
                    "`{}` expects {} argument(s), found {}",
                    member, expected, found
                )
            }
            DispatchError::WrongArgumentType {
                member,
                expected,
                found,
            } => {
                write!(f, "`{}` expects {}, found {}", member, expected, found)
            }
        }
    }
}

impl std::error::Error for DispatchError {}
