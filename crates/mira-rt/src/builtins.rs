//! Built-in classes: array, sequence, and text.
//!
//! These give the container shapes the same field/method surface as
//! user-declared records:
//!
//! | Shape    | Fields                                 | Methods
//! |----------|----------------------------------------|--------
//! | array    | `length`, `x`/`y`/`z` (mutable), `ref` | `length`, `ref`, `list`, `fill!`, `values`
//! | sequence | `x`/`y`/`z` (read-only)                | `length`, `ref`, `vector`
//! | text     |                                        | `length`, `ref`, `list`
//!
//! `ref` takes one to three indices and applies them one after another, so
//! `ref(i, j)` on an array of arrays is element `j` of element `i`.

use std::sync::Arc;

use crate::class::{no_subscripts, ClassId, FieldEntry, MethodEntry, Mutator, Predicate};
use crate::error::DispatchError;
use crate::registry::ClassRegistry;
use crate::value::Value;

pub const ARRAY_CLASS: &str = "array";
pub const SEQUENCE_CLASS: &str = "sequence";
pub const TEXT_CLASS: &str = "text";

/// Most subscripts a single positional access may carry.
pub const MAX_INDICES: usize = 3;

// ── Positional access ───────────────────────────────────────────────────

/// The two shapes positional access is hard-wired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexShape {
    Array,
    Text,
}

impl IndexShape {
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) => Some(IndexShape::Array),
            Value::Text(_) => Some(IndexShape::Text),
            _ => None,
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        IndexShape::of(value) == Some(self)
    }

    pub fn get(self, recv: &Value, index: &Value) -> Result<Value, DispatchError> {
        match (self, recv) {
            (IndexShape::Array, Value::Array(items)) => {
                let items = items.borrow();
                let i = position(index, items.len())?;
                Ok(items[i].clone())
            }
            (IndexShape::Text, Value::Text(chars)) => {
                let chars = chars.borrow();
                let i = position(index, chars.len())?;
                Ok(Value::Char(chars[i]))
            }
            _ => Err(non_indexable(recv)),
        }
    }

    pub fn set(self, recv: &Value, index: &Value, value: Value) -> Result<(), DispatchError> {
        match (self, recv) {
            (IndexShape::Array, Value::Array(items)) => {
                let mut items = items.borrow_mut();
                let i = position(index, items.len())?;
                items[i] = value;
                Ok(())
            }
            (IndexShape::Text, Value::Text(chars)) => {
                let c = match value {
                    Value::Char(c) => c,
                    other => return Err(DispatchError::wrong_type("ref", "a char", &other)),
                };
                let mut chars = chars.borrow_mut();
                let i = position(index, chars.len())?;
                chars[i] = c;
                Ok(())
            }
            _ => Err(non_indexable(recv)),
        }
    }
}

pub(crate) fn non_indexable(recv: &Value) -> DispatchError {
    DispatchError::IndexedAccessOnNonIndexable {
        receiver: recv.to_string(),
    }
}

/// Turn an index value into a position within `0..len`.
fn position(index: &Value, len: usize) -> Result<usize, DispatchError> {
    match index {
        Value::Int(n) if *n >= 0 && (*n as usize) < len => Ok(*n as usize),
        Value::Int(n) => Err(DispatchError::IndexOutOfRange { index: *n, len }),
        other => Err(DispatchError::wrong_type("ref", "an integer index", other)),
    }
}

pub(crate) fn check_index_count(count: usize) -> Result<(), DispatchError> {
    if (1..=MAX_INDICES).contains(&count) {
        Ok(())
    } else {
        Err(DispatchError::IndexArity { found: count })
    }
}

/// One element of an array, sequence, or text.
fn element(recv: &Value, index: &Value) -> Result<Value, DispatchError> {
    match recv {
        Value::Seq(items) => {
            let i = position(index, items.len())?;
            Ok(items[i].clone())
        }
        other => match IndexShape::of(other) {
            Some(shape) => shape.get(other, index),
            None => Err(non_indexable(other)),
        },
    }
}

/// Apply each index in turn.
fn nested_ref(recv: &Value, indices: &[Value]) -> Result<Value, DispatchError> {
    check_index_count(indices.len())?;
    indices
        .iter()
        .try_fold(recv.clone(), |current, index| element(&current, index))
}

/// Write through a chain of indices: all but the last select the
/// container, the last selects the slot.
fn nested_set(recv: &Value, indices: &[Value], value: Value) -> Result<(), DispatchError> {
    check_index_count(indices.len())?;
    let (last, path) = match indices.split_last() {
        Some(split) => split,
        None => return Err(DispatchError::IndexArity { found: 0 }),
    };
    let container = if path.is_empty() {
        recv.clone()
    } else {
        path.iter()
            .try_fold(recv.clone(), |current, index| element(&current, index))?
    };
    match IndexShape::of(&container) {
        Some(shape) => shape.set(&container, last, value),
        None => Err(non_indexable(&container)),
    }
}

fn length(recv: &Value) -> Result<Value, DispatchError> {
    let len = match recv {
        Value::Array(items) => items.borrow().len(),
        Value::Seq(items) => items.len(),
        Value::Text(chars) => chars.borrow().len(),
        other => return Err(DispatchError::wrong_type("length", "a container", other)),
    };
    Ok(Value::Int(len as i64))
}

fn expect_args(member: &str, args: &[Value], count: usize) -> Result<(), DispatchError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(DispatchError::arity(member, &count.to_string(), args.len()))
    }
}

fn ref_arity(args: &[Value]) -> Result<(), DispatchError> {
    if (1..=MAX_INDICES).contains(&args.len()) {
        Ok(())
    } else {
        Err(DispatchError::arity("ref", "1 to 3", args.len()))
    }
}

// ── Class definitions ───────────────────────────────────────────────────

const COMPONENTS: [&str; 3] = ["x", "y", "z"];

fn array_component(name: &'static str, index: i64) -> FieldEntry {
    let mutator: Mutator = Arc::new(move |recv: &Value, subs: &[Value], value: Value| {
        no_subscripts(name, subs)?;
        IndexShape::Array.set(recv, &Value::Int(index), value)
    });
    FieldEntry::new(
        name,
        move |recv, subs| {
            no_subscripts(name, subs)?;
            IndexShape::Array.get(recv, &Value::Int(index))
        },
        Some(mutator),
    )
}

fn sequence_component(name: &'static str, index: i64) -> FieldEntry {
    FieldEntry::computed(name, move |recv| element(recv, &Value::Int(index)))
}

fn array_fields() -> Vec<FieldEntry> {
    let ref_mutator: Mutator = Arc::new(|recv: &Value, subs: &[Value], value: Value| {
        nested_set(recv, subs, value)
    });
    let mut fields = vec![
        FieldEntry::computed("length", length),
        FieldEntry::new("ref", nested_ref, Some(ref_mutator)),
    ];
    fields.extend(
        COMPONENTS
            .into_iter()
            .zip(0..)
            .map(|(name, i)| array_component(name, i)),
    );
    fields
}

fn array_methods() -> Vec<MethodEntry> {
    vec![
        MethodEntry::new("length", |recv, args| {
            expect_args("length", args, 0)?;
            length(recv)
        }),
        MethodEntry::new("ref", |recv, args| {
            ref_arity(args)?;
            nested_ref(recv, args)
        }),
        MethodEntry::new("list", |recv, args| {
            expect_args("list", args, 0)?;
            match recv {
                Value::Array(items) => Ok(Value::seq(items.borrow().clone())),
                other => Err(DispatchError::wrong_type("list", "an array", other)),
            }
        }),
        MethodEntry::new("fill!", |recv, args| {
            expect_args("fill!", args, 1)?;
            match recv {
                Value::Array(items) => {
                    for slot in items.borrow_mut().iter_mut() {
                        *slot = args[0].clone();
                    }
                    Ok(Value::Nil)
                }
                other => Err(DispatchError::wrong_type("fill!", "an array", other)),
            }
        }),
        MethodEntry::new("values", |recv, args| {
            expect_args("values", args, 0)?;
            match recv {
                Value::Array(items) => Ok(Value::Values(items.borrow().clone().into())),
                other => Err(DispatchError::wrong_type("values", "an array", other)),
            }
        }),
    ]
}

fn sequence_methods() -> Vec<MethodEntry> {
    vec![
        MethodEntry::new("length", |recv, args| {
            expect_args("length", args, 0)?;
            length(recv)
        }),
        MethodEntry::new("ref", |recv, args| {
            ref_arity(args)?;
            nested_ref(recv, args)
        }),
        MethodEntry::new("vector", |recv, args| {
            expect_args("vector", args, 0)?;
            match recv {
                Value::Seq(items) => Ok(Value::array(items.to_vec())),
                other => Err(DispatchError::wrong_type("vector", "a sequence", other)),
            }
        }),
    ]
}

fn text_methods() -> Vec<MethodEntry> {
    vec![
        MethodEntry::new("length", |recv, args| {
            expect_args("length", args, 0)?;
            length(recv)
        }),
        MethodEntry::new("ref", |recv, args| {
            ref_arity(args)?;
            nested_ref(recv, args)
        }),
        MethodEntry::new("list", |recv, args| {
            expect_args("list", args, 0)?;
            match recv {
                Value::Text(chars) => Ok(Value::seq(
                    chars.borrow().iter().map(|c| Value::Char(*c)).collect(),
                )),
                other => Err(DispatchError::wrong_type("list", "text", other)),
            }
        }),
    ]
}

/// Register array, sequence, and text, in that order.
pub(crate) fn install(registry: &ClassRegistry) {
    registry.define_builtin(
        ClassId::new(ARRAY_CLASS),
        Predicate::new("array?", Value::is_array),
        array_fields(),
        array_methods(),
    );
    registry.define_builtin(
        ClassId::new(SEQUENCE_CLASS),
        Predicate::new("sequence?", Value::is_seq),
        COMPONENTS
            .into_iter()
            .zip(0..)
            .map(|(name, i)| sequence_component(name, i))
            .collect(),
        sequence_methods(),
    );
    registry.define_builtin(
        ClassId::new(TEXT_CLASS),
        Predicate::new("text?", Value::is_text),
        Vec::new(),
        text_methods(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(ns: &[i64]) -> Vec<Value> {
        ns.iter().map(|n| Value::Int(*n)).collect()
    }

    fn grid() -> Value {
        Value::array(vec![
            Value::array(ints(&[1, 2, 3])),
            Value::array(ints(&[4, 5, 6])),
        ])
    }

    #[test]
    fn test_nested_ref_matches_chained_elements() {
        let g = grid();
        let row = element(&g, &Value::Int(1)).unwrap();
        let chained = element(&row, &Value::Int(2)).unwrap();
        assert_eq!(nested_ref(&g, &ints(&[1, 2])).unwrap(), chained);
        assert_eq!(chained, Value::Int(6));
    }

    #[test]
    fn test_nested_ref_rejects_four_indices() {
        let err = nested_ref(&grid(), &ints(&[0, 0, 0, 0])).unwrap_err();
        assert_eq!(err, DispatchError::IndexArity { found: 4 });
    }

    #[test]
    fn test_nested_set_writes_inner_array() {
        let g = grid();
        nested_set(&g, &ints(&[0, 1]), Value::Int(20)).unwrap();
        assert_eq!(nested_ref(&g, &ints(&[0, 1])).unwrap(), Value::Int(20));
    }

    #[test]
    fn test_text_set_requires_char() {
        let t = Value::text("abc");
        IndexShape::Text.set(&t, &Value::Int(1), Value::Char('X')).unwrap();
        assert_eq!(t, Value::text("aXc"));
        let err = IndexShape::Text
            .set(&t, &Value::Int(1), Value::Int(1))
            .unwrap_err();
        assert!(matches!(err, DispatchError::WrongArgumentType { .. }));
    }

    #[test]
    fn test_position_errors() {
        assert_eq!(
            position(&Value::Int(-1), 3),
            Err(DispatchError::IndexOutOfRange { index: -1, len: 3 })
        );
        assert_eq!(
            position(&Value::Int(3), 3),
            Err(DispatchError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert!(position(&Value::text("0"), 3).is_err());
    }

    #[test]
    fn test_element_of_scalar_is_non_indexable() {
        let err = element(&Value::Int(5), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, DispatchError::IndexedAccessOnNonIndexable { .. }));
    }
}
