//! Class identities, predicates, and the field/method entries a class
//! declares.
//!
//! All callables are `Arc<dyn Fn .. + Send + Sync>`: they only borrow
//! values for the duration of a call, so the registry holding them can be
//! shared once it has been populated.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::DispatchError;
use crate::value::Value;

/// Opaque, comparable name of a runtime shape.
///
/// Uniqueness is the registering code's responsibility; two registrations
/// with the same name denote the same class.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(Arc<str>);

impl ClassId {
    pub fn new(name: &str) -> Self {
        ClassId(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ClassId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        ClassId::new(name)
    }
}

// ── Function types ──────────────────────────────────────────────────────

/// Reads a field. The slice carries subscripts; plain fields receive `&[]`.
pub type Accessor = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, DispatchError> + Send + Sync>;

/// Writes a field. Subscripts come before the new value.
pub type Mutator =
    Arc<dyn Fn(&Value, &[Value], Value) -> Result<(), DispatchError> + Send + Sync>;

/// Calls a method. The receiver is always the first parameter.
pub type Method = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, DispatchError> + Send + Sync>;

// ── Predicate ───────────────────────────────────────────────────────────

/// Recognizes membership in a class. Must be pure and cheap: it runs on
/// every cache probe.
#[derive(Clone)]
pub struct Predicate {
    name: Arc<str>,
    test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new(name: &str, test: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Predicate {
            name: Arc::from(name),
            test: Arc::new(test),
        }
    }

    /// Accepts records declared with class `class`.
    pub fn record(class: &ClassId) -> Self {
        let class = class.clone();
        Predicate::new(&format!("{}?", class), move |v| v.is_record_of(&class))
    }

    #[inline]
    pub fn accepts(&self, value: &Value) -> bool {
        (self.test)(value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.name)
    }
}

// ── Entries ─────────────────────────────────────────────────────────────

/// A declared field. `mutator: None` marks the field read-only.
#[derive(Clone)]
pub struct FieldEntry {
    pub name: String,
    pub accessor: Accessor,
    pub mutator: Option<Mutator>,
}

impl FieldEntry {
    pub fn new(
        name: &str,
        accessor: impl Fn(&Value, &[Value]) -> Result<Value, DispatchError> + Send + Sync + 'static,
        mutator: Option<Mutator>,
    ) -> Self {
        FieldEntry {
            name: name.to_string(),
            accessor: Arc::new(accessor),
            mutator,
        }
    }

    /// A read-only field computed from the receiver.
    pub fn computed(
        name: &str,
        f: impl Fn(&Value) -> Result<Value, DispatchError> + Send + Sync + 'static,
    ) -> Self {
        let member = name.to_string();
        FieldEntry::new(
            name,
            move |recv, subs| {
                no_subscripts(&member, subs)?;
                f(recv)
            },
            None,
        )
    }

    /// A mutable field stored in record slot `index`.
    pub fn slot(name: &str, index: usize) -> Self {
        let read_name = name.to_string();
        let write_name = name.to_string();
        let mutator: Mutator = Arc::new(move |recv: &Value, subs: &[Value], value: Value| {
            no_subscripts(&write_name, subs)?;
            match recv {
                Value::Record(r) => {
                    let len = r.len();
                    if r.set(index, value) {
                        Ok(())
                    } else {
                        Err(DispatchError::IndexOutOfRange {
                            index: index as i64,
                            len,
                        })
                    }
                }
                other => Err(DispatchError::wrong_type(&write_name, "a record", other)),
            }
        });
        FieldEntry::new(
            name,
            move |recv, subs| {
                no_subscripts(&read_name, subs)?;
                match recv {
                    Value::Record(r) => r.get(index).ok_or(DispatchError::IndexOutOfRange {
                        index: index as i64,
                        len: r.len(),
                    }),
                    other => Err(DispatchError::wrong_type(&read_name, "a record", other)),
                }
            },
            Some(mutator),
        )
    }

    pub fn is_read_only(&self) -> bool {
        self.mutator.is_none()
    }
}

impl fmt::Debug for FieldEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEntry")
            .field("name", &self.name)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

/// A declared method.
#[derive(Clone)]
pub struct MethodEntry {
    pub name: String,
    pub callable: Method,
}

impl MethodEntry {
    pub fn new(
        name: &str,
        callable: impl Fn(&Value, &[Value]) -> Result<Value, DispatchError> + Send + Sync + 'static,
    ) -> Self {
        MethodEntry {
            name: name.to_string(),
            callable: Arc::new(callable),
        }
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry").field("name", &self.name).finish()
    }
}

/// Fails unless `subs` is empty. Plain fields take no subscripts.
pub(crate) fn no_subscripts(member: &str, subs: &[Value]) -> Result<(), DispatchError> {
    if subs.is_empty() {
        Ok(())
    } else {
        Err(DispatchError::arity(member, "no subscripts", subs.len()))
    }
}

/// Member names must be usable in dotted access expressions.
pub(crate) fn validate_member_name(name: &str) -> Result<(), DispatchError> {
    let Some(first) = name.chars().next() else {
        return Err(DispatchError::malformed(name, "member name is empty"));
    };
    if first.is_ascii_digit() {
        return Err(DispatchError::malformed(name, "member name starts with a digit"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '.' | '[' | ']' | ','))
    {
        return Err(DispatchError::malformed(
            name,
            format!("member name contains {:?}", bad),
        ));
    }
    Ok(())
}
