//! Field and method resolution within a known class.
//!
//! Lookups are linear scans over the class's declared entries. Classes
//! declare a handful of members, so there is no secondary hash layer.
//!
//! The generic-object category has no tables. Resolving a member on it
//! yields a function that forwards to the object's own dispatch, and that
//! function is cached like any other.

use std::sync::Arc;

use crate::class::{no_subscripts, Accessor, ClassId, Method, Mutator};
use crate::error::DispatchError;
use crate::registry::ClassRegistry;
use crate::value::Value;

/// Outcome of looking up a field for writing.
///
/// A read-only field and a missing field are different failures and the
/// caller must be able to tell them apart.
#[derive(Clone)]
pub enum MutatorLookup {
    Found(Mutator),
    ReadOnly,
    Missing,
}

impl std::fmt::Debug for MutatorLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutatorLookup::Found(_) => write!(f, "Found(..)"),
            MutatorLookup::ReadOnly => write!(f, "ReadOnly"),
            MutatorLookup::Missing => write!(f, "Missing"),
        }
    }
}

impl ClassRegistry {
    pub fn resolve_accessor(&self, class: &ClassId, field: &str) -> Option<Accessor> {
        let state = self.state.read();
        if state.classifier.is_delegated(class) {
            return Some(delegated_accessor(field));
        }
        state
            .fields(class)?
            .iter()
            .find(|f| f.name == field)
            .map(|f| Arc::clone(&f.accessor))
    }

    pub fn resolve_mutator(&self, class: &ClassId, field: &str) -> MutatorLookup {
        let state = self.state.read();
        if state.classifier.is_delegated(class) {
            return MutatorLookup::Found(delegated_mutator(field));
        }
        let entry = state
            .fields(class)
            .and_then(|fields| fields.iter().find(|f| f.name == field));
        match entry {
            Some(f) => match &f.mutator {
                Some(m) => MutatorLookup::Found(Arc::clone(m)),
                None => MutatorLookup::ReadOnly,
            },
            None => MutatorLookup::Missing,
        }
    }

    pub fn resolve_method(&self, class: &ClassId, method: &str) -> Option<Method> {
        let state = self.state.read();
        if state.classifier.is_delegated(class) {
            return Some(delegated_method(method));
        }
        state
            .methods(class)?
            .iter()
            .find(|m| m.name == method)
            .map(|m| Arc::clone(&m.callable))
    }
}

// ── Generic-object delegation ───────────────────────────────────────────

fn delegated_accessor(field: &str) -> Accessor {
    let name = field.to_string();
    Arc::new(move |recv: &Value, subs: &[Value]| {
        no_subscripts(&name, subs)?;
        match recv {
            Value::Object(obj) => obj.get_field(&name),
            other => Err(DispatchError::wrong_type(&name, "an object", other)),
        }
    })
}

fn delegated_mutator(field: &str) -> Mutator {
    let name = field.to_string();
    Arc::new(move |recv: &Value, subs: &[Value], value: Value| {
        no_subscripts(&name, subs)?;
        match recv {
            Value::Object(obj) => obj.set_field(&name, value),
            other => Err(DispatchError::wrong_type(&name, "an object", other)),
        }
    })
}

fn delegated_method(method: &str) -> Method {
    let name = method.to_string();
    Arc::new(move |recv: &Value, args: &[Value]| match recv {
        Value::Object(obj) => obj.send(&name, args),
        other => Err(DispatchError::wrong_type(&name, "an object", other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{FieldEntry, Predicate};
    use crate::classify::OBJECT_CLASS;

    #[test]
    fn test_read_only_distinct_from_missing() {
        let reg = ClassRegistry::new();
        let seq = ClassId::new("sequence");
        assert!(matches!(reg.resolve_mutator(&seq, "x"), MutatorLookup::ReadOnly));
        assert!(matches!(reg.resolve_mutator(&seq, "w"), MutatorLookup::Missing));
        assert!(reg.resolve_accessor(&seq, "x").is_some());
    }

    #[test]
    fn test_unregistered_class_resolves_nothing() {
        let reg = ClassRegistry::empty();
        let ghost = ClassId::new("Ghost");
        assert!(reg.resolve_accessor(&ghost, "x").is_none());
        assert!(reg.resolve_method(&ghost, "length").is_none());
        assert!(matches!(reg.resolve_mutator(&ghost, "x"), MutatorLookup::Missing));
    }

    #[test]
    fn test_computed_field_mutator_is_read_only() {
        let reg = ClassRegistry::empty();
        let p = ClassId::new("P");
        reg.register_class(p.clone(), Predicate::record(&p)).unwrap();
        reg.register_fields(
            &p,
            vec![
                FieldEntry::slot("x", 0),
                FieldEntry::computed("double", |v| match v {
                    Value::Record(r) => {
                        let x = r.get(0).and_then(|x| x.as_int()).unwrap_or(0);
                        Ok(Value::Int(x * 2))
                    }
                    _ => Ok(Value::Nil),
                }),
            ],
        )
        .unwrap();
        assert!(matches!(reg.resolve_mutator(&p, "x"), MutatorLookup::Found(_)));
        assert!(matches!(reg.resolve_mutator(&p, "double"), MutatorLookup::ReadOnly));
    }

    #[test]
    fn test_object_class_always_delegates() {
        let reg = ClassRegistry::empty();
        let object = ClassId::new(OBJECT_CLASS);
        assert!(reg.resolve_method(&object, "anything").is_some());
        assert!(reg.resolve_accessor(&object, "anything").is_some());
    }
}
