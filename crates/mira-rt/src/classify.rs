//! Ordered, predicate-based classification of runtime values.
//!
//! The classifier is an open list of `(class, predicate)` pairs scanned in
//! registration order; the first predicate that accepts a value decides its
//! class. Values can satisfy several predicates, so order is the tie-break:
//! built-ins go first, specific user predicates before general ones.
//!
//! The generic-object category sits outside the list. Its predicate is
//! consulted only after every registered predicate has rejected the value,
//! so a user predicate that recognizes particular objects still wins.

use crate::class::{ClassId, Predicate};
use crate::value::Value;

/// Reserved class identity for values owned by the external object system.
pub const OBJECT_CLASS: &str = "object";

#[derive(Debug, Clone)]
pub struct Classifier {
    entries: Vec<(ClassId, Predicate)>,
    fallback: Option<(ClassId, Predicate)>,
}

impl Classifier {
    /// An empty classifier that still recognizes generic objects.
    pub fn new() -> Self {
        Classifier {
            entries: Vec::new(),
            fallback: Some((
                ClassId::new(OBJECT_CLASS),
                Predicate::new("object?", Value::is_object),
            )),
        }
    }

    /// Append a class. Re-registering an identity appends another entry;
    /// the earlier one keeps winning for values both accept.
    pub fn push(&mut self, class: ClassId, predicate: Predicate) {
        self.entries.push((class, predicate));
    }

    pub fn classify(&self, value: &Value) -> Option<ClassId> {
        self.entries
            .iter()
            .chain(self.fallback.iter())
            .find(|(_, pred)| pred.accepts(value))
            .map(|(class, _)| class.clone())
    }

    /// First-match scan in registration order, then the object fallback.
    ///
    /// For the fallback the returned predicate also rejects every value a
    /// registered entry accepts, so a slot warmed by one generic object
    /// never hits for an object a user class claims.
    pub fn classify_with_predicate(&self, value: &Value) -> Option<(ClassId, Predicate)> {
        if let Some((class, pred)) = self.entries.iter().find(|(_, pred)| pred.accepts(value)) {
            return Some((class.clone(), pred.clone()));
        }
        let (class, pred) = self.fallback.as_ref()?;
        if !pred.accepts(value) {
            return None;
        }
        Some((class.clone(), self.unclaimed(pred)))
    }

    /// `fallback` narrowed to values no registered entry accepts.
    fn unclaimed(&self, fallback: &Predicate) -> Predicate {
        let name = fallback.name().to_string();
        let fallback = fallback.clone();
        let claimed: Vec<Predicate> = self.entries.iter().map(|(_, pred)| pred.clone()).collect();
        Predicate::new(&name, move |v| {
            fallback.accepts(v) && !claimed.iter().any(|pred| pred.accepts(v))
        })
    }

    /// True if `class` is the generic-object category.
    pub fn is_delegated(&self, class: &ClassId) -> bool {
        matches!(&self.fallback, Some((fallback, _)) if fallback == class)
    }

    /// Registered classes in classification order, fallback excluded.
    pub fn order(&self) -> impl Iterator<Item = &ClassId> {
        self.entries.iter().map(|(class, _)| class)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_pred(name: &str) -> Predicate {
        Predicate::new(name, |v| matches!(v, Value::Int(_)))
    }

    #[test]
    fn test_first_registered_wins() {
        let mut c = Classifier::new();
        c.push(ClassId::new("small"), Predicate::new("small?", |v| {
            matches!(v, Value::Int(n) if *n < 10)
        }));
        c.push(ClassId::new("int"), int_pred("int?"));

        for _ in 0..3 {
            assert_eq!(c.classify(&Value::Int(3)), Some(ClassId::new("small")));
            assert_eq!(c.classify(&Value::Int(30)), Some(ClassId::new("int")));
        }
    }

    #[test]
    fn test_unclassified_is_none() {
        let mut c = Classifier::new();
        c.push(ClassId::new("int"), int_pred("int?"));
        assert_eq!(c.classify(&Value::Bool(true)), None);
    }

    #[test]
    fn test_reregistration_keeps_first_entry() {
        let mut c = Classifier::new();
        c.push(ClassId::new("a"), int_pred("first?"));
        c.push(ClassId::new("a"), int_pred("second?"));
        let (_, pred) = c.classify_with_predicate(&Value::Int(1)).unwrap();
        assert_eq!(pred.name(), "first?");
        assert_eq!(c.order().count(), 2);
    }

    #[derive(Debug)]
    struct Dummy;

    impl crate::value::GenericObject for Dummy {
        fn class_name(&self) -> &str {
            "dummy%"
        }

        fn send(
            &self,
            _method: &str,
            _args: &[Value],
        ) -> Result<Value, crate::error::DispatchError> {
            Ok(Value::Nil)
        }
    }

    #[test]
    fn test_object_fallback_after_user_predicates() {
        let mut c = Classifier::new();
        let obj = Value::object(Dummy);
        assert_eq!(c.classify(&obj), Some(ClassId::new(OBJECT_CLASS)));
        assert!(c.is_delegated(&ClassId::new(OBJECT_CLASS)));

        // Registered after construction, yet consulted before the fallback.
        c.push(ClassId::new("dummy"), Predicate::new("dummy?", Value::is_object));
        assert_eq!(c.classify(&obj), Some(ClassId::new("dummy")));
    }

    #[test]
    fn test_fallback_predicate_rejects_claimed_objects() {
        let mut c = Classifier::new();
        c.push(ClassId::new("int"), int_pred("int?"));
        let obj = Value::object(Dummy);
        let (class, pred) = c.classify_with_predicate(&obj).unwrap();
        assert_eq!(class, ClassId::new(OBJECT_CLASS));
        assert_eq!(pred.name(), "object?");
        assert!(pred.accepts(&obj));
        assert!(!pred.accepts(&Value::Int(1)));

        c.push(ClassId::new("dummy"), Predicate::new("dummy?", Value::is_object));
        let narrowed = c.unclaimed(&Predicate::new("object?", Value::is_object));
        assert!(!narrowed.accepts(&obj));
    }
}
