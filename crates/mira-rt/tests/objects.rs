//! Integration tests for receivers owned by the external object system.

use std::cell::Cell;

use mira_rt::{
    CallSite, ClassId, ClassRegistry, DispatchError, FieldEntry, FieldSite, GenericObject,
    MethodEntry, Predicate, StoreSite, Value, OBJECT_CLASS,
};

// ── Helpers ────────────────────────────────────────────────────────────

/// A counter whose methods and fields are dispatched by the object itself.
#[derive(Debug, Default)]
struct Counter {
    count: Cell<i64>,
    sends: Cell<u32>,
}

impl GenericObject for Counter {
    fn class_name(&self) -> &str {
        "counter%"
    }

    fn send(&self, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        self.sends.set(self.sends.get() + 1);
        match method {
            "increment" => {
                let by = args.first().and_then(Value::as_int).unwrap_or(1);
                self.count.set(self.count.get() + by);
                Ok(Value::Int(self.count.get()))
            }
            "get" => Ok(Value::Int(self.count.get())),
            other => Err(DispatchError::UnknownMethod {
                class: self.class_name().to_string(),
                receiver: "#<object counter%>".to_string(),
                method: other.to_string(),
            }),
        }
    }

    fn get_field(&self, name: &str) -> Result<Value, DispatchError> {
        match name {
            "count" => Ok(Value::Int(self.count.get())),
            other => Err(DispatchError::UnknownField {
                class: self.class_name().to_string(),
                receiver: "#<object counter%>".to_string(),
                field: other.to_string(),
            }),
        }
    }

    fn set_field(&self, name: &str, value: Value) -> Result<(), DispatchError> {
        match (name, value) {
            ("count", Value::Int(n)) => {
                self.count.set(n);
                Ok(())
            }
            _ => Err(DispatchError::ReadOnlyFieldWrite {
                class: self.class_name().to_string(),
                receiver: "#<object counter%>".to_string(),
                field: name.to_string(),
            }),
        }
    }
}

/// An object that only implements the required part of the interface.
#[derive(Debug)]
struct Opaque;

impl GenericObject for Opaque {
    fn class_name(&self) -> &str {
        "opaque%"
    }

    fn send(&self, _method: &str, _args: &[Value]) -> Result<Value, DispatchError> {
        Ok(Value::text("sent"))
    }
}

/// Registers `Wrapped`, a user class that claims only `opaque%` objects.
fn register_wrapped(reg: &ClassRegistry) -> ClassId {
    let wrapped = ClassId::new("Wrapped");
    reg.register_class(
        wrapped.clone(),
        Predicate::new("opaque?", |v| {
            matches!(v, Value::Object(obj) if obj.class_name() == "opaque%")
        }),
    )
    .unwrap();
    wrapped
}

// ── Delegation ─────────────────────────────────────────────────────────

#[test]
fn test_methods_delegate_to_send() {
    let reg = ClassRegistry::new();
    let counter = Value::object(Counter::default());
    assert_eq!(reg.classify(&counter), Some(ClassId::new(OBJECT_CLASS)));

    let mut site = CallSite::new();
    for expected in 1..=3 {
        assert_eq!(
            reg.call_method(&mut site, &counter, "increment", &[]).unwrap(),
            Value::Int(expected)
        );
    }
    assert_eq!(
        reg.call_method(&mut CallSite::new(), &counter, "increment", &[Value::Int(10)])
            .unwrap(),
        Value::Int(13)
    );
    assert_eq!(site.stats().misses, 1);
    assert_eq!(site.class(), Some(&ClassId::new(OBJECT_CLASS)));
}

#[test]
fn test_object_errors_propagate_unchanged() {
    let reg = ClassRegistry::new();
    let counter = Value::object(Counter::default());
    let err = reg
        .call_method(&mut CallSite::new(), &counter, "reset", &[])
        .unwrap_err();
    assert_eq!(err.member(), Some("reset"));
    assert!(matches!(err, DispatchError::UnknownMethod { ref class, .. } if class == "counter%"));
}

#[test]
fn test_fields_delegate_to_object() {
    let reg = ClassRegistry::new();
    let counter = Value::object(Counter::default());
    reg.set_field(&mut StoreSite::new(), &counter, "count", Value::Int(41))
        .unwrap();
    assert_eq!(
        reg.get_field(&mut FieldSite::new(), &counter, "count").unwrap(),
        Value::Int(41)
    );
}

#[test]
fn test_default_object_fields_are_unknown() {
    let reg = ClassRegistry::empty();
    let opaque = Value::object(Opaque);
    let err = reg
        .get_field(&mut FieldSite::new(), &opaque, "anything")
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::UnknownField {
            class: "opaque%".into(),
            receiver: "#<object opaque%>".into(),
            field: "anything".into(),
        }
    );
    assert_eq!(
        reg.call_method(&mut CallSite::new(), &opaque, "anything", &[]).unwrap(),
        Value::text("sent")
    );
}

#[test]
fn test_user_predicate_shadows_object_fallback() {
    let reg = ClassRegistry::new();
    let wrapped = register_wrapped(&reg);
    reg.register_methods(
        &wrapped,
        vec![MethodEntry::new("who", |_, _| Ok(Value::text("registry")))],
    )
    .unwrap();
    reg.register_fields(&wrapped, vec![FieldEntry::computed("tag", |_| Ok(Value::Int(7)))])
        .unwrap();

    let opaque = Value::object(Opaque);
    let counter = Value::object(Counter::default());

    let mut site = CallSite::new();
    assert_eq!(
        reg.call_method(&mut site, &opaque, "who", &[]).unwrap(),
        Value::text("registry")
    );
    // The counter is still a generic object: the registry entry does not
    // apply and `who` goes to its own dispatch.
    let err = reg.call_method(&mut site, &counter, "who", &[]).unwrap_err();
    assert!(matches!(err, DispatchError::UnknownMethod { ref class, .. } if class == "counter%"));
    assert_eq!(site.class(), Some(&ClassId::new(OBJECT_CLASS)));
    assert_eq!(reg.classify(&opaque), Some(wrapped.clone()));

    // Warmed by an unclaimed object, the site must still route the claimed
    // one to the registry.
    assert_eq!(
        reg.call_method(&mut site, &opaque, "who", &[]).unwrap(),
        Value::text("registry")
    );
    assert_eq!(site.class(), Some(&wrapped));
}

#[test]
fn test_object_warmed_site_matches_cold_lookup() {
    let reg = ClassRegistry::new();
    let wrapped = register_wrapped(&reg);
    reg.register_fields(&wrapped, vec![FieldEntry::computed("count", |_| Ok(Value::Int(-1)))])
        .unwrap();

    let counter = Value::object(Counter::default());
    let opaque = Value::object(Opaque);

    let mut warm = FieldSite::new();
    assert_eq!(reg.get_field(&mut warm, &counter, "count").unwrap(), Value::Int(0));
    let cold = reg.get_field(&mut FieldSite::new(), &opaque, "count").unwrap();
    assert_eq!(reg.get_field(&mut warm, &opaque, "count").unwrap(), cold);
    assert_eq!(cold, Value::Int(-1));
    assert_eq!(warm.stats().misses, 2);
}

#[test]
fn test_site_alternating_object_and_array() {
    let reg = ClassRegistry::new();
    let counter = Value::object(Counter::default());
    let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
    let mut site = CallSite::new();
    assert_eq!(reg.call_method(&mut site, &arr, "length", &[]).unwrap(), Value::Int(2));
    assert_eq!(reg.call_method(&mut site, &counter, "get", &[]).unwrap(), Value::Int(0));
    assert_eq!(reg.call_method(&mut site, &arr, "length", &[]).unwrap(), Value::Int(2));
    assert_eq!(site.stats().misses, 3);
}
