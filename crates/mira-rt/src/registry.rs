//! The class registry.
//!
//! Maps class identities to their declared fields and methods and owns the
//! classifier that turns a value into a class identity.
//!
//! ## Semantics
//!
//! - Classes are classified in registration order; the order is observable.
//! - `register_fields` / `register_methods` replace the class's previous
//!   field or method set wholesale. Nothing is merged.
//! - Re-registering a class identity is not detected.
//! - There is no removal.
//!
//! Registration is expected to finish before steady-state access begins.
//! The tables sit behind an `RwLock` so a populated registry can be shared,
//! but callers must not interleave registration with lookups and rely on
//! previously warmed caches staying meaningful.

use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::{validate_member_name, ClassId, FieldEntry, MethodEntry, Predicate};
use crate::classify::{Classifier, OBJECT_CLASS};
use crate::error::DispatchError;
use crate::value::Value;

// ---------------------------------------------------------------------------
// ClassRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ClassTable {
    fields: Option<Vec<FieldEntry>>,
    methods: Option<Vec<MethodEntry>>,
}

pub(crate) struct RegistryState {
    pub(crate) classifier: Classifier,
    tables: FxHashMap<ClassId, ClassTable>,
}

impl RegistryState {
    pub(crate) fn fields(&self, class: &ClassId) -> Option<&[FieldEntry]> {
        self.tables.get(class)?.fields.as_deref()
    }

    pub(crate) fn methods(&self, class: &ClassId) -> Option<&[MethodEntry]> {
        self.tables.get(class)?.methods.as_deref()
    }
}

/// Registry of classes, their predicates, fields, and methods.
pub struct ClassRegistry {
    pub(crate) state: RwLock<RegistryState>,
}

impl ClassRegistry {
    /// A registry with only the generic-object fallback installed.
    pub fn empty() -> Self {
        ClassRegistry {
            state: RwLock::new(RegistryState {
                classifier: Classifier::new(),
                tables: FxHashMap::default(),
            }),
        }
    }

    /// A registry with the built-in array, sequence, and text classes
    /// registered ahead of anything the caller adds.
    pub fn new() -> Self {
        let registry = Self::empty();
        crate::builtins::install(&registry);
        registry
    }

    /// Append `class` to the classification order.
    ///
    /// Fails with `ReservedClass` for the generic-object identity.
    pub fn register_class(
        &self,
        class: ClassId,
        predicate: Predicate,
    ) -> Result<(), DispatchError> {
        check_not_reserved(&class)?;
        tracing::debug!(class = %class, predicate = predicate.name(), "registered class");
        let mut state = self.state.write();
        state.tables.entry(class.clone()).or_default();
        state.classifier.push(class, predicate);
        Ok(())
    }

    /// Declare the fields of `class`, replacing any earlier declaration.
    ///
    /// Fails with `MalformedAccessExpression` if a field name could not be
    /// written in an access expression.
    pub fn register_fields(
        &self,
        class: &ClassId,
        fields: Vec<FieldEntry>,
    ) -> Result<(), DispatchError> {
        check_not_reserved(class)?;
        for field in &fields {
            validate_member_name(&field.name)?;
        }
        tracing::debug!(class = %class, count = fields.len(), "registered fields");
        self.state
            .write()
            .tables
            .entry(class.clone())
            .or_default()
            .fields = Some(fields);
        Ok(())
    }

    /// Declare the methods of `class`, replacing any earlier declaration.
    pub fn register_methods(
        &self,
        class: &ClassId,
        methods: Vec<MethodEntry>,
    ) -> Result<(), DispatchError> {
        check_not_reserved(class)?;
        for method in &methods {
            validate_member_name(&method.name)?;
        }
        tracing::debug!(class = %class, count = methods.len(), "registered methods");
        self.state
            .write()
            .tables
            .entry(class.clone())
            .or_default()
            .methods = Some(methods);
        Ok(())
    }

    /// Register a record type whose fields are mutable slots, in order.
    ///
    /// Shorthand for `register_class` with [`Predicate::record`] followed
    /// by `register_fields` with one [`FieldEntry::slot`] per name.
    pub fn register_record(
        &self,
        class: &ClassId,
        field_names: &[&str],
    ) -> Result<(), DispatchError> {
        let fields = field_names
            .iter()
            .enumerate()
            .map(|(i, name)| FieldEntry::slot(name, i))
            .collect();
        self.register_class(class.clone(), Predicate::record(class))?;
        self.register_fields(class, fields)
    }

    /// Register a class with its full member surface in one step. Names
    /// are trusted; used for the built-in classes.
    pub(crate) fn define_builtin(
        &self,
        class: ClassId,
        predicate: Predicate,
        fields: Vec<FieldEntry>,
        methods: Vec<MethodEntry>,
    ) {
        let mut state = self.state.write();
        state.tables.insert(
            class.clone(),
            ClassTable {
                fields: Some(fields),
                methods: Some(methods),
            },
        );
        state.classifier.push(class, predicate);
    }

    pub fn fields_of(&self, class: &ClassId) -> Option<Vec<FieldEntry>> {
        self.state.read().fields(class).map(<[FieldEntry]>::to_vec)
    }

    pub fn methods_of(&self, class: &ClassId) -> Option<Vec<MethodEntry>> {
        self.state.read().methods(class).map(<[MethodEntry]>::to_vec)
    }

    pub fn classify(&self, value: &Value) -> Option<ClassId> {
        self.state.read().classifier.classify(value)
    }

    pub fn classify_with_predicate(&self, value: &Value) -> Option<(ClassId, Predicate)> {
        self.state.read().classifier.classify_with_predicate(value)
    }

    /// Registered classes in classification order.
    pub fn class_order(&self) -> Vec<ClassId> {
        self.state.read().classifier.order().cloned().collect()
    }
}

/// The generic-object identity has no tables; members on it always go to
/// the object's own dispatch.
fn check_not_reserved(class: &ClassId) -> Result<(), DispatchError> {
    if class.as_str() == OBJECT_CLASS {
        return Err(DispatchError::ReservedClass {
            class: class.to_string(),
        });
    }
    Ok(())
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Global registry instance
// ---------------------------------------------------------------------------

static GLOBAL_REGISTRY: OnceLock<ClassRegistry> = OnceLock::new();

/// The process-wide registry, built with the built-in classes on first use.
pub fn global_registry() -> &'static ClassRegistry {
    GLOBAL_REGISTRY.get_or_init(ClassRegistry::new)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
