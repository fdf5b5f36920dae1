//! The dispatch algorithm.
//!
//! Every entry point follows the same protocol against the site's slot:
//!
//! 1. Probe the slot. If it is warm and its predicate accepts the
//!    receiver, invoke the cached function. The registry is not touched.
//! 2. Otherwise classify the receiver, resolve the member in that class,
//!    overwrite the slot with the new `(predicate, function)` pair.
//! 3. Invoke the function on the receiver and any arguments.
//!
//! Classification failure and resolution failure are both hard errors
//! naming the receiver and the member. A failed resolution leaves the slot
//! as it was.
//!
//! Positional access is a narrower sibling: the receiver must be an array
//! or text, the slot caches only that shape decision, and the indices are
//! passed on every call.

use std::sync::Arc;

use crate::builtins::{check_index_count, non_indexable, IndexShape};
use crate::cache::{CallSite, FieldSite, IndexSite, StoreSite};
use crate::class::{ClassId, Predicate};
use crate::error::DispatchError;
use crate::registry::ClassRegistry;
use crate::resolve::MutatorLookup;
use crate::value::Value;

impl ClassRegistry {
    /// Read `field` from `receiver`.
    pub fn get_field(
        &self,
        site: &mut FieldSite,
        receiver: &Value,
        field: &str,
    ) -> Result<Value, DispatchError> {
        self.get_field_at(site, receiver, field, &[])
    }

    /// Read a subscripted field such as the array `ref` field.
    pub fn get_field_at(
        &self,
        site: &mut FieldSite,
        receiver: &Value,
        field: &str,
        subscripts: &[Value],
    ) -> Result<Value, DispatchError> {
        let accessor = match site.probe(receiver) {
            Some(accessor) => accessor,
            None => {
                let (class, predicate) = self.classify_receiver(receiver, field)?;
                let accessor = self
                    .resolve_accessor(&class, field)
                    .ok_or_else(|| unknown_field(&class, receiver, field))?;
                tracing::trace!(member = field, class = %class, "field read site miss");
                site.fill(class, predicate, Arc::clone(&accessor));
                accessor
            }
        };
        accessor(receiver, subscripts)
    }

    /// Write `value` into `field` of `receiver`.
    pub fn set_field(
        &self,
        site: &mut StoreSite,
        receiver: &Value,
        field: &str,
        value: Value,
    ) -> Result<(), DispatchError> {
        self.set_field_at(site, receiver, field, &[], value)
    }

    pub fn set_field_at(
        &self,
        site: &mut StoreSite,
        receiver: &Value,
        field: &str,
        subscripts: &[Value],
        value: Value,
    ) -> Result<(), DispatchError> {
        let mutator = match site.probe(receiver) {
            Some(mutator) => mutator,
            None => {
                let (class, predicate) = self.classify_receiver(receiver, field)?;
                let mutator = match self.resolve_mutator(&class, field) {
                    MutatorLookup::Found(mutator) => mutator,
                    MutatorLookup::ReadOnly => {
                        return Err(DispatchError::ReadOnlyFieldWrite {
                            class: class.to_string(),
                            receiver: receiver.to_string(),
                            field: field.to_string(),
                        })
                    }
                    MutatorLookup::Missing => return Err(unknown_field(&class, receiver, field)),
                };
                tracing::trace!(member = field, class = %class, "field write site miss");
                site.fill(class, predicate, Arc::clone(&mutator));
                mutator
            }
        };
        mutator(receiver, subscripts, value)
    }

    /// Call `method` on `receiver` with `args`.
    pub fn call_method(
        &self,
        site: &mut CallSite,
        receiver: &Value,
        method: &str,
        args: &[Value],
    ) -> Result<Value, DispatchError> {
        let callable = match site.probe(receiver) {
            Some(callable) => callable,
            None => {
                let (class, predicate) = self.classify_receiver(receiver, method)?;
                let callable = self.resolve_method(&class, method).ok_or_else(|| {
                    DispatchError::UnknownMethod {
                        class: class.to_string(),
                        receiver: receiver.to_string(),
                        method: method.to_string(),
                    }
                })?;
                tracing::trace!(member = method, class = %class, "call site miss");
                site.fill(class, predicate, Arc::clone(&callable));
                callable
            }
        };
        callable(receiver, args)
    }

    /// Positional read through one to three indices.
    ///
    /// The first index is applied to `receiver` using the site's cached
    /// shape; each further index is applied to the previous result.
    pub fn get_indexed(
        &self,
        site: &mut IndexSite,
        receiver: &Value,
        indices: &[Value],
    ) -> Result<Value, DispatchError> {
        check_index_count(indices.len())?;
        let shape = index_shape(site, receiver)?;
        let mut current = shape.get(receiver, &indices[0])?;
        for index in &indices[1..] {
            current = step(&current, index)?;
        }
        Ok(current)
    }

    /// Positional write through one to three indices.
    pub fn set_indexed(
        &self,
        site: &mut IndexSite,
        receiver: &Value,
        indices: &[Value],
        value: Value,
    ) -> Result<(), DispatchError> {
        check_index_count(indices.len())?;
        let shape = index_shape(site, receiver)?;
        let Some((last, path)) = indices.split_last() else {
            return Err(DispatchError::IndexArity { found: 0 });
        };
        let Some((first, middle)) = path.split_first() else {
            return shape.set(receiver, last, value);
        };
        let mut container = shape.get(receiver, first)?;
        for index in middle {
            container = step(&container, index)?;
        }
        match IndexShape::of(&container) {
            Some(inner) => inner.set(&container, last, value),
            None => Err(non_indexable(&container)),
        }
    }

    fn classify_receiver(
        &self,
        receiver: &Value,
        member: &str,
    ) -> Result<(ClassId, Predicate), DispatchError> {
        self.classify_with_predicate(receiver)
            .ok_or_else(|| DispatchError::UnclassifiedReceiver {
                receiver: receiver.to_string(),
                member: member.to_string(),
            })
    }
}

fn unknown_field(class: &ClassId, receiver: &Value, field: &str) -> DispatchError {
    DispatchError::UnknownField {
        class: class.to_string(),
        receiver: receiver.to_string(),
        field: field.to_string(),
    }
}

fn index_shape(site: &mut IndexSite, receiver: &Value) -> Result<IndexShape, DispatchError> {
    if let Some(shape) = site.probe(receiver) {
        return Ok(shape);
    }
    let shape = IndexShape::of(receiver).ok_or_else(|| non_indexable(receiver))?;
    tracing::trace!(shape = ?shape, "index site miss");
    site.fill(shape);
    Ok(shape)
}

/// One uncached positional hop.
fn step(current: &Value, index: &Value) -> Result<Value, DispatchError> {
    match IndexShape::of(current) {
        Some(shape) => shape.get(current, index),
        None => Err(non_indexable(current)),
    }
}
