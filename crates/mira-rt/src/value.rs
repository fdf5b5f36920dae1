//! Runtime values that member access operates on.
//!
//! The shapes are fixed: scalars, text, arrays, sequences, user-declared
//! records, generic objects supplied by an external object system, and the
//! multiple-value result of a `values` spread. Which *class* a value
//! belongs to is decided by the classifier, but
//! the shape tests the built-in predicates use live on [`Value`].
//!
//! Containers are reference-counted and share their storage on clone, so a
//! write through one handle is visible through every other handle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::class::ClassId;
use crate::error::DispatchError;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    /// Mutable character buffer.
    Text(Rc<RefCell<Vec<char>>>),
    /// Mutable, fixed-length vector.
    Array(Rc<RefCell<Vec<Value>>>),
    /// Immutable list.
    Seq(Rc<[Value]>),
    /// Instance of a user-declared record type.
    Record(Rc<Record>),
    /// Object owned by the external object system.
    Object(Rc<dyn GenericObject>),
    /// Several values returned at once.
    Values(Rc<[Value]>),
}

impl Value {
    pub fn text(s: &str) -> Self {
        Value::Text(Rc::new(RefCell::new(s.chars().collect())))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn seq(items: Vec<Value>) -> Self {
        Value::Seq(items.into())
    }

    pub fn record(class: ClassId, fields: Vec<Value>) -> Self {
        Value::Record(Rc::new(Record::new(class, fields)))
    }

    pub fn object(obj: impl GenericObject + 'static) -> Self {
        Value::Object(Rc::new(obj))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_seq(&self) -> bool {
        matches!(self, Value::Seq(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// True when `self` is a record whose declared class is `class`.
    pub fn is_record_of(&self, class: &ClassId) -> bool {
        matches!(self, Value::Record(r) if r.class() == class)
    }

    /// Short name of the value's shape, used in argument errors.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Seq(_) => "sequence",
            Value::Record(_) => "record",
            Value::Object(_) => "object",
            Value::Values(_) => "values",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of ints and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other, &mut Vec::new())
    }
}

/// Pairs of containers already under comparison. Meeting a pair again means
/// the comparison has gone round a cycle; that branch is taken as equal.
type SeenPairs = Vec<(*const (), *const ())>;

fn equal(a: &Value, b: &Value, seen: &mut SeenPairs) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => Rc::ptr_eq(x, y) || *x.borrow() == *y.borrow(),
        (Value::Array(x), Value::Array(y)) => {
            Rc::ptr_eq(x, y)
                || guarded(seen, Rc::as_ptr(x).cast(), Rc::as_ptr(y).cast(), |seen| {
                    all_equal(&x.borrow(), &y.borrow(), seen)
                })
        }
        (Value::Seq(x), Value::Seq(y)) | (Value::Values(x), Value::Values(y)) => {
            all_equal(x, y, seen)
        }
        (Value::Record(x), Value::Record(y)) => {
            Rc::ptr_eq(x, y)
                || (x.class == y.class
                    && guarded(seen, Rc::as_ptr(x).cast(), Rc::as_ptr(y).cast(), |seen| {
                        all_equal(&x.fields.borrow(), &y.fields.borrow(), seen)
                    }))
        }
        (Value::Object(x), Value::Object(y)) => std::ptr::addr_eq(Rc::as_ptr(x), Rc::as_ptr(y)),
        _ => false,
    }
}

fn guarded(
    seen: &mut SeenPairs,
    a: *const (),
    b: *const (),
    compare: impl FnOnce(&mut SeenPairs) -> bool,
) -> bool {
    if seen.contains(&(a, b)) {
        return true;
    }
    seen.push((a, b));
    let result = compare(seen);
    seen.pop();
    result
}

fn all_equal(xs: &[Value], ys: &[Value], seen: &mut SeenPairs) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equal(x, y, seen))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self, f, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self, f, &mut Vec::new())
    }
}

/// The mutable container behind `value`, if it can take part in a cycle.
fn container_ptr(value: &Value) -> Option<*const ()> {
    match value {
        Value::Array(items) => Some(Rc::as_ptr(items).cast()),
        Value::Record(r) => Some(Rc::as_ptr(r).cast()),
        _ => None,
    }
}

/// Write `value`, eliding any container already being written further up.
fn render(value: &Value, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
    let ptr = container_ptr(value);
    if let Some(ptr) = ptr {
        if open.contains(&ptr) {
            return match value {
                Value::Record(r) => write!(f, "#<{} ...>", r.class()),
                _ => f.write_str("#[...]"),
            };
        }
        open.push(ptr);
    }
    let result = match value {
        Value::Nil => write!(f, "nil"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(n) => write!(f, "{}", n),
        Value::Float(x) => write!(f, "{:?}", x),
        Value::Char(c) => write!(f, "{:?}", c),
        Value::Text(t) => {
            let s: String = t.borrow().iter().collect();
            write!(f, "{:?}", s)
        }
        Value::Array(items) => {
            write!(f, "#[")?;
            render_joined(f, &items.borrow(), ", ", open)?;
            write!(f, "]")
        }
        Value::Seq(items) => {
            write!(f, "(")?;
            render_joined(f, items, " ", open)?;
            write!(f, ")")
        }
        Value::Record(r) => {
            write!(f, "#<{}", r.class())?;
            for field in r.fields.borrow().iter() {
                write!(f, " ")?;
                render(field, f, open)?;
            }
            write!(f, ">")
        }
        Value::Object(obj) => write!(f, "#<object {}>", obj.class_name()),
        Value::Values(items) => {
            write!(f, "(values")?;
            for item in items.iter() {
                write!(f, " ")?;
                render(item, f, open)?;
            }
            write!(f, ")")
        }
    };
    if ptr.is_some() {
        open.pop();
    }
    result
}

fn render_joined(
    f: &mut fmt::Formatter<'_>,
    items: &[Value],
    sep: &str,
    open: &mut Vec<*const ()>,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        render(item, f, open)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An instance of a user-declared record type: a class tag plus positional
/// field storage. Field names live in the registry, not here.
pub struct Record {
    class: ClassId,
    fields: RefCell<Vec<Value>>,
}

impl Record {
    pub fn new(class: ClassId, fields: Vec<Value>) -> Self {
        Record {
            class,
            fields: RefCell::new(fields),
        }
    }

    pub fn class(&self) -> &ClassId {
        &self.class
    }

    pub fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.fields.borrow().get(index).cloned()
    }

    /// Overwrite slot `index`. Returns `false` if the slot does not exist.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.fields.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.class == other.class
                && all_equal(&self.fields.borrow(), &other.fields.borrow(), &mut Vec::new()))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("class", &self.class)
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Generic objects
// ---------------------------------------------------------------------------

/// An object whose methods are dispatched by an external object system.
///
/// The runtime never enumerates these methods. When a receiver classifies
/// as a generic object, method calls go to [`GenericObject::send`] and field
/// access goes to [`GenericObject::get_field`] / [`GenericObject::set_field`].
pub trait GenericObject: fmt::Debug {
    /// Name of the object's class in the external object system.
    fn class_name(&self) -> &str;

    /// Invoke `method` with `args`. The receiver is `self`.
    fn send(&self, method: &str, args: &[Value]) -> Result<Value, DispatchError>;

    fn get_field(&self, name: &str) -> Result<Value, DispatchError> {
        Err(DispatchError::UnknownField {
            class: self.class_name().to_string(),
            receiver: format!("#<object {}>", self.class_name()),
            field: name.to_string(),
        })
    }

    fn set_field(&self, name: &str, _value: Value) -> Result<(), DispatchError> {
        Err(DispatchError::UnknownField {
            class: self.class_name().to_string(),
            receiver: format!("#<object {}>", self.class_name()),
            field: name.to_string(),
        })
    }
}
