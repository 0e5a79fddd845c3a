//! Runtime value model for the Mython evaluator.
//!
//! Values are a clonable tagged enum: primitives copy by value, classes and
//! instances share by `Rc` handle, so two variables bound to the same
//! instance observe each other's field writes. Method lookup walks the
//! single-inheritance parent chain filtering by (name, arity).

pub mod error;

pub use self::error::{RuntimeError, RuntimeResult};

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Statement;

pub(crate) const SELF_NAME: &str = "self";
pub(crate) const INIT_METHOD: &str = "__init__";
pub(crate) const ADD_METHOD: &str = "__add__";
const STR_METHOD: &str = "__str__";
const EQ_METHOD: &str = "__eq__";
const LT_METHOD: &str = "__lt__";

/// A scope frame: top-level program scope, a method-local scope, or the
/// field table of a class instance.
pub type Closure = HashMap<String, Value>;

/// Output sink borrowed for the duration of one program execution.
pub struct Context<'a> {
    output: &'a mut dyn fmt::Write,
}

impl<'a> Context<'a> {
    pub fn new(output: &'a mut dyn fmt::Write) -> Self {
        Self { output }
    }

    pub fn write_str(&mut self, text: &str) -> RuntimeResult<()> {
        self.output.write_str(text)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, PartialEq)]
pub struct Class {
    name: String,
    methods: Vec<Method>,
    parent: Option<Rc<Class>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        Self {
            name,
            methods,
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a method by exact (name, arity), walking the parent chain.
    /// Same-name methods of different arity coexist.
    pub fn method(&self, name: &str, arity: usize) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.formal_params.len() == arity)
            .or_else(|| {
                self.parent
                    .as_deref()
                    .and_then(|parent| parent.method(name, arity))
            })
    }
}

#[derive(Debug)]
pub struct ClassInstance {
    class: Rc<Class>,
    fields: RefCell<Closure>,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(Closure::new()),
        }
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn has_method(&self, method: &str, arity: usize) -> bool {
        self.class.method(method, arity).is_some()
    }

    pub fn fields(&self) -> Ref<'_, Closure> {
        self.fields.borrow()
    }

    pub fn fields_mut(&self) -> RefMut<'_, Closure> {
        self.fields.borrow_mut()
    }

    /// Invokes a method on an instance, binding formal parameters and
    /// `self` into a fresh closure. Errors when no method matches the
    /// (name, arity) pair; the permissive no-op path for arbitrary method
    /// calls lives in the evaluator, not here.
    pub fn call(
        instance: &Rc<ClassInstance>,
        method: &str,
        args: Vec<Value>,
        context: &mut Context,
    ) -> RuntimeResult<Value> {
        let Some(found) = instance.class.method(method, args.len()) else {
            return Err(RuntimeError::UnknownMethod {
                class: instance.class.name().to_string(),
                method: method.to_string(),
                arity: args.len(),
            });
        };

        let mut closure: Closure = found
            .formal_params
            .iter()
            .cloned()
            .zip(args)
            .collect();
        closure.insert(SELF_NAME.to_string(), Value::Instance(Rc::clone(instance)));
        crate::interpreter::exec_method_body(&found.body, &mut closure, context)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Number(i32),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(Rc<ClassInstance>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Class(_) => "Class",
            Value::Instance(_) => "ClassInstance",
        }
    }

    /// Bools are themselves, numbers are truthy when nonzero, strings when
    /// non-empty; everything else is falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Number(value) => *value != 0,
            Value::String(value) => !value.is_empty(),
            _ => false,
        }
    }

    /// Writes the printed form of this value to the output sink. Instances
    /// render through `__str__`/0 when defined, falling back to an opaque
    /// address identifier.
    pub fn print(&self, context: &mut Context) -> RuntimeResult<()> {
        match self {
            Value::None => context.write_str("None"),
            Value::Number(value) => context.write_str(&value.to_string()),
            Value::String(value) => context.write_str(value),
            Value::Bool(true) => context.write_str("True"),
            Value::Bool(false) => context.write_str("False"),
            Value::Class(class) => context.write_str(&format!("Class {}", class.name())),
            Value::Instance(instance) => {
                if instance.has_method(STR_METHOD, 0) {
                    let rendered = ClassInstance::call(instance, STR_METHOD, Vec::new(), context)?;
                    rendered.print(context)
                } else {
                    context.write_str(&format!(
                        "<{} object at {:p}>",
                        instance.class_name(),
                        Rc::as_ptr(instance)
                    ))
                }
            }
        }
    }
}

/// Structural equality for primitives, `__eq__`/1 dispatch for instance
/// left operands; two none values are equal.
pub fn equal(lhs: &Value, rhs: &Value, context: &mut Context) -> RuntimeResult<bool> {
    match (lhs, rhs) {
        (Value::None, Value::None) => Ok(true),
        (Value::Number(l), Value::Number(r)) => Ok(l == r),
        (Value::String(l), Value::String(r)) => Ok(l == r),
        (Value::Bool(l), Value::Bool(r)) => Ok(l == r),
        (Value::Instance(instance), _) if instance.has_method(EQ_METHOD, 1) => {
            let result = ClassInstance::call(instance, EQ_METHOD, vec![rhs.clone()], context)?;
            Ok(result.is_truthy())
        }
        _ => Err(RuntimeError::NotComparable {
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

/// Numeric, lexicographic or boolean ordering, `__lt__`/1 dispatch for
/// instance left operands. Two none values are not ordered.
pub fn less(lhs: &Value, rhs: &Value, context: &mut Context) -> RuntimeResult<bool> {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => Ok(l < r),
        (Value::String(l), Value::String(r)) => Ok(l < r),
        (Value::Bool(l), Value::Bool(r)) => Ok(l < r),
        (Value::Instance(instance), _) if instance.has_method(LT_METHOD, 1) => {
            let result = ClassInstance::call(instance, LT_METHOD, vec![rhs.clone()], context)?;
            Ok(result.is_truthy())
        }
        _ => Err(RuntimeError::NotComparable {
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

pub fn not_equal(lhs: &Value, rhs: &Value, context: &mut Context) -> RuntimeResult<bool> {
    Ok(!equal(lhs, rhs, context)?)
}

pub fn less_or_equal(lhs: &Value, rhs: &Value, context: &mut Context) -> RuntimeResult<bool> {
    Ok(less(lhs, rhs, context)? || equal(lhs, rhs, context)?)
}

pub fn greater(lhs: &Value, rhs: &Value, context: &mut Context) -> RuntimeResult<bool> {
    Ok(!less_or_equal(lhs, rhs, context)?)
}

pub fn greater_or_equal(lhs: &Value, rhs: &Value, context: &mut Context) -> RuntimeResult<bool> {
    Ok(!less(lhs, rhs, context)?)
}
