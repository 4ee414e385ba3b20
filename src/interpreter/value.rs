use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    rc::Rc,
};

use super::builtin::Builtin;
use super::environment::Environment;
use super::error::RuntimeError;
use crate::ast::{Block, FunctionLiteral, Identifier};

pub const TRUE: Value = Value::Boolean(true);
pub const FALSE: Value = Value::Boolean(false);
pub const NULL: Value = Value::Null;

#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Null,
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Hash(Rc<HashObject>),
    Function(Rc<Function>),
    Builtin(Builtin),
    // Unwound at function call boundaries and at the top of a program
    Return(Box<Value>),
    Error(RuntimeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Boolean,
    Null,
    String,
    Array,
    Hash,
    Function,
    Builtin,
    Return,
    Error,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "INTEGER",
            ValueKind::Boolean => "BOOLEAN",
            ValueKind::Null => "NULL",
            ValueKind::String => "STRING",
            ValueKind::Array => "ARRAY",
            ValueKind::Hash => "HASH",
            ValueKind::Function => "FUNCTION",
            ValueKind::Builtin => "BUILTIN",
            ValueKind::Return => "RETURN_VALUE",
            ValueKind::Error => "ERROR",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Hash(_) => ValueKind::Hash,
            Value::Function(_) => ValueKind::Function,
            Value::Builtin(_) => ValueKind::Builtin,
            Value::Return(_) => ValueKind::Return,
            Value::Error(_) => ValueKind::Error,
        }
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::from(s))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(elements))
    }

    /// Only null and false are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The key this value is stored under in a hash, for the hashable kinds
    pub fn hash_key(&self) -> Option<HashKey> {
        let code = match self {
            Value::Integer(i) => *i as u64,
            Value::Boolean(b) => u64::from(*b),
            Value::String(s) => {
                let mut hasher = DefaultHasher::new();
                s.hash(&mut hasher);
                hasher.finish()
            }
            _ => return None,
        };
        Some(HashKey {
            kind: self.kind(),
            code,
        })
    }

    /// Reference identity as the language sees it. Booleans and null are singletons, so they compare by value
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::Null, Value::Null) => true,
            (Value::Array(l), Value::Array(r)) => Rc::ptr_eq(l, r),
            (Value::Hash(l), Value::Hash(r)) => Rc::ptr_eq(l, r),
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            (Value::Builtin(l), Value::Builtin(r)) => l.name == r.name,
            _ => false,
        }
    }
}

impl From<RuntimeError> for Value {
    fn from(error: RuntimeError) -> Self {
        Value::Error(error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    kind: ValueKind,
    code: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// Hash contents, iterated in first insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HashObject {
    pairs: HashMap<HashKey, HashPair>,
    order: Vec<HashKey>,
}

impl HashObject {
    /// A later insert under the same key replaces the pair but keeps its position
    pub fn insert(&mut self, hash_key: HashKey, key: Value, value: Value) {
        if self
            .pairs
            .insert(hash_key, HashPair { key, value })
            .is_none()
        {
            self.order.push(hash_key);
        }
    }

    pub fn get(&self, hash_key: &HashKey) -> Option<&HashPair> {
        self.pairs.get(hash_key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HashPair> {
        self.order.iter().filter_map(|key| self.pairs.get(key))
    }
}

/// A function literal closed over the environment it was evaluated in
pub struct Function {
    pub literal: Rc<FunctionLiteral>,
    pub closure: Rc<Environment>,
}

impl Function {
    pub fn parameters(&self) -> &[Identifier] {
        &self.literal.parameters
    }

    pub fn body(&self) -> &Block {
        &self.literal.body
    }
}

fn write_separated<T: Display>(
    f: &mut Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => f.write_str("null"),
            Value::String(s) => f.write_str(s),
            Value::Array(elements) => {
                f.write_str("[")?;
                write_separated(f, elements.iter())?;
                f.write_str("]")
            }
            Value::Hash(hash) => {
                f.write_str("{")?;
                write_separated(f, hash.iter().map(|pair| format!("{}: {}", pair.key, pair.value)))?;
                f.write_str("}")
            }
            Value::Function(function) => write!(f, "{}", function.literal),
            Value::Builtin(_) => f.write_str("builtin function"),
            Value::Return(value) => write!(f, "{}", value),
            Value::Error(error) => write!(f, "ERROR: {}", error),
        }
    }
}

// Functions hold their environment which may hold the function again, so never descend into it
impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "Value::Integer({})", i),
            Value::Boolean(b) => write!(f, "Value::Boolean({})", b),
            Value::Null => f.write_str("Value::Null"),
            Value::String(s) => write!(f, "Value::String({:?})", s),
            Value::Array(elements) => write!(f, "Value::Array({:?})", elements),
            Value::Hash(hash) => write!(f, "Value::Hash({:?})", hash.iter().collect::<Vec<_>>()),
            Value::Function(function) => write!(f, "Value::Function({})", function.literal),
            Value::Builtin(builtin) => write!(f, "Value::Builtin({})", builtin.name),
            Value::Return(value) => write!(f, "Value::Return({:?})", value),
            Value::Error(error) => write!(f, "Value::Error({:?})", error),
        }
    }
}

/// Structural equality for host code. The language's own `==` lives in the evaluator
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(l), Self::Integer(r)) => l == r,
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Null, Self::Null) => true,
            (Self::String(l), Self::String(r)) => l == r,
            (Self::Array(l), Self::Array(r)) => l == r,
            (Self::Hash(l), Self::Hash(r)) => l == r,
            (Self::Function(l), Self::Function(r)) => Rc::ptr_eq(l, r),
            (Self::Builtin(l), Self::Builtin(r)) => l.name == r.name,
            (Self::Return(l), Self::Return(r)) => l == r,
            (Self::Error(l), Self::Error(r)) => l == r,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!NULL.is_truthy());
        assert!(!FALSE.is_truthy());
        assert!(TRUE.is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_string_hash_keys() {
        let hello1 = Value::string("Hello World");
        let hello2 = Value::string("Hello World");
        let diff = Value::string("My name is johnny");
        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_ne!(hello1.hash_key(), diff.hash_key());
    }

    #[test]
    fn test_hash_keys_include_kind() {
        assert_ne!(Value::Integer(1).hash_key(), TRUE.hash_key());
        assert_ne!(Value::Integer(0).hash_key(), FALSE.hash_key());
        assert_eq!(Value::Integer(7).hash_key(), Value::Integer(7).hash_key());
    }

    #[test]
    fn test_unhashable_kinds() {
        assert!(NULL.hash_key().is_none());
        assert!(Value::array(vec![]).hash_key().is_none());
        assert!(Value::Hash(Rc::new(HashObject::default()))
            .hash_key()
            .is_none());
    }

    #[test]
    fn test_hash_object_overwrite_keeps_position() {
        let mut hash = HashObject::default();
        let a = Value::string("a");
        let b = Value::string("b");
        hash.insert(a.hash_key().unwrap(), a.clone(), Value::Integer(1));
        hash.insert(b.hash_key().unwrap(), b.clone(), Value::Integer(2));
        hash.insert(a.hash_key().unwrap(), a.clone(), Value::Integer(3));
        assert_eq!(2, hash.len());
        let values: Vec<_> = hash.iter().map(|pair| pair.value.clone()).collect();
        assert_eq!(vec![Value::Integer(3), Value::Integer(2)], values);
    }

    #[test]
    fn test_identity() {
        let array = Value::array(vec![Value::Integer(1)]);
        assert!(array.is_identical(&array.clone()));
        assert!(!array.is_identical(&Value::array(vec![Value::Integer(1)])));
        assert!(NULL.is_identical(&NULL));
        assert!(!TRUE.is_identical(&Value::Integer(1)));
    }

    #[test]
    fn test_display() {
        let mut hash = HashObject::default();
        let key = Value::string("one");
        hash.insert(key.hash_key().unwrap(), key, Value::Integer(1));
        assert_eq!("{one: 1}", Value::Hash(Rc::new(hash)).to_string());
        assert_eq!(
            "[1, true, null]",
            Value::array(vec![Value::Integer(1), TRUE, NULL]).to_string()
        );
        assert_eq!(
            "ERROR: division by zero",
            Value::Error(RuntimeError::DivideByZero).to_string()
        );
    }
}
