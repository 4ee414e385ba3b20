use std::fmt::{self, Debug, Formatter};

use super::error::RuntimeError;
use super::value::{Value, ValueKind, NULL};
use super::Interpreter;

pub type BuiltinFn = fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError>;

/// A host function visible to every program. Never rebound, only shadowed
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub call: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Value {
        (self.call)(interpreter, args).unwrap_or_else(Value::Error)
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

static BUILTINS: [Builtin; 6] = [
    Builtin {
        name: "len",
        call: len,
    },
    Builtin {
        name: "first",
        call: first,
    },
    Builtin {
        name: "last",
        call: last,
    },
    Builtin {
        name: "rest",
        call: rest,
    },
    Builtin {
        name: "push",
        call: push,
    },
    Builtin {
        name: "puts",
        call: puts,
    },
];

pub fn lookup_builtin(name: &str) -> Option<Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name).copied()
}

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|builtin| builtin.name)
}

fn check_arity(args: &[Value], want: usize) -> Result<(), RuntimeError> {
    if args.len() != want {
        return Err(RuntimeError::ArityMismatch {
            got: args.len(),
            want,
        });
    }
    Ok(())
}

fn array_arg<'a>(builtin: &'static str, arg: &'a Value) -> Result<&'a [Value], RuntimeError> {
    match arg {
        Value::Array(elements) => Ok(elements.as_slice()),
        other => Err(RuntimeError::ArgumentType {
            builtin,
            expected: ValueKind::Array,
            got: other.kind(),
        }),
    }
}

fn len(_interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    check_arity(&args, 1)?;
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(elements) => elements.len(),
        other => {
            return Err(RuntimeError::UnsupportedArgument {
                builtin: "len",
                got: other.kind(),
            })
        }
    };
    Ok(Value::Integer(len as i64))
}

fn first(_interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    check_arity(&args, 1)?;
    let elements = array_arg("first", &args[0])?;
    Ok(elements.first().cloned().unwrap_or(NULL))
}

fn last(_interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    check_arity(&args, 1)?;
    let elements = array_arg("last", &args[0])?;
    Ok(elements.last().cloned().unwrap_or(NULL))
}

fn rest(_interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    check_arity(&args, 1)?;
    let elements = array_arg("rest", &args[0])?;
    match elements.split_first() {
        Some((_, tail)) => Ok(Value::array(tail.to_vec())),
        None => Ok(NULL),
    }
}

fn push(_interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    check_arity(&args, 2)?;
    let elements = array_arg("push", &args[0])?;
    let mut pushed = Vec::with_capacity(elements.len() + 1);
    pushed.extend_from_slice(elements);
    pushed.push(args[1].clone());
    Ok(Value::array(pushed))
}

fn puts(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    for arg in &args {
        interpreter.write_line(&arg.to_string());
    }
    Ok(NULL)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interpreter::CaptureOutput;

    fn call(name: &str, args: Vec<Value>) -> Value {
        let mut interpreter = Interpreter::with_output(CaptureOutput::new());
        lookup_builtin(name).unwrap().call(&mut interpreter, args)
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().copied().map(Value::Integer).collect())
    }

    #[test]
    fn test_registry() {
        let names: Vec<_> = builtin_names().collect();
        assert_eq!(vec!["len", "first", "last", "rest", "push", "puts"], names);
        assert!(lookup_builtin("print").is_none());
    }

    #[test]
    fn test_len() {
        assert_eq!(Value::Integer(4), call("len", vec![Value::string("four")]));
        assert_eq!(Value::Integer(0), call("len", vec![Value::string("")]));
        assert_eq!(Value::Integer(3), call("len", vec![ints(&[1, 2, 3])]));
        assert_eq!(
            Value::Error(RuntimeError::UnsupportedArgument {
                builtin: "len",
                got: ValueKind::Integer
            }),
            call("len", vec![Value::Integer(1)])
        );
        assert_eq!(
            "ERROR: wrong number of arguments. got=2, want=1",
            call("len", vec![Value::string("one"), Value::string("two")]).to_string()
        );
    }

    #[test]
    fn test_array_accessors() {
        assert_eq!(Value::Integer(1), call("first", vec![ints(&[1, 2, 3])]));
        assert_eq!(NULL, call("first", vec![ints(&[])]));
        assert_eq!(Value::Integer(3), call("last", vec![ints(&[1, 2, 3])]));
        assert_eq!(NULL, call("last", vec![ints(&[])]));
        assert_eq!(ints(&[2, 3]), call("rest", vec![ints(&[1, 2, 3])]));
        assert_eq!(NULL, call("rest", vec![ints(&[])]));
        assert_eq!(
            "ERROR: argument to `first` must be ARRAY, got INTEGER",
            call("first", vec![Value::Integer(1)]).to_string()
        );
    }

    #[test]
    fn test_push_copies() {
        let original = ints(&[1]);
        assert_eq!(ints(&[1, 2]), call("push", vec![original.clone(), Value::Integer(2)]));
        assert_eq!(ints(&[1]), original);
        assert_eq!(
            "ERROR: argument to `push` must be ARRAY, got INTEGER",
            call("push", vec![Value::Integer(1), Value::Integer(1)]).to_string()
        );
    }

    #[test]
    fn test_puts() {
        let capture = CaptureOutput::new();
        let mut interpreter = Interpreter::with_output(capture.clone());
        let result = lookup_builtin("puts").unwrap().call(
            &mut interpreter,
            vec![Value::string("hello"), Value::Integer(1), ints(&[1, 2])],
        );
        assert_eq!(NULL, result);
        assert_eq!(vec!["hello", "1", "[1, 2]"], capture.lines());
    }
}
