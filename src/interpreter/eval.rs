use std::rc::Rc;

use tracing::trace;

use super::builtin::lookup_builtin;
use super::environment::Environment;
use super::error::RuntimeError;
use super::value::{Function, HashObject, Value, NULL};
use super::Interpreter;
use crate::ast::{Block, Expr, ExprInner, InfixOp, PrefixOp, Program, Stmt, StmtInner};

// Hands an error value straight back to the caller, otherwise yields the value
macro_rules! check {
    ($value:expr) => {
        match $value {
            error @ Value::Error(_) => return error,
            value => value,
        }
    };
}

impl Interpreter {
    /// Evaluates in the global environment, so bindings survive across calls
    pub fn eval_program(&mut self, program: &Program) -> Option<Value> {
        let env = self.global_env().clone();
        self.eval_program_in(program, &env)
    }

    pub fn eval_program_in(&mut self, program: &Program, env: &Rc<Environment>) -> Option<Value> {
        let mut result = None;
        for stmt in &program.0 {
            match self.eval_statement(stmt, env) {
                Some(Value::Return(value)) => return Some(*value),
                error @ Some(Value::Error(_)) => return error,
                value => result = value,
            }
        }
        result
    }

    /// `None` for statements that produce nothing, such as `let`
    pub fn eval_statement(&mut self, stmt: &Stmt, env: &Rc<Environment>) -> Option<Value> {
        match &stmt.inner {
            StmtInner::Let { name, value } => {
                let value = self.eval_expr(value.as_ref()?, env);
                if value.is_error() {
                    return Some(value);
                }
                env.bind(&name.name, value);
                None
            }
            StmtInner::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env),
                    None => NULL,
                };
                if value.is_error() {
                    return Some(value);
                }
                Some(Value::Return(Box::new(value)))
            }
            StmtInner::Expr(expr) => Some(self.eval_expr(expr.as_ref()?, env)),
            StmtInner::Block(block) => self.eval_block(block, env),
        }
    }

    // Return markers stay wrapped so they keep unwinding through enclosing blocks
    fn eval_block(&mut self, block: &Block, env: &Rc<Environment>) -> Option<Value> {
        let mut result = None;
        for stmt in &block.statements {
            result = self.eval_statement(stmt, env);
            if matches!(result, Some(Value::Return(_) | Value::Error(_))) {
                break;
            }
        }
        result
    }

    pub fn eval_expr(&mut self, expr: &Expr, env: &Rc<Environment>) -> Value {
        match &expr.inner {
            ExprInner::Integer(i) => Value::Integer(*i),
            ExprInner::Boolean(b) => Value::Boolean(*b),
            ExprInner::String(s) => Value::string(s),
            ExprInner::Identifier(name) => self.eval_identifier(name, env),
            ExprInner::Prefix { op, right } => {
                let right = check!(self.eval_expr(right, env));
                eval_prefix(*op, right)
            }
            ExprInner::Infix { left, op, right } => {
                let left = check!(self.eval_expr(left, env));
                let right = check!(self.eval_expr(right, env));
                eval_infix(*op, left, right)
            }
            ExprInner::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = check!(self.eval_expr(condition, env));
                let branch = if condition.is_truthy() {
                    Some(consequence)
                } else {
                    alternative.as_ref()
                };
                branch
                    .and_then(|block| self.eval_block(block, env))
                    .unwrap_or(NULL)
            }
            ExprInner::Function(literal) => Value::Function(Rc::new(Function {
                literal: literal.clone(),
                closure: env.clone(),
            })),
            ExprInner::Call { callee, arguments } => {
                let callee = check!(self.eval_expr(callee, env));
                match self.eval_expressions(arguments, env) {
                    Ok(args) => self.apply_function(callee, args),
                    Err(error) => error,
                }
            }
            ExprInner::Array(elements) => match self.eval_expressions(elements, env) {
                Ok(elements) => Value::array(elements),
                Err(error) => error,
            },
            ExprInner::Index { collection, index } => {
                let collection = check!(self.eval_expr(collection, env));
                let index = check!(self.eval_expr(index, env));
                eval_index(collection, index)
            }
            ExprInner::Hash(pairs) => self.eval_hash_literal(pairs, env),
        }
    }

    fn eval_identifier(&self, name: &str, env: &Rc<Environment>) -> Value {
        if let Some(value) = env.lookup(name) {
            return value;
        }
        match lookup_builtin(name) {
            Some(builtin) => Value::Builtin(builtin),
            None => RuntimeError::UnboundIdentifier(name.to_string()).into(),
        }
    }

    // Left to right, stopping at the first error
    fn eval_expressions(
        &mut self,
        exprs: &[Expr],
        env: &Rc<Environment>,
    ) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let value = self.eval_expr(expr, env);
            if value.is_error() {
                return Err(value);
            }
            values.push(value);
        }
        Ok(values)
    }

    fn eval_hash_literal(&mut self, pairs: &[(Expr, Expr)], env: &Rc<Environment>) -> Value {
        let mut hash = HashObject::default();
        for (key, value) in pairs {
            let key = check!(self.eval_expr(key, env));
            let Some(hash_key) = key.hash_key() else {
                return RuntimeError::UnusableHashKey(key.kind()).into();
            };
            let value = check!(self.eval_expr(value, env));
            hash.insert(hash_key, key, value);
        }
        Value::Hash(Rc::new(hash))
    }

    pub fn apply_function(&mut self, callee: Value, args: Vec<Value>) -> Value {
        match callee {
            Value::Function(function) => {
                let want = function.parameters().len();
                if args.len() != want {
                    return RuntimeError::ArityMismatch {
                        got: args.len(),
                        want,
                    }
                    .into();
                }
                trace!(function = %function.literal, arity = want, "applying function");
                let scope = self.open_scope(&function.closure);
                for (parameter, arg) in function.parameters().iter().zip(args) {
                    scope.bind(&parameter.name, arg);
                }
                match self.eval_block(function.body(), &scope) {
                    Some(Value::Return(value)) => *value,
                    Some(value) => value,
                    None => NULL,
                }
            }
            Value::Builtin(builtin) => {
                trace!(builtin = builtin.name, "applying builtin");
                builtin.call(self, args)
            }
            other => RuntimeError::NotAFunction(other.kind()).into(),
        }
    }
}

fn eval_prefix(op: PrefixOp, right: Value) -> Value {
    match op {
        PrefixOp::Not => Value::Boolean(!right.is_truthy()),
        PrefixOp::Negative => match right {
            Value::Integer(i) => Value::Integer(i.wrapping_neg()),
            other => RuntimeError::UnknownPrefixOperator {
                op,
                right: other.kind(),
            }
            .into(),
        },
    }
}

fn eval_infix(op: InfixOp, left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix(op, *l, *r),
        (Value::String(l), Value::String(r)) if op == InfixOp::Add => {
            let mut joined = String::with_capacity(l.len() + r.len());
            joined.push_str(l);
            joined.push_str(r);
            Value::string(&joined)
        }
        (Value::String(_), Value::String(_)) => RuntimeError::UnknownInfixOperator {
            left: left.kind(),
            op,
            right: right.kind(),
        }
        .into(),
        _ if op == InfixOp::Equal => Value::Boolean(left.is_identical(&right)),
        _ if op == InfixOp::NotEqual => Value::Boolean(!left.is_identical(&right)),
        _ if left.kind() != right.kind() => RuntimeError::TypeMismatch {
            left: left.kind(),
            op,
            right: right.kind(),
        }
        .into(),
        _ => RuntimeError::UnknownInfixOperator {
            left: left.kind(),
            op,
            right: right.kind(),
        }
        .into(),
    }
}

fn eval_integer_infix(op: InfixOp, l: i64, r: i64) -> Value {
    match op {
        InfixOp::Add => Value::Integer(l.wrapping_add(r)),
        InfixOp::Subtract => Value::Integer(l.wrapping_sub(r)),
        InfixOp::Multiply => Value::Integer(l.wrapping_mul(r)),
        InfixOp::Divide => match floor_div(l, r) {
            Some(quotient) => Value::Integer(quotient),
            None => RuntimeError::DivideByZero.into(),
        },
        InfixOp::LessThan => Value::Boolean(l < r),
        InfixOp::GreaterThan => Value::Boolean(l > r),
        InfixOp::Equal => Value::Boolean(l == r),
        InfixOp::NotEqual => Value::Boolean(l != r),
    }
}

// Rounds toward negative infinity
fn floor_div(l: i64, r: i64) -> Option<i64> {
    if r == 0 {
        return None;
    }
    let quotient = l.wrapping_div(r);
    if l.wrapping_rem(r) != 0 && (l < 0) != (r < 0) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

fn eval_index(collection: Value, index: Value) -> Value {
    match (&collection, &index) {
        (Value::Array(elements), Value::Integer(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(NULL),
        (Value::Hash(hash), _) => match index.hash_key() {
            Some(key) => hash
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(NULL),
            None => RuntimeError::UnusableHashKey(index.kind()).into(),
        },
        _ => RuntimeError::IndexNotSupported(collection.kind()).into(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_floor_div() {
        assert_eq!(Some(3), floor_div(7, 2));
        assert_eq!(Some(-4), floor_div(-7, 2));
        assert_eq!(Some(-4), floor_div(7, -2));
        assert_eq!(Some(3), floor_div(-7, -2));
        assert_eq!(Some(-3), floor_div(-6, 2));
        assert_eq!(None, floor_div(1, 0));
        assert_eq!(Some(i64::MIN), floor_div(i64::MIN, -1));
    }

    #[test]
    fn test_infix_dispatch_order() {
        assert_eq!(
            "ERROR: type mismatch: INTEGER + BOOLEAN",
            eval_infix(InfixOp::Add, Value::Integer(5), Value::Boolean(true)).to_string()
        );
        assert_eq!(
            "ERROR: unknown operator: BOOLEAN + BOOLEAN",
            eval_infix(InfixOp::Add, Value::Boolean(true), Value::Boolean(false)).to_string()
        );
        assert_eq!(
            "ERROR: unknown operator: STRING - STRING",
            eval_infix(InfixOp::Subtract, Value::string("a"), Value::string("b")).to_string()
        );
        assert_eq!(
            Value::Boolean(false),
            eval_infix(InfixOp::Equal, Value::Integer(1), Value::Boolean(true))
        );
        assert_eq!(
            Value::Boolean(true),
            eval_infix(InfixOp::NotEqual, Value::Null, Value::Integer(0))
        );
    }

    #[test]
    fn test_negate_non_integer() {
        assert_eq!(
            "ERROR: unknown operator: -BOOLEAN",
            eval_prefix(PrefixOp::Negative, Value::Boolean(true)).to_string()
        );
        assert_eq!(
            Value::Integer(i64::MIN),
            eval_prefix(PrefixOp::Negative, Value::Integer(i64::MIN))
        );
    }

    #[test]
    fn test_index_errors() {
        assert_eq!(
            "ERROR: index operator not supported: INTEGER",
            eval_index(Value::Integer(1), Value::Integer(0)).to_string()
        );
        assert_eq!(NULL, eval_index(Value::array(vec![]), Value::Integer(-1)));
    }
}
