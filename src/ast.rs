use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use crate::scanner::Token;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Program(pub Vec<Stmt>);

impl Program {
    pub fn token_literal(&self) -> &str {
        self.0.first().map(Stmt::token_literal).unwrap_or("")
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for stmt in &self.0 {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    // The opening brace
    pub token: Token,
    pub statements: Vec<Stmt>,
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionLiteral {
    pub parameters: Vec<Identifier>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub token: Token,
    pub inner: StmtInner,
}

/// Expression slots are `None` only when the parser recorded an error for them
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtInner {
    Let {
        name: Identifier,
        value: Option<Expr>,
    },
    Return(Option<Expr>),
    Expr(Option<Expr>),
    Block(Block),
}

impl Stmt {
    pub fn token_literal(&self) -> &str {
        &self.token.literal
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.inner {
            StmtInner::Let { name, value } => {
                write!(f, "{} {} = ", self.token_literal(), name)?;
                if let Some(value) = value {
                    write!(f, "{}", value)?;
                }
                f.write_str(";")
            }
            StmtInner::Return(value) => {
                write!(f, "{} ", self.token_literal())?;
                if let Some(value) = value {
                    write!(f, "{}", value)?;
                }
                f.write_str(";")
            }
            StmtInner::Expr(Some(expr)) => write!(f, "{}", expr),
            StmtInner::Expr(None) => Ok(()),
            StmtInner::Block(block) => write!(f, "{}", block),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub token: Token,
    pub inner: ExprInner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprInner {
    Identifier(String),
    Integer(i64),
    String(String),
    Boolean(bool),
    Prefix {
        op: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        left: Box<Expr>,
        op: InfixOp,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    // Shared with every function value created from this literal
    Function(Rc<FunctionLiteral>),
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Index {
        collection: Box<Expr>,
        index: Box<Expr>,
    },
    Hash(Vec<(Expr, Expr)>),
}

impl Expr {
    pub fn token_literal(&self) -> &str {
        &self.token.literal
    }
}

fn write_separated<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for FunctionLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        write_separated(f, &self.parameters)?;
        write!(f, ") {}", self.body)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ExprInner::Identifier(name) => f.write_str(name),
            ExprInner::Integer(_) | ExprInner::String(_) | ExprInner::Boolean(_) => {
                f.write_str(self.token_literal())
            }
            ExprInner::Prefix { op, right } => write!(f, "({}{})", op, right),
            ExprInner::Infix { left, op, right } => write!(f, "({} {} {})", left, op, right),
            ExprInner::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{} {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, "else {}", alternative)?;
                }
                Ok(())
            }
            ExprInner::Function(literal) => write!(f, "{}", literal),
            ExprInner::Call { callee, arguments } => {
                write!(f, "{}(", callee)?;
                write_separated(f, arguments)?;
                f.write_str(")")
            }
            ExprInner::Array(elements) => {
                f.write_str("[")?;
                write_separated(f, elements)?;
                f.write_str("]")
            }
            ExprInner::Index { collection, index } => write!(f, "({}[{}])", collection, index),
            ExprInner::Hash(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Negative,
}

impl Display for PrefixOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Not => f.write_str("!"),
            PrefixOp::Negative => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    GreaterThan,
    Equal,
    NotEqual,
}

impl Display for InfixOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InfixOp::Add => f.write_str("+"),
            InfixOp::Subtract => f.write_str("-"),
            InfixOp::Multiply => f.write_str("*"),
            InfixOp::Divide => f.write_str("/"),
            InfixOp::LessThan => f.write_str("<"),
            InfixOp::GreaterThan => f.write_str(">"),
            InfixOp::Equal => f.write_str("=="),
            InfixOp::NotEqual => f.write_str("!="),
        }
    }
}
