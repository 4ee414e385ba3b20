use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::ast::*;
use crate::reporter::Reporter;
use crate::scanner::{Pos, ScanErrorKind, Scanner, Token, TokenKind};

/// A single syntax problem. Parsing continues after recording one
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{pos}: {message}")]
pub struct ParseError {
    pub pos: Pos,
    pub message: String,
}

/// Every syntax error of a program, in source order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrors(pub Vec<ParseError>);

impl SyntaxErrors {
    pub fn report_to<R: Reporter>(&self, reporter: &mut R) {
        for error in &self.0 {
            reporter.report(error.pos, &error.message);
        }
    }
}

impl Display for SyntaxErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            1 => f.write_str("1 syntax error"),
            n => write!(f, "{} syntax errors", n),
        }
    }
}

/// Binding power of operators, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

type PrefixRule<'src> = fn(&mut Parser<'src>) -> Option<Expr>;
type InfixRule<'src> = fn(&mut Parser<'src>, Expr) -> Option<Expr>;

fn prefix_rule<'src>(kind: TokenKind) -> Option<PrefixRule<'src>> {
    let rule: PrefixRule<'src> = match kind {
        TokenKind::Ident => Parser::parse_identifier,
        TokenKind::Int => Parser::parse_integer_literal,
        TokenKind::String => Parser::parse_string_literal,
        TokenKind::True | TokenKind::False => Parser::parse_boolean,
        TokenKind::Bang | TokenKind::Minus => Parser::parse_prefix_expression,
        TokenKind::LParen => Parser::parse_grouped_expression,
        TokenKind::If => Parser::parse_if_expression,
        TokenKind::Function => Parser::parse_function_literal,
        TokenKind::LBracket => Parser::parse_array_literal,
        TokenKind::LBrace => Parser::parse_hash_literal,
        _ => return None,
    };
    Some(rule)
}

fn infix_rule<'src>(kind: TokenKind) -> Option<(Precedence, InfixRule<'src>)> {
    let rule: (Precedence, InfixRule<'src>) = match kind {
        TokenKind::Eq | TokenKind::NotEq => (Precedence::Equals, Parser::parse_infix_expression),
        TokenKind::Lt | TokenKind::Gt => (Precedence::LessGreater, Parser::parse_infix_expression),
        TokenKind::Plus | TokenKind::Minus => (Precedence::Sum, Parser::parse_infix_expression),
        TokenKind::Asterisk | TokenKind::Slash => {
            (Precedence::Product, Parser::parse_infix_expression)
        }
        TokenKind::LParen => (Precedence::Call, Parser::parse_call_expression),
        TokenKind::LBracket => (Precedence::Index, Parser::parse_index_expression),
        _ => return None,
    };
    Some(rule)
}

fn precedence_of(kind: TokenKind) -> Precedence {
    infix_rule(kind)
        .map(|(precedence, _)| precedence)
        .unwrap_or(Precedence::Lowest)
}

fn token_to_infix_op(kind: TokenKind) -> InfixOp {
    match kind {
        TokenKind::Plus => InfixOp::Add,
        TokenKind::Minus => InfixOp::Subtract,
        TokenKind::Asterisk => InfixOp::Multiply,
        TokenKind::Slash => InfixOp::Divide,
        TokenKind::Lt => InfixOp::LessThan,
        TokenKind::Gt => InfixOp::GreaterThan,
        TokenKind::Eq => InfixOp::Equal,
        TokenKind::NotEq => InfixOp::NotEqual,
        k => unreachable!("token was not a valid infix operator: {}", k),
    }
}

// A statement failed when it is missing or lost its expression. Errors recovered inside a nested block do not count
fn is_failed(stmt: Option<&Stmt>) -> bool {
    match stmt.map(|stmt| &stmt.inner) {
        None => true,
        Some(StmtInner::Let { value, .. }) => value.is_none(),
        Some(StmtInner::Return(value)) | Some(StmtInner::Expr(value)) => value.is_none(),
        Some(StmtInner::Block(_)) => false,
    }
}

/// Parse a whole program, returning it alongside every syntax error encountered
pub fn parse(scanner: Scanner<'_>) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(scanner);
    let program = parser.parse_program();
    (program, parser.into_errors())
}

/// Precedence climbing parser with two tokens of lookahead
pub struct Parser<'src> {
    scanner: Scanner<'src>,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub fn new(scanner: Scanner<'src>) -> Parser<'src> {
        let mut parser = Parser {
            scanner,
            current: Token::new(TokenKind::Eof, "", Pos::default()),
            peek: Token::new(TokenKind::Eof, "", Pos::default()),
            errors: Vec::new(),
        };
        parser.next_token();
        parser.next_token();
        parser
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut stmts = Vec::new();
        while !self.current_is(TokenKind::Eof) {
            let stmt = self.parse_statement();
            let failed = is_failed(stmt.as_ref());
            stmts.extend(stmt);
            if failed {
                self.synchronize();
            }
            self.next_token();
        }
        Program(stmts)
    }

    fn report(&mut self, pos: Pos, message: String) {
        debug!(%pos, %message, "syntax error");
        self.errors.push(ParseError { pos, message });
    }

    fn pull(&mut self) -> Token {
        match self.scanner.next() {
            Some(Ok(token)) => token,
            Some(Err(err)) => {
                let literal = match err.kind {
                    ScanErrorKind::UnrecognizedCharacter(ch) => ch.to_string(),
                    ScanErrorKind::UnterminatedString => "\"".to_string(),
                };
                self.report(err.pos, err.to_string());
                Token::new(TokenKind::Illegal, literal, err.pos)
            }
            // The scanner is exhausted after its EOF, keep handing out EOF
            None => Token::new(TokenKind::Eof, "", self.peek.pos),
        }
    }

    fn next_token(&mut self) {
        let next = self.pull();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    /// Advance if the next token is of the given kind, otherwise record an error and leave the token in place
    fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek_is(kind) {
            self.next_token();
            Some(())
        } else {
            let message = format!(
                "expected next token to be {}, got {} instead",
                kind, self.peek.kind
            );
            self.report(self.peek.pos, message);
            None
        }
    }

    // Skip the remainder of a broken statement: stop on its ';', or just before a closing '}' or EOF
    fn synchronize(&mut self) {
        while !self.current_is(TokenKind::Semicolon)
            && !self.current_is(TokenKind::Eof)
            && !self.peek_is(TokenKind::RBrace)
            && !self.peek_is(TokenKind::Eof)
        {
            self.next_token();
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => Some(self.parse_return_statement()),
            _ => Some(self.parse_expression_statement()),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        let token = self.current.clone();
        self.expect_peek(TokenKind::Ident)?;
        let name = Identifier {
            token: self.current.clone(),
            name: self.current.literal.clone(),
        };
        if self.expect_peek(TokenKind::Assign).is_none() {
            return Some(Stmt {
                token,
                inner: StmtInner::Let { name, value: None },
            });
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest);
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Stmt {
            token,
            inner: StmtInner::Let { name, value },
        })
    }

    fn parse_return_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest);
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Stmt {
            token,
            inner: StmtInner::Return(value),
        }
    }

    fn parse_expression_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        let expr = self.parse_expression(Precedence::Lowest);
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Stmt {
            token,
            inner: StmtInner::Expr(expr),
        }
    }

    fn parse_block(&mut self) -> Option<Block> {
        let token = self.current.clone();
        let mut statements = Vec::new();
        self.next_token();
        while !self.current_is(TokenKind::RBrace) && !self.current_is(TokenKind::Eof) {
            let stmt = self.parse_statement();
            let failed = is_failed(stmt.as_ref());
            statements.extend(stmt);
            if failed {
                self.synchronize();
                // The offending token was the closing brace itself
                if self.current_is(TokenKind::RBrace) {
                    break;
                }
            }
            self.next_token();
        }
        if self.current_is(TokenKind::Eof) {
            let pos = self.current.pos;
            self.report(pos, "expected '}' to close block, got end of input".to_string());
            return None;
        }
        Some(Block { token, statements })
    }

    pub fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let Some(prefix) = prefix_rule(self.current.kind) else {
            // Illegal tokens were already reported by the scanner
            if !self.current_is(TokenKind::Illegal) {
                let message = format!("no prefix parse function for {} found", self.current.kind);
                self.report(self.current.pos, message);
            }
            return None;
        };
        let mut left = prefix(self)?;
        while !self.peek_is(TokenKind::Semicolon) && precedence < precedence_of(self.peek.kind) {
            let Some((_, infix)) = infix_rule(self.peek.kind) else {
                return Some(left);
            };
            self.next_token();
            left = infix(self, left)?;
        }
        Some(left)
    }

    fn parse_identifier(&mut self) -> Option<Expr> {
        Some(Expr {
            token: self.current.clone(),
            inner: ExprInner::Identifier(self.current.literal.clone()),
        })
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expr {
                token: self.current.clone(),
                inner: ExprInner::Integer(value),
            }),
            Err(_) => {
                let message = format!("could not parse {} as integer", self.current.literal);
                self.report(self.current.pos, message);
                None
            }
        }
    }

    fn parse_string_literal(&mut self) -> Option<Expr> {
        Some(Expr {
            token: self.current.clone(),
            inner: ExprInner::String(self.current.literal.clone()),
        })
    }

    fn parse_boolean(&mut self) -> Option<Expr> {
        Some(Expr {
            token: self.current.clone(),
            inner: ExprInner::Boolean(self.current_is(TokenKind::True)),
        })
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        let op = match token.kind {
            TokenKind::Bang => PrefixOp::Not,
            TokenKind::Minus => PrefixOp::Negative,
            k => unreachable!("token was not a valid prefix operator: {}", k),
        };
        self.next_token();
        let right = Box::new(self.parse_expression(Precedence::Prefix)?);
        Some(Expr {
            token,
            inner: ExprInner::Prefix { op, right },
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        Some(expr)
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        self.expect_peek(TokenKind::LParen)?;
        self.next_token();
        let condition = Box::new(self.parse_expression(Precedence::Lowest)?);
        self.expect_peek(TokenKind::RParen)?;
        self.expect_peek(TokenKind::LBrace)?;
        let consequence = self.parse_block()?;
        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };
        Some(Expr {
            token,
            inner: ExprInner::If {
                condition,
                consequence,
                alternative,
            },
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        self.expect_peek(TokenKind::LParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block()?;
        Some(Expr {
            token,
            inner: ExprInner::Function(Rc::new(FunctionLiteral { parameters, body })),
        })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut parameters = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.next_token();
            return Some(parameters);
        }
        loop {
            self.expect_peek(TokenKind::Ident)?;
            parameters.push(Identifier {
                token: self.current.clone(),
                name: self.current.literal.clone(),
            });
            if !self.peek_is(TokenKind::Comma) {
                break;
            }
            self.next_token();
        }
        self.expect_peek(TokenKind::RParen)?;
        Some(parameters)
    }

    /// Comma separated expressions up to `end`, with the current token on the opener
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        let mut list = Vec::new();
        if self.peek_is(end) {
            self.next_token();
            return Some(list);
        }
        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect_peek(end)?;
        Some(list)
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expr {
            token,
            inner: ExprInner::Array(elements),
        })
    }

    fn parse_hash_literal(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        let mut pairs = Vec::new();
        while !self.peek_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(TokenKind::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if !self.peek_is(TokenKind::RBrace) {
                self.expect_peek(TokenKind::Comma)?;
            }
        }
        self.expect_peek(TokenKind::RBrace)?;
        Some(Expr {
            token,
            inner: ExprInner::Hash(pairs),
        })
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.current.clone();
        let op = token_to_infix_op(token.kind);
        let precedence = precedence_of(token.kind);
        self.next_token();
        let right = Box::new(self.parse_expression(precedence)?);
        Some(Expr {
            token,
            inner: ExprInner::Infix {
                left: Box::new(left),
                op,
                right,
            },
        })
    }

    fn parse_call_expression(&mut self, callee: Expr) -> Option<Expr> {
        let token = self.current.clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr {
            token,
            inner: ExprInner::Call {
                callee: Box::new(callee),
                arguments,
            },
        })
    }

    fn parse_index_expression(&mut self, collection: Expr) -> Option<Expr> {
        let token = self.current.clone();
        self.next_token();
        let index = Box::new(self.parse_expression(Precedence::Lowest)?);
        self.expect_peek(TokenKind::RBracket)?;
        Some(Expr {
            token,
            inner: ExprInner::Index {
                collection: Box::new(collection),
                index,
            },
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_ok(code: &str) -> Program {
        let (program, errors) = parse(Scanner::new(code));
        assert!(errors.is_empty(), "unexpected errors for {:?}: {:?}", code, errors);
        program
    }

    fn single_expr(code: &str) -> Expr {
        let mut program = parse_ok(code);
        assert_eq!(1, program.0.len());
        match program.0.remove(0).inner {
            StmtInner::Expr(Some(expr)) => expr,
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_table() {
        assert!(Precedence::Lowest < Precedence::Equals);
        assert!(Precedence::Sum < Precedence::Product);
        assert!(Precedence::Call < Precedence::Index);
        assert_eq!(Precedence::Lowest, precedence_of(TokenKind::Semicolon));
        assert_eq!(Precedence::Index, precedence_of(TokenKind::LBracket));
    }

    #[test]
    fn test_parse_let() {
        let program = parse_ok("let x = 5;");
        match &program.0[0].inner {
            StmtInner::Let { name, value } => {
                assert_eq!("x", name.name);
                assert_eq!("x", name.token.literal);
                assert_eq!(Some(ExprInner::Integer(5)), value.as_ref().map(|v| v.inner.clone()));
            }
            other => panic!("expected let, got {:?}", other),
        }
        assert_eq!("let", program.0[0].token_literal());
    }

    #[test]
    fn test_let_without_assign_keeps_name() {
        let (program, errors) = parse(Scanner::new("let x 5;\nlet y = 2;"));
        assert_eq!(1, errors.len());
        assert_eq!("expected next token to be =, got INT instead", errors[0].message);
        match &program.0[0].inner {
            StmtInner::Let { name, value } => {
                assert_eq!("x", name.name);
                assert!(value.is_none());
            }
            other => panic!("expected let, got {:?}", other),
        }
        assert_eq!("let x = ;let y = 2;", program.to_string());
    }

    #[test]
    fn test_terminator_is_optional() {
        let program = parse_ok("let x = 5\nx");
        assert_eq!(2, program.0.len());
    }

    #[test]
    fn test_parse_call_args() {
        let expr = single_expr("add(1, 2 * 3, 4 + 5);");
        match expr.inner {
            ExprInner::Call { callee, arguments } => {
                assert_eq!("add", callee.to_string());
                assert_eq!(3, arguments.len());
                assert_eq!("(2 * 3)", arguments[1].to_string());
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_fun_define() {
        let expr = single_expr("fn(x, y) { x + y; }");
        match expr.inner {
            ExprInner::Function(literal) => {
                let names: Vec<_> = literal.parameters.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(vec!["x", "y"], names);
                assert_eq!(1, literal.body.statements.len());
                assert_eq!("(x + y)", literal.body.to_string());
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        let (_, errors) = parse(Scanner::new("99999999999999999999"));
        assert_eq!(1, errors.len());
        assert_eq!(
            "could not parse 99999999999999999999 as integer",
            errors[0].message
        );
    }

    #[test]
    fn test_scan_errors_become_syntax_errors() {
        let (_, errors) = parse(Scanner::new("let x = $;"));
        assert_eq!(1, errors.len());
        assert_eq!("unrecognized character '$'", errors[0].message);
        assert_eq!(8, errors[0].pos.offset_in_line);
    }

    #[test]
    fn test_syntax_errors_display() {
        let (_, errors) = parse(Scanner::new("let = 1; let 2;"));
        assert_eq!("2 syntax errors", SyntaxErrors(errors).to_string());
    }
}
