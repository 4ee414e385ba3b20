use std::fmt::{self, Display, Formatter};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Pos {
    pub offset_in_line: usize,
    pub line: usize,
}

impl Display for Pos {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.offset_in_line)
    }
}

#[derive(Clone, Error, Debug, PartialEq, Eq)]
#[error("{kind}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub pos: Pos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanErrorKind {
    UnterminatedString,
    UnrecognizedCharacter(char),
}

impl Display for ScanErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => f.write_str("unterminated string"),
            Self::UnrecognizedCharacter(ch) => write!(f, "unrecognized character '{}'", ch),
        }
    }
}

/// A token in the input stream
/// Note that pos is always defined, but in the case of EOF will describe a location
/// potentially off the end of the input stream
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, pos: Pos) -> Token {
        Token {
            kind,
            literal: literal.into(),
            pos,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,

    Ident,
    Int,
    String,

    // Operators
    Assign,
    Plus,
    Minus,
    Bang,
    Asterisk,
    Slash,
    Lt,
    Gt,
    Eq,
    NotEq,

    // Delimiters
    Comma,
    Semicolon,
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Keywords
    Function,
    Let,
    True,
    False,
    If,
    Else,
    Return,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Illegal => "ILLEGAL",
            Self::Eof => "EOF",
            Self::Ident => "IDENT",
            Self::Int => "INT",
            Self::String => "STRING",
            Self::Assign => "=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Bang => "!",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Function => "FUNCTION",
            Self::Let => "LET",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::If => "IF",
            Self::Else => "ELSE",
            Self::Return => "RETURN",
        };
        f.write_str(text)
    }
}

const KEYWORD_LITERAL_TO_KIND: [(&str, TokenKind); 7] = [
    ("fn", TokenKind::Function),
    ("let", TokenKind::Let),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("return", TokenKind::Return),
];

const WS_CHARS: &str = " \r\t";

#[derive(Clone)]
pub struct Scanner<'lex> {
    code: &'lex str,
    code_iter: Peekable<CharIndices<'lex>>,
    emitted_eof: bool, // Have we sent the EOF yet

    line: usize,
    offset_in_line: usize,
}

impl<'lex> Scanner<'lex> {
    pub fn new(code: &'lex str) -> Scanner<'lex> {
        Scanner {
            code,
            code_iter: code.char_indices().peekable(),
            emitted_eof: false,
            line: 0,
            offset_in_line: 0,
        }
    }

    fn current_pos(&self) -> Pos {
        Pos {
            line: self.line,
            offset_in_line: self.offset_in_line,
        }
    }

    fn consume_next_char_if_eq(&mut self, next_ch: char) -> bool {
        self.code_iter.next_if(|(_, ch)| *ch == next_ch).is_some()
    }

    fn consume_next_char_if_neq(&mut self, not_next_ch: char) -> bool {
        self.code_iter
            .next_if(|(_, ch)| *ch != not_next_ch)
            .is_some()
    }

    fn consume_next_char_if_match<F>(&mut self, predicate: F) -> bool
    where
        F: FnOnce(char) -> bool,
    {
        self.code_iter.next_if(|(_, ch)| predicate(*ch)).is_some()
    }

    fn consume_next_char_if_ws(&mut self) -> bool {
        self.code_iter
            .next_if(|(_, ch)| WS_CHARS.contains(*ch))
            .is_some()
    }

    fn gobble_whitespace(&mut self) {
        loop {
            if self.consume_next_char_if_ws() {
                self.offset_in_line += 1;
            } else if self.consume_next_char_if_eq('\n') {
                self.offset_in_line = 0;
                self.line += 1;
            } else {
                break;
            }
        }
    }

    // Consumes a `//` comment up to, but not including, its newline
    fn gobble_comment(&mut self) -> bool {
        let mut lookahead = self.code_iter.clone();
        if !matches!(
            (lookahead.next(), lookahead.next()),
            (Some((_, '/')), Some((_, '/')))
        ) {
            return false;
        }
        self.code_iter = lookahead;
        let mut comment_len = 2;
        while self.consume_next_char_if_neq('\n') {
            comment_len += 1;
        }
        self.offset_in_line += comment_len;
        true
    }

    // Whitespace and comments may alternate for any number of lines
    fn skip_trivia(&mut self) {
        loop {
            self.gobble_whitespace();
            if !self.gobble_comment() {
                break;
            }
        }
    }

    // Byte offset of the next unconsumed char
    fn next_offset(&mut self) -> usize {
        self.code_iter
            .peek()
            .map(|(offset, _)| *offset)
            .unwrap_or(self.code.len())
    }

    fn single(&mut self, kind: TokenKind, ch: char, pos: Pos) -> Token {
        self.offset_in_line += 1;
        Token::new(kind, ch.to_string(), pos)
    }

    // Operators that may be followed by '=' to form a two char operator
    fn with_optional_eq(
        &mut self,
        ch: char,
        single: TokenKind,
        double: TokenKind,
        pos: Pos,
    ) -> Token {
        if self.consume_next_char_if_eq('=') {
            self.offset_in_line += 2;
            Token::new(double, format!("{}=", ch), pos)
        } else {
            self.offset_in_line += 1;
            Token::new(single, ch.to_string(), pos)
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

impl<'lex> Iterator for Scanner<'lex> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_trivia();
        let pos = self.current_pos();
        if let Some((offset, ch)) = self.code_iter.next() {
            let token = match ch {
                '(' => self.single(TokenKind::LParen, ch, pos),
                ')' => self.single(TokenKind::RParen, ch, pos),
                '{' => self.single(TokenKind::LBrace, ch, pos),
                '}' => self.single(TokenKind::RBrace, ch, pos),
                '[' => self.single(TokenKind::LBracket, ch, pos),
                ']' => self.single(TokenKind::RBracket, ch, pos),
                ',' => self.single(TokenKind::Comma, ch, pos),
                ';' => self.single(TokenKind::Semicolon, ch, pos),
                ':' => self.single(TokenKind::Colon, ch, pos),
                '+' => self.single(TokenKind::Plus, ch, pos),
                '-' => self.single(TokenKind::Minus, ch, pos),
                '*' => self.single(TokenKind::Asterisk, ch, pos),
                '<' => self.single(TokenKind::Lt, ch, pos),
                '>' => self.single(TokenKind::Gt, ch, pos),
                '!' => self.with_optional_eq(ch, TokenKind::Bang, TokenKind::NotEq, pos),
                '=' => self.with_optional_eq(ch, TokenKind::Assign, TokenKind::Eq, pos),
                '/' => self.single(TokenKind::Slash, ch, pos),
                '0'..='9' => {
                    let mut num_len = 1;
                    while self.consume_next_char_if_match(|ch| ch.is_ascii_digit()) {
                        num_len += 1;
                    }
                    self.offset_in_line += num_len;
                    let end = self.next_offset();
                    Token::new(TokenKind::Int, &self.code[offset..end], pos)
                }
                '"' => {
                    self.offset_in_line += 1;
                    let start = offset + 1;
                    // Strings are multiline, so we need to track whether or not we cross a newline
                    let mut end = None;
                    while let Some((str_offset, ch)) = self.code_iter.next() {
                        match ch {
                            '\n' => {
                                self.offset_in_line = 0;
                                self.line += 1;
                            }
                            '"' => {
                                self.offset_in_line += 1;
                                end = Some(str_offset);
                                break;
                            }
                            _ => self.offset_in_line += 1,
                        }
                    }
                    match end {
                        Some(end) => Token::new(TokenKind::String, &self.code[start..end], pos),
                        None => {
                            return Some(Err(ScanError {
                                kind: ScanErrorKind::UnterminatedString,
                                pos,
                            }))
                        }
                    }
                }
                c if is_identifier_start(c) => {
                    let mut ident_len = 1;
                    while self.consume_next_char_if_match(is_identifier_continue) {
                        ident_len += 1;
                    }
                    self.offset_in_line += ident_len;
                    let end = self.next_offset();
                    let identifier = &self.code[offset..end];
                    let kind = KEYWORD_LITERAL_TO_KIND
                        .iter()
                        .find(|(lit, _)| *lit == identifier)
                        .map(|(_, kind)| *kind)
                        .unwrap_or(TokenKind::Ident);
                    Token::new(kind, identifier, pos)
                }
                c => {
                    self.offset_in_line += 1;
                    return Some(Err(ScanError {
                        kind: ScanErrorKind::UnrecognizedCharacter(c),
                        pos,
                    }));
                }
            };
            Some(Ok(token))
        } else if !self.emitted_eof {
            self.emitted_eof = true;
            Some(Ok(Token::new(TokenKind::Eof, "", pos)))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(code: &str) -> Vec<TokenKind> {
        Scanner::new(code)
            .map(|token| token.unwrap().kind)
            .collect()
    }

    #[test]
    fn scan_anything() {
        let mut scanner = Scanner::new("let");
        let first_token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Let, first_token.kind);
        assert_eq!("let", first_token.literal);
        assert_eq!(
            Pos {
                offset_in_line: 0,
                line: 0
            },
            first_token.pos
        );
    }

    #[test]
    fn scan_basic_sequence() {
        let code = "let five = \"9001\";";
        let mut scanner = Scanner::new(code);

        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Let, token.kind);

        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Ident, token.kind);
        assert_eq!("five", token.literal);
        assert_eq!(4, token.pos.offset_in_line);

        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Assign, token.kind);
        assert_eq!(9, token.pos.offset_in_line);

        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::String, token.kind);
        assert_eq!("9001", token.literal);
        assert_eq!(11, token.pos.offset_in_line);

        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Semicolon, token.kind);
        assert_eq!(17, token.pos.offset_in_line);

        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Eof, token.kind);
        // We have passed the EOF
        assert!(scanner.next().is_none());
    }

    #[test]
    fn scan_operators_and_delimiters() {
        use TokenKind::*;
        assert_eq!(
            vec![
                Assign, Plus, Minus, Bang, Asterisk, Slash, Lt, Gt, Eq, NotEq, Comma, Semicolon,
                Colon, LParen, RParen, LBrace, RBrace, LBracket, RBracket, Eof
            ],
            kinds("= + - ! * / < > == != , ; : ( ) { } [ ]")
        );
    }

    #[test]
    fn scan_keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            vec![Function, Let, True, False, If, Else, Return, Ident, Ident, Int, Eof],
            kinds("fn let true false if else return add_two _x1 42")
        );
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(
            vec![Int, Slash, Int, Int, Eof],
            kinds("1 / 2 // one half\n3")
        );
    }

    #[test]
    fn long_comment_runs_do_not_recurse() {
        use TokenKind::*;
        let mut code = "// note\n  \n".repeat(200_000);
        code.push_str("1 // done");
        assert_eq!(vec![Int, Eof], kinds(&code));
        let token = Scanner::new(&code).next().unwrap().unwrap();
        assert_eq!(400_000, token.pos.line);
        assert_eq!(0, token.pos.offset_in_line);
    }

    #[test]
    fn test_multi_line_string_pos() {
        let code = r#"
"marco
bomp";
"#;
        let mut scanner = Scanner::new(code);
        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::String, token.kind);
        assert_eq!("marco\nbomp", token.literal);
        assert_eq!(1, token.pos.line);

        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Semicolon, token.kind);
        assert_eq!(
            Pos {
                line: 2,
                offset_in_line: 5
            },
            token.pos
        );
    }

    #[test]
    fn multibyte_identifiers_slice_correctly() {
        let mut scanner = Scanner::new("let größe = 1;");
        scanner.next();
        let token = scanner.next().unwrap().unwrap();
        assert_eq!("größe", token.literal);
        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Assign, token.kind);
        assert_eq!(10, token.pos.offset_in_line);
    }

    // Verify we don't get into an infinite loop by error conditions
    #[test]
    fn no_infinite_seq_on_unterminated_string() {
        let mut scanner = Scanner::new("\"a string that isn't terminated");
        let token = scanner.next().unwrap();
        assert_eq!(ScanErrorKind::UnterminatedString, token.unwrap_err().kind);
        let token = scanner.next().unwrap();
        assert_eq!(TokenKind::Eof, token.unwrap().kind);
        assert!(scanner.next().is_none());
    }

    #[test]
    fn no_infinite_seq_on_bad_token() {
        let mut scanner = Scanner::new("$var");
        let token = scanner.next().unwrap();
        assert_eq!(
            ScanErrorKind::UnrecognizedCharacter('$'),
            token.unwrap_err().kind
        );
        let token = scanner.next().unwrap().unwrap();
        assert_eq!(TokenKind::Ident, token.kind);
        assert_eq!("var", token.literal);
    }
}
