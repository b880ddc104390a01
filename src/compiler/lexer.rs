//! # Lexer
//!
//! Tokenizes VYL source code into a flat token stream with precise source
//! locations. The scanner handles comments, string literals with escape
//! sequences, interpolated-string splitting, numeric literals (including the
//! `..` range disambiguation), keywords, and multi-character operators.

use crate::compiler::error::CompileError;
use serde::Serialize;

/// The closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // Keywords
    Var,
    Let,
    Mut,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Struct,
    Enum,
    Interface,
    New,
    Return,
    Defer,
    SelfKw,
    Null,
    Function,
    Include,
    Import,

    // Type names
    IntType,
    DecType,
    StringType,
    BoolType,

    // Literals
    True,
    False,
    Integer,
    Decimal,
    Str,
    InterpStr,

    Identifier,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Not,
    Amp,
    Question,
    Arrow,
    Range,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,

    Newline,
    Eof,
}

/// One segment of an interpolated string: either literal text or the source
/// text of an embedded expression, carried verbatim for re-parsing by the
/// code generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringPart {
    pub is_expr: bool,
    pub text: String,
}

/// A single token with its source position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The textual value for identifiers, keywords, strings, and numbers.
    pub value: Option<String>,
    /// Parsed value for integer literals.
    pub int_value: Option<i64>,
    /// Parsed value for decimal literals.
    pub dec_value: Option<f64>,
    /// Interpolation segments for `InterpStr` tokens.
    pub parts: Vec<StringPart>,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn simple(kind: TokenKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            value: None,
            int_value: None,
            dec_value: None,
            parts: Vec::new(),
            line,
            column,
        }
    }

    fn with_value(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::simple(kind, line, column)
        }
    }

    /// The textual value, or the empty string for value-less tokens.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Maps an identifier spelling to its keyword kind, if any.
fn keyword_kind(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "var" => TokenKind::Var,
        "let" => TokenKind::Let,
        "mut" => TokenKind::Mut,
        "if" => TokenKind::If,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "struct" => TokenKind::Struct,
        "enum" => TokenKind::Enum,
        "interface" => TokenKind::Interface,
        "new" => TokenKind::New,
        "return" => TokenKind::Return,
        "defer" => TokenKind::Defer,
        "self" => TokenKind::SelfKw,
        "null" => TokenKind::Null,
        "Function" => TokenKind::Function,
        "include" => TokenKind::Include,
        "import" => TokenKind::Import,
        "int" => TokenKind::IntType,
        "dec" => TokenKind::DecType,
        "string" => TokenKind::StringType,
        "bool" => TokenKind::BoolType,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    };
    Some(kind)
}

/// Lexical analyzer for VYL source code.
pub struct Lexer {
    source: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Looks ahead at a character without consuming it.
    fn peek(&self, offset: usize) -> Option<char> {
        self.source.get(self.position + offset).copied()
    }

    /// Consumes the current character, maintaining line/column counters.
    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.position).copied()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Skips spaces, tabs, and carriage returns. Newlines stay significant.
    fn skip_whitespace(&mut self) {
        while matches!(self.peek(0), Some(' ' | '\t' | '\r')) {
            self.advance();
        }
    }

    /// Skips a `//` comment to end of line, if one starts here.
    fn skip_comment(&mut self) {
        if self.peek(0) == Some('/') && self.peek(1) == Some('/') {
            while let Some(ch) = self.peek(0) {
                if ch == '\n' {
                    break;
                }
                self.advance();
            }
        }
    }

    /// Scans a string literal with escape-sequence support. The opening
    /// quote has already been observed at (line, column).
    fn scan_string(&mut self, line: usize, column: usize) -> Result<String, CompileError> {
        self.advance(); // opening quote
        let mut result = String::new();
        loop {
            match self.peek(0) {
                None | Some('\n') => {
                    return Err(CompileError::lex("Unterminated string literal", line, column));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escape = self.peek(0).ok_or_else(|| {
                        CompileError::lex("Unterminated string literal", line, column)
                    })?;
                    match escape {
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        'r' => result.push('\r'),
                        '"' => result.push('"'),
                        '\\' => result.push('\\'),
                        other => result.push(other),
                    }
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
        Ok(result)
    }

    /// Scans digits into an integer or decimal token. A single `.` followed
    /// by another `.` terminates the number so the `..` range operator
    /// survives; a second fractional dot is an error.
    fn scan_number(&mut self, line: usize, column: usize) -> Result<Token, CompileError> {
        let mut text = String::new();
        let mut has_dot = false;
        while let Some(ch) = self.peek(0) {
            if ch == '.' {
                if self.peek(1) == Some('.') {
                    break;
                }
                if has_dot {
                    return Err(CompileError::lex(
                        "Malformed number: second '.' in literal",
                        line,
                        column,
                    ));
                }
                has_dot = true;
                text.push(ch);
                self.advance();
            } else if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if has_dot {
            let value: f64 = text
                .parse()
                .map_err(|_| CompileError::lex(format!("Invalid decimal '{}'", text), line, column))?;
            let mut token = Token::with_value(TokenKind::Decimal, text, line, column);
            token.dec_value = Some(value);
            Ok(token)
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| CompileError::lex(format!("Invalid integer '{}'", text), line, column))?;
            let mut token = Token::with_value(TokenKind::Integer, text, line, column);
            token.int_value = Some(value);
            Ok(token)
        }
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(ch) = self.peek(0) {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    /// Produces the next token.
    fn next_token(&mut self) -> Result<Token, CompileError> {
        loop {
            self.skip_whitespace();
            if self.peek(0) == Some('/') && self.peek(1) == Some('/') {
                self.skip_comment();
                continue;
            }
            break;
        }

        let line = self.line;
        let column = self.column;

        let ch = match self.peek(0) {
            None => return Ok(Token::simple(TokenKind::Eof, line, column)),
            Some(ch) => ch,
        };

        if ch == '\n' {
            self.advance();
            return Ok(Token::simple(TokenKind::Newline, line, column));
        }

        if ch == '"' {
            let content = self.scan_string(line, column)?;
            if content.contains('{') {
                let mut token = Token::with_value(TokenKind::InterpStr, content.clone(), line, column);
                token.parts = split_interpolation(&content);
                return Ok(token);
            }
            return Ok(Token::with_value(TokenKind::Str, content, line, column));
        }

        if ch.is_ascii_digit() {
            return self.scan_number(line, column);
        }

        if ch.is_alphabetic() || ch == '_' {
            let ident = self.scan_identifier();
            let kind = keyword_kind(&ident).unwrap_or(TokenKind::Identifier);
            return Ok(Token::with_value(kind, ident, line, column));
        }

        // Multi-character operators take priority over single-character ones.
        if let Some(next) = self.peek(1) {
            let kind = match (ch, next) {
                ('=', '=') => Some(TokenKind::Eq),
                ('!', '=') => Some(TokenKind::Ne),
                ('<', '=') => Some(TokenKind::Le),
                ('>', '=') => Some(TokenKind::Ge),
                ('.', '.') => Some(TokenKind::Range),
                ('-', '>') => Some(TokenKind::Arrow),
                ('&', '&') => Some(TokenKind::AndAnd),
                ('|', '|') => Some(TokenKind::OrOr),
                _ => None,
            };
            if let Some(kind) = kind {
                self.advance();
                self.advance();
                return Ok(Token::simple(kind, line, column));
            }
        }

        self.advance();
        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Assign,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '!' => TokenKind::Not,
            '&' => TokenKind::Amp,
            '?' => TokenKind::Question,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            other => {
                return Err(CompileError::lex(
                    format!("Unexpected character '{}'", other),
                    line,
                    column,
                ));
            }
        };
        Ok(Token::simple(kind, line, column))
    }

    /// Tokenizes the entire source, materializing a finite list terminated
    /// by `EOF` (the parser requires lookahead).
    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// Splits the decoded content of an interpolated string into ordered
/// (is_expression, text) parts. Braces nest inside expression segments.
fn split_interpolation(content: &str) -> Vec<StringPart> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            if !text.is_empty() {
                parts.push(StringPart {
                    is_expr: false,
                    text: std::mem::take(&mut text),
                });
            }
            let mut expr = String::new();
            let mut depth = 1usize;
            for inner in chars.by_ref() {
                match inner {
                    '{' => {
                        depth += 1;
                        expr.push(inner);
                    }
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        expr.push(inner);
                    }
                    _ => expr.push(inner),
                }
            }
            if !expr.trim().is_empty() {
                parts.push(StringPart {
                    is_expr: true,
                    text: expr,
                });
            }
        } else {
            text.push(ch);
        }
    }

    if !text.is_empty() {
        parts.push(StringPart {
            is_expr: false,
            text,
        });
    }
    parts
}

/// Convenience function to tokenize source code.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = tokenize("var int count = 3;").unwrap();
        let expected = [
            TokenKind::Var,
            TokenKind::IntType,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Integer,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            expected
        );
        assert_eq!(tokens[2].text(), "count");
        assert_eq!(tokens[4].int_value, Some(3));
    }

    #[test]
    fn positions_are_tracked() {
        let tokens = tokenize("var x\nvar y").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 5));
        // NEWLINE sits at the end of line 1
        assert_eq!(tokens[2].kind, TokenKind::Newline);
        assert_eq!((tokens[3].line, tokens[3].column), (2, 1));
    }

    #[test]
    fn range_operator_does_not_eat_the_integer() {
        let tokens = tokenize("1..5").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].int_value, Some(1));
        assert_eq!(tokens[1].kind, TokenKind::Range);
        assert_eq!(tokens[2].int_value, Some(5));
    }

    #[test]
    fn decimal_literal() {
        let tokens = tokenize("3.25").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Decimal);
        assert_eq!(tokens[0].dec_value, Some(3.25));
    }

    #[test]
    fn double_fraction_dot_is_an_error() {
        let err = tokenize("1.2.3").unwrap_err();
        assert!(matches!(err, CompileError::Lex { line: 1, .. }));
    }

    #[test]
    fn string_escapes() {
        let tokens = tokenize("\"a\\tb\\n\\\"q\\\"\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text(), "a\tb\n\"q\"");
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("var s = \"oops").unwrap_err();
        match err {
            CompileError::Lex { line, column, .. } => {
                assert_eq!(line, 1);
                assert_eq!(column, 9);
            }
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn unexpected_character_fails() {
        assert!(matches!(
            tokenize("var a = 1 # 2;").unwrap_err(),
            CompileError::Lex { .. }
        ));
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            kinds("== != <= >= -> .. && || ?"),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Arrow,
                TokenKind::Range,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_discarded() {
        assert_eq!(
            kinds("var x; // trailing words = 5\nvar y;"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Newline,
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn interpolated_string_splits_into_parts() {
        let tokens = tokenize("\"total: {a + b} items\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::InterpStr);
        let parts = &tokens[0].parts;
        assert_eq!(parts.len(), 3);
        assert!(!parts[0].is_expr);
        assert_eq!(parts[0].text, "total: ");
        assert!(parts[1].is_expr);
        assert_eq!(parts[1].text, "a + b");
        assert!(!parts[2].is_expr);
        assert_eq!(parts[2].text, " items");
    }

    #[test]
    fn interpolation_handles_nested_braces() {
        let tokens = tokenize("\"{x + {y}}\"").unwrap();
        let parts = &tokens[0].parts;
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_expr);
        assert_eq!(parts[0].text, "x + {y}");
    }
}
