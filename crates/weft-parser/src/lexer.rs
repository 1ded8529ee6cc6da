//! Tokenizer.

use weft_ast::Span;

use crate::SyntaxError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Alias,
    Break,
    Case,
    Const,
    Continue,
    Continuing,
    Default,
    Discard,
    Else,
    Enable,
    False,
    Fn,
    For,
    If,
    Let,
    Loop,
    Override,
    Return,
    Struct,
    Switch,
    True,
    Var,
    While,
}

impl Keyword {
    fn from_ident(text: &str) -> Option<Self> {
        Some(match text {
            "alias" => Self::Alias,
            "break" => Self::Break,
            "case" => Self::Case,
            "const" => Self::Const,
            "continue" => Self::Continue,
            "continuing" => Self::Continuing,
            "default" => Self::Default,
            "discard" => Self::Discard,
            "else" => Self::Else,
            "enable" => Self::Enable,
            "false" => Self::False,
            "fn" => Self::Fn,
            "for" => Self::For,
            "if" => Self::If,
            "let" => Self::Let,
            "loop" => Self::Loop,
            "override" => Self::Override,
            "return" => Self::Return,
            "struct" => Self::Struct,
            "switch" => Self::Switch,
            "true" => Self::True,
            "var" => Self::Var,
            "while" => Self::While,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    /// Integer literal; `suffix` is `i`, `u` or absent.
    Int { value: u64, suffix: Option<char> },
    /// Float literal; `suffix` is `f`, `h` or absent.
    Float { value: f64, suffix: Option<char> },
    At,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    Equal,
    EqualEqual,
    NotEqual,
    Bang,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    PlusPlus,
    MinusMinus,
    /// Compound assignment; the payload is the operator token before `=`.
    CompoundAssign(CompoundOp),
    Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompoundOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::Keyword(k) => format!("keyword '{}'", format!("{k:?}").to_lowercase()),
            Self::Int { .. } | Self::Float { .. } => "number".to_string(),
            Self::Eof => "end of input".to_string(),
            other => format!("'{}'", punct_text(other)),
        }
    }
}

fn punct_text(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::At => "@",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::Comma => ",",
        TokenKind::Colon => ":",
        TokenKind::Semicolon => ";",
        TokenKind::Dot => ".",
        TokenKind::Arrow => "->",
        TokenKind::Equal => "=",
        TokenKind::EqualEqual => "==",
        TokenKind::NotEqual => "!=",
        TokenKind::Bang => "!",
        TokenKind::Less => "<",
        TokenKind::LessEqual => "<=",
        TokenKind::Greater => ">",
        TokenKind::GreaterEqual => ">=",
        TokenKind::ShiftLeft => "<<",
        TokenKind::ShiftRight => ">>",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::Amp => "&",
        TokenKind::AmpAmp => "&&",
        TokenKind::Pipe => "|",
        TokenKind::PipePipe => "||",
        TokenKind::Caret => "^",
        TokenKind::Tilde => "~",
        TokenKind::PlusPlus => "++",
        TokenKind::MinusMinus => "--",
        TokenKind::CompoundAssign(_) => "op=",
        _ => "?",
    }
}

/// Splits `source` into tokens, ending with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_trivia()?;
        let start = lexer.pos;
        let Some(&c) = lexer.bytes.get(lexer.pos) else {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
            return Ok(tokens);
        };
        let kind = if c.is_ascii_alphabetic() || c == b'_' {
            lexer.ident()
        } else if c.is_ascii_digit() || (c == b'.' && lexer.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            lexer.number()?
        } else if !c.is_ascii() {
            let ch = source[start..].chars().next().unwrap_or('?');
            return Err(SyntaxError::new(
                format!("unexpected character '{ch}'"),
                Span::new(start, start + ch.len_utf8()),
            ));
        } else {
            lexer.punct()?
        };
        tokens.push(Token {
            kind,
            span: Span::new(start, lexer.pos),
        });
    }
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match (self.peek_at(0), self.peek_at(1)) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    while self.peek_at(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    let mut depth = 1;
                    while depth > 0 {
                        match (self.peek_at(0), self.peek_at(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                depth -= 1;
                                self.pos += 2;
                            }
                            (Some(b'/'), Some(b'*')) => {
                                depth += 1;
                                self.pos += 2;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                return Err(SyntaxError::new(
                                    "unterminated block comment",
                                    Span::new(start, start + 2),
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn ident(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek_at(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        match Keyword::from_ident(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(text.to_string()),
        }
    }

    fn number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        if self.peek_at(0) == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek_at(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits = &self.source[digits_start..self.pos];
            let value = u64::from_str_radix(digits, 16).map_err(|_| {
                SyntaxError::new("invalid hexadecimal literal", Span::new(start, self.pos))
            })?;
            let suffix = self.int_suffix();
            return Ok(TokenKind::Int { value, suffix });
        }

        let mut is_float = false;
        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_at(0) == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_at(0), Some(b'e' | b'E')) {
            let exponent_digits = match self.peek_at(1) {
                Some(b'+' | b'-') => self.peek_at(2),
                other => other,
            };
            if exponent_digits.is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += if matches!(self.peek_at(1), Some(b'+' | b'-')) { 2 } else { 1 };
                while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let text = &self.source[start..self.pos];
        let span = Span::new(start, self.pos);

        if !is_float && text.len() > 1 && text.starts_with('0') {
            return Err(SyntaxError::new(
                "decimal literals may not have leading zeros",
                span,
            ));
        }

        match self.peek_at(0) {
            Some(suffix @ (b'f' | b'h')) => {
                self.pos += 1;
                let value = text.parse::<f64>().map_err(|_| {
                    SyntaxError::new("invalid float literal", span)
                })?;
                Ok(TokenKind::Float {
                    value,
                    suffix: Some(char::from(suffix)),
                })
            }
            _ if is_float => {
                let value = text
                    .parse::<f64>()
                    .map_err(|_| SyntaxError::new("invalid float literal", span))?;
                Ok(TokenKind::Float {
                    value,
                    suffix: None,
                })
            }
            _ => {
                let value = text
                    .parse::<u64>()
                    .map_err(|_| SyntaxError::new("integer literal is too large", span))?;
                let suffix = self.int_suffix();
                Ok(TokenKind::Int { value, suffix })
            }
        }
    }

    fn int_suffix(&mut self) -> Option<char> {
        match self.peek_at(0) {
            Some(c @ (b'i' | b'u')) => {
                self.pos += 1;
                Some(char::from(c))
            }
            _ => None,
        }
    }

    fn punct(&mut self) -> Result<TokenKind, SyntaxError> {
        use TokenKind as T;

        let start = self.pos;
        let c0 = self.bytes[self.pos];
        let c1 = self.peek_at(1);
        let c2 = self.peek_at(2);
        let (kind, len) = match (c0, c1, c2) {
            (b'<', Some(b'<'), Some(b'=')) => (T::CompoundAssign(CompoundOp::ShiftLeft), 3),
            (b'>', Some(b'>'), Some(b'=')) => (T::CompoundAssign(CompoundOp::ShiftRight), 3),
            (b'-', Some(b'>'), _) => (T::Arrow, 2),
            (b'=', Some(b'='), _) => (T::EqualEqual, 2),
            (b'!', Some(b'='), _) => (T::NotEqual, 2),
            (b'<', Some(b'='), _) => (T::LessEqual, 2),
            (b'>', Some(b'='), _) => (T::GreaterEqual, 2),
            (b'<', Some(b'<'), _) => (T::ShiftLeft, 2),
            (b'>', Some(b'>'), _) => (T::ShiftRight, 2),
            (b'&', Some(b'&'), _) => (T::AmpAmp, 2),
            (b'|', Some(b'|'), _) => (T::PipePipe, 2),
            (b'+', Some(b'+'), _) => (T::PlusPlus, 2),
            (b'-', Some(b'-'), _) => (T::MinusMinus, 2),
            (b'+', Some(b'='), _) => (T::CompoundAssign(CompoundOp::Add), 2),
            (b'-', Some(b'='), _) => (T::CompoundAssign(CompoundOp::Subtract), 2),
            (b'*', Some(b'='), _) => (T::CompoundAssign(CompoundOp::Multiply), 2),
            (b'/', Some(b'='), _) => (T::CompoundAssign(CompoundOp::Divide), 2),
            (b'%', Some(b'='), _) => (T::CompoundAssign(CompoundOp::Modulo), 2),
            (b'&', Some(b'='), _) => (T::CompoundAssign(CompoundOp::And), 2),
            (b'|', Some(b'='), _) => (T::CompoundAssign(CompoundOp::Or), 2),
            (b'^', Some(b'='), _) => (T::CompoundAssign(CompoundOp::Xor), 2),
            (b'@', ..) => (T::At, 1),
            (b'(', ..) => (T::LParen, 1),
            (b')', ..) => (T::RParen, 1),
            (b'{', ..) => (T::LBrace, 1),
            (b'}', ..) => (T::RBrace, 1),
            (b'[', ..) => (T::LBracket, 1),
            (b']', ..) => (T::RBracket, 1),
            (b',', ..) => (T::Comma, 1),
            (b':', ..) => (T::Colon, 1),
            (b';', ..) => (T::Semicolon, 1),
            (b'.', ..) => (T::Dot, 1),
            (b'=', ..) => (T::Equal, 1),
            (b'!', ..) => (T::Bang, 1),
            (b'<', ..) => (T::Less, 1),
            (b'>', ..) => (T::Greater, 1),
            (b'+', ..) => (T::Plus, 1),
            (b'-', ..) => (T::Minus, 1),
            (b'*', ..) => (T::Star, 1),
            (b'/', ..) => (T::Slash, 1),
            (b'%', ..) => (T::Percent, 1),
            (b'&', ..) => (T::Amp, 1),
            (b'|', ..) => (T::Pipe, 1),
            (b'^', ..) => (T::Caret, 1),
            (b'~', ..) => (T::Tilde, 1),
            _ => {
                return Err(SyntaxError::new(
                    format!("unexpected character '{}'", char::from(c0)),
                    Span::new(start, start + 1),
                ));
            }
        };
        self.pos += len;
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("fn main_2"),
            vec![
                TokenKind::Keyword(Keyword::Fn),
                TokenKind::Ident("main_2".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            kinds("1 2u 3i 0x1F 1.5 2f 1e3 .5h"),
            vec![
                TokenKind::Int { value: 1, suffix: None },
                TokenKind::Int { value: 2, suffix: Some('u') },
                TokenKind::Int { value: 3, suffix: Some('i') },
                TokenKind::Int { value: 31, suffix: None },
                TokenKind::Float { value: 1.5, suffix: None },
                TokenKind::Float { value: 2.0, suffix: Some('f') },
                TokenKind::Float { value: 1000.0, suffix: None },
                TokenKind::Float { value: 0.5, suffix: Some('h') },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn leading_zero_is_rejected() {
        let err = tokenize("012").unwrap_err();
        assert!(err.message.contains("leading zeros"));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n /* block /* nested */ */ b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_comment() {
        let err = tokenize("/* open").unwrap_err();
        assert_eq!(err.span, Span::new(0, 2));
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            kinds("-> >>= <= && ++ +="),
            vec![
                TokenKind::Arrow,
                TokenKind::CompoundAssign(CompoundOp::ShiftRight),
                TokenKind::LessEqual,
                TokenKind::AmpAmp,
                TokenKind::PlusPlus,
                TokenKind::CompoundAssign(CompoundOp::Add),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn spans_cover_tokens() {
        let tokens = tokenize("let  xy").unwrap();
        assert_eq!(tokens[1].span, Span::new(5, 7));
    }
}
