//! PromQL tokenizer

use super::ParseError;
use crate::position::SourceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// ident ::= (letter|[_:]) (letter|digit|[_:])*
    Identifier,
    Number,
    /// duration ::= (digit+ unit)+ with unit one of ms, s, m, h, d, w, y
    Duration,
    String,

    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    At,

    Assign,
    Eql,
    Neq,
    RegexMatch,
    RegexNoMatch,
    Lss,
    Lte,
    Gtr,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    Eof,
}

impl TokenKind {
    /// Human-readable name used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::Duration => "duration",
            TokenKind::String => "string",
            TokenKind::LeftParen => "\"(\"",
            TokenKind::RightParen => "\")\"",
            TokenKind::LeftBrace => "\"{\"",
            TokenKind::RightBrace => "\"}\"",
            TokenKind::LeftBracket => "\"[\"",
            TokenKind::RightBracket => "\"]\"",
            TokenKind::Comma => "\",\"",
            TokenKind::Colon => "\":\"",
            TokenKind::At => "\"@\"",
            TokenKind::Assign => "\"=\"",
            TokenKind::Eql => "\"==\"",
            TokenKind::Neq => "\"!=\"",
            TokenKind::RegexMatch => "\"=~\"",
            TokenKind::RegexNoMatch => "\"!~\"",
            TokenKind::Lss => "\"<\"",
            TokenKind::Lte => "\"<=\"",
            TokenKind::Gtr => "\">\"",
            TokenKind::Gte => "\">=\"",
            TokenKind::Add => "\"+\"",
            TokenKind::Sub => "\"-\"",
            TokenKind::Mul => "\"*\"",
            TokenKind::Div => "\"/\"",
            TokenKind::Mod => "\"%\"",
            TokenKind::Pow => "\"^\"",
            TokenKind::Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: SourceRange,
}

impl Token {
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.range.start..self.range.end]
    }
}

pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    position: usize,
    /// Inside `[...]`, where `:` separates range and step
    bracket_depth: usize,
    errors: Vec<ParseError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: 0,
            bracket_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Tokenize the whole input. All lexical errors are collected.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<ParseError>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        if self.errors.is_empty() {
            Ok(tokens)
        } else {
            Err(self.errors)
        }
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.position + offset).copied()
    }

    /// Skip whitespace and `#` comments
    fn skip_trivia(&mut self) {
        let mut comment = false;
        while let Some(c) = self.peek_byte(0) {
            if c == b'\n' {
                comment = false;
                self.position += 1;
                continue;
            }

            if comment || c.is_ascii_whitespace() {
                self.position += 1;
                continue;
            }

            if c == b'#' {
                comment = true;
                self.position += 1;
                continue;
            }

            break;
        }
    }

    fn token(&mut self, kind: TokenKind, length: usize) -> Token {
        let start = self.position;
        self.position += length;
        Token {
            kind,
            range: SourceRange::new(start, self.position),
        }
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.skip_trivia();
            let Some(c) = self.peek_byte(0) else {
                return Token {
                    kind: TokenKind::Eof,
                    range: SourceRange::new(self.bytes.len(), self.bytes.len()),
                };
            };
            let next = self.peek_byte(1);

            let token = match c {
                b'(' => self.token(TokenKind::LeftParen, 1),
                b')' => self.token(TokenKind::RightParen, 1),
                b'{' => self.token(TokenKind::LeftBrace, 1),
                b'}' => self.token(TokenKind::RightBrace, 1),
                b'[' => {
                    self.bracket_depth += 1;
                    self.token(TokenKind::LeftBracket, 1)
                }
                b']' => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    self.token(TokenKind::RightBracket, 1)
                }
                b',' => self.token(TokenKind::Comma, 1),
                b'@' => self.token(TokenKind::At, 1),
                b'+' => self.token(TokenKind::Add, 1),
                b'-' => self.token(TokenKind::Sub, 1),
                b'*' => self.token(TokenKind::Mul, 1),
                b'/' => self.token(TokenKind::Div, 1),
                b'%' => self.token(TokenKind::Mod, 1),
                b'^' => self.token(TokenKind::Pow, 1),
                b'=' => match next {
                    Some(b'=') => self.token(TokenKind::Eql, 2),
                    Some(b'~') => self.token(TokenKind::RegexMatch, 2),
                    _ => self.token(TokenKind::Assign, 1),
                },
                b'!' => match next {
                    Some(b'=') => self.token(TokenKind::Neq, 2),
                    Some(b'~') => self.token(TokenKind::RegexNoMatch, 2),
                    _ => {
                        self.unexpected_character();
                        continue;
                    }
                },
                b'<' => match next {
                    Some(b'=') => self.token(TokenKind::Lte, 2),
                    _ => self.token(TokenKind::Lss, 1),
                },
                b'>' => match next {
                    Some(b'=') => self.token(TokenKind::Gte, 2),
                    _ => self.token(TokenKind::Gtr, 1),
                },
                b':' if self.bracket_depth > 0 || !next.is_some_and(is_identifier_start) => {
                    self.token(TokenKind::Colon, 1)
                }
                b'"' | b'\'' | b'`' => match self.lex_string(c) {
                    Some(token) => token,
                    None => continue,
                },
                b'0'..=b'9' => self.lex_number_or_duration(),
                b'.' if next.is_some_and(|n| n.is_ascii_digit()) => self.lex_number_or_duration(),
                c if is_identifier_start(c) || c == b':' => self.lex_identifier(),
                _ => {
                    self.unexpected_character();
                    continue;
                }
            };

            return token;
        }
    }

    fn unexpected_character(&mut self) {
        let start = self.position;
        let c = self.source[start..].chars().next().unwrap_or('\u{fffd}');
        self.position += c.len_utf8().max(1);
        self.errors.push(ParseError::new(
            SourceRange::new(start, self.position),
            format!("unexpected character: '{}'", c.escape_default()),
        ));
    }

    fn lex_identifier(&mut self) -> Token {
        let length = self.bytes[self.position..]
            .iter()
            .take_while(|&&b| is_identifier_start(b) || b.is_ascii_digit() || b == b':')
            .count();
        self.token(TokenKind::Identifier, length)
    }

    /// Lex a quoted literal starting at the opening `quote`.
    /// Records an error and returns `None` when the literal is unterminated.
    fn lex_string(&mut self, quote: u8) -> Option<Token> {
        let start = self.position;
        let mut end = start + 1;

        while let Some(&c) = self.bytes.get(end) {
            end += 1;

            if c == b'\\' && quote != b'`' {
                // Skip escaped character
                end += 1;
                continue;
            }

            if c == b'\n' && quote != b'`' {
                break;
            }

            if c == quote {
                return Some(self.token(TokenKind::String, end - start));
            }
        }

        let end = end.min(self.bytes.len());
        self.position = end;
        self.errors.push(ParseError::new(
            SourceRange::new(start, end),
            "unterminated quoted string",
        ));
        None
    }

    fn lex_number_or_duration(&mut self) -> Token {
        let start = self.position;
        let rest = &self.bytes[start..];

        if rest.len() > 2 && rest[0] == b'0' && (rest[1] == b'x' || rest[1] == b'X') {
            let digits = rest[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
            if digits > 0 {
                return self.token(TokenKind::Number, 2 + digits);
            }
        }

        let int_digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();

        if int_digits > 0 && unit_length(&rest[int_digits..]) > 0 {
            return self.lex_duration();
        }

        let mut length = int_digits;
        if rest.get(length) == Some(&b'.') {
            length += 1;
            length += rest[length..].iter().take_while(|b| b.is_ascii_digit()).count();
        }

        if matches!(rest.get(length), Some(b'e') | Some(b'E')) {
            let mut exp = length + 1;
            if matches!(rest.get(exp), Some(b'+') | Some(b'-')) {
                exp += 1;
            }
            let exp_digits = rest[exp.min(rest.len())..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if exp_digits > 0 {
                length = exp + exp_digits;
            }
        }

        self.token(TokenKind::Number, length)
    }

    fn lex_duration(&mut self) -> Token {
        let rest = &self.bytes[self.position..];
        let mut length = 0;

        loop {
            let digits = rest[length..].iter().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 {
                break;
            }
            let unit = unit_length(&rest[length + digits..]);
            if unit == 0 {
                break;
            }
            length += digits + unit;
        }

        self.token(TokenKind::Duration, length)
    }
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Length of the duration unit at the start of `rest`, 0 if none
fn unit_length(rest: &[u8]) -> usize {
    let unit = match rest {
        [b'm', b's', ..] => 2,
        [b's' | b'm' | b'h' | b'd' | b'w' | b'y', ..] => 1,
        _ => return 0,
    };

    // `5min` is not a duration followed by `in`
    match rest.get(unit) {
        Some(&b) if b.is_ascii_alphabetic() || b == b'_' => 0,
        _ => unit,
    }
}

/// Parse a duration literal such as `1h30m` into milliseconds
pub fn parse_duration(text: &str) -> Result<i64, String> {
    let bytes = text.as_bytes();
    let mut total: i64 = 0;
    let mut i = 0;

    if bytes.is_empty() {
        return Err("empty duration string".to_string());
    }

    while i < bytes.len() {
        let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return Err(format!("not a valid duration string: {:?}", text));
        }
        let value: i64 = text[i..i + digits]
            .parse()
            .map_err(|_| format!("duration out of range: {:?}", text))?;
        i += digits;

        let (unit, factor) = match &bytes[i..] {
            [b'm', b's', ..] => (2, 1),
            [b's', ..] => (1, 1_000),
            [b'm', ..] => (1, 60_000),
            [b'h', ..] => (1, 3_600_000),
            [b'd', ..] => (1, 86_400_000),
            [b'w', ..] => (1, 604_800_000),
            [b'y', ..] => (1, 31_536_000_000),
            _ => return Err(format!("not a valid duration string: {:?}", text)),
        };
        i += unit;

        total = value
            .checked_mul(factor)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| format!("duration out of range: {:?}", text))?;
    }

    Ok(total)
}

/// Decode a quoted string literal (including its quotes)
pub fn unquote(raw: &str) -> Result<String, String> {
    let quote = raw.chars().next().ok_or("empty string literal")?;
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .ok_or("malformed string literal")?;

    if quote == '`' {
        return Ok(inner.to_string());
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let escaped = chars.next().ok_or("invalid escape sequence at end of string")?;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            other => return Err(format!("unknown escape sequence: \\{}", other)),
        }
    }

    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, String> {
    let hex: String = chars.take(digits).collect();
    if hex.len() != digits {
        return Err(format!("invalid escape sequence: {}", hex));
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape sequence: {}", hex))
}
