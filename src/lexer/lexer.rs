//! The single-pass, one-token-lookahead lexer.
//!
//! Operates directly on the source's bytes: identifiers, numbers, and
//! string bodies are all recorded as spans into the original text, not
//! copied out. The only place this lexer allocates is decoding a string
//! literal that actually contains an escape sequence ([`decode_string_escapes`]),
//! and that is opt-in — callers skip it entirely for the common
//! escape-free literal.
//!
//! Two places the grammar needs the lexer to behave differently than
//! "always produce the next token" are handled by making the caller
//! choose:
//!
//! - [`SlashContext`]: whether a leading `/` starts a regexp literal or a
//!   divide operator. The grammar knows this from its own parser state
//!   (after a primary expression, `/` divides; after an operator or a
//!   keyword, `/` can only start a regexp), the lexer can't.
//! - [`Lexer::scan_until`]: `while (...)` and `for (...)` discard their
//!   condition text during the first pass and re-lex it once the whole
//!   statement's shape is known; this captures the raw span between
//!   balanced delimiters without trying to parse it.

use super::token::{Keyword, NumberKind, Punct, ReservedWord, Token, TokenKind};
use crate::error::{Error, ErrorKind, Result, Span};

/// Disambiguates a leading `/`. The statement/expression parser tracks
/// which context it is in and passes this through on every call to
/// [`Lexer::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashContext {
    /// `/` and `/=` are the divide and divide-assign operators.
    Divide,
    /// `/` opens a regular expression literal.
    RegexpAllowed,
}

#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    current: Token,
}

impl<'a> Lexer<'a> {
    /// Construct a lexer and scan its first token, so [`Lexer::current`]
    /// is valid immediately.
    pub fn new(source: &'a str) -> Result<Self> {
        let mut lexer = Lexer { source, bytes: source.as_bytes(), pos: 0, line: 1, column: 1, current: eof_token() };
        lexer.current = lexer.scan_token(SlashContext::RegexpAllowed)?;
        Ok(lexer)
    }

    /// The token one lookahead ahead of whatever was last consumed.
    pub fn current(&self) -> Token {
        self.current
    }

    /// The source text a span covers.
    pub fn text(&self, span: Span) -> &'a str {
        &self.source[span.start..span.end]
    }

    /// Consume the current token and scan the next one under `ctx`,
    /// returning the token just consumed.
    pub fn advance(&mut self, ctx: SlashContext) -> Result<Token> {
        let consumed = self.current;
        self.current = self.scan_token(ctx)?;
        Ok(consumed)
    }

    /// Require the current token to be an identifier (not a keyword or
    /// reserved word — those are rejected as binding names elsewhere in
    /// the grammar, but this call site wants a plain name), consume it,
    /// and return its span for the caller to intern.
    pub fn expect_identifier(&mut self, ctx: SlashContext) -> Result<Span> {
        match self.current.kind {
            TokenKind::Identifier => Ok(self.advance(ctx)?.span),
            TokenKind::Keyword(_) | TokenKind::ReservedWord(_) => {
                Err(Error::parse(ErrorKind::IdentifierExpected, self.current.span))
            }
            _ => Err(Error::parse(ErrorKind::IdentifierExpected, self.current.span)),
        }
    }

    /// Capture the raw span up to (but not including) the next occurrence
    /// of `end1` or `end2` that isn't nested inside `()`, `[]`, `{}`, or a
    /// `?:` conditional. Leaves the lexer positioned just after the
    /// terminator, under `Divide` context (the terminator is always a
    /// punctuator, never something a regexp could follow).
    pub fn scan_until(&mut self, end1: Punct, end2: Punct) -> Result<Span> {
        let start = self.current.span.start;
        let (mut parens, mut brackets, mut braces, mut conditionals) = (0i32, 0i32, 0i32, 0i32);
        loop {
            let tok = self.advance(SlashContext::Divide)?;
            match tok.kind {
                TokenKind::Eof => return Err(Error::parse(ErrorKind::RightParenExpected, tok.span)),
                TokenKind::Punct(Punct::LeftParen) => parens += 1,
                TokenKind::Punct(Punct::RightParen) => parens -= 1,
                TokenKind::Punct(Punct::LeftBracket) => brackets += 1,
                TokenKind::Punct(Punct::RightBracket) => brackets -= 1,
                TokenKind::Punct(Punct::LeftBrace) => braces += 1,
                TokenKind::Punct(Punct::RightBrace) => braces -= 1,
                TokenKind::Punct(Punct::Question) => conditionals += 1,
                TokenKind::Punct(Punct::Colon) if conditionals > 0 => conditionals -= 1,
                _ => {}
            }
            let nested = parens > 0 || brackets > 0 || braces > 0 || conditionals > 0;
            if !nested {
                if tok.kind == TokenKind::Punct(end1) || tok.kind == TokenKind::Punct(end2) {
                    return Ok(Span::new(start, tok.span.start, self.current.span.line, self.current.span.column));
                }
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current_byte(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.pos]
        }
    }

    fn peek_byte(&self, ahead: usize) -> u8 {
        self.bytes.get(self.pos + ahead).copied().unwrap_or(0)
    }

    fn current_char(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    /// Advance one byte (ASCII-only call sites: punctuators, digits,
    /// quotes, comment delimiters).
    fn advance_byte(&mut self) {
        debug_assert!(self.bytes[self.pos] < 0x80);
        if self.bytes[self.pos] == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    /// Advance one full code point (identifier/string bodies, which may be
    /// multi-byte UTF-8).
    fn advance_char(&mut self) -> char {
        let c = self.current_char();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += c.len_utf8();
        c
    }

    fn make_span(&self, start: usize, start_line: u32, start_column: u32) -> Span {
        Span::new(start, self.pos, start_line, start_column)
    }

    fn scan_token(&mut self, ctx: SlashContext) -> Result<Token> {
        let was_newline = self.skip_trivia()?;
        let start = self.pos;
        let (start_line, start_column) = (self.line, self.column);

        if self.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, self.make_span(start, start_line, start_column), was_newline));
        }

        let c = self.current_byte();
        let kind = match c {
            b'0'..=b'9' => self.scan_number()?,
            b'.' if self.peek_byte(1).is_ascii_digit() => self.scan_number()?,
            b'"' | b'\'' => self.scan_string(c)?,
            b'/' => self.scan_slash(ctx, start)?,
            _ if is_identifier_start(self.current_char()) => self.scan_identifier(),
            b'(' => {
                self.advance_byte();
                TokenKind::Punct(Punct::LeftParen)
            }
            b')' => {
                self.advance_byte();
                TokenKind::Punct(Punct::RightParen)
            }
            b'{' => {
                self.advance_byte();
                TokenKind::Punct(Punct::LeftBrace)
            }
            b'}' => {
                self.advance_byte();
                TokenKind::Punct(Punct::RightBrace)
            }
            b'[' => {
                self.advance_byte();
                TokenKind::Punct(Punct::LeftBracket)
            }
            b']' => {
                self.advance_byte();
                TokenKind::Punct(Punct::RightBracket)
            }
            b';' => {
                self.advance_byte();
                TokenKind::Punct(Punct::Semicolon)
            }
            b',' => {
                self.advance_byte();
                TokenKind::Punct(Punct::Comma)
            }
            b'.' => {
                self.advance_byte();
                TokenKind::Punct(Punct::Dot)
            }
            b':' => {
                self.advance_byte();
                TokenKind::Punct(Punct::Colon)
            }
            b'?' => {
                self.advance_byte();
                TokenKind::Punct(Punct::Question)
            }
            b'~' => {
                self.advance_byte();
                TokenKind::Punct(Punct::Tilde)
            }
            b'+' => self.scan_repeatable_or_assign(Punct::Plus, b'+', Punct::PlusPlus, Punct::PlusEqual),
            b'-' => self.scan_repeatable_or_assign(Punct::Minus, b'-', Punct::MinusMinus, Punct::MinusEqual),
            b'*' => self.scan_assign_only(Punct::Star, Punct::StarEqual),
            b'%' => self.scan_assign_only(Punct::Percent, Punct::PercentEqual),
            b'^' => self.scan_assign_only(Punct::Caret, Punct::CaretEqual),
            b'=' => self.scan_equal(),
            b'!' => self.scan_bang(),
            b'<' => self.scan_less(),
            b'>' => self.scan_greater(),
            b'&' => self.scan_amp_or_pipe(b'&', Punct::Amp, Punct::AndAnd, Punct::AmpEqual),
            b'|' => self.scan_amp_or_pipe(b'|', Punct::Pipe, Punct::OrOr, Punct::PipeEqual),
            _ => {
                let span = self.make_span(start, start_line, start_column);
                self.advance_char();
                return Err(Error::parse(ErrorKind::UnexpectedCharacter, span));
            }
        };

        Ok(Token::new(kind, self.make_span(start, start_line, start_column), was_newline))
    }

    /// Skip whitespace and comments, returning whether a line terminator
    /// was seen anywhere in the skipped span (ASI needs only the fact, not
    /// the count or position).
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut saw_newline = false;
        loop {
            match self.current_byte() {
                b'\n' => {
                    saw_newline = true;
                    self.advance_byte();
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.advance_byte(),
                b'/' if self.peek_byte(1) == b'/' => {
                    while !self.is_at_end() && self.current_byte() != b'\n' {
                        self.advance_byte();
                    }
                }
                b'/' if self.peek_byte(1) == b'*' => {
                    let start = self.pos;
                    let (start_line, start_column) = (self.line, self.column);
                    self.advance_byte();
                    self.advance_byte();
                    loop {
                        if self.is_at_end() {
                            return Err(Error::parse(
                                ErrorKind::UnterminatedComment,
                                self.make_span(start, start_line, start_column),
                            ));
                        }
                        if self.current_byte() == b'*' && self.peek_byte(1) == b'/' {
                            self.advance_byte();
                            self.advance_byte();
                            break;
                        }
                        if self.current_byte() == b'\n' {
                            saw_newline = true;
                        }
                        self.advance_byte();
                    }
                }
                c if c >= 0x80 && current_char_is_unicode_space(self.current_char()) => {
                    self.advance_char();
                }
                _ => return Ok(saw_newline),
            }
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind> {
        let start = self.pos;

        if self.current_byte() == b'0' && matches!(self.peek_byte(1), b'x' | b'X') {
            self.advance_byte();
            self.advance_byte();
            let digits_start = self.pos;
            while self.current_byte().is_ascii_hexdigit() {
                self.advance_byte();
            }
            if self.pos == digits_start {
                return Err(Error::parse(
                    ErrorKind::InvalidNumericLiteral,
                    Span::new(start, self.pos, self.line, self.column),
                ));
            }
            return Ok(TokenKind::Number(NumberKind::Hex));
        }

        if self.current_byte() == b'0' && self.peek_byte(1).is_ascii_digit() {
            // Legacy octal (ES5 Annex B.1.1): a leading zero followed only
            // by octal digits. A `0` followed by `8`/`9` or a `.` falls
            // through to the decimal path below instead.
            let mut lookahead = 1;
            let mut all_octal = true;
            while self.peek_byte(lookahead).is_ascii_digit() {
                if !(b'0'..=b'7').contains(&self.peek_byte(lookahead)) {
                    all_octal = false;
                }
                lookahead += 1;
            }
            let followed_by_dot_or_exp = matches!(self.peek_byte(lookahead), b'.' | b'e' | b'E');
            if all_octal && !followed_by_dot_or_exp {
                for _ in 0..lookahead {
                    self.advance_byte();
                }
                return Ok(TokenKind::Number(NumberKind::LegacyOctal));
            }
        }

        while self.current_byte().is_ascii_digit() {
            self.advance_byte();
        }
        if self.current_byte() == b'.' {
            self.advance_byte();
            while self.current_byte().is_ascii_digit() {
                self.advance_byte();
            }
        }
        if matches!(self.current_byte(), b'e' | b'E') {
            self.advance_byte();
            if matches!(self.current_byte(), b'+' | b'-') {
                self.advance_byte();
            }
            let exp_start = self.pos;
            while self.current_byte().is_ascii_digit() {
                self.advance_byte();
            }
            if self.pos == exp_start {
                return Err(Error::parse(
                    ErrorKind::InvalidNumericLiteral,
                    Span::new(start, self.pos, self.line, self.column),
                ));
            }
        }
        if is_identifier_start(self.current_char()) || self.current_byte().is_ascii_digit() {
            // `3abc` or `3.4.5` — a numeric literal can't be immediately
            // followed by another identifier/digit character.
            return Err(Error::parse(
                ErrorKind::InvalidNumericLiteral,
                Span::new(start, self.pos, self.line, self.column),
            ));
        }
        Ok(TokenKind::Number(NumberKind::Decimal))
    }

    fn scan_string(&mut self, quote: u8) -> Result<TokenKind> {
        let outer_start = self.pos;
        let (outer_line, outer_column) = (self.line, self.column);
        self.advance_byte();
        let mut has_escape = false;
        loop {
            if self.is_at_end() || self.current_byte() == b'\n' {
                return Err(Error::parse(
                    ErrorKind::UnterminatedString,
                    Span::new(outer_start, self.pos, outer_line, outer_column),
                ));
            }
            if self.current_byte() == quote {
                self.advance_byte();
                return Ok(TokenKind::String { has_escape });
            }
            if self.current_byte() == b'\\' {
                has_escape = true;
                self.advance_byte();
                if self.is_at_end() {
                    return Err(Error::parse(
                        ErrorKind::UnterminatedString,
                        Span::new(outer_start, self.pos, outer_line, outer_column),
                    ));
                }
                // Line continuation (`\` immediately before a newline)
                // still needs to track the line count even though it
                // contributes no character to the decoded value.
                self.advance_char();
                continue;
            }
            self.advance_char();
        }
    }

    fn scan_slash(&mut self, ctx: SlashContext, start: usize) -> Result<TokenKind> {
        if ctx == SlashContext::RegexpAllowed {
            return self.scan_regexp(start);
        }
        Ok(self.scan_assign_only(Punct::Slash, Punct::SlashEqual))
    }

    fn scan_regexp(&mut self, start: usize) -> Result<TokenKind> {
        let (start_line, start_column) = (self.line, self.column);
        self.advance_byte(); // opening '/'
        let mut in_class = false;
        loop {
            if self.is_at_end() || self.current_byte() == b'\n' {
                return Err(Error::parse(
                    ErrorKind::UnterminatedRegexp,
                    Span::new(start, self.pos, start_line, start_column),
                ));
            }
            match self.current_byte() {
                b'\\' => {
                    self.advance_byte();
                    if self.is_at_end() || self.current_byte() == b'\n' {
                        return Err(Error::parse(
                            ErrorKind::UnterminatedRegexp,
                            Span::new(start, self.pos, start_line, start_column),
                        ));
                    }
                    self.advance_char();
                }
                b'[' => {
                    in_class = true;
                    self.advance_byte();
                }
                b']' => {
                    in_class = false;
                    self.advance_byte();
                }
                b'/' if !in_class => {
                    self.advance_byte();
                    break;
                }
                _ => {
                    self.advance_char();
                }
            }
        }
        // Flags: a run of identifier-continue characters.
        while is_identifier_continue(self.current_char()) {
            self.advance_char();
        }
        Ok(TokenKind::Regexp)
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance_char();
        while is_identifier_continue(self.current_char()) {
            self.advance_char();
        }
        let text = &self.source[start..self.pos];
        if let Some(keyword) = Keyword::from_str(text) {
            return TokenKind::Keyword(keyword);
        }
        if let Some(reserved) = ReservedWord::from_str(text) {
            return TokenKind::ReservedWord(reserved);
        }
        TokenKind::Identifier
    }

    fn scan_repeatable_or_assign(&mut self, base: Punct, repeat: u8, doubled: Punct, assign: Punct) -> TokenKind {
        self.advance_byte();
        if self.current_byte() == repeat {
            self.advance_byte();
            TokenKind::Punct(doubled)
        } else if self.current_byte() == b'=' {
            self.advance_byte();
            TokenKind::Punct(assign)
        } else {
            TokenKind::Punct(base)
        }
    }

    fn scan_assign_only(&mut self, base: Punct, assign: Punct) -> TokenKind {
        self.advance_byte();
        if self.current_byte() == b'=' {
            self.advance_byte();
            TokenKind::Punct(assign)
        } else {
            TokenKind::Punct(base)
        }
    }

    fn scan_amp_or_pipe(&mut self, repeat: u8, base: Punct, doubled: Punct, assign: Punct) -> TokenKind {
        self.advance_byte();
        if self.current_byte() == repeat {
            self.advance_byte();
            TokenKind::Punct(doubled)
        } else if self.current_byte() == b'=' {
            self.advance_byte();
            TokenKind::Punct(assign)
        } else {
            TokenKind::Punct(base)
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        self.advance_byte();
        if self.current_byte() == b'=' {
            self.advance_byte();
            if self.current_byte() == b'=' {
                self.advance_byte();
                return TokenKind::Punct(Punct::StrictEqual);
            }
            return TokenKind::Punct(Punct::EqualEqual);
        }
        TokenKind::Punct(Punct::Equal)
    }

    fn scan_bang(&mut self) -> TokenKind {
        self.advance_byte();
        if self.current_byte() == b'=' {
            self.advance_byte();
            if self.current_byte() == b'=' {
                self.advance_byte();
                return TokenKind::Punct(Punct::StrictNotEqual);
            }
            return TokenKind::Punct(Punct::NotEqual);
        }
        TokenKind::Punct(Punct::Not)
    }

    fn scan_less(&mut self) -> TokenKind {
        self.advance_byte();
        if self.current_byte() == b'=' {
            self.advance_byte();
            return TokenKind::Punct(Punct::LessEqual);
        }
        if self.current_byte() == b'<' {
            self.advance_byte();
            if self.current_byte() == b'=' {
                self.advance_byte();
                return TokenKind::Punct(Punct::LeftShiftEqual);
            }
            return TokenKind::Punct(Punct::LeftShift);
        }
        TokenKind::Punct(Punct::Less)
    }

    fn scan_greater(&mut self) -> TokenKind {
        self.advance_byte();
        if self.current_byte() == b'=' {
            self.advance_byte();
            return TokenKind::Punct(Punct::GreaterEqual);
        }
        if self.current_byte() == b'>' {
            self.advance_byte();
            if self.current_byte() == b'>' {
                self.advance_byte();
                if self.current_byte() == b'=' {
                    self.advance_byte();
                    return TokenKind::Punct(Punct::UnsignedRightShiftEqual);
                }
                return TokenKind::Punct(Punct::UnsignedRightShift);
            }
            if self.current_byte() == b'=' {
                self.advance_byte();
                return TokenKind::Punct(Punct::RightShiftEqual);
            }
            return TokenKind::Punct(Punct::RightShift);
        }
        TokenKind::Punct(Punct::Greater)
    }
}

fn eof_token() -> Token {
    Token::new(TokenKind::Eof, Span::default(), false)
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c == '$' || unicode_xid::UnicodeXID::is_xid_start(c)
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c == '$' || unicode_xid::UnicodeXID::is_xid_continue(c) || c == '\u{200c}' || c == '\u{200d}'
}

/// The non-ASCII subset of ES5.1's `WhiteSpace`/`LineTerminator`
/// productions; the ASCII ones are handled in [`Lexer::skip_trivia`]'s
/// match directly.
fn current_char_is_unicode_space(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{2028}' | '\u{2029}' | '\u{FEFF}') || c.is_whitespace()
}

/// Parse an already-scanned numeric literal's span text into its value.
/// `text` is exactly what the lexer accepted, so this never fails.
pub fn number_value(text: &str, kind: NumberKind) -> f64 {
    match kind {
        NumberKind::Decimal => text.parse::<f64>().unwrap_or(f64::NAN),
        NumberKind::Hex => u64::from_str_radix(&text[2..], 16).map(|v| v as f64).unwrap_or(f64::NAN),
        NumberKind::LegacyOctal => u64::from_str_radix(text, 8).map(|v| v as f64).unwrap_or(f64::NAN),
    }
}

/// Decode a string literal's escapes. `raw` is the span text *between* the
/// quotes. Only called when the lexer flagged `has_escape`; the
/// escape-free path interns `raw` directly.
pub fn decode_string_escapes(raw: &str, span: Span) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            return Err(Error::parse(ErrorKind::InvalidEscapeSequence, span));
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'v' => out.push('\u{000B}'),
            '0' if !chars.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            '\n' => {} // line continuation: contributes nothing
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' | '\'' | '"' => out.push(escaped),
            'x' => {
                let hex: String = (0..2).map_while(|_| chars.next_if(|c| c.is_ascii_hexdigit())).collect();
                if hex.len() != 2 {
                    return Err(Error::parse(ErrorKind::InvalidEscapeSequence, span));
                }
                let code = u32::from_str_radix(&hex, 16).unwrap();
                out.push(char::from_u32(code).unwrap());
            }
            'u' => {
                let hex: String = (0..4).map_while(|_| chars.next_if(|c| c.is_ascii_hexdigit())).collect();
                if hex.len() != 4 {
                    return Err(Error::parse(ErrorKind::InvalidEscapeSequence, span));
                }
                let code = u32::from_str_radix(&hex, 16).unwrap();
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => return Err(Error::parse(ErrorKind::InvalidEscapeSequence, span)),
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source).unwrap();
        let mut out = Vec::new();
        loop {
            let tok = lexer.current();
            out.push(tok);
            if tok.is_eof() {
                break;
            }
            lexer.advance(SlashContext::RegexpAllowed).unwrap();
        }
        out
    }

    #[test]
    fn scans_punctuators_and_operators() {
        let tokens = lex_all("+ ++ += >>> >>>=");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Punct(Punct::Plus),
                TokenKind::Punct(Punct::PlusPlus),
                TokenKind::Punct(Punct::PlusEqual),
                TokenKind::Punct(Punct::UnsignedRightShift),
                TokenKind::Punct(Punct::UnsignedRightShiftEqual),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_decimal_hex_and_legacy_octal_numbers() {
        let mut lexer = Lexer::new("3.14 0x1F 0777 0.5 0").unwrap();
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.current();
            if tok.is_eof() {
                break;
            }
            kinds.push((tok.kind, lexer.text(tok.span)));
            lexer.advance(SlashContext::Divide).unwrap();
        }
        assert_eq!(kinds[0], (TokenKind::Number(NumberKind::Decimal), "3.14"));
        assert_eq!(kinds[1], (TokenKind::Number(NumberKind::Hex), "0x1F"));
        assert_eq!(kinds[2], (TokenKind::Number(NumberKind::LegacyOctal), "0777"));
        assert_eq!(kinds[3], (TokenKind::Number(NumberKind::Decimal), "0.5"));
        assert_eq!(kinds[4], (TokenKind::Number(NumberKind::Decimal), "0"));
        assert_eq!(number_value("0x1F", NumberKind::Hex), 31.0);
        assert_eq!(number_value("0777", NumberKind::LegacyOctal), 511.0);
    }

    #[test]
    fn tracks_newline_for_asi() {
        let tokens = lex_all("a\nb");
        assert!(!tokens[0].was_newline);
        assert!(tokens[1].was_newline);
    }

    #[test]
    fn slash_context_picks_divide_or_regexp() {
        let mut lexer = Lexer::new("/abc/g").unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Regexp);

        let mut lexer = Lexer::new("a / b").unwrap();
        lexer.advance(SlashContext::Divide).unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Punct(Punct::Slash));
    }

    #[test]
    fn string_literal_flags_escapes() {
        let mut lexer = Lexer::new(r#" "plain" "has\nescape" "#).unwrap();
        let first = lexer.current();
        assert_eq!(first.kind, TokenKind::String { has_escape: false });
        lexer.advance(SlashContext::Divide).unwrap();
        let second = lexer.current();
        assert_eq!(second.kind, TokenKind::String { has_escape: true });
        let inner = Span::new(second.span.start + 1, second.span.end - 1, second.span.line, second.span.column);
        let decoded = decode_string_escapes(lexer.text(inner), inner).unwrap();
        assert_eq!(decoded, "has\nescape");
    }

    #[test]
    fn unterminated_string_reports_error() {
        let err = Lexer::new("\"no closing quote").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnterminatedString));
    }

    #[test]
    fn identifiers_vs_keywords_vs_reserved_words() {
        let tokens = lex_all("foo while class $bar _baz");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].kind, TokenKind::Keyword(Keyword::While));
        assert_eq!(tokens[2].kind, TokenKind::ReservedWord(ReservedWord::Class));
        assert_eq!(tokens[3].kind, TokenKind::Identifier);
        assert_eq!(tokens[4].kind, TokenKind::Identifier);
    }

    #[test]
    fn scan_until_respects_nesting() {
        let mut lexer = Lexer::new("(a + (b * c)) { body }").unwrap();
        let span = lexer.scan_until(Punct::RightParen, Punct::RightParen).unwrap();
        assert_eq!(lexer.text(span), "a + (b * c)");
        assert_eq!(lexer.current().kind, TokenKind::Punct(Punct::LeftBrace));
    }

    #[test]
    fn skips_line_and_block_comments() {
        let tokens = lex_all("a // comment\n/* block\ncomment */ b");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]);
        assert!(tokens[1].was_newline);
    }
}
