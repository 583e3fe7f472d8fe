//! Error taxonomy and source-position tracking for the parser / byte-code
//! generator.
//!
//! The VM's own runtime error kinds are out of scope here: everything in
//! [`ErrorKind`] is something `raise_error` can unwind the compilation with,
//! never a live program exception.

pub mod diagnostic;

pub use diagnostic::Diagnostic;

/// A half-open byte range into the source text, plus the 1-based line/column
/// of its start. Lexer tokens, AST-free as this parser is, carry one of these
/// instead of owning their text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self { start, end, line, column }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One entry of the parser's fixed error taxonomy. The `Display` impl
/// renders the machine name (`identifier_expected`), matching the host
/// contract's `"Parse error '<kind>' at line: L col: C"` format; use
/// [`ErrorKind::message`] for a human-readable diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Syntax
    PrimaryExprExpected,
    RightParenExpected,
    RightSquareExpected,
    ColonExpected,
    ColonForConditionalExpected,
    LeftBraceExpected,
    RightBraceExpected,
    SemicolonExpected,
    ArgumentListExpected,
    IdentifierExpected,
    ArrayItemSeparatorExpected,
    ObjectItemSeparatorExpected,
    // Lexical
    UnexpectedCharacter,
    UnterminatedString,
    UnterminatedComment,
    UnterminatedRegexp,
    InvalidEscapeSequence,
    InvalidNumericLiteral,
    KeywordUsedAsIdentifier,
    // Strict mode
    EvalCannotBeAssigned,
    ArgumentsCannotBeAssigned,
    NoArgumentsExpected,
    OneArgumentExpected,
    // Limits
    LiteralLimitReached,
    RegisterLimitReached,
    StackLimitReached,
    ArgumentLimitReached,
    CodeSizeLimitReached,
    // Resource
    OutOfMemory,
    // Control
    BreakNotInLoopOrSwitch,
    ContinueNotInLoop,
    DuplicateLabel,
    TargetLabelNotFound,
    MultipleDefaultNotAllowed,
    CaseOrDefaultExpected,
}

impl ErrorKind {
    /// The taxonomy's machine name, as it appears in `raise_error` call
    /// sites and in the host's printed diagnostic.
    pub fn name(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            PrimaryExprExpected => "primary_expr_expected",
            RightParenExpected => "right_paren_expected",
            RightSquareExpected => "right_square_expected",
            ColonExpected => "colon_expected",
            ColonForConditionalExpected => "colon_for_conditional_expected",
            LeftBraceExpected => "left_brace_expected",
            RightBraceExpected => "right_brace_expected",
            SemicolonExpected => "semicolon_expected",
            ArgumentListExpected => "argument_list_expected",
            IdentifierExpected => "identifier_expected",
            ArrayItemSeparatorExpected => "array_item_separator_expected",
            ObjectItemSeparatorExpected => "object_item_separator_expected",
            UnexpectedCharacter => "unexpected_character",
            UnterminatedString => "unterminated_string",
            UnterminatedComment => "unterminated_comment",
            UnterminatedRegexp => "unterminated_regexp",
            InvalidEscapeSequence => "invalid_escape_sequence",
            InvalidNumericLiteral => "invalid_numeric_literal",
            KeywordUsedAsIdentifier => "keyword_used_as_identifier",
            EvalCannotBeAssigned => "eval_cannot_be_assigned",
            ArgumentsCannotBeAssigned => "arguments_cannot_be_assigned",
            NoArgumentsExpected => "no_arguments_expected",
            OneArgumentExpected => "one_argument_expected",
            LiteralLimitReached => "literal_limit_reached",
            RegisterLimitReached => "register_limit_reached",
            StackLimitReached => "stack_limit_reached",
            ArgumentLimitReached => "argument_limit_reached",
            CodeSizeLimitReached => "code_size_limit_reached",
            OutOfMemory => "out_of_memory",
            BreakNotInLoopOrSwitch => "break_not_in_loop_or_switch",
            ContinueNotInLoop => "continue_not_in_loop",
            DuplicateLabel => "duplicate_label",
            TargetLabelNotFound => "target_label_not_found",
            MultipleDefaultNotAllowed => "multiple_default_not_allowed",
            CaseOrDefaultExpected => "case_or_default_expected",
        }
    }

    /// Human-readable explanation, used by [`Diagnostic`] rather than by the
    /// bare host-wrapper format.
    pub fn message(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            PrimaryExprExpected => "expected an expression",
            RightParenExpected => "expected ')'",
            RightSquareExpected => "expected ']'",
            ColonExpected => "expected ':'",
            ColonForConditionalExpected => "expected ':' in conditional expression",
            LeftBraceExpected => "expected '{'",
            RightBraceExpected => "expected '}'",
            SemicolonExpected => "expected ';'",
            ArgumentListExpected => "expected an argument list",
            IdentifierExpected => "expected an identifier",
            ArrayItemSeparatorExpected => "expected ',' between array elements",
            ObjectItemSeparatorExpected => "expected ',' between object properties",
            UnexpectedCharacter => "unexpected character",
            UnterminatedString => "unterminated string literal",
            UnterminatedComment => "unterminated multi-line comment",
            UnterminatedRegexp => "unterminated regular expression literal",
            InvalidEscapeSequence => "invalid escape sequence",
            InvalidNumericLiteral => "invalid numeric literal",
            KeywordUsedAsIdentifier => "reserved word used as an identifier",
            EvalCannotBeAssigned => "'eval' cannot be assigned to in strict mode",
            ArgumentsCannotBeAssigned => "'arguments' cannot be assigned to in strict mode",
            NoArgumentsExpected => "getter functions must have no arguments",
            OneArgumentExpected => "setter functions must have exactly one argument",
            LiteralLimitReached => "too many distinct literals in this function",
            RegisterLimitReached => "too many registers required by this function",
            StackLimitReached => "operand stack limit exceeded",
            ArgumentLimitReached => "too many arguments",
            CodeSizeLimitReached => "compiled byte code exceeds the size limit",
            OutOfMemory => "out of memory",
            BreakNotInLoopOrSwitch => "'break' outside of a loop or switch",
            ContinueNotInLoop => "'continue' outside of a loop",
            DuplicateLabel => "duplicate statement label",
            TargetLabelNotFound => "no matching label for this 'break'/'continue'",
            MultipleDefaultNotAllowed => "a 'switch' statement may have at most one 'default' clause",
            CaseOrDefaultExpected => "expected 'case', 'default', or '}'",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A raised parse error: the kind plus the span of the token that triggered
/// it. Carrying an owned `Span` (rather than an index into the source) is
/// what lets this propagate past the lexer/parser boundary after the
/// underlying token buffer may have moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error '{}' at line: {} col: {}",
            self.kind, self.span.line, self.span.column
        )
    }
}

impl std::error::Error for ParseError {}

/// Top-level error type threaded through `Result` instead of the
/// longjmp-style escape the original parser used; each nested parser
/// context's `Drop` releases its own scratch on the way out regardless of
/// which variant unwinds through it.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn parse(kind: ErrorKind, span: Span) -> Self {
        Error::Parse(ParseError::new(kind, span))
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse(e) => Some(e.span),
            Error::Io(_) => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Parse(e) => Some(e.kind),
            Error::Io(_) => None,
        }
    }
}

/// Result type used throughout lexing, parsing, and byte-code generation.
pub type Result<T> = std::result::Result<T, Error>;
