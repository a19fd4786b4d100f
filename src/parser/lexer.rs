//! Lexer for the scene script using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Tree keywords
    #[token("view")]
    View,
    #[token("in")]
    In,
    #[token("attach")]
    Attach,
    #[token("to")]
    To,
    #[token("detach")]
    Detach,
    #[token("remove")]
    Remove,

    // Installation keywords
    #[token("reload")]
    Reload,
    #[token("clear")]
    Clear,

    // Flags
    #[token("flag")]
    Flag,
    #[token("set")]
    Set,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Install operator
    #[token("<-")]
    Install,

    // Comparison operators (longer first)
    #[token(">=")]
    GreaterOrEqual,
    #[token("<=")]
    LessOrEqual,
    #[token("=")]
    Equals,

    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("*")]
    Star,
    #[token("!")]
    Bang,

    // Delimiters
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,

    /// Input the lexer could not match; never accepted by the grammar
    Error(String),
}

/// Lex input string into tokens with spans.
///
/// Unrecognised input becomes [`Token::Error`] so the parser reports it at
/// the right place instead of silently skipping it.
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    let mut lexer = Token::lexer(input);
    std::iter::from_fn(move || {
        let token = lexer.next()?;
        let span = lexer.span();
        Some(match token {
            Ok(token) => (token, span),
            Err(()) => (Token::Error(lexer.slice().to_string()), span),
        })
    })
}
