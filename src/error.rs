//! Error types for parsing, plus diagnostics shared with script execution

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Syntax { span, .. } => span.clone(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let label = if expected.is_empty() {
                    message.clone()
                } else {
                    format!("{}\nExpected: {}", message, expected.join(", "))
                };
                report(source, filename, span.clone(), message, &label)
            }
        }
    }
}

/// Render one labelled diagnostic with ariadne.
pub(crate) fn report(source: &str, filename: &str, span: Span, message: &str, label: &str) -> String {
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);
    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{}: {}", filename, message),
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) if is_keyword(tok) => format!(
                    "Cannot use {} as a name - it is a reserved keyword",
                    format_token(tok)
                ),
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "Unexpected end of input".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let mut expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();
        expected.sort();
        expected.dedup();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

fn is_keyword(tok: &Token) -> bool {
    matches!(
        tok,
        Token::View
            | Token::In
            | Token::Attach
            | Token::To
            | Token::Detach
            | Token::Remove
            | Token::Reload
            | Token::Clear
            | Token::Flag
            | Token::Set
            | Token::True
            | Token::False
    )
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Number(n) => format!("number {}", n),
        Token::Error(s) => format!("invalid input '{}'", s),
        Token::View => "keyword 'view'".to_string(),
        Token::In => "keyword 'in'".to_string(),
        Token::Attach => "keyword 'attach'".to_string(),
        Token::To => "keyword 'to'".to_string(),
        Token::Detach => "keyword 'detach'".to_string(),
        Token::Remove => "keyword 'remove'".to_string(),
        Token::Reload => "keyword 'reload'".to_string(),
        Token::Clear => "keyword 'clear'".to_string(),
        Token::Flag => "keyword 'flag'".to_string(),
        Token::Set => "keyword 'set'".to_string(),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Install => "'<-'".to_string(),
        Token::GreaterOrEqual => "'>='".to_string(),
        Token::LessOrEqual => "'<='".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::LineComment | Token::BlockComment => "comment".to_string(),
    }
}

/// Compute Levenshtein edit distance between two strings
pub(crate) fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = Vec::with_capacity(b_chars.len() + 1);
        current.push(i + 1);
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            let value = (previous[j] + cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
            current.push(value);
        }
        previous = current;
    }
    previous[b_chars.len()]
}

/// Find similar names within a maximum edit distance, closest first
pub(crate) fn find_similar<'a>(
    defined: impl IntoIterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = defined
        .into_iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist <= max_distance && dist > 0).then_some((dist, name))
        })
        .collect();
    candidates.sort();
    candidates.dedup();
    candidates
        .into_iter()
        .map(|(_, name)| name.to_string())
        .take(3)
        .collect()
}
