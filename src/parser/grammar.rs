//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::attribute::{AttributeKind, Priority, Relation};
use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse script source into an AST
pub fn parse(input: &str) -> Result<Script, Vec<crate::ParseError>> {
    let len = input.len();

    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Split (Token, SimpleSpan) into token and span parts
    let token_stream =
        Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    script_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Arguments as written inside `name( ... )`, before the name is known
#[derive(Debug, Clone)]
struct Call {
    name: Spanned<Identifier>,
    arguments: Vec<ConstantExpr>,
}

impl Call {
    fn plain(&self) -> Option<Vec<f64>> {
        self.arguments
            .iter()
            .map(|a| {
                (a.relation == Relation::Equal && a.multiplier == 1.0).then_some(a.constant)
            })
            .collect()
    }

    /// Turn a parsed call into an attribute head, or explain why it is not one.
    fn into_head(self) -> Result<AttributeHead, String> {
        let name = self.name.node.as_str();
        if let Some(kind) = AttributeKind::from_name(name) {
            return match self.arguments.as_slice() {
                [constant] => Ok(AttributeHead::Single {
                    kind,
                    constant: *constant,
                }),
                [] => Ok(AttributeHead::Single {
                    kind,
                    constant: ConstantExpr::default(),
                }),
                _ => Err(format!("'{}' takes a single constant", name)),
            };
        }
        let plain = self.plain();
        match (name, plain.as_deref()) {
            ("size", Some([width, height])) => Ok(AttributeHead::Size {
                width: *width,
                height: *height,
            }),
            ("edges", Some([inset])) => Ok(AttributeHead::Edges(*inset)),
            ("center", Some([offset])) => Ok(AttributeHead::Center(*offset)),
            ("size", _) => Err("'size' takes two plain numbers: size(width, height)".to_string()),
            ("edges", _) => Err("'edges' takes one plain number: edges(inset)".to_string()),
            ("center", _) => Err("'center' takes one plain number: center(offset)".to_string()),
            _ => {
                let known = AttributeKind::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .chain(["size", "edges", "center"]);
                let similar = crate::error::find_similar(known, name, 2);
                if similar.is_empty() {
                    Err(format!("Unknown attribute '{}'", name))
                } else {
                    Err(format!(
                        "Unknown attribute '{}'. Did you mean: {}?",
                        name,
                        similar.join(", ")
                    ))
                }
            }
        }
    }
}

fn script_parser<'a, I>() -> impl Parser<'a, I, Script, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    // Basic token parsers
    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .labelled("identifier")
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let number = select! {
        Token::Number(n) => n,
    };

    let signed = just(Token::Minus)
        .or_not()
        .then(number)
        .map(|(minus, n)| if minus.is_some() { -n } else { n })
        .labelled("number");

    let boolean = choice((just(Token::True).to(true), just(Token::False).to(false)));

    // Constant inside an attribute literal: 20, -4, >= 10, <= 40, * 0.5, * 0.5 + 8
    let constant = choice((
        just(Token::Star)
            .ignore_then(signed.clone())
            .then(just(Token::Plus).ignore_then(signed.clone()).or_not())
            .map(|(multiplier, constant)| ConstantExpr {
                multiplier,
                constant: constant.unwrap_or(0.0),
                ..ConstantExpr::default()
            }),
        just(Token::GreaterOrEqual)
            .ignore_then(signed.clone())
            .map(|constant| ConstantExpr {
                relation: Relation::GreaterOrEqual,
                constant,
                ..ConstantExpr::default()
            }),
        just(Token::LessOrEqual)
            .ignore_then(signed.clone())
            .map(|constant| ConstantExpr {
                relation: Relation::LessOrEqual,
                constant,
                ..ConstantExpr::default()
            }),
        signed.clone().map(|constant| ConstantExpr {
            constant,
            ..ConstantExpr::default()
        }),
    ));

    let head = identifier
        .clone()
        .then(
            constant
                .separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        )
        .map(|(name, arguments)| Call { name, arguments })
        .try_map(|call, span| call.into_head().map_err(|msg| Rich::custom(span, msg)))
        .map_with(|head, e| Spanned::new(head, span_range(&e.span())));

    let kind_name = identifier.clone().try_map(|name, span| {
        AttributeKind::from_name(name.node.as_str())
            .ok_or_else(|| Rich::custom(span, format!("Unknown attribute '{}'", name.node)))
    });

    // .to(view) / .to(view, kind)
    let to_modifier = just(Token::To)
        .ignore_then(
            identifier
                .clone()
                .then(just(Token::Comma).ignore_then(kind_name).or_not())
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        )
        .map(|(view, kind)| Modifier::To { view, kind });

    let priority = choice((
        select! { Token::Number(n) => Priority::Custom(n) },
        identifier.clone().try_map(|name, span| match name.node.as_str() {
            "required" => Ok(Priority::Required),
            "high" => Ok(Priority::High),
            "low" => Ok(Priority::Low),
            other => Err(Rich::custom(
                span,
                format!("Unknown priority '{}': use required, high, low or a number", other),
            )),
        }),
    ));

    // .with(priority) / .when(flag) / .when(!flag)
    let named_modifier = identifier
        .clone()
        .then(
            just(Token::Bang)
                .or_not()
                .then(priority.or_not())
                .then(identifier.clone().or_not())
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        )
        .try_map(|(name, ((bang, priority), flag)), span| {
            match (name.node.as_str(), bang, priority, flag) {
                ("with", None, Some(priority), None) => Ok(Modifier::With(priority)),
                ("when", bang, None, Some(flag)) => Ok(Modifier::When {
                    flag,
                    negated: bang.is_some(),
                }),
                ("with", ..) => Err(Rich::custom(span, "'with' takes one priority")),
                ("when", ..) => Err(Rich::custom(span, "'when' takes one flag name")),
                (other, ..) => Err(Rich::custom(
                    span,
                    format!("Unknown modifier '{}': use to, with or when", other),
                )),
            }
        });

    let modifier = just(Token::Dot)
        .ignore_then(choice((to_modifier, named_modifier)))
        .map_with(|m, e| Spanned::new(m, span_range(&e.span())));

    let attribute = head
        .then(modifier.repeated().collect::<Vec<_>>())
        .map_with(|(head, modifiers), e| {
            Spanned::new(AttributeExpr { head, modifiers }, span_range(&e.span()))
        });

    let attribute_list = choice((
        attribute
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose)),
        attribute.map(|a| vec![a]),
    ));

    // view name [in parent] [width: 400, height: 1000]
    let property = identifier
        .clone()
        .then_ignore(just(Token::Colon))
        .then(signed)
        .map_with(|(key, value), e| Spanned::new(Property { key, value }, span_range(&e.span())));

    let properties = property
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    let view_decl = just(Token::View)
        .ignore_then(identifier.clone())
        .then(just(Token::In).ignore_then(identifier.clone()).or_not())
        .then(properties.or_not())
        .map(|((name, parent), properties)| {
            Statement::View(ViewDecl {
                name,
                parent,
                properties: properties.unwrap_or_default(),
            })
        });

    let attach = just(Token::Attach)
        .ignore_then(identifier.clone())
        .then_ignore(just(Token::To))
        .then(identifier.clone())
        .map(|(view, parent)| Statement::Attach { view, parent });

    let detach = just(Token::Detach)
        .ignore_then(identifier.clone())
        .map(Statement::Detach);

    let remove = just(Token::Remove)
        .ignore_then(identifier.clone())
        .map(Statement::Remove);

    let flag = just(Token::Flag)
        .ignore_then(identifier.clone())
        .then_ignore(just(Token::Equals))
        .then(boolean.clone())
        .map(|(name, value)| Statement::Flag { name, value });

    let set = just(Token::Set)
        .ignore_then(identifier.clone())
        .then_ignore(just(Token::Equals))
        .then(boolean)
        .map(|(name, value)| Statement::Set { name, value });

    let reload = just(Token::Reload)
        .ignore_then(identifier.clone())
        .map(Statement::Reload);

    let clear = just(Token::Clear)
        .ignore_then(identifier.clone())
        .map(Statement::Clear);

    let install = identifier
        .then_ignore(just(Token::Install))
        .then(attribute_list)
        .map(|(view, attributes)| Statement::Install { view, attributes });

    let statement = choice((
        view_decl, attach, detach, remove, flag, set, reload, clear, install,
    ))
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
    .boxed();

    statement
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|statements| Script { statements })
}
