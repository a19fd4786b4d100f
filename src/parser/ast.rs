//! Abstract Syntax Tree types for the scene script

use crate::attribute::{AttributeKind, Priority, Relation};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete script
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub statements: Vec<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `view name [in parent] [key: value, ...]`
    View(ViewDecl),
    /// `attach view to parent`
    Attach {
        view: Spanned<Identifier>,
        parent: Spanned<Identifier>,
    },
    /// `detach view`
    Detach(Spanned<Identifier>),
    /// `remove view`
    Remove(Spanned<Identifier>),
    /// `flag name = bool`
    Flag {
        name: Spanned<Identifier>,
        value: bool,
    },
    /// `set name = bool`
    Set {
        name: Spanned<Identifier>,
        value: bool,
    },
    /// `view <- attribute` or `view <- [attribute, ...]`
    Install {
        view: Spanned<Identifier>,
        attributes: Vec<Spanned<AttributeExpr>>,
    },
    /// `reload view`
    Reload(Spanned<Identifier>),
    /// `clear view`
    Clear(Spanned<Identifier>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewDecl {
    pub name: Spanned<Identifier>,
    pub parent: Option<Spanned<Identifier>>,
    pub properties: Vec<Spanned<Property>>,
}

/// `key: number` inside a view declaration's brackets
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: Spanned<Identifier>,
    pub value: f64,
}

/// An attribute literal with its chained modifiers
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeExpr {
    pub head: Spanned<AttributeHead>,
    pub modifiers: Vec<Spanned<Modifier>>,
}

/// What the literal expands to before modifiers apply
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeHead {
    /// `top(20)`, `height(<= 40)`, `width(* 0.5)`
    Single {
        kind: AttributeKind,
        constant: ConstantExpr,
    },
    /// `size(w, h)`
    Size { width: f64, height: f64 },
    /// `edges(inset)`
    Edges(f64),
    /// `center(offset)`
    Center(f64),
}

/// The parenthesised part of a single attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantExpr {
    pub relation: Relation,
    pub constant: f64,
    pub multiplier: f64,
}

impl Default for ConstantExpr {
    fn default() -> Self {
        Self {
            relation: Relation::Equal,
            constant: 0.0,
            multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// `.to(view)` / `.to(view, kind)`
    To {
        view: Spanned<Identifier>,
        kind: Option<AttributeKind>,
    },
    /// `.with(high)` / `.with(300)`
    With(Priority),
    /// `.when(flag)` / `.when(!flag)`
    When {
        flag: Spanned<Identifier>,
        negated: bool,
    },
}
