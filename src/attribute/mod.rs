//! Declared layout attributes
//!
//! An [`Attribute`] is one geometric intent ("my top is 20 below my
//! container's top") that the [`Installer`](crate::install::Installer) turns
//! into a native constraint. Attributes are shared handles: the caller, the
//! registry and the native constraint's back-reference all point at the same
//! instance, and "is this the attribute currently installed for that slot" is
//! answered by identity, never by comparing fields.
//!
//! # Example
//!
//! ```rust
//! use tether::attribute::{Attribute, AttributeBatch, Priority};
//!
//! let top = Attribute::top(20.0).with(Priority::High);
//! let pair = [Attribute::width(120.0), Attribute::height(40.0).at_least()];
//! pair.when(|| true);
//!
//! let alias = top.clone();
//! alias.set_constant(44.0);
//! assert_eq!(top.constant(), 44.0);
//! assert!(top.ptr_eq(&alias));
//! ```

mod kind;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub use kind::{AnchorCategory, AttributeKind, LayoutDirection};

use crate::platform::ViewId;

/// Comparison between the two sides of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

impl Relation {
    /// The relation with both sides swapped.
    pub fn flipped(self) -> Self {
        match self {
            Self::Equal => Self::Equal,
            Self::LessOrEqual => Self::GreaterOrEqual,
            Self::GreaterOrEqual => Self::LessOrEqual,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "=",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
        })
    }
}

/// How hard the engine should try to satisfy a constraint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Priority {
    #[default]
    Required,
    High,
    Low,
    /// Explicit value on the 0..=1000 scale; 1000 and above is required
    Custom(f64),
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::High => f.write_str("high"),
            Self::Low => f.write_str("low"),
            Self::Custom(value) => write!(f, "{}", value),
        }
    }
}

/// Predicate evaluated at install time
pub type Condition = Rc<dyn Fn() -> bool>;

/// Explicit related element of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub view: ViewId,
    /// Attribute on `view`; when absent it is derived from the declaring kind
    pub kind: Option<AttributeKind>,
}

struct Inner {
    kind: AttributeKind,
    relation: Cell<Relation>,
    constant: Cell<f64>,
    multiplier: Cell<f64>,
    priority: Cell<Priority>,
    condition: RefCell<Option<Condition>>,
    target: Cell<Option<Target>>,
}

/// Shared handle to one declared attribute
#[derive(Clone)]
pub struct Attribute(Rc<Inner>);

impl Attribute {
    pub fn new(kind: AttributeKind, constant: f64) -> Self {
        Self(Rc::new(Inner {
            kind,
            relation: Cell::new(Relation::Equal),
            constant: Cell::new(constant),
            multiplier: Cell::new(1.0),
            priority: Cell::new(Priority::Required),
            condition: RefCell::new(None),
            target: Cell::new(None),
        }))
    }

    pub fn width(constant: f64) -> Self {
        Self::new(AttributeKind::Width, constant)
    }

    pub fn height(constant: f64) -> Self {
        Self::new(AttributeKind::Height, constant)
    }

    pub fn left(constant: f64) -> Self {
        Self::new(AttributeKind::Left, constant)
    }

    pub fn right(constant: f64) -> Self {
        Self::new(AttributeKind::Right, constant)
    }

    pub fn top(constant: f64) -> Self {
        Self::new(AttributeKind::Top, constant)
    }

    pub fn bottom(constant: f64) -> Self {
        Self::new(AttributeKind::Bottom, constant)
    }

    pub fn leading(constant: f64) -> Self {
        Self::new(AttributeKind::Leading, constant)
    }

    pub fn trailing(constant: f64) -> Self {
        Self::new(AttributeKind::Trailing, constant)
    }

    pub fn center_x(constant: f64) -> Self {
        Self::new(AttributeKind::CenterX, constant)
    }

    pub fn center_y(constant: f64) -> Self {
        Self::new(AttributeKind::CenterY, constant)
    }

    // ---- fluent modifiers: mutate in place, hand back the same handle ----

    /// Relate to `view`, deriving the attribute on `view` from this kind.
    pub fn to(self, view: ViewId) -> Self {
        self.0.target.set(Some(Target { view, kind: None }));
        self
    }

    /// Relate to a specific attribute of `view`.
    pub fn to_attribute(self, view: ViewId, kind: AttributeKind) -> Self {
        self.0.target.set(Some(Target {
            view,
            kind: Some(kind),
        }));
        self
    }

    /// Only install while `condition` returns true.
    pub fn when(self, condition: impl Fn() -> bool + 'static) -> Self {
        self.set_condition(Some(Rc::new(condition)));
        self
    }

    pub fn with(self, priority: Priority) -> Self {
        self.set_priority(priority);
        self
    }

    pub fn at_least(self) -> Self {
        self.0.relation.set(Relation::GreaterOrEqual);
        self
    }

    pub fn at_most(self) -> Self {
        self.0.relation.set(Relation::LessOrEqual);
        self
    }

    pub fn multiplied_by(self, multiplier: f64) -> Self {
        self.0.multiplier.set(multiplier);
        self
    }

    // ---- late mutation through any clone of the handle ----

    pub fn set_constant(&self, constant: f64) {
        self.0.constant.set(constant);
    }

    pub fn set_priority(&self, priority: Priority) {
        self.0.priority.set(priority);
    }

    pub fn set_condition(&self, condition: Option<Condition>) {
        *self.0.condition.borrow_mut() = condition;
    }

    // ---- accessors ----

    pub fn kind(&self) -> AttributeKind {
        self.0.kind
    }

    pub fn relation(&self) -> Relation {
        self.0.relation.get()
    }

    pub fn constant(&self) -> f64 {
        self.0.constant.get()
    }

    pub fn multiplier(&self) -> f64 {
        self.0.multiplier.get()
    }

    pub fn priority(&self) -> Priority {
        self.0.priority.get()
    }

    pub fn target(&self) -> Option<Target> {
        self.0.target.get()
    }

    pub fn condition(&self) -> Option<Condition> {
        self.0.condition.borrow().clone()
    }

    /// Evaluate the condition; attributes without one are always active.
    pub fn is_active(&self) -> bool {
        // Clone out of the cell so the predicate may touch this attribute.
        match self.condition() {
            Some(condition) => condition(),
            None => true,
        }
    }

    /// Handle identity.
    pub fn ptr_eq(&self, other: &Attribute) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Equality is identity: two separately built `width(120)` are different
/// attributes.
impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Attribute {}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind())
            .field("relation", &self.relation())
            .field("constant", &self.constant())
            .field("multiplier", &self.multiplier())
            .field("priority", &self.priority())
            .field("conditional", &self.0.condition.borrow().is_some())
            .field("target", &self.target())
            .finish()
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind())?;
        match self.relation() {
            Relation::Equal => {}
            relation => write!(f, "{} ", relation)?,
        }
        if self.multiplier() != 1.0 {
            write!(f, "* {}", self.multiplier())?;
            if self.constant() != 0.0 {
                write!(f, " + {}", self.constant())?;
            }
        } else {
            write!(f, "{}", self.constant())?;
        }
        write!(f, ")")?;
        if let Some(target) = self.target() {
            match target.kind {
                Some(kind) => write!(f, ".to({}, {})", target.view, kind)?,
                None => write!(f, ".to({})", target.view)?,
            }
        }
        if self.priority() != Priority::Required {
            write!(f, ".with({})", self.priority())?;
        }
        if self.0.condition.borrow().is_some() {
            write!(f, ".when(..)")?;
        }
        Ok(())
    }
}

impl From<&Attribute> for Attribute {
    fn from(attribute: &Attribute) -> Self {
        attribute.clone()
    }
}

/// A single attribute installs like a one-element batch.
impl IntoIterator for Attribute {
    type Item = Attribute;
    type IntoIter = std::iter::Once<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self)
    }
}

impl<'a> IntoIterator for &'a Attribute {
    type Item = &'a Attribute;
    type IntoIter = std::iter::Once<&'a Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self)
    }
}

/// Apply one modifier to every attribute of a batch
pub trait AttributeBatch {
    /// Share one condition across the whole batch.
    fn when(&self, condition: impl Fn() -> bool + 'static) -> &Self;

    fn with(&self, priority: Priority) -> &Self;

    /// Relate every attribute of the batch to `view`.
    fn to(&self, view: ViewId) -> &Self;

    fn to_attribute(&self, view: ViewId, kind: AttributeKind) -> &Self;
}

impl AttributeBatch for [Attribute] {
    fn when(&self, condition: impl Fn() -> bool + 'static) -> &Self {
        let condition: Condition = Rc::new(condition);
        for attribute in self {
            attribute.set_condition(Some(condition.clone()));
        }
        self
    }

    fn with(&self, priority: Priority) -> &Self {
        for attribute in self {
            attribute.set_priority(priority);
        }
        self
    }

    fn to(&self, view: ViewId) -> &Self {
        for attribute in self {
            attribute.0.target.set(Some(Target { view, kind: None }));
        }
        self
    }

    fn to_attribute(&self, view: ViewId, kind: AttributeKind) -> &Self {
        for attribute in self {
            attribute.0.target.set(Some(Target {
                view,
                kind: Some(kind),
            }));
        }
        self
    }
}

/// Width and height in one go.
pub fn size(width: f64, height: f64) -> Vec<Attribute> {
    vec![Attribute::width(width), Attribute::height(height)]
}

/// Inset all four edges from the container by `inset`.
pub fn edges(inset: f64) -> Vec<Attribute> {
    vec![
        Attribute::top(inset),
        Attribute::left(inset),
        Attribute::bottom(inset),
        Attribute::right(inset),
    ]
}

/// Center on both axes, offset by `offset`.
pub fn center(offset: f64) -> Vec<Attribute> {
    vec![Attribute::center_x(offset), Attribute::center_y(offset)]
}
