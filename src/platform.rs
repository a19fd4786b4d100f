//! Collaborator interfaces for the host view system
//!
//! The installer never solves geometry and never walks a view tree on its own.
//! It talks to the host through two capabilities: a [`ViewHierarchy`] that
//! answers "who contains this view", and a [`ConstraintEngine`] that accepts
//! and drops native constraints. A host implements both and gets [`Platform`]
//! for free. [`crate::scene::Scene`] is the in-process implementation backed by
//! the kasuari solver.

use std::fmt;

use thiserror::Error;

use crate::attribute::{Priority, Relation};

/// Identifier for a view owned by a platform.
///
/// A slot index plus a generation counter. Removing a view frees its slot; a
/// later view reusing the slot gets a higher generation, so a stale `ViewId`
/// never aliases a live view.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u32, u32);

impl ViewId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.0, self.1)
    }
}

/// Geometric property understood by the native engine.
///
/// Leading/trailing have already been resolved to left/right by the time an
/// attribute reaches this level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeAttribute {
    Left,
    Right,
    Top,
    Bottom,
    Width,
    Height,
    CenterX,
    CenterY,
}

impl NativeAttribute {
    /// The facing edge on a neighbouring element.
    ///
    /// Centers and dimensions face themselves.
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            other => other,
        }
    }

    /// Whether a positive constant moves this edge inward.
    pub fn is_trailing_edge(self) -> bool {
        matches!(self, Self::Right | Self::Bottom)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Width => "width",
            Self::Height => "height",
            Self::CenterX => "center_x",
            Self::CenterY => "center_y",
        }
    }
}

impl fmt::Display for NativeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved constraint ready for the native engine:
/// `first.attribute RELATION second.attribute * multiplier + constant`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRequest {
    pub first: ViewId,
    pub first_attribute: NativeAttribute,
    pub relation: Relation,
    /// `None` for pure size constraints against a constant.
    pub second: Option<(ViewId, NativeAttribute)>,
    pub multiplier: f64,
    pub constant: f64,
    pub priority: Priority,
}

impl fmt::Display for ConstraintRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {} ", self.first, self.first_attribute, self.relation)?;
        match self.second {
            Some((view, attribute)) => {
                write!(f, "{}.{}", view, attribute)?;
                if self.multiplier != 1.0 {
                    write!(f, " * {}", self.multiplier)?;
                }
                if self.constant != 0.0 {
                    write!(f, " + {}", self.constant)?;
                }
            }
            None => write!(f, "{}", self.constant)?,
        }
        if self.priority != Priority::Required {
            write!(f, " @ {}", self.priority)?;
        }
        Ok(())
    }
}

/// Errors a native engine may raise when asked to activate a constraint
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine refused the constraint (for example it contradicts other
    /// required constraints)
    #[error("constraint rejected: {description} ({reason})")]
    Rejected { description: String, reason: String },

    /// A view referenced by the request does not exist
    #[error("unknown view {0}")]
    UnknownView(ViewId),
}

/// Structural queries over the host view tree
pub trait ViewHierarchy {
    /// The immediate container of `view`, or `None` for roots and detached views.
    fn container_of(&self, view: ViewId) -> Option<ViewId>;

    /// Whether `view` still refers to a live view.
    fn is_alive(&self, view: ViewId) -> bool;

    /// Whether `view` is `ancestor` or lives somewhere below it.
    fn is_within(&self, view: ViewId, ancestor: ViewId) -> bool {
        let mut current = Some(view);
        while let Some(v) = current {
            if v == ancestor {
                return true;
            }
            current = self.container_of(v);
        }
        false
    }

    /// Closest view that contains (or is) both `a` and `b`.
    fn common_ancestor(&self, a: ViewId, b: ViewId) -> Option<ViewId> {
        let mut current = Some(a);
        while let Some(v) = current {
            if self.is_within(b, v) {
                return Some(v);
            }
            current = self.container_of(v);
        }
        None
    }
}

/// The native constraint store
///
/// Every constraint added through [`ConstraintEngine::add_constraint`] carries
/// a back-reference to the attribute that produced it. Constraints created any
/// other way are foreign; the installer never finds or removes them.
pub trait ConstraintEngine {
    /// Opaque handle to an active constraint
    type Handle: Copy + fmt::Debug;

    /// Create and activate a constraint anchored on `anchor`.
    fn add_constraint(
        &mut self,
        anchor: ViewId,
        request: ConstraintRequest,
        origin: crate::attribute::Attribute,
    ) -> Result<Self::Handle, EngineError>;

    /// Deactivate and drop a constraint. Unknown handles are ignored.
    fn remove_constraint(&mut self, handle: Self::Handle);

    /// Locate the active constraint on `anchor` that `owner` created from `origin`.
    fn find_constraint(
        &self,
        anchor: ViewId,
        owner: ViewId,
        origin: &crate::attribute::Attribute,
    ) -> Option<Self::Handle>;
}

/// A complete host: hierarchy plus constraint store.
pub trait Platform: ViewHierarchy + ConstraintEngine {}

impl<T: ViewHierarchy + ConstraintEngine> Platform for T {}
