//! Attribute kinds and their mapping onto native attributes

use std::fmt;

use serde::Deserialize;

use crate::platform::NativeAttribute;

/// Horizontal writing direction used to resolve leading/trailing edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum LayoutDirection {
    #[default]
    #[serde(rename = "ltr")]
    LeftToRight,
    #[serde(rename = "rtl")]
    RightToLeft,
}

/// Which element an attribute is about when it names no target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorCategory {
    /// Describes the element alone (its own width or height)
    Intrinsic,
    /// Describes the element relative to a neighbour, its container by default
    Relational,
}

/// The geometric property an attribute constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Width,
    Height,
    Left,
    Right,
    Top,
    Bottom,
    Leading,
    Trailing,
    CenterX,
    CenterY,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 10] = [
        Self::Width,
        Self::Height,
        Self::Left,
        Self::Right,
        Self::Top,
        Self::Bottom,
        Self::Leading,
        Self::Trailing,
        Self::CenterX,
        Self::CenterY,
    ];

    pub fn category(self) -> AnchorCategory {
        match self {
            Self::Width | Self::Height => AnchorCategory::Intrinsic,
            _ => AnchorCategory::Relational,
        }
    }

    /// Resolve to the native attribute under the given direction.
    pub fn native(self, direction: LayoutDirection) -> NativeAttribute {
        let rtl = direction == LayoutDirection::RightToLeft;
        match self {
            Self::Width => NativeAttribute::Width,
            Self::Height => NativeAttribute::Height,
            Self::Left => NativeAttribute::Left,
            Self::Right => NativeAttribute::Right,
            Self::Top => NativeAttribute::Top,
            Self::Bottom => NativeAttribute::Bottom,
            Self::Leading if rtl => NativeAttribute::Right,
            Self::Leading => NativeAttribute::Left,
            Self::Trailing if rtl => NativeAttribute::Left,
            Self::Trailing => NativeAttribute::Right,
            Self::CenterX => NativeAttribute::CenterX,
            Self::CenterY => NativeAttribute::CenterY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Leading => "leading",
            Self::Trailing => "trailing",
            Self::CenterX => "center_x",
            Self::CenterY => "center_y",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
