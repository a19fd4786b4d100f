//! Solved geometry

use std::fmt;

use crate::platform::ViewId;

/// Absolute rectangle of a view, in root coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Round every component to `decimals` places, folding `-0` into `0`.
    pub fn rounded(&self, decimals: usize) -> Self {
        Self::new(
            round(self.x, decimals),
            round(self.y, decimals),
            round(self.width, decimals),
            round(self.height, decimals),
        )
    }
}

fn round(value: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={} y={} w={} h={}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// One solved view
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub view: ViewId,
    pub name: String,
    pub frame: Frame,
}

/// Frames for every live view, in arena order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frames {
    placements: Vec<Placement>,
}

impl Frames {
    pub(crate) fn push(&mut self, view: ViewId, name: &str, frame: Frame) {
        self.placements.push(Placement {
            view,
            name: name.to_string(),
            frame,
        });
    }

    pub fn get(&self, view: ViewId) -> Option<Frame> {
        self.placements
            .iter()
            .find(|placement| placement.view == view)
            .map(|placement| placement.frame)
    }

    pub fn by_name(&self, name: &str) -> Option<Frame> {
        self.placements
            .iter()
            .find(|placement| placement.name == name)
            .map(|placement| placement.frame)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placement> {
        self.placements.iter()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Copy with every frame rounded to `decimals` places
    pub fn rounded(&self, decimals: usize) -> Self {
        Self {
            placements: self
                .placements
                .iter()
                .map(|placement| Placement {
                    frame: placement.frame.rounded(decimals),
                    ..placement.clone()
                })
                .collect(),
        }
    }
}

/// One line per view: `name x=.. y=.. w=.. h=..`
impl fmt::Display for Frames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for placement in &self.placements {
            writeln!(f, "{} {}", placement.name, placement.frame)?;
        }
        Ok(())
    }
}
