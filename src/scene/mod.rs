//! In-process host: a view tree plus a kasuari-backed constraint store
//!
//! [`Scene`] implements [`Platform`](crate::platform::Platform), so the
//! installer can run against it without any real UI toolkit. Views live in a
//! generational arena; a removed view's slot is recycled with a bumped
//! generation.
//!
//! Roots are pinned at the origin with their declared size through foreign
//! constraints (constraints with no attribute back-reference). Every other
//! variable carries a weak stay toward zero, so an under-constrained view
//! collapses instead of drifting.

pub mod frame;
pub mod solver;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::attribute::{Attribute, Priority, Relation};
use crate::platform::{
    ConstraintEngine, ConstraintRequest, EngineError, NativeAttribute, ViewHierarchy, ViewId,
};

pub use frame::{Frame, Frames, Placement};
use solver::{LayoutProperty, LayoutSolver};

/// Errors raised by tree edits
#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("unknown view {0}")]
    UnknownView(ViewId),

    #[error("cannot attach {view} to {parent}: {parent} lives inside {view}")]
    Cycle { view: ViewId, parent: ViewId },
}

/// Handle to a native constraint held by the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

/// Inspection view of one native constraint
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSummary {
    pub id: ConstraintId,
    pub anchor: ViewId,
    pub description: String,
    /// Created outside the installer (no attribute back-reference)
    pub foreign: bool,
}

struct NativeConstraint {
    anchor: ViewId,
    request: ConstraintRequest,
    origin: Option<Attribute>,
    native: kasuari::Constraint,
}

impl NativeConstraint {
    fn references(&self, view: ViewId) -> bool {
        self.request.first == view || self.request.second.map(|(v, _)| v) == Some(view)
    }
}

struct Node {
    name: String,
    parent: Option<ViewId>,
    children: Vec<ViewId>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    solver: LayoutSolver,
    constraints: BTreeMap<ConstraintId, NativeConstraint>,
    next_constraint: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, name: &str, parent: Option<ViewId>) -> ViewId {
        let node = Node {
            name: name.to_string(),
            parent,
            children: Vec::new(),
        };
        let id = match self.free.pop() {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                slot.generation += 1;
                slot.node = Some(node);
                ViewId::new(idx, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    node: Some(node),
                });
                ViewId::new(self.slots.len() as u32 - 1, 1)
            }
        };
        if let Some(parent) = parent {
            if let Some(node) = self.node_mut(parent) {
                node.children.push(id);
            }
        }
        self.solver.add_stays(id);
        id
    }

    fn node(&self, view: ViewId) -> Option<&Node> {
        self.slots
            .get(view.idx())
            .filter(|slot| slot.generation == view.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, view: ViewId) -> Option<&mut Node> {
        self.slots
            .get_mut(view.idx())
            .filter(|slot| slot.generation == view.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// Add a top-level view pinned at the origin with a fixed size.
    pub fn add_root(&mut self, name: &str, width: f64, height: f64) -> ViewId {
        let root = self.allocate(name, None);
        let pins = [
            (NativeAttribute::Left, 0.0),
            (NativeAttribute::Top, 0.0),
            (NativeAttribute::Width, width),
            (NativeAttribute::Height, height),
        ];
        for (attribute, constant) in pins {
            let request = ConstraintRequest {
                first: root,
                first_attribute: attribute,
                relation: Relation::Equal,
                second: None,
                multiplier: 1.0,
                constant,
                priority: Priority::Required,
            };
            if let Err(e) = self.activate(root, request, None) {
                log::warn!("could not pin root {}: {}", name, e);
            }
        }
        root
    }

    /// Add a view inside `parent`. A dead parent leaves the view detached.
    pub fn add_view(&mut self, name: &str, parent: ViewId) -> ViewId {
        if self.is_alive(parent) {
            self.allocate(name, Some(parent))
        } else {
            log::warn!("parent {} of {} is gone; view left detached", parent, name);
            self.allocate(name, None)
        }
    }

    /// Add a view with no container.
    pub fn add_detached(&mut self, name: &str) -> ViewId {
        self.allocate(name, None)
    }

    /// Move `view` (and its subtree) under `parent`.
    pub fn attach(&mut self, view: ViewId, parent: ViewId) -> Result<(), SceneError> {
        if !self.is_alive(view) {
            return Err(SceneError::UnknownView(view));
        }
        if !self.is_alive(parent) {
            return Err(SceneError::UnknownView(parent));
        }
        if self.is_within(parent, view) {
            return Err(SceneError::Cycle { view, parent });
        }
        self.detach(view);
        if let Some(node) = self.node_mut(view) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(view);
        }
        Ok(())
    }

    /// Take `view` out of its container.
    ///
    /// Constraints held outside the detached subtree that reference it are
    /// dropped; the subtree's own constraints stay.
    pub fn detach(&mut self, view: ViewId) {
        let Some(parent) = self.container_of(view) else {
            return;
        };
        let stale: Vec<ConstraintId> = self
            .constraints
            .iter()
            .filter(|(_, c)| !self.is_within(c.anchor, view))
            .filter(|(_, c)| {
                self.is_within(c.request.first, view)
                    || c.request.second.is_some_and(|(v, _)| self.is_within(v, view))
            })
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.remove_constraint(id);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|child| *child != view);
        }
        if let Some(node) = self.node_mut(view) {
            node.parent = None;
        }
    }

    /// Destroy `view` and its whole subtree together with every constraint
    /// that mentions them.
    pub fn remove_view(&mut self, view: ViewId) {
        if !self.is_alive(view) {
            return;
        }
        self.detach(view);
        let doomed = self.subtree(view);
        let stale: Vec<ConstraintId> = self
            .constraints
            .iter()
            .filter(|(_, c)| doomed.iter().any(|v| c.anchor == *v || c.references(*v)))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.remove_constraint(id);
        }
        for v in doomed {
            self.solver.forget(v);
            if let Some(slot) = self.slots.get_mut(v.idx()) {
                slot.node = None;
            }
            self.free.push(v.idx() as u32);
        }
    }

    /// `view` followed by all of its descendants, depth first.
    pub fn subtree(&self, view: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut stack = vec![view];
        while let Some(v) = stack.pop() {
            if let Some(node) = self.node(v) {
                out.push(v);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    pub fn name(&self, view: ViewId) -> Option<&str> {
        self.node(view).map(|node| node.name.as_str())
    }

    /// First live view with this name.
    pub fn find(&self, name: &str) -> Option<ViewId> {
        self.views().find(|view| self.name(*view) == Some(name))
    }

    pub fn children(&self, view: ViewId) -> &[ViewId] {
        self.node(view)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Live views in arena order.
    pub fn views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.node
                .as_ref()
                .map(|_| ViewId::new(idx as u32, slot.generation))
        })
    }

    /// Native constraints held by `anchor`, in creation order.
    pub fn constraints_on(&self, anchor: ViewId) -> Vec<ConstraintSummary> {
        self.constraints
            .iter()
            .filter(|(_, c)| c.anchor == anchor)
            .map(|(id, c)| ConstraintSummary {
                id: *id,
                anchor,
                description: c.request.to_string(),
                foreign: c.origin.is_none(),
            })
            .collect()
    }

    /// Add a constraint with no attribute back-reference.
    ///
    /// The installer never finds or removes these.
    pub fn add_foreign_constraint(
        &mut self,
        anchor: ViewId,
        request: ConstraintRequest,
    ) -> Result<ConstraintId, EngineError> {
        self.activate(anchor, request, None)
    }

    /// Read the solved frame of every live view.
    pub fn solve(&self) -> Frames {
        let mut frames = Frames::default();
        for view in self.views() {
            let frame = Frame::new(
                self.solver.value(view, LayoutProperty::X),
                self.solver.value(view, LayoutProperty::Y),
                self.solver.value(view, LayoutProperty::Width),
                self.solver.value(view, LayoutProperty::Height),
            );
            frames.push(view, self.name(view).unwrap_or_default(), frame);
        }
        frames
    }

    fn activate(
        &mut self,
        anchor: ViewId,
        request: ConstraintRequest,
        origin: Option<Attribute>,
    ) -> Result<ConstraintId, EngineError> {
        let mentioned = [Some(anchor), Some(request.first), request.second.map(|(v, _)| v)];
        if let Some(dead) = mentioned.into_iter().flatten().find(|v| !self.is_alive(*v)) {
            return Err(EngineError::UnknownView(dead));
        }
        let native = self.solver.build(&request);
        self.solver.add(&native, &request.to_string())?;
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(
            id,
            NativeConstraint {
                anchor,
                request,
                origin,
                native,
            },
        );
        Ok(id)
    }
}

impl ViewHierarchy for Scene {
    fn container_of(&self, view: ViewId) -> Option<ViewId> {
        self.node(view).and_then(|node| node.parent)
    }

    fn is_alive(&self, view: ViewId) -> bool {
        self.node(view).is_some()
    }
}

impl ConstraintEngine for Scene {
    type Handle = ConstraintId;

    fn add_constraint(
        &mut self,
        anchor: ViewId,
        request: ConstraintRequest,
        origin: Attribute,
    ) -> Result<ConstraintId, EngineError> {
        self.activate(anchor, request, Some(origin))
    }

    fn remove_constraint(&mut self, handle: ConstraintId) {
        if let Some(constraint) = self.constraints.remove(&handle) {
            self.solver.remove(&constraint.native);
        }
    }

    fn find_constraint(&self, anchor: ViewId, owner: ViewId, origin: &Attribute) -> Option<ConstraintId> {
        self.constraints
            .iter()
            .find(|(_, c)| {
                c.anchor == anchor
                    && c.request.first == owner
                    && c.origin.as_ref().is_some_and(|o| o.ptr_eq(origin))
            })
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn top_request(first: ViewId, second: ViewId, constant: f64) -> ConstraintRequest {
        ConstraintRequest {
            first,
            first_attribute: NativeAttribute::Top,
            relation: Relation::Equal,
            second: Some((second, NativeAttribute::Top)),
            multiplier: 1.0,
            constant,
            priority: Priority::Required,
        }
    }

    #[test]
    fn test_root_is_pinned() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 400.0, 1000.0);
        let frames = scene.solve();
        assert_eq!(frames.get(root), Some(Frame::new(0.0, 0.0, 400.0, 1000.0)));
        let summaries = scene.constraints_on(root);
        assert_eq!(summaries.len(), 4);
        assert!(summaries.iter().all(|s| s.foreign));
    }

    #[test]
    fn test_tree_queries() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 100.0, 100.0);
        let a = scene.add_view("a", root);
        let b = scene.add_view("b", a);
        assert_eq!(scene.container_of(b), Some(a));
        assert_eq!(scene.children(root), &[a]);
        assert_eq!(scene.find("b"), Some(b));
        assert_eq!(scene.subtree(root), vec![root, a, b]);
        assert_eq!(scene.name(a), Some("a"));
    }

    #[test]
    fn test_removed_slot_is_reused_with_new_generation() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 100.0, 100.0);
        let a = scene.add_view("a", root);
        scene.remove_view(a);
        let b = scene.add_view("b", root);
        assert_eq!(a.idx(), b.idx());
        assert_ne!(a, b);
        assert!(!scene.is_alive(a));
        assert!(scene.is_alive(b));
        assert_eq!(scene.children(root), &[b]);
    }

    #[test]
    fn test_find_constraint_needs_matching_origin() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 100.0, 100.0);
        let a = scene.add_view("a", root);
        let attribute = Attribute::top(10.0);
        let id = scene
            .add_constraint(root, top_request(a, root, 10.0), attribute.clone())
            .unwrap();

        assert_eq!(scene.find_constraint(root, a, &attribute), Some(id));
        assert_eq!(scene.find_constraint(root, a, &Attribute::top(10.0)), None);
        assert_eq!(scene.find_constraint(a, a, &attribute), None);
        assert_eq!(scene.solve().get(a).map(|f| f.y), Some(10.0));
    }

    #[test]
    fn test_detach_drops_outside_constraints_only() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 100.0, 100.0);
        let a = scene.add_view("a", root);
        let inner = scene.add_view("inner", a);
        scene
            .add_constraint(root, top_request(a, root, 10.0), Attribute::top(10.0))
            .unwrap();
        scene
            .add_constraint(a, top_request(inner, a, 5.0), Attribute::top(5.0))
            .unwrap();

        scene.detach(a);
        assert_eq!(scene.container_of(a), None);
        assert_eq!(scene.constraints_on(root).len(), 4);
        assert_eq!(scene.constraints_on(a).len(), 1);
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 100.0, 100.0);
        let a = scene.add_view("a", root);
        let b = scene.add_view("b", a);
        assert_eq!(scene.attach(a, b), Err(SceneError::Cycle { view: a, parent: b }));

        let loose = scene.add_detached("loose");
        scene.attach(loose, b).unwrap();
        assert_eq!(scene.container_of(loose), Some(b));
    }

    #[test]
    fn test_remove_view_drops_referencing_constraints() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 100.0, 100.0);
        let a = scene.add_view("a", root);
        let b = scene.add_view("b", root);
        scene
            .add_constraint(root, top_request(b, a, 0.0), Attribute::top(0.0))
            .unwrap();
        scene.remove_view(a);
        assert_eq!(scene.constraints_on(root).len(), 4);
    }

    #[test]
    fn test_dead_view_is_rejected() {
        let mut scene = Scene::new();
        let root = scene.add_root("root", 100.0, 100.0);
        let a = scene.add_view("a", root);
        scene.remove_view(a);
        let result = scene.add_constraint(root, top_request(a, root, 0.0), Attribute::top(0.0));
        assert!(matches!(result, Err(EngineError::UnknownView(view)) if view == a));
    }
}
