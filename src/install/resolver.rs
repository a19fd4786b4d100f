//! Anchor selection and conflict detection
//!
//! For one attribute declared on one view the resolver decides:
//! - which view will hold the native constraint (the anchor),
//! - the conflict key the declaration competes under,
//! - which registered attribute, if any, it replaces,
//! - the constraint request to hand the engine.
//!
//! It reads the hierarchy and the registry but mutates neither.

use crate::attribute::{AnchorCategory, Attribute, LayoutDirection};
use crate::platform::{ConstraintRequest, NativeAttribute, ViewHierarchy, ViewId};

use super::registry::{AttributeRegistry, ConflictKey};

/// Where a declaration ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The native constraint lives on this view
    Resolved(ViewId),
    /// No container to hold it yet; bookkeeping stays with the declaring view
    Unresolved,
}

/// Outcome of resolving one attribute
#[derive(Debug)]
pub struct Resolution {
    pub anchor: Anchor,
    pub key: ConflictKey,
    /// Registry list the attribute belongs to
    pub home: ViewId,
    /// Attribute on `home` with the same key
    pub replaces: Option<Attribute>,
    /// Unresolved declaration of the same family left behind on the declaring view
    pub supersedes: Option<Attribute>,
    /// `None` when the anchor is unresolved
    pub request: Option<ConstraintRequest>,
    /// Condition result sampled during resolution
    pub active: bool,
}

pub struct Resolver<'a, H: ViewHierarchy> {
    hierarchy: &'a H,
    registry: &'a AttributeRegistry,
    direction: LayoutDirection,
}

impl<'a, H: ViewHierarchy> Resolver<'a, H> {
    pub fn new(hierarchy: &'a H, registry: &'a AttributeRegistry, direction: LayoutDirection) -> Self {
        Self {
            hierarchy,
            registry,
            direction,
        }
    }

    pub fn resolve(&self, view: ViewId, attribute: &Attribute) -> Resolution {
        let family = attribute.kind().native(self.direction);
        let target = attribute.target();
        let container = self.hierarchy.container_of(view);

        // Related element, before any hierarchy check.
        let related = match (attribute.kind().category(), target) {
            (_, Some(target)) => Some(target.view),
            (AnchorCategory::Intrinsic, None) => None,
            (AnchorCategory::Relational, None) => container,
        };

        let anchor = match related {
            None if target.is_none() && attribute.kind().category() == AnchorCategory::Intrinsic => {
                Anchor::Resolved(view)
            }
            Some(other) if other == view => Anchor::Resolved(view),
            Some(other) => match container {
                Some(parent) if self.hierarchy.is_within(other, parent) => Anchor::Resolved(parent),
                Some(_) => match self.hierarchy.common_ancestor(view, other) {
                    Some(ancestor) => Anchor::Resolved(ancestor),
                    None => Anchor::Unresolved,
                },
                None => Anchor::Unresolved,
            },
            None => Anchor::Unresolved,
        };

        let related_attribute = related.map(|other| {
            match target.and_then(|t| t.kind) {
                Some(kind) => kind.native(self.direction),
                None if Some(other) == container || other == view => family,
                None => family.opposite(),
            }
        });

        let key = ConflictKey {
            owner: view,
            family,
            anchor: match anchor {
                Anchor::Resolved(anchor) => Some(anchor),
                Anchor::Unresolved => None,
            },
            related,
            related_attribute,
        };

        let home = key.anchor.unwrap_or(view);
        let replaces = self
            .registry
            .find(home, &key)
            .map(|entry| entry.attribute.clone());

        let supersedes = match anchor {
            Anchor::Resolved(anchor) if anchor != view => self
                .registry
                .entries(view)
                .iter()
                .find(|entry| {
                    entry.key.anchor.is_none()
                        && entry.key.owner == view
                        && entry.key.family == family
                })
                .map(|entry| entry.attribute.clone()),
            _ => None,
        };

        let request = match anchor {
            Anchor::Resolved(_) => Some(self.request(view, attribute, family, related.zip(related_attribute))),
            Anchor::Unresolved => None,
        };

        Resolution {
            anchor,
            key,
            home,
            replaces,
            supersedes,
            request,
            active: attribute.is_active(),
        }
    }

    /// Build the native request, applying inset semantics to trailing edges.
    fn request(
        &self,
        view: ViewId,
        attribute: &Attribute,
        family: NativeAttribute,
        second: Option<(ViewId, NativeAttribute)>,
    ) -> ConstraintRequest {
        let (constant, relation) = if family.is_trailing_edge() {
            (-attribute.constant(), attribute.relation().flipped())
        } else {
            (attribute.constant(), attribute.relation())
        };
        ConstraintRequest {
            first: view,
            first_attribute: family,
            relation,
            second,
            multiplier: if second.is_some() {
                attribute.multiplier()
            } else {
                1.0
            },
            constant,
            priority: attribute.priority(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeKind, Relation};
    use crate::install::registry::Entry;

    /// 0 = root, 1 and 2 children of 0, 3 child of 1, 4 detached, 5 another root
    struct Tree;

    impl ViewHierarchy for Tree {
        fn container_of(&self, view: ViewId) -> Option<ViewId> {
            match view.idx() {
                1 | 2 => Some(id(0)),
                3 => Some(id(1)),
                _ => None,
            }
        }

        fn is_alive(&self, view: ViewId) -> bool {
            view.idx() <= 5
        }
    }

    fn id(i: u32) -> ViewId {
        ViewId::new(i, 1)
    }

    fn resolve(view: ViewId, attribute: &Attribute) -> Resolution {
        let registry = AttributeRegistry::new();
        Resolver::new(&Tree, &registry, LayoutDirection::LeftToRight).resolve(view, attribute)
    }

    #[test]
    fn test_size_without_target_anchors_on_self() {
        let resolution = resolve(id(4), &Attribute::width(120.0));
        assert_eq!(resolution.anchor, Anchor::Resolved(id(4)));
        let request = resolution.request.expect("resolved");
        assert_eq!(request.second, None);
        assert_eq!(request.constant, 120.0);
    }

    #[test]
    fn test_position_defaults_to_container() {
        let resolution = resolve(id(1), &Attribute::top(20.0));
        assert_eq!(resolution.anchor, Anchor::Resolved(id(0)));
        assert_eq!(resolution.key.related, Some(id(0)));
        assert_eq!(resolution.key.related_attribute, Some(NativeAttribute::Top));
    }

    #[test]
    fn test_detached_position_is_unresolved() {
        let resolution = resolve(id(4), &Attribute::top(20.0));
        assert_eq!(resolution.anchor, Anchor::Unresolved);
        assert_eq!(resolution.home, id(4));
        assert!(resolution.request.is_none());
    }

    #[test]
    fn test_sibling_relates_to_opposite_edge() {
        let resolution = resolve(id(1), &Attribute::left(10.0).to(id(2)));
        assert_eq!(resolution.anchor, Anchor::Resolved(id(0)));
        let request = resolution.request.expect("resolved");
        assert_eq!(request.second, Some((id(2), NativeAttribute::Right)));
        assert_eq!(request.constant, 10.0);
    }

    #[test]
    fn test_trailing_edge_inverts_constant_and_relation() {
        let attribute = Attribute::right(10.0).at_least();
        let request = resolve(id(1), &attribute).request.expect("resolved");
        assert_eq!(request.first_attribute, NativeAttribute::Right);
        assert_eq!(request.second, Some((id(0), NativeAttribute::Right)));
        assert_eq!(request.constant, -10.0);
        assert_eq!(request.relation, Relation::LessOrEqual);
    }

    #[test]
    fn test_cousin_anchors_on_common_ancestor() {
        let resolution = resolve(id(3), &Attribute::top(0.0).to(id(2)));
        assert_eq!(resolution.anchor, Anchor::Resolved(id(0)));
    }

    #[test]
    fn test_unrelated_tree_is_unresolved() {
        let resolution = resolve(id(1), &Attribute::top(0.0).to(id(5)));
        assert_eq!(resolution.anchor, Anchor::Unresolved);
    }

    #[test]
    fn test_aspect_ratio_on_self() {
        let attribute = Attribute::width(0.0)
            .to_attribute(id(4), AttributeKind::Height)
            .multiplied_by(2.0);
        let resolution = resolve(id(4), &attribute);
        assert_eq!(resolution.anchor, Anchor::Resolved(id(4)));
        let request = resolution.request.expect("resolved");
        assert_eq!(request.second, Some((id(4), NativeAttribute::Height)));
        assert_eq!(request.multiplier, 2.0);
    }

    #[test]
    fn test_finds_conflict_on_anchor_not_on_declaring_view() {
        let mut registry = AttributeRegistry::new();
        let first = Attribute::top(20.0);
        let key = resolve(id(1), &first).key;
        registry.append(id(0), Entry::new(first.clone(), key, true));

        let resolver = Resolver::new(&Tree, &registry, LayoutDirection::LeftToRight);
        let again = resolver.resolve(id(1), &Attribute::top(200.0));
        assert_eq!(again.replaces, Some(first));

        // the sibling declares the same kind on the same container: no conflict
        let sibling = resolver.resolve(id(2), &Attribute::top(200.0));
        assert!(sibling.replaces.is_none());
    }

    #[test]
    fn test_leading_conflicts_with_left() {
        let left = resolve(id(1), &Attribute::left(0.0)).key;
        let leading = resolve(id(1), &Attribute::leading(5.0)).key;
        assert_eq!(left, leading);
    }

    #[test]
    fn test_condition_sampled() {
        let resolution = resolve(id(1), &Attribute::top(0.0).when(|| false));
        assert!(!resolution.active);
        assert!(resolution.request.is_some());
    }
}
