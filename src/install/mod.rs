//! Installing attributes onto views
//!
//! [`Installer`] is the entry point: it owns the [`AttributeRegistry`] and the
//! host [`Platform`], runs the [`Resolver`] for each declared attribute and
//! applies the outcome to both. All methods run to completion on the calling
//! thread; the registry is not shared, so two installs can never interleave.
//!
//! # Example
//!
//! ```rust
//! use tether::attribute::Attribute;
//! use tether::install::Installer;
//! use tether::scene::Scene;
//!
//! let mut installer = Installer::new(Scene::new());
//! let root = installer.platform_mut().add_root("root", 400.0, 1000.0);
//! let a = installer.platform_mut().add_view("a", root);
//!
//! installer.install(a, [Attribute::top(20.0).to(root), Attribute::width(120.0)]);
//!
//! assert_eq!(installer.attributes(root).len(), 1);
//! assert_eq!(installer.attributes(a).len(), 1);
//! ```

pub mod registry;
pub mod resolver;

pub use registry::{AttributeRegistry, ConflictKey, Entry};
pub use resolver::{Anchor, Resolution, Resolver};

use crate::attribute::Attribute;
use crate::config::LayoutConfig;
use crate::platform::{Platform, ViewId};

/// Drives resolution and keeps registry and native store in step
pub struct Installer<P: Platform> {
    platform: P,
    registry: AttributeRegistry,
    config: LayoutConfig,
}

impl<P: Platform> Installer<P> {
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, LayoutConfig::default())
    }

    pub fn with_config(platform: P, config: LayoutConfig) -> Self {
        Self {
            platform,
            registry: AttributeRegistry::new(),
            config,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn into_platform(self) -> P {
        self.platform
    }

    /// Attributes registered on `view`, in declaration order.
    ///
    /// These are the attributes whose constraints `view` holds, which for
    /// position attributes means the ones its children declared.
    pub fn attributes(&self, view: ViewId) -> Vec<Attribute> {
        self.entries(view)
            .into_iter()
            .map(|entry| entry.attribute.clone())
            .collect()
    }

    /// Registry entries as `view` currently sees them.
    ///
    /// Entries of destroyed views are hidden. Entries whose anchor no longer
    /// holds their constraint, because the declaring or related element left
    /// it, are listed with their owner as pending a reload.
    pub fn entries(&self, view: ViewId) -> Vec<&Entry> {
        if !self.platform.is_alive(view) {
            return Vec::new();
        }
        let live = |entry: &Entry| !entry.is_stale(|v| self.platform.is_alive(v));
        let held = self
            .registry
            .entries(view)
            .iter()
            .filter(|entry| live(*entry) && !self.is_displaced(view, entry));
        let mut pending: Vec<&Entry> = self
            .registry
            .views()
            .flat_map(|home| {
                self.registry
                    .entries(home)
                    .iter()
                    .filter(move |entry| entry.owner() == view && self.is_displaced(home, entry))
            })
            .filter(|entry| live(*entry))
            .collect();
        pending.sort_by_key(|entry| entry.sequence());
        held.chain(pending).collect()
    }

    /// Install a batch of attributes declared by `view`.
    ///
    /// One attribute failing to resolve never blocks the rest of the batch.
    pub fn install<I>(&mut self, view: ViewId, attributes: I)
    where
        I: IntoIterator,
        I::Item: Into<Attribute>,
    {
        self.prune();
        if !self.platform.is_alive(view) {
            log::warn!("install on dead view {}; ignored", view);
            return;
        }
        for attribute in attributes {
            self.install_one(view, attribute.into());
        }
    }

    /// Re-resolve everything `view` declared, re-evaluating conditions and
    /// anchors. Entries sharing a home keep their relative order.
    pub fn reload(&mut self, view: ViewId) {
        self.prune();
        let declared = self.take_declared(view);
        log::debug!("reloading {} attribute(s) of {}", declared.len(), view);
        for attribute in declared {
            self.install_one(view, attribute);
        }
    }

    /// Remove every attribute `view` declared together with its constraints.
    pub fn clear(&mut self, view: ViewId) {
        self.prune();
        let removed = self.take_declared(view);
        log::debug!("cleared {} attribute(s) of {}", removed.len(), view);
    }

    fn install_one(&mut self, view: ViewId, attribute: Attribute) {
        let resolution = Resolver::new(&self.platform, &self.registry, self.config.direction)
            .resolve(view, &attribute);

        if let Some(stale) = &resolution.supersedes {
            self.registry.remove(view, view, stale);
            log::trace!("{} supersedes unresolved {} on {}", attribute, stale, view);
        }
        if let Some(old) = &resolution.replaces {
            self.deactivate(resolution.home, view, old);
        }

        let installed = self.activate(view, &attribute, &resolution);
        let entry = Entry::new(attribute.clone(), resolution.key, installed);
        match &resolution.replaces {
            Some(old) => {
                self.registry.replace(resolution.home, view, old, entry);
                log::trace!("{} replaces {} on {}", attribute, old, resolution.home);
            }
            None => self.registry.append(resolution.home, entry),
        }
    }

    /// Hand the resolved request to the engine. Returns whether a constraint
    /// is now active.
    fn activate(&mut self, view: ViewId, attribute: &Attribute, resolution: &Resolution) -> bool {
        let Some(mut request) = resolution.request.clone() else {
            log::debug!(
                "{} on {} has no container to anchor on; recorded without a constraint",
                attribute,
                view
            );
            return false;
        };
        if !resolution.active {
            log::trace!("{} on {} skipped: condition is false", attribute, view);
            return false;
        }
        request.priority = self.config.resolve_priority(request.priority);
        let description = request.to_string();
        match self
            .platform
            .add_constraint(resolution.home, request, attribute.clone())
        {
            Ok(handle) => {
                log::trace!("activated {} as {:?}", description, handle);
                true
            }
            Err(e) => {
                log::warn!("{} on {} left inactive: {}", attribute, view, e);
                false
            }
        }
    }

    fn deactivate(&mut self, home: ViewId, owner: ViewId, attribute: &Attribute) {
        if let Some(handle) = self.platform.find_constraint(home, owner, attribute) {
            self.platform.remove_constraint(handle);
        }
    }

    /// Whether `entry` sits on `home` although `home` can no longer hold its
    /// constraint.
    ///
    /// That happens when the owner or the related element moved out from
    /// under `home`, or when the engine dropped a constraint the entry had
    /// installed.
    fn is_displaced(&self, home: ViewId, entry: &Entry) -> bool {
        let owner = entry.owner();
        let outside = |v: ViewId| !self.platform.is_within(v, home);
        let moved = entry.key.anchor.is_some()
            && home != owner
            && (outside(owner) || entry.key.related.is_some_and(outside));
        let orphaned = entry.installed
            && self
                .platform
                .find_constraint(home, owner, &entry.attribute)
                .is_none();
        moved || orphaned
    }

    /// Remove `view`'s declarations from registry and engine, returning them
    /// in declaration order.
    fn take_declared(&mut self, view: ViewId) -> Vec<Attribute> {
        let declared = self.registry.declared_by(view);
        declared
            .into_iter()
            .map(|(home, entry)| {
                self.deactivate(home, view, &entry.attribute);
                self.registry.remove(home, view, &entry.attribute);
                entry.attribute
            })
            .collect()
    }

    /// Drop declarations of destroyed views and send displaced ones back to
    /// their owner as unresolved, where the next reload picks them up.
    fn prune(&mut self) {
        let platform = &self.platform;
        let dropped = self.registry.prune(|view| platform.is_alive(view));
        if dropped > 0 {
            log::debug!("pruned {} attribute(s) of destroyed views", dropped);
        }

        let displaced: Vec<(ViewId, Entry)> = self
            .registry
            .views()
            .flat_map(|home| self.registry.entries(home).iter().map(move |entry| (home, entry)))
            .filter(|(home, entry)| self.is_displaced(*home, entry))
            .map(|(home, entry)| (home, entry.clone()))
            .collect();
        for (home, entry) in displaced {
            let owner = entry.owner();
            self.deactivate(home, owner, &entry.attribute);
            let mut key = Resolver::new(&self.platform, &self.registry, self.config.direction)
                .resolve(owner, &entry.attribute)
                .key;
            key.anchor = None;
            self.registry.rehome(home, &entry.attribute, key);
            log::debug!(
                "{} of {} no longer fits {}; kept unresolved until reload",
                entry.attribute,
                owner,
                home
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::attribute::{AttributeBatch, AttributeKind};
    use crate::scene::Scene;

    /// Constraints on `view` that came from attributes
    fn installed(installer: &Installer<Scene>, view: ViewId) -> usize {
        installer
            .platform()
            .constraints_on(view)
            .iter()
            .filter(|c| !c.foreign)
            .count()
    }

    fn setup() -> (Installer<Scene>, ViewId, ViewId, ViewId) {
        let mut installer = Installer::new(Scene::new());
        let scene = installer.platform_mut();
        let root = scene.add_root("root", 400.0, 1000.0);
        let a = scene.add_view("a", root);
        let b = scene.add_view("b", root);
        (installer, root, a, b)
    }

    #[test]
    fn test_reinstalling_same_attribute_picks_up_new_constant() {
        let (mut installer, root, a, _) = setup();
        let top = Attribute::top(20.0);
        installer.install(a, &top);
        top.set_constant(60.0);
        installer.install(a, &top);

        assert_eq!(installer.attributes(root), vec![top]);
        assert_eq!(installed(&installer, root), 1);
        let y = installer.platform().solve().get(a).map(|f| f.y).unwrap();
        assert!((y - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_reload_reevaluates_conditions() {
        let (mut installer, _, a, _) = setup();
        let wide = Rc::new(Cell::new(false));
        let flag = wide.clone();
        installer.install(a, Attribute::width(300.0).when(move || flag.get()));
        assert_eq!(installed(&installer, a), 0);

        wide.set(true);
        installer.reload(a);
        assert_eq!(installer.attributes(a).len(), 1);
        assert_eq!(installed(&installer, a), 1);
    }

    #[test]
    fn test_reload_after_attach_resolves_anchor() {
        let mut installer = Installer::new(Scene::new());
        let root = installer.platform_mut().add_root("root", 200.0, 200.0);
        let loose = installer.platform_mut().add_detached("loose");

        installer.install(loose, Attribute::top(30.0));
        assert_eq!(installer.attributes(loose).len(), 1);

        installer.platform_mut().attach(loose, root).unwrap();
        installer.reload(loose);
        assert!(installer.attributes(loose).is_empty());
        assert_eq!(installer.attributes(root).len(), 1);
        assert_eq!(installed(&installer, root), 1);
    }

    #[test]
    fn test_resolved_install_supersedes_unresolved_one() {
        let mut installer = Installer::new(Scene::new());
        let root = installer.platform_mut().add_root("root", 200.0, 200.0);
        let loose = installer.platform_mut().add_detached("loose");
        installer.install(loose, Attribute::top(30.0));

        installer.platform_mut().attach(loose, root).unwrap();
        let replacement = Attribute::top(40.0);
        installer.install(loose, &replacement);

        assert!(installer.attributes(loose).is_empty());
        assert_eq!(installer.attributes(root), vec![replacement]);
    }

    #[test]
    fn test_clear_removes_declarations_everywhere() {
        let (mut installer, root, a, b) = setup();
        installer.install(a, [Attribute::top(10.0), Attribute::width(50.0)]);
        installer.install(b, Attribute::top(10.0));

        installer.clear(a);
        assert!(installer.attributes(a).is_empty());
        assert_eq!(installer.attributes(root).len(), 1);
        assert_eq!(installed(&installer, a), 0);
        assert_eq!(installed(&installer, root), 1);
    }

    #[test]
    fn test_batch_condition_shared() {
        let (mut installer, root, a, _) = setup();
        let batch = vec![Attribute::top(0.0), Attribute::left(0.0)];
        batch.when(|| false);
        installer.install(a, &batch);
        assert_eq!(installer.attributes(root).len(), 2);
        assert_eq!(installed(&installer, root), 0);
    }

    #[test]
    fn test_destroyed_view_is_pruned() {
        let (mut installer, root, a, b) = setup();
        installer.install(a, Attribute::top(10.0));
        installer.install(b, Attribute::top(10.0));
        installer.platform_mut().remove_view(a);

        assert_eq!(installer.attributes(root).len(), 1);
        assert!(installer.attributes(a).is_empty());
        installer.install(b, Attribute::width(10.0));
        assert_eq!(installer.registry().len(root), 1);
    }

    #[test]
    fn test_rejected_constraint_stays_registered() {
        let (mut installer, root, a, _) = setup();
        installer.install(
            a,
            [
                Attribute::top(0.0),
                Attribute::top(0.0).to_attribute(root, AttributeKind::Bottom),
            ],
        );
        // both keys differ, so both are kept; the second cannot be satisfied
        assert_eq!(installer.attributes(root).len(), 2);
        assert_eq!(installed(&installer, root), 1);
    }

    #[test]
    fn test_detaching_related_view_hands_sibling_attribute_back() {
        let (mut installer, root, a, b) = setup();
        let below = Attribute::top(4.0).to(a);
        installer.install(b, &below);
        assert_eq!(installer.attributes(root).len(), 1);

        installer.platform_mut().detach(a);
        assert!(installer.attributes(root).is_empty());
        assert_eq!(installer.attributes(b), vec![below.clone()]);
        assert_eq!(installed(&installer, root), 0);

        installer.platform_mut().attach(a, root).unwrap();
        installer.reload(b);
        assert_eq!(installer.attributes(root), vec![below]);
        assert_eq!(installed(&installer, root), 1);
    }

    #[test]
    fn test_install_on_detached_view_replaces_displaced_attribute() {
        let (mut installer, root, a, _) = setup();
        installer.install(a, Attribute::top(10.0));
        installer.platform_mut().detach(a);

        let latest = Attribute::top(30.0);
        installer.install(a, &latest);
        assert_eq!(installer.attributes(a), vec![latest]);
        assert!(installer.registry().entries(root).is_empty());

        installer.platform_mut().attach(a, root).unwrap();
        installer.reload(a);
        let y = installer.platform().solve().get(a).map(|f| f.y).unwrap();
        assert!((y - 30.0).abs() < 0.001, "y = {}", y);
    }

    #[test]
    fn test_reload_keeps_engine_order_across_homes() {
        let (mut installer, root, a, _) = setup();
        installer.install(
            a,
            [Attribute::width(0.0).to(root).multiplied_by(0.5), Attribute::width(50.0)],
        );
        let order: Vec<_> = installer
            .registry()
            .declared_by(a)
            .into_iter()
            .map(|(home, entry)| (home, entry.installed))
            .collect();
        assert_eq!(order, vec![(root, true), (a, false)]);

        installer.reload(a);
        let order: Vec<_> = installer
            .registry()
            .declared_by(a)
            .into_iter()
            .map(|(home, entry)| (home, entry.installed))
            .collect();
        assert_eq!(order, vec![(root, true), (a, false)]);
    }
}
