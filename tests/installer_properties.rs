//! Integration tests for the installer's bookkeeping: which element holds
//! each attribute, how many native constraints are live, and how conflicting
//! declarations replace each other.

use pretty_assertions::assert_eq;
use tether::{Attribute, AttributeBatch, Installer, Priority, Scene, ViewId};

/// Native constraints held by `view` that the installer created.
fn native_count(installer: &Installer<Scene>, view: ViewId) -> usize {
    installer
        .platform()
        .constraints_on(view)
        .iter()
        .filter(|summary| !summary.foreign)
        .count()
}

fn container_with_children() -> (Installer<Scene>, ViewId, ViewId, ViewId) {
    let mut scene = Scene::new();
    let c = scene.add_root("c", 400.0, 1000.0);
    let a = scene.add_view("a", c);
    let b = scene.add_view("b", c);
    (Installer::new(scene), c, a, b)
}

#[test]
fn test_width_on_detached_element_anchors_on_itself() {
    let mut scene = Scene::new();
    let a = scene.add_detached("a");
    let mut installer = Installer::new(scene);

    installer.install(a, Attribute::width(120.0));

    assert_eq!(installer.attributes(a).len(), 1);
    assert_eq!(native_count(&installer, a), 1);
    let summary = &installer.platform().constraints_on(a)[0];
    assert_eq!(summary.description, format!("{}.width = 120", a));
}

#[test]
fn test_top_to_container_is_held_by_container() {
    let (mut installer, c, a, _) = container_with_children();

    installer.install(a, Attribute::top(20.0).to(c));

    assert_eq!(installer.attributes(c).len(), 1);
    assert_eq!(installer.attributes(a).len(), 0);
    assert_eq!(native_count(&installer, c), 1);
    let summary = &installer.platform().constraints_on(c)[4];
    assert_eq!(summary.description, format!("{}.top = {}.top + 20", a, c));
}

#[test]
fn test_reinstall_replaces_and_keeps_counts() {
    let (mut installer, c, a, _) = container_with_children();

    installer.install(a, Attribute::top(20.0).to(c));
    let latest = Attribute::top(200.0).to(c);
    installer.install(a, &latest);

    let registered = installer.attributes(c);
    assert_eq!(registered.len(), 1);
    assert!(registered[0].ptr_eq(&latest));
    assert_eq!(native_count(&installer, c), 1);
    let frame = installer.platform().solve().get(a).unwrap();
    assert!((frame.y - 200.0).abs() < 1e-6, "y = {}", frame.y);
}

#[test]
fn test_many_installs_leave_one_active_attribute_per_key() {
    let (mut installer, c, a, _) = container_with_children();

    let mut last = Attribute::left(0.0);
    for constant in [5.0, 10.0, 15.0, 20.0, 25.0] {
        last = Attribute::left(constant);
        installer.install(a, &last);
    }

    let registered = installer.attributes(c);
    assert_eq!(registered.len(), 1);
    assert!(registered[0].ptr_eq(&last));
    assert_eq!(native_count(&installer, c), 1);
}

#[test]
fn test_siblings_register_on_shared_container() {
    let (mut installer, c, a, b) = container_with_children();

    installer.install(a, [Attribute::top(20.0).to(c), Attribute::width(120.0)]);
    installer.install(b, [Attribute::top(20.0).to(c), Attribute::width(120.0)]);

    assert_eq!(installer.attributes(c).len(), 2);
    assert_eq!(installer.attributes(a).len(), 1);
    assert_eq!(installer.attributes(b).len(), 1);
    assert_eq!(native_count(&installer, c), 2);
}

#[test]
fn test_installs_on_one_element_leave_another_untouched() {
    let (mut installer, _, a, b) = container_with_children();

    let b_width = Attribute::width(80.0);
    installer.install(b, &b_width);
    let before = installer.platform().constraints_on(b);

    installer.install(a, [Attribute::width(10.0), Attribute::height(10.0)]);
    installer.install(a, Attribute::width(30.0));

    let registered = installer.attributes(b);
    assert_eq!(registered.len(), 1);
    assert!(registered[0].ptr_eq(&b_width));
    assert_eq!(installer.platform().constraints_on(b), before);
}

#[test]
fn test_false_condition_is_recorded_without_constraint() {
    let (mut installer, c, a, _) = container_with_children();
    installer.install(a, Attribute::top(0.0));
    let registered = installer.attributes(c).len();
    let constraints = native_count(&installer, c);

    installer.install(a, Attribute::left(10.0).when(|| false));

    assert_eq!(installer.attributes(c).len(), registered + 1);
    assert_eq!(native_count(&installer, c), constraints);
}

#[test]
fn test_replacement_keeps_counts_unchanged() {
    let (mut installer, c, a, _) = container_with_children();
    installer.install(a, [Attribute::top(0.0), Attribute::left(4.0)]);
    let registered = installer.attributes(c).len();
    let constraints = native_count(&installer, c);

    installer.install(a, Attribute::left(8.0));

    assert_eq!(installer.attributes(c).len(), registered);
    assert_eq!(native_count(&installer, c), constraints);
}

#[test]
fn test_replacement_keeps_declaration_position() {
    let (mut installer, c, a, _) = container_with_children();
    let top = Attribute::top(0.0);
    let bottom = Attribute::bottom(0.0);
    installer.install(a, [&top, &Attribute::left(4.0), &bottom]);

    let left = Attribute::left(8.0);
    installer.install(a, &left);

    let registered = installer.attributes(c);
    assert_eq!(registered.len(), 3);
    assert!(registered[0].ptr_eq(&top));
    assert!(registered[1].ptr_eq(&left));
    assert!(registered[2].ptr_eq(&bottom));
}

#[test]
fn test_container_relative_on_detached_element_is_kept_for_later() {
    let mut scene = Scene::new();
    let a = scene.add_detached("a");
    let mut installer = Installer::new(scene);

    installer.install(a, [Attribute::top(20.0), Attribute::width(50.0)]);

    assert_eq!(installer.attributes(a).len(), 2);
    assert_eq!(native_count(&installer, a), 1);
}

#[test]
fn test_reload_after_attach_resolves_pending_attributes() {
    let mut scene = Scene::new();
    let root = scene.add_root("root", 400.0, 400.0);
    let a = scene.add_detached("a");
    let mut installer = Installer::new(scene);

    installer.install(a, Attribute::top(20.0));
    assert_eq!(native_count(&installer, root), 0);

    installer.platform_mut().attach(a, root).unwrap();
    installer.reload(a);

    assert_eq!(installer.attributes(a).len(), 0);
    assert_eq!(installer.attributes(root).len(), 1);
    assert_eq!(native_count(&installer, root), 1);
    let frame = installer.platform().solve().get(a).unwrap();
    assert!((frame.y - 20.0).abs() < 1e-6, "y = {}", frame.y);
}

#[test]
fn test_batch_condition_and_priority_apply_to_every_attribute() {
    let (mut installer, c, a, _) = container_with_children();
    let batch = [Attribute::top(0.0), Attribute::left(0.0), Attribute::width(10.0)];
    batch.when(|| false).with(Priority::Low);

    installer.install(a, &batch);

    assert_eq!(installer.attributes(c).len(), 2);
    assert_eq!(installer.attributes(a).len(), 1);
    assert_eq!(native_count(&installer, c), 0);
    assert_eq!(native_count(&installer, a), 0);
    assert!(batch.iter().all(|attribute| attribute.priority() == Priority::Low));
}

#[test]
fn test_foreign_constraints_are_never_touched() {
    let (mut installer, c, a, _) = container_with_children();
    let foreign_before = installer
        .platform()
        .constraints_on(c)
        .iter()
        .filter(|summary| summary.foreign)
        .count();

    installer.install(a, [Attribute::top(0.0), Attribute::width(10.0)]);
    installer.clear(a);

    let summaries = installer.platform().constraints_on(c);
    assert_eq!(summaries.len(), foreign_before);
    assert!(summaries.iter().all(|summary| summary.foreign));
}

#[test]
fn test_removed_view_drops_its_declarations() {
    let (mut installer, c, a, b) = container_with_children();
    installer.install(a, Attribute::top(0.0));
    installer.install(b, Attribute::top(0.0));

    installer.platform_mut().remove_view(a);

    assert!(installer.attributes(a).is_empty());
    assert_eq!(installer.attributes(c).len(), 1);
    assert_eq!(native_count(&installer, c), 1);
}

#[test]
fn test_shared_handle_is_tracked_per_declaring_view() {
    let (mut installer, c, a, b) = container_with_children();
    let top = Attribute::top(10.0);
    installer.install(b, &top);
    installer.install(a, &top);
    installer.install(a, &top);

    let owners: Vec<_> = installer.entries(c).iter().map(|entry| entry.owner()).collect();
    assert_eq!(owners, vec![b, a]);
    assert_eq!(native_count(&installer, c), 2);

    installer.clear(a);

    let owners: Vec<_> = installer.entries(c).iter().map(|entry| entry.owner()).collect();
    assert_eq!(owners, vec![b]);
    assert_eq!(native_count(&installer, c), 1);
    let frame = installer.platform().solve().get(b).unwrap();
    assert!((frame.y - 10.0).abs() < 1e-6, "y = {}", frame.y);
}

#[test]
fn test_reload_leaves_frames_unchanged() {
    let (mut installer, c, a, _) = container_with_children();
    installer.install(
        a,
        [
            Attribute::width(0.0).to(c).multiplied_by(0.5),
            Attribute::width(50.0),
            Attribute::top(12.0),
        ],
    );
    let before = installer.platform().solve().get(a).unwrap();
    assert!((before.width - 200.0).abs() < 1e-6, "width = {}", before.width);

    installer.reload(a);

    let after = installer.platform().solve().get(a).unwrap();
    assert!((after.width - before.width).abs() < 1e-6, "width = {}", after.width);
    assert!((after.y - before.y).abs() < 1e-6, "y = {}", after.y);
    assert_eq!(installer.attributes(c).len(), 2);
    assert_eq!(installer.attributes(a).len(), 1);
}

#[test]
fn test_detach_and_reattach_without_reload() {
    let (mut installer, c, a, _) = container_with_children();
    installer.install(a, [Attribute::top(10.0), Attribute::width(40.0)]);
    assert_eq!(installer.attributes(c).len(), 1);

    installer.platform_mut().detach(a);
    assert!(installer.attributes(c).is_empty());
    assert_eq!(native_count(&installer, c), 0);
    assert_eq!(installer.attributes(a).len(), 2);

    // the container's constraint is gone, so the entry stays with `a`
    installer.platform_mut().attach(a, c).unwrap();
    assert!(installer.attributes(c).is_empty());
    assert_eq!(native_count(&installer, c), 0);
    assert_eq!(installer.attributes(a).len(), 2);

    installer.reload(a);
    assert_eq!(installer.attributes(c).len(), 1);
    assert_eq!(installer.attributes(a).len(), 1);
    assert_eq!(native_count(&installer, c), 1);
    let frame = installer.platform().solve().get(a).unwrap();
    assert!((frame.y - 10.0).abs() < 1e-6, "y = {}", frame.y);
    assert!((frame.width - 40.0).abs() < 1e-6, "width = {}", frame.width);
}
