//! Per-feature-group coloring of the displayed part.

use std::collections::{BTreeSet, HashMap};

use shared::{FeatureGroup, Rgb, ShapeId};

use crate::builder::collect_group_shape_ids;
use crate::error::ViewerError;
use crate::scene::{
    BodyHandle, BodyStyle, PartHandle, Scene, SceneNodeHandle, ShapeHandle, ShapeKind,
    ShapeResolver,
};
use crate::tree::FeatureTree;

/// A synthetic body holding the shapes of one kind from one feature group.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorizedBodyEntry {
    pub body: BodyHandle,
    pub ids: Vec<ShapeId>,
    pub color: Rgb,
}

/// Which feature groups are colored on the scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupFilter {
    #[default]
    All,
    Group(String),
}

impl GroupFilter {
    /// Selector entry that shows every group.
    pub const ALL_LABEL: &'static str = "All Features";

    pub fn from_selector(value: &str) -> Self {
        if value == Self::ALL_LABEL {
            GroupFilter::All
        } else {
            GroupFilter::Group(value.to_string())
        }
    }

    pub fn group_name(&self) -> Option<&str> {
        match self {
            GroupFilter::All => None,
            GroupFilter::Group(name) => Some(name),
        }
    }
}

/// Colorized bodies of the active part, keyed by feature group name.
#[derive(Debug, Default)]
pub struct ColorizedBodies {
    groups: Vec<(String, Vec<ColorizedBodyEntry>)>,
    scene_nodes: HashMap<BodyHandle, SceneNodeHandle>,
    ghost: Option<SceneNodeHandle>,
}

impl ColorizedBodies {
    pub fn clear(&mut self) {
        self.groups.clear();
        self.scene_nodes.clear();
        self.ghost = None;
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    pub fn entries(&self, group: &str) -> Option<&[ColorizedBodyEntry]> {
        self.groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Entries of the groups selected by `filter`, in recording order.
    pub fn entries_in_scope(&self, filter: &GroupFilter) -> Vec<&ColorizedBodyEntry> {
        self.groups
            .iter()
            .filter(|(name, _)| filter.group_name().map_or(true, |n| n == name.as_str()))
            .flat_map(|(_, entries)| entries.iter())
            .collect()
    }

    /// Every body whose shape set contains `id`. Overlapping groups yield several.
    pub fn bodies_owning(&self, id: ShapeId) -> Vec<BodyHandle> {
        self.groups
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .filter(|e| e.ids.contains(&id))
            .map(|e| e.body)
            .collect()
    }

    pub fn scene_node(&self, body: BodyHandle) -> Option<SceneNodeHandle> {
        self.scene_nodes.get(&body).copied()
    }

    pub fn ghost_node(&self) -> Option<SceneNodeHandle> {
        self.ghost
    }

    fn record(&mut self, group: &str, entries: Vec<ColorizedBodyEntry>) {
        match self.groups.iter_mut().find(|(name, _)| name == group) {
            Some((_, existing)) => *existing = entries,
            None => self.groups.push((group.to_string(), entries)),
        }
    }

    fn show(&mut self, scene: &mut dyn Scene, entry: &ColorizedBodyEntry) {
        if let Some(node) = scene.add_body(entry.body, BodyStyle::Colored(entry.color)) {
            self.scene_nodes.insert(entry.body, node);
        }
    }
}

/// Color every feature group of a freshly displayed part and ghost the rest.
///
/// Does nothing when the representation is not a BRep.
pub fn colorize_part(
    groups: &[FeatureGroup],
    resolver: &mut dyn ShapeResolver,
    scene: &mut dyn Scene,
    bodies: &mut ColorizedBodies,
) -> Result<(), ViewerError> {
    if !resolver.is_brep() {
        tracing::debug!("representation is not a BRep, skipping colorization");
        return Ok(());
    }

    for group in groups {
        let color = group.rgb();
        let shapes: Vec<ShapeHandle> = collect_group_shape_ids(group)
            .into_iter()
            .filter_map(|id| resolver.shape(id))
            .collect();

        let mut entries = Vec::new();
        for (kind, typed) in split_by_kind(&*resolver, &shapes) {
            let mut ids: Vec<ShapeId> = Vec::with_capacity(typed.len());
            for id in typed.iter().filter_map(|&s| resolver.shape_id(s)) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            match resolver.form_body(&typed) {
                Ok(body) => entries.push(ColorizedBodyEntry { body, ids, color }),
                Err(e) => tracing::warn!("group '{}': skipping {:?} shapes: {}", group.name, kind, e),
            }
        }

        for entry in &entries {
            bodies.show(scene, entry);
        }
        tracing::debug!("colorized group '{}' with {} bodies", group.name, entries.len());
        bodies.record(&group.name, entries);
    }

    let colorized = colorized_ids(bodies.entries_in_scope(&GroupFilter::All));
    bodies.ghost = ghost_remaining(resolver, scene, &colorized)?;
    Ok(())
}

/// Re-display the part with only the groups in `filter` colored.
///
/// The recorded bodies are reused, so switching back to [`GroupFilter::All`]
/// restores the original colors.
pub fn apply_group_filter(
    filter: &GroupFilter,
    part: PartHandle,
    resolver: &mut dyn ShapeResolver,
    scene: &mut dyn Scene,
    bodies: &mut ColorizedBodies,
    tree: &mut FeatureTree,
) -> Result<(), ViewerError> {
    tree.show_only_group(filter.group_name());

    let targets: Vec<ColorizedBodyEntry> =
        bodies.entries_in_scope(filter).into_iter().cloned().collect();

    scene.remove_root_part();
    scene.add_root_part(part);
    bodies.scene_nodes.clear();
    bodies.ghost = None;

    for entry in &targets {
        bodies.show(scene, entry);
    }

    if resolver.is_brep() {
        let colorized = colorized_ids(targets.iter());
        bodies.ghost = ghost_remaining(resolver, scene, &colorized)?;
    }
    Ok(())
}

fn colorized_ids<'a>(entries: impl IntoIterator<Item = &'a ColorizedBodyEntry>) -> BTreeSet<ShapeId> {
    entries
        .into_iter()
        .flat_map(|e| e.ids.iter().copied())
        .collect()
}

/// Group shapes by kind, keeping first-seen kind order.
fn split_by_kind(
    resolver: &dyn ShapeResolver,
    shapes: &[ShapeHandle],
) -> Vec<(ShapeKind, Vec<ShapeHandle>)> {
    let mut out: Vec<(ShapeKind, Vec<ShapeHandle>)> = Vec::new();
    for &shape in shapes {
        let kind = resolver.shape_kind(shape);
        match out.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, typed)) => typed.push(shape),
            None => out.push((kind, vec![shape])),
        }
    }
    out
}

/// Add every non-colorized face as one translucent body.
fn ghost_remaining(
    resolver: &mut dyn ShapeResolver,
    scene: &mut dyn Scene,
    colorized: &BTreeSet<ShapeId>,
) -> Result<Option<SceneNodeHandle>, ViewerError> {
    let faces: Vec<ShapeHandle> = resolver
        .faces()
        .into_iter()
        .filter(|&f| resolver.shape_id(f).map_or(true, |id| !colorized.contains(&id)))
        .collect();
    if faces.is_empty() {
        return Ok(None);
    }

    let body = resolver.form_body(&faces)?;
    let node = scene.add_body(body, BodyStyle::Ghosted);
    scene.update();
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_selector() {
        assert_eq!(GroupFilter::from_selector("All Features"), GroupFilter::All);
        assert_eq!(
            GroupFilter::from_selector("Hole(s)"),
            GroupFilter::Group("Hole(s)".into())
        );
    }

    #[test]
    fn test_bodies_owning_overlap() {
        let mut bodies = ColorizedBodies::default();
        let c = Rgb::WHITE;
        bodies.record(
            "A",
            vec![ColorizedBodyEntry { body: BodyHandle(1), ids: vec![1, 2], color: c }],
        );
        bodies.record(
            "B",
            vec![ColorizedBodyEntry { body: BodyHandle(2), ids: vec![2, 3], color: c }],
        );
        assert_eq!(bodies.bodies_owning(2), vec![BodyHandle(1), BodyHandle(2)]);
        assert_eq!(bodies.bodies_owning(3), vec![BodyHandle(2)]);
        assert!(bodies.bodies_owning(9).is_empty());
    }

    #[test]
    fn test_record_replaces_same_group() {
        let mut bodies = ColorizedBodies::default();
        let entry = |b| ColorizedBodyEntry { body: BodyHandle(b), ids: vec![], color: Rgb::WHITE };
        bodies.record("A", vec![entry(1)]);
        bodies.record("A", vec![entry(2)]);
        assert_eq!(bodies.group_names().count(), 1);
        assert_eq!(bodies.entries("A").unwrap()[0].body, BodyHandle(2));
    }

    #[test]
    fn test_entries_in_scope() {
        let mut bodies = ColorizedBodies::default();
        let entry = |b| ColorizedBodyEntry { body: BodyHandle(b), ids: vec![], color: Rgb::WHITE };
        bodies.record("A", vec![entry(1), entry(2)]);
        bodies.record("B", vec![entry(3)]);
        assert_eq!(bodies.entries_in_scope(&GroupFilter::All).len(), 3);
        let only_b = bodies.entries_in_scope(&GroupFilter::Group("B".into()));
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].body, BodyHandle(3));
    }
}
