//! Keeps the feature-tree highlight and the scene selection in sync.
//!
//! Both directions are turned into a [`SelectionCommand`] and applied by the
//! same [`Selector`], which is the only writer of [`SelectionState`]. After a
//! tree click the state holds exactly the shapes the scene was asked to select.
//! Programmatic scene selections are issued with [`Dispatch::Suppress`] so the
//! scene never echoes a tree click back as a selection-changed event.

use std::collections::BTreeSet;

use shared::ShapeId;

use crate::colorize::ColorizedBodies;
use crate::error::ViewerError;
use crate::scene::{
    Dispatch, Scene, SelectedShapeCollector, SelectionChanged, SelectionItem, ShapeHandle,
    ShapeResolver,
};
use crate::tree::{parse_shape_tag, FeatureTree, NodeId, ScrollTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Selected,
}

/// Shape IDs currently selected on the active part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    ids: BTreeSet<ShapeId>,
}

impl SelectionState {
    pub fn phase(&self) -> SelectionPhase {
        if self.ids.is_empty() {
            SelectionPhase::Idle
        } else {
            SelectionPhase::Selected
        }
    }

    pub fn ids(&self) -> &BTreeSet<ShapeId> {
        &self.ids
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn clear(&mut self) {
        self.ids.clear();
    }
}

/// A request to change the selection, from either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    /// The scene reported shapes (de)selected by the user.
    SceneDelta {
        added: Vec<ShapeId>,
        removed: Vec<ShapeId>,
    },
    /// A tree node was clicked; its resolved shapes become the selection.
    TreeClick {
        node: NodeId,
        shapes: Vec<(ShapeId, ShapeHandle)>,
    },
}

/// What the tree panel has to do after a command was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub highlighted: Vec<NodeId>,
    pub scroll: Option<ScrollTarget>,
    /// Programmatic selections issued on the scene.
    pub scene_selections: usize,
}

/// Everything a command may touch besides the selection state itself.
pub struct SyncContext<'a> {
    pub tree: &'a mut FeatureTree,
    pub scene: &'a mut dyn Scene,
    pub bodies: &'a ColorizedBodies,
}

#[derive(Debug, Default)]
pub struct Selector {
    state: SelectionState,
}

impl Selector {
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }

    /// Scene -> tree.
    pub fn on_scene_selection_changed(
        &mut self,
        event: &SelectionChanged,
        resolver: &dyn ShapeResolver,
        ctx: SyncContext<'_>,
    ) -> Result<SyncOutcome, ViewerError> {
        ensure_brep(resolver)?;
        let removed = resolve_items(&event.removed, resolver)?;
        let added = resolve_items(&event.added, resolver)?;
        Ok(self.submit(SelectionCommand::SceneDelta { added, removed }, ctx))
    }

    /// Tree -> scene.
    pub fn on_tree_click(
        &mut self,
        node: NodeId,
        resolver: &dyn ShapeResolver,
        ctx: SyncContext<'_>,
    ) -> Result<SyncOutcome, ViewerError> {
        ensure_brep(resolver)?;
        let Some(tag) = ctx.tree.node(node).and_then(|n| n.shape_tag()) else {
            tracing::debug!("click on untagged tree node {node}");
            return Ok(SyncOutcome::default());
        };

        let ids = parse_shape_tag(&tag);
        let mut shapes = Vec::with_capacity(ids.len());
        for id in ids {
            match resolver.shape(id) {
                Some(shape) => shapes.push((id, shape)),
                // stale IDs are dropped; process data and geometry may disagree
                None => tracing::debug!("shape {id} of node {node} not in representation"),
            }
        }
        if shapes.is_empty() {
            return Ok(SyncOutcome::default());
        }
        Ok(self.submit(SelectionCommand::TreeClick { node, shapes }, ctx))
    }

    /// Apply one command. Every selection change goes through here.
    pub fn submit(&mut self, command: SelectionCommand, mut ctx: SyncContext<'_>) -> SyncOutcome {
        match command {
            SelectionCommand::SceneDelta { added, removed } => {
                for id in &removed {
                    self.state.ids.remove(id);
                }
                self.state.ids.extend(added);
                self.highlight_selected(ctx.tree)
            }
            SelectionCommand::TreeClick { node, shapes } => {
                ctx.scene.deselect_all(Dispatch::Suppress);
                ctx.tree.clear_highlights();
                self.state.clear();

                let mut issued = 0;
                for (id, shape) in &shapes {
                    for body in ctx.bodies.bodies_owning(*id) {
                        let Some(scene_node) = ctx.bodies.scene_node(body) else {
                            continue;
                        };
                        ctx.scene
                            .select(SelectionItem::shape(scene_node, *shape), Dispatch::Suppress);
                        self.state.ids.insert(*id);
                        issued += 1;
                    }
                }

                // shapes of filtered-out groups are not on the scene
                if self.state.is_empty() {
                    tracing::debug!("no displayed body holds the shapes of node {node}");
                    return SyncOutcome::default();
                }
                ctx.tree.highlight(node);
                SyncOutcome {
                    highlighted: vec![node],
                    scroll: None,
                    scene_selections: issued,
                }
            }
        }
    }

    fn highlight_selected(&self, tree: &mut FeatureTree) -> SyncOutcome {
        tree.clear_highlights();
        for &id in &self.state.ids {
            for node in tree.nodes_tagged_with(id) {
                tree.highlight(node);
                tree.expand_ancestors(node);
            }
        }
        let highlighted = tree.highlighted();
        let scroll = highlighted.first().and_then(|&n| tree.scroll_target(n));
        SyncOutcome {
            highlighted,
            scroll,
            scene_selections: 0,
        }
    }
}

fn ensure_brep(resolver: &dyn ShapeResolver) -> Result<(), ViewerError> {
    if resolver.is_brep() {
        Ok(())
    } else {
        tracing::error!("{}", ViewerError::NotBrep);
        Err(ViewerError::NotBrep)
    }
}

fn resolve_items(
    items: &[SelectionItem],
    resolver: &dyn ShapeResolver,
) -> Result<Vec<ShapeId>, ViewerError> {
    let mut ids = Vec::new();
    for item in items {
        let mut collector = SelectedShapeCollector::default();
        for entity in &item.entities {
            entity.accept(&mut collector)?;
        }
        for shape in collector.into_shapes() {
            match resolver.shape_id(shape) {
                Some(id) => ids.push(id),
                None => tracing::warn!("selected shape {:?} has no ID in the representation", shape),
            }
        }
    }
    Ok(ids)
}
