//! Viewer session: the loaded model, the active part and its per-part state.

use shared::{FeatureGroup, FoldState, ProcessData, TreeKind};

use crate::builder::build_tree;
use crate::colorize::{apply_group_filter, colorize_part, ColorizedBodies, GroupFilter};
use crate::error::ViewerError;
use crate::scene::{PartHandle, Scene, SelectionChanged, ShapeResolver};
use crate::selection::{SelectionState, Selector, SyncContext, SyncOutcome};
use crate::tree::{FeatureTree, NodeId};

/// A part found in the loaded model together with its representation.
#[derive(Debug)]
pub struct CollectedPart<R> {
    /// ID matching `partId` in the process data
    pub id: String,
    pub label: String,
    pub part: PartHandle,
    pub representation: R,
}

/// State owned by the active part. Dropped wholesale on part switch.
#[derive(Debug)]
pub struct PartSession {
    part_index: usize,
    /// False when the tree is shown without geometry on the scene.
    displayed: bool,
    tree: FeatureTree,
    selector: Selector,
    bodies: ColorizedBodies,
    filter: GroupFilter,
}

impl PartSession {
    fn new(part_index: usize, displayed: bool, tree: FeatureTree) -> Self {
        Self {
            part_index,
            displayed,
            tree,
            selector: Selector::default(),
            bodies: ColorizedBodies::default(),
            filter: GroupFilter::All,
        }
    }

    pub fn tree(&self) -> &FeatureTree {
        &self.tree
    }

    pub fn selection(&self) -> &SelectionState {
        self.selector.state()
    }

    pub fn bodies(&self) -> &ColorizedBodies {
        &self.bodies
    }

    pub fn filter(&self) -> &GroupFilter {
        &self.filter
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }
}

pub struct Viewer<S, R> {
    scene: S,
    process: ProcessData,
    parts: Vec<CollectedPart<R>>,
    tree_kind: TreeKind,
    fold: FoldState,
    /// Cleared when the requested geometry does not exist (no unfolded model).
    show_geometry: bool,
    session: Option<PartSession>,
}

impl<S: Scene, R: ShapeResolver> Viewer<S, R> {
    pub fn new(scene: S, process: ProcessData, parts: Vec<CollectedPart<R>>) -> Self {
        Self {
            scene,
            process,
            parts,
            tree_kind: TreeKind::default(),
            fold: FoldState::default(),
            show_geometry: true,
            session: None,
        }
    }

    pub fn with_tree_kind(mut self, kind: TreeKind) -> Self {
        self.tree_kind = kind;
        self
    }

    /// Display the first part of the model.
    pub fn load(&mut self) -> Result<(), ViewerError> {
        let label = self.parts.first().ok_or(ViewerError::NoParts)?.label.clone();
        self.select_part(&label)
    }

    pub fn part_labels(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn tree_kind(&self) -> TreeKind {
        self.tree_kind
    }

    pub fn fold_state(&self) -> FoldState {
        self.fold
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn session(&self) -> Option<&PartSession> {
        self.session.as_ref()
    }

    pub fn tree(&self) -> Option<&FeatureTree> {
        self.session.as_ref().map(|s| &s.tree)
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        self.session.as_ref().map(|s| s.selector.state())
    }

    pub fn active_part(&self) -> Option<&CollectedPart<R>> {
        self.session.as_ref().map(|s| &self.parts[s.part_index])
    }

    /// Feature groups offered by the group filter selector.
    pub fn feature_group_names(&self) -> Vec<String> {
        self.active_groups()
            .iter()
            .map(|g| g.name.clone())
            .collect()
    }

    fn active_groups(&self) -> &[FeatureGroup] {
        let Some(part) = self.active_part() else {
            return &[];
        };
        self.process
            .part(&part.id)
            .map(|p| p.feature_groups(self.tree_kind, self.fold))
            .unwrap_or(&[])
    }

    /// Tear down the current part and display the part labelled `label`.
    pub fn select_part(&mut self, label: &str) -> Result<(), ViewerError> {
        self.teardown();

        let index = self
            .parts
            .iter()
            .position(|p| p.label == label)
            .ok_or_else(|| ViewerError::UnknownPart(label.to_string()))?;
        let collected = &mut self.parts[index];

        let Some(part_data) = self.process.part(&collected.id) else {
            let err = ViewerError::MissingPartData(collected.label.clone());
            tracing::error!("{err}");
            return Err(err);
        };

        let tree = build_tree(part_data, &collected.label, self.tree_kind, self.fold);
        let groups = part_data.feature_groups(self.tree_kind, self.fold);
        let mut session = PartSession::new(index, self.show_geometry, tree);

        if !self.show_geometry {
            tracing::info!(
                "showing {:?} tree of part '{}' without geometry",
                self.fold,
                collected.label
            );
            self.session = Some(session);
            return Ok(());
        }

        self.scene.add_root_part(collected.part);
        if let Err(e) = colorize_part(
            groups,
            &mut collected.representation,
            &mut self.scene,
            &mut session.bodies,
        ) {
            tracing::error!("unable to colorize part '{}': {e}", collected.label);
            self.scene.remove_root_part();
            return Err(e);
        }

        tracing::info!(
            "displaying part '{}' ({:?}, {:?}, {} groups)",
            collected.label,
            self.tree_kind,
            self.fold,
            groups.len()
        );
        self.session = Some(session);
        Ok(())
    }

    /// Switch between the features and the DFM tree of the active part.
    pub fn set_tree_kind(&mut self, kind: TreeKind) -> Result<(), ViewerError> {
        self.tree_kind = kind;
        self.reload()
    }

    /// Switch to the other geometry (folded or unfolded) of a sheet-metal model.
    ///
    /// The active part stays selected when the new geometry has a part with
    /// the same label. An empty `parts` means the geometry was not generated:
    /// the current parts are kept for their process data and the tree is
    /// shown over an empty scene.
    pub fn set_fold_state(
        &mut self,
        fold: FoldState,
        parts: Vec<CollectedPart<R>>,
    ) -> Result<(), ViewerError> {
        let active = self.active_part().map(|p| p.label.clone());
        self.teardown();
        self.fold = fold;
        if parts.is_empty() {
            tracing::warn!("no {fold:?} geometry for this model, showing the tree only");
            self.show_geometry = false;
        } else {
            self.parts = parts;
            self.show_geometry = true;
        }

        match active {
            Some(label) if self.parts.iter().any(|p| p.label == label) => self.select_part(&label),
            _ => self.load(),
        }
    }

    /// Color only the groups selected by `filter`.
    pub fn apply_group_filter(&mut self, filter: GroupFilter) -> Result<(), ViewerError> {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("group filter changed without an active part");
            return Ok(());
        };
        if !session.displayed {
            tree_only_filter(session, filter);
            return Ok(());
        }
        let collected = &mut self.parts[session.part_index];
        apply_group_filter(
            &filter,
            collected.part,
            &mut collected.representation,
            &mut self.scene,
            &mut session.bodies,
            &mut session.tree,
        )?;
        // re-adding the part dropped the scene selection
        session.selector.reset();
        session.tree.clear_highlights();
        session.filter = filter;
        Ok(())
    }

    pub fn click_tree_node(&mut self, node: NodeId) -> Result<SyncOutcome, ViewerError> {
        let Some(session) = self.session.as_mut().filter(|s| s.displayed) else {
            return Ok(SyncOutcome::default());
        };
        let resolver = &self.parts[session.part_index].representation;
        let ctx = SyncContext {
            tree: &mut session.tree,
            scene: &mut self.scene,
            bodies: &session.bodies,
        };
        session.selector.on_tree_click(node, resolver, ctx)
    }

    pub fn scene_selection_changed(
        &mut self,
        event: &SelectionChanged,
    ) -> Result<SyncOutcome, ViewerError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(SyncOutcome::default());
        };
        let resolver = &self.parts[session.part_index].representation;
        let ctx = SyncContext {
            tree: &mut session.tree,
            scene: &mut self.scene,
            bodies: &session.bodies,
        };
        session.selector.on_scene_selection_changed(event, resolver, ctx)
    }

    fn reload(&mut self) -> Result<(), ViewerError> {
        let label = match self.active_part() {
            Some(p) => p.label.clone(),
            None => return self.load(),
        };
        self.select_part(&label)
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.selector.reset();
            session.bodies.clear();
            if session.displayed {
                self.scene.remove_root_part();
            }
        }
    }
}

fn tree_only_filter(session: &mut PartSession, filter: GroupFilter) {
    session.tree.show_only_group(filter.group_name());
    session.filter = filter;
}
