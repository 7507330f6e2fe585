//! Headless stand-ins for the 3D toolkit.
//!
//! [`MockScene`] records every call so tests can assert on what the viewer
//! asked the scene to do. [`MockRepresentation`] maps shape ID `n` to
//! `ShapeHandle(n + 1000)`.

use std::collections::BTreeMap;

use shared::{ProcessData, ShapeId};

use crate::error::ViewerError;
use crate::scene::{
    BodyHandle, BodyStyle, Dispatch, PartHandle, Scene, SceneEntity, SceneNodeHandle,
    SelectionChanged, SelectionItem, ShapeHandle, ShapeKind, ShapeResolver,
};
use crate::session::{CollectedPart, Viewer};

const HANDLE_OFFSET: u64 = 1000;

pub fn handle_of(id: ShapeId) -> ShapeHandle {
    ShapeHandle(u64::from(id) + HANDLE_OFFSET)
}

// ── Representation ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MockRepresentation {
    brep: bool,
    shapes: BTreeMap<ShapeId, ShapeKind>,
    next_body: u64,
    /// Shapes of every body formed so far, in formation order.
    pub formed: Vec<Vec<ShapeHandle>>,
    /// Makes `form_body` fail, as the toolkit does for mixed or empty input.
    pub fail_form_body: bool,
}

impl MockRepresentation {
    pub fn brep() -> Self {
        Self {
            brep: true,
            next_body: 1,
            ..Default::default()
        }
    }

    /// A tessellated representation: no shape-level access.
    pub fn mesh() -> Self {
        Self {
            brep: false,
            next_body: 1,
            ..Default::default()
        }
    }

    pub fn with_shapes(mut self, ids: impl IntoIterator<Item = ShapeId>, kind: ShapeKind) -> Self {
        for id in ids {
            self.shapes.insert(id, kind);
        }
        self
    }

    pub fn formed_ids(&self, body: BodyHandle) -> Vec<ShapeId> {
        let index = (body.0 as usize).wrapping_sub(1);
        self.formed
            .get(index)
            .map(|shapes| shapes.iter().filter_map(|&s| self.shape_id(s)).collect())
            .unwrap_or_default()
    }
}

impl ShapeResolver for MockRepresentation {
    fn is_brep(&self) -> bool {
        self.brep
    }

    fn shape(&self, id: ShapeId) -> Option<ShapeHandle> {
        if self.brep && self.shapes.contains_key(&id) {
            Some(handle_of(id))
        } else {
            None
        }
    }

    fn shape_id(&self, shape: ShapeHandle) -> Option<ShapeId> {
        let id = ShapeId::try_from(shape.0.checked_sub(HANDLE_OFFSET)?).ok()?;
        self.shapes.contains_key(&id).then_some(id)
    }

    fn shape_kind(&self, shape: ShapeHandle) -> ShapeKind {
        self.shape_id(shape)
            .and_then(|id| self.shapes.get(&id).copied())
            .unwrap_or(ShapeKind::Other)
    }

    fn faces(&self) -> Vec<ShapeHandle> {
        if !self.brep {
            return Vec::new();
        }
        self.shapes
            .iter()
            .filter(|(_, kind)| **kind == ShapeKind::Face)
            .map(|(&id, _)| handle_of(id))
            .collect()
    }

    fn form_body(&mut self, shapes: &[ShapeHandle]) -> Result<BodyHandle, ViewerError> {
        if self.fail_form_body {
            return Err(ViewerError::BodyFormation("rejected by toolkit".into()));
        }
        if shapes.is_empty() {
            return Err(ViewerError::BodyFormation("no shapes".into()));
        }
        let kind = self.shape_kind(shapes[0]);
        if shapes.iter().any(|&s| self.shape_kind(s) != kind) {
            return Err(ViewerError::BodyFormation("mixed shape kinds".into()));
        }
        let body = BodyHandle(self.next_body);
        self.next_body += 1;
        self.formed.push(shapes.to_vec());
        Ok(body)
    }
}

// ── Scene ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SceneCall {
    DeselectAll(Dispatch),
    Select(SelectionItem, Dispatch),
    RemoveRootPart,
    AddRootPart(PartHandle),
    AddBody(BodyHandle, BodyStyle),
    Update,
}

#[derive(Debug, Default)]
pub struct MockScene {
    pub calls: Vec<SceneCall>,
    pub root: Option<PartHandle>,
    /// Bodies under the root part with their style and scene node.
    pub bodies: Vec<(BodyHandle, BodyStyle, SceneNodeHandle)>,
    pub selected: Vec<SelectionItem>,
    /// Selection-changed events the scene would have dispatched.
    pub notifications: Vec<SelectionChanged>,
    next_node: u64,
}

impl MockScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_of(&self, body: BodyHandle) -> Option<SceneNodeHandle> {
        self.bodies.iter().find(|(b, _, _)| *b == body).map(|(_, _, n)| *n)
    }

    pub fn style_of(&self, body: BodyHandle) -> Option<BodyStyle> {
        self.bodies.iter().find(|(b, _, _)| *b == body).map(|(_, s, _)| *s)
    }

    pub fn colored_bodies(&self) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, s, _)| matches!(s, BodyStyle::Colored(_)))
            .map(|(b, _, _)| *b)
            .collect()
    }

    pub fn ghosted_bodies(&self) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, s, _)| *s == BodyStyle::Ghosted)
            .map(|(b, _, _)| *b)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&SceneCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Simulate the user picking shape `id` on the body shown under `node`.
    pub fn user_pick(&mut self, node: SceneNodeHandle, id: ShapeId) -> SelectionChanged {
        let item = SelectionItem::shape(node, handle_of(id));
        self.selected.push(item.clone());
        let event = SelectionChanged {
            added: vec![item],
            removed: Vec::new(),
        };
        self.notifications.push(event.clone());
        event
    }

    /// Simulate the user clearing the selection.
    pub fn user_clear(&mut self) -> SelectionChanged {
        let event = SelectionChanged {
            added: Vec::new(),
            removed: std::mem::take(&mut self.selected),
        };
        self.notifications.push(event.clone());
        event
    }

    pub fn selected_shapes(&self) -> Vec<ShapeHandle> {
        self.selected
            .iter()
            .flat_map(|item| item.entities.iter())
            .filter_map(|e| match e {
                SceneEntity::Shape(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl Scene for MockScene {
    fn deselect_all(&mut self, dispatch: Dispatch) {
        self.calls.push(SceneCall::DeselectAll(dispatch));
        let removed = std::mem::take(&mut self.selected);
        if dispatch == Dispatch::Notify && !removed.is_empty() {
            self.notifications.push(SelectionChanged {
                added: Vec::new(),
                removed,
            });
        }
    }

    fn select(&mut self, item: SelectionItem, dispatch: Dispatch) {
        self.calls.push(SceneCall::Select(item.clone(), dispatch));
        self.selected.push(item.clone());
        if dispatch == Dispatch::Notify {
            self.notifications.push(SelectionChanged {
                added: vec![item],
                removed: Vec::new(),
            });
        }
    }

    fn remove_root_part(&mut self) {
        self.calls.push(SceneCall::RemoveRootPart);
        self.root = None;
        self.bodies.clear();
        self.selected.clear();
    }

    fn add_root_part(&mut self, part: PartHandle) {
        self.calls.push(SceneCall::AddRootPart(part));
        self.root = Some(part);
    }

    fn add_body(&mut self, body: BodyHandle, style: BodyStyle) -> Option<SceneNodeHandle> {
        self.calls.push(SceneCall::AddBody(body, style));
        self.root?;
        self.next_node += 1;
        let node = SceneNodeHandle(self.next_node);
        self.bodies.push((body, style, node));
        Some(node)
    }

    fn update(&mut self) {
        self.calls.push(SceneCall::Update);
    }
}

// ── Viewer ──────────────────────────────────────────────────────

pub type TestViewer = Viewer<MockScene, MockRepresentation>;

/// Viewer over a mock scene, with the first part already displayed.
pub fn viewer_from_json(
    json: &str,
    parts: Vec<CollectedPart<MockRepresentation>>,
) -> Result<TestViewer, String> {
    let process: ProcessData = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let mut viewer = Viewer::new(MockScene::new(), process, parts);
    viewer.load().map_err(|e| e.to_string())?;
    Ok(viewer)
}
