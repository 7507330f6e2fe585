//! Capability traits for the external 3D toolkit.
//!
//! The toolkit's objects (parts, bodies, shapes, scene nodes) are opaque to us,
//! so they travel as copyable handles. Implementations map handles back to the
//! real toolkit objects.

use shared::{Rgb, ShapeId};

use crate::error::ViewerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneNodeHandle(pub u64);

/// Topological type of a shape. A body may only hold shapes of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Vertex,
    Edge,
    Wire,
    Face,
    Shell,
    Solid,
    Other,
}

/// Something the scene reports as selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEntity {
    Part(PartHandle),
    Body(BodyHandle),
    Shape(ShapeHandle),
}

impl SceneEntity {
    pub fn accept(&self, visitor: &mut dyn EntityVisitor) -> Result<(), ViewerError> {
        visitor.visit(self)
    }
}

pub trait EntityVisitor {
    fn visit(&mut self, entity: &SceneEntity) -> Result<(), ViewerError>;
}

/// Collects selected shapes; part and body entities are ignored.
#[derive(Debug, Default)]
pub struct SelectedShapeCollector {
    shapes: Vec<ShapeHandle>,
}

impl SelectedShapeCollector {
    pub fn shapes(&self) -> &[ShapeHandle] {
        &self.shapes
    }

    pub fn into_shapes(self) -> Vec<ShapeHandle> {
        self.shapes
    }
}

impl EntityVisitor for SelectedShapeCollector {
    fn visit(&mut self, entity: &SceneEntity) -> Result<(), ViewerError> {
        if let SceneEntity::Shape(shape) = entity {
            if !self.shapes.contains(shape) {
                self.shapes.push(*shape);
            }
        }
        Ok(())
    }
}

/// Selected entities under one scene node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    pub node: SceneNodeHandle,
    pub entities: Vec<SceneEntity>,
}

impl SelectionItem {
    pub fn shape(node: SceneNodeHandle, shape: ShapeHandle) -> Self {
        Self {
            node,
            entities: vec![SceneEntity::Shape(shape)],
        }
    }
}

/// Payload of the scene's selection-changed notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChanged {
    pub added: Vec<SelectionItem>,
    pub removed: Vec<SelectionItem>,
}

/// Whether a programmatic selection change fires the selection-changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Notify,
    Suppress,
}

/// Appearance of a body added to the root part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyStyle {
    /// Solid color of a feature group
    Colored(Rgb),
    /// Translucent silhouette of everything that is not colorized
    Ghosted,
}

/// Scene and selection manager of the 3D viewer.
pub trait Scene {
    fn deselect_all(&mut self, dispatch: Dispatch);
    fn select(&mut self, item: SelectionItem, dispatch: Dispatch);

    fn remove_root_part(&mut self);
    fn add_root_part(&mut self, part: PartHandle);
    /// Attach a body under the displayed root part. `None` if the scene refused it.
    fn add_body(&mut self, body: BodyHandle, style: BodyStyle) -> Option<SceneNodeHandle>;
    fn update(&mut self);
}

/// One geometric representation of a part.
pub trait ShapeResolver {
    /// Shape-level selection only works on boundary representations.
    fn is_brep(&self) -> bool;
    fn shape(&self, id: ShapeId) -> Option<ShapeHandle>;
    fn shape_id(&self, shape: ShapeHandle) -> Option<ShapeId>;
    fn shape_kind(&self, shape: ShapeHandle) -> ShapeKind;
    /// Every face of every body in the representation.
    fn faces(&self) -> Vec<ShapeHandle>;
    /// Group shapes of a single kind into a new body.
    fn form_body(&mut self, shapes: &[ShapeHandle]) -> Result<BodyHandle, ViewerError>;
}
