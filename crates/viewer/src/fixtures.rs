//! Factory functions for test data: process data documents and matching
//! mock representations.
//!
//! The machining fixture yields this tree for part "Bracket":
//!
//! ```text
//! 0 Bracket
//! ├─ 1 Through Hole(s)                      (126, 10, 1)
//! │  └─ 2 Through Hole (2.50, 10.00)        closed
//! │     ├─ 3 [10 11]
//! │     └─ 4 [12]
//! ├─ 5 Flat Face Milled Face(s)             (0, 128, 255)
//! │  └─ 6 [13 14]
//! └─ 7 Concave Fillet Edge Milling Face(s)  (50, 200, 50)
//!    └─ 8 [14 20 21]
//! ```
//!
//! Shape 21 is an edge, 30 and 31 are faces outside every group.

use shared::{ProcessData, ShapeId};

use crate::harness::MockRepresentation;
use crate::scene::{PartHandle, ShapeKind};
use crate::session::CollectedPart;

// ── Process data ────────────────────────────────────────────────

pub const MACHINING_PROCESS_DATA: &str = r#"{
  "parts": [
    {
      "partId": "0:1",
      "process": "CNC Machining Milling",
      "featureRecognition": {
        "name": "Feature Recognition",
        "totalFeatureCount": "4",
        "featureGroups": [
          {
            "name": "Through Hole(s)",
            "color": "(126, 10, 1)",
            "totalGroupFeatureCount": "2",
            "subGroupCount": "1",
            "subGroups": [
              {
                "parametersCount": "2",
                "parameters": [
                  { "name": "Radius", "units": "mm", "value": "2.5" },
                  { "name": "Depth", "units": "mm", "value": "10" }
                ],
                "featureCount": "2",
                "features": [
                  { "shapeIDCount": "2", "shapeIDs": [{ "id": "10" }, { "id": "11" }] },
                  { "shapeIDCount": "1", "shapeIDs": [{ "id": "12" }] }
                ]
              }
            ]
          },
          {
            "name": "Flat Face Milled Face(s)",
            "color": "(0, 128, 255)",
            "totalGroupFeatureCount": "1",
            "featureCount": "1",
            "features": [
              { "shapeIDCount": "2", "shapeIDs": [{ "id": "13" }, { "id": "14" }] }
            ]
          },
          {
            "name": "Concave Fillet Edge Milling Face(s)",
            "color": "(50, 200, 50)",
            "totalGroupFeatureCount": "1",
            "featureCount": "1",
            "features": [
              { "shapeIDCount": "3", "shapeIDs": [{ "id": "14" }, { "id": "20" }, { "id": "21" }] }
            ]
          }
        ]
      },
      "dfm": {
        "name": "Design for Manufacturing",
        "totalFeatureCount": "1",
        "featureGroups": [
          {
            "name": "Deep Hole(s)",
            "color": "(200, 0, 0)",
            "subGroupCount": "1",
            "subGroups": [
              {
                "parameters": [
                  { "name": "Expected Max Depth", "units": "mm", "value": "25" },
                  { "name": "Actual Depth", "units": "mm", "value": 31.4159 }
                ],
                "features": [
                  { "shapeIDCount": 1, "shapeIDs": [{ "id": 12 }] }
                ]
              }
            ]
          }
        ]
      }
    },
    {
      "partId": "0:2",
      "process": "CNC Machining Milling",
      "error": "Feature recognition failed for this part"
    }
  ]
}"#;

pub const SHEET_METAL_PROCESS_DATA: &str = r#"{
  "parts": [
    {
      "partId": "0:1",
      "process": "Sheet Metal",
      "featureRecognition": {
        "name": "Feature Recognition",
        "featureGroups": [
          {
            "name": "Bend(s)",
            "color": "(255, 128, 0)",
            "subGroups": [
              {
                "parameters": [
                  { "name": "Radius", "units": "mm", "value": "1" },
                  { "name": "Angle", "units": "deg", "value": "90" }
                ],
                "features": [
                  { "shapeIDCount": "2", "shapeIDs": [{ "id": "10" }, { "id": "11" }] }
                ]
              }
            ]
          }
        ]
      },
      "dfm": {
        "name": "Design for Manufacturing",
        "message": "No DFM issues found"
      },
      "featureRecognitionUnfolded": {
        "name": "Flat Pattern",
        "parametersCount": "3",
        "parameters": [
          { "name": "Length", "units": "mm", "value": "120.456" },
          { "name": "Width", "units": "mm", "value": "80" },
          { "name": "Thickness", "units": "mm", "value": "2" }
        ]
      },
      "dfmUnfolded": {
        "name": "Design for Manufacturing",
        "featureGroups": [
          {
            "name": "Irregular Size Bend Relief(s)",
            "color": "(180, 40, 200)",
            "features": [
              { "shapeIDCount": "1", "shapeIDs": [{ "id": "30" }] }
            ]
          }
        ]
      }
    }
  ]
}"#;

pub fn machining_process_data() -> ProcessData {
    serde_json::from_str(MACHINING_PROCESS_DATA).unwrap_or_default()
}

pub fn sheet_metal_process_data() -> ProcessData {
    serde_json::from_str(SHEET_METAL_PROCESS_DATA).unwrap_or_default()
}

// ── Representations ─────────────────────────────────────────────

/// Faces referenced by the machining fixture plus two uncolored faces.
pub const MACHINING_FACES: [ShapeId; 8] = [10, 11, 12, 13, 14, 20, 30, 31];
pub const MACHINING_EDGES: [ShapeId; 1] = [21];

pub fn machining_representation() -> MockRepresentation {
    MockRepresentation::brep()
        .with_shapes(MACHINING_FACES, ShapeKind::Face)
        .with_shapes(MACHINING_EDGES, ShapeKind::Edge)
}

pub fn folded_sheet_representation() -> MockRepresentation {
    MockRepresentation::brep().with_shapes([10, 11, 12, 13], ShapeKind::Face)
}

pub fn unfolded_sheet_representation() -> MockRepresentation {
    MockRepresentation::brep().with_shapes([30, 31, 32], ShapeKind::Face)
}

// ── Collected parts ─────────────────────────────────────────────

pub fn part(id: &str, label: &str, handle: u64, rep: MockRepresentation) -> CollectedPart<MockRepresentation> {
    CollectedPart {
        id: id.to_string(),
        label: label.to_string(),
        part: PartHandle(handle),
        representation: rep,
    }
}

/// "Bracket" (0:1) with full data and "Bolt" (0:2) whose conversion failed.
pub fn machining_parts() -> Vec<CollectedPart<MockRepresentation>> {
    vec![
        part("0:1", "Bracket", 1, machining_representation()),
        part("0:2", "Bolt", 2, MockRepresentation::brep().with_shapes([1, 2], ShapeKind::Face)),
    ]
}

pub fn folded_sheet_parts() -> Vec<CollectedPart<MockRepresentation>> {
    vec![part("0:1", "Plate", 1, folded_sheet_representation())]
}

pub fn unfolded_sheet_parts() -> Vec<CollectedPart<MockRepresentation>> {
    vec![part("0:1", "Plate", 11, unfolded_sheet_representation())]
}
