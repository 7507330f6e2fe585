//! Builds the feature tree from process data.
//!
//! Pure functions: the same part and mode always produce the same tree.

use shared::{
    FeatureGroup, FoldState, Parameter, ProcessDataPart, Section, ShapeId, SubGroup, TreeKind,
    UnfoldedSection,
};

use crate::tree::{FeatureTree, NodeId, NodeKind, TreeNode};

/// Shown when the requested section is absent from the process data.
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Build the tree for one part in the requested mode.
pub fn build_tree(
    part: &ProcessDataPart,
    part_label: &str,
    kind: TreeKind,
    fold: FoldState,
) -> FeatureTree {
    if let Some(error) = part.error_message() {
        return FeatureTree::message(error);
    }
    match (kind, fold) {
        (TreeKind::Features, FoldState::Unfolded) => {
            build_parameter_tree(part.feature_recognition_unfolded.as_ref(), part_label)
        }
        _ => build_group_tree(part.section(kind, fold), part_label),
    }
}

fn build_group_tree(section: Option<&Section>, part_label: &str) -> FeatureTree {
    let Some(section) = section else {
        return FeatureTree::message(NO_DATA_MESSAGE);
    };
    if let Some(message) = section.message() {
        return FeatureTree::message(message);
    }

    let mut tree = FeatureTree::new(TreeNode::new(NodeKind::Part, part_label).with_open(true));
    let root = tree.root();
    for group in section.feature_groups.iter().flatten() {
        append_group(&mut tree, root, group);
    }
    tree
}

fn build_parameter_tree(section: Option<&UnfoldedSection>, part_label: &str) -> FeatureTree {
    let Some(section) = section else {
        return FeatureTree::message(NO_DATA_MESSAGE);
    };
    if let Some(message) = section.message() {
        return FeatureTree::message(message);
    }

    let mut tree = FeatureTree::new(TreeNode::new(NodeKind::Part, part_label).with_open(true));
    let root = tree.root();
    for p in section.parameters.iter().flatten() {
        let label = format!("{}: {} {}", p.name, format_value(&p.value), p.units);
        tree.push(root, TreeNode::new(NodeKind::Parameter, label.trim_end()));
    }
    tree
}

/// Append a group header and its features/subgroups under `parent`.
pub fn append_group(tree: &mut FeatureTree, parent: NodeId, group: &FeatureGroup) -> NodeId {
    let swatch = group.color.as_ref().map(|_| group.rgb());
    let header = tree.push(
        parent,
        TreeNode::new(NodeKind::Group, group.name.as_str())
            .with_open(true)
            .with_swatch(swatch),
    );
    let singular = strip_plural_marker(&group.name);

    if let Some(features) = &group.features {
        for feature in features {
            tree.push(header, feature_leaf(singular.to_string(), feature));
        }
    } else if let Some(sub_groups) = &group.sub_groups {
        for sub in sub_groups {
            append_sub_group(tree, header, singular, sub);
        }
    }
    header
}

fn append_sub_group(tree: &mut FeatureTree, parent: NodeId, singular: &str, sub: &SubGroup) {
    let node = tree.push(
        parent,
        TreeNode::new(NodeKind::SubGroup, sub_group_label(singular, &sub.parameters)),
    );
    let listing = parameter_listing(&sub.parameters);
    for feature in &sub.features {
        tree.push(node, feature_leaf(listing.clone(), feature));
    }
}

fn feature_leaf(label: String, feature: &shared::Feature) -> TreeNode {
    let node = TreeNode::new(NodeKind::Feature, label);
    if feature.has_shapes() {
        node.with_shape_ids(feature.shape_ids())
    } else {
        node
    }
}

/// Drop the trailing "(s)" plural marker: "Through Hole(s)" -> "Through Hole".
pub fn strip_plural_marker(name: &str) -> &str {
    let mut s = name;
    loop {
        let trimmed = s.trim_end();
        match trimmed.strip_suffix("(s)") {
            Some(rest) => s = rest,
            None => return trimmed,
        }
    }
}

/// Two decimals for finite numbers, the literal text otherwise.
pub fn format_value(value: &str) -> String {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => format!("{v:.2}"),
        _ => value.to_string(),
    }
}

/// "Through Hole (2.50, 10.00)"
pub fn sub_group_label(singular: &str, parameters: &[Parameter]) -> String {
    let values: Vec<String> = parameters.iter().map(|p| format_value(&p.value)).collect();
    format!("{} ({})", singular, values.join(", "))
}

/// "Radius - 2.50 mm, Depth - 10.00 mm"
pub fn parameter_listing(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| format!("{} - {} {}", p.name, format_value(&p.value), p.units))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every shape ID referenced anywhere in the group, first occurrence order.
pub fn collect_group_shape_ids(group: &FeatureGroup) -> Vec<ShapeId> {
    let flat = group.features.iter().flatten();
    let nested = group
        .sub_groups
        .iter()
        .flatten()
        .flat_map(|sub| sub.features.iter());

    let mut ids = Vec::new();
    for feature in flat.chain(nested) {
        for id in feature.shape_ids() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Feature, ShapeIdRef};

    fn param(name: &str, value: &str, units: &str) -> Parameter {
        Parameter {
            name: name.into(),
            value: value.into(),
            units: units.into(),
        }
    }

    fn feature(ids: &[&str]) -> Feature {
        Feature {
            shape_id_count: Some(ids.len().to_string()),
            shape_ids: ids.iter().map(|id| ShapeIdRef { id: id.to_string() }).collect(),
        }
    }

    #[test]
    fn test_strip_plural_marker() {
        assert_eq!(strip_plural_marker("Hole(s)"), "Hole");
        assert_eq!(strip_plural_marker("Through Hole (s)"), "Through Hole");
        assert_eq!(strip_plural_marker("Bend"), "Bend");
    }

    #[test]
    fn test_strip_plural_marker_idempotent() {
        for name in ["Hole(s)", "Hole(s)(s)", "Hole(s) (s)", "Pocket", "(s)", ""] {
            let once = strip_plural_marker(name);
            assert_eq!(strip_plural_marker(once), once, "input {name:?}");
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value("3.14159"), "3.14");
        assert_eq!(format_value("10"), "10.00");
        assert_eq!(format_value("N/A"), "N/A");
        assert_eq!(format_value("inf"), "inf");
        assert_eq!(format_value("NaN"), "NaN");
    }

    #[test]
    fn test_parameter_listing_fragments() {
        assert_eq!(
            parameter_listing(&[param("Diameter", "3.14159", "mm")]),
            "Diameter - 3.14 mm"
        );
        assert_eq!(
            parameter_listing(&[param("Depth", "N/A", "mm")]),
            "Depth - N/A mm"
        );
        assert_eq!(
            parameter_listing(&[param("Radius", "1", "mm"), param("Angle", "90", "deg")]),
            "Radius - 1.00 mm, Angle - 90.00 deg"
        );
    }

    #[test]
    fn test_sub_group_label() {
        let params = [param("Radius", "2.5", "mm"), param("Type", "Blind", "")];
        assert_eq!(sub_group_label("Hole", &params), "Hole (2.50, Blind)");
    }

    #[test]
    fn test_group_without_children() {
        let group = FeatureGroup {
            name: "Empty(s)".into(),
            ..Default::default()
        };
        let mut tree = FeatureTree::new(TreeNode::new(NodeKind::Part, "p"));
        let header = append_group(&mut tree, 0, &group);
        assert!(tree.children(header).is_empty());
        assert!(tree.node(header).unwrap().swatch.is_none());
    }

    #[test]
    fn test_flat_and_nested_counts() {
        let flat = FeatureGroup {
            name: "Pocket(s)".into(),
            features: Some(vec![feature(&["1"]), feature(&["2"]), feature(&[])]),
            ..Default::default()
        };
        let nested = FeatureGroup {
            name: "Hole(s)".into(),
            sub_groups: Some(vec![
                SubGroup {
                    parameters: vec![param("D", "1", "mm")],
                    features: vec![feature(&["3"]), feature(&["4"])],
                    ..Default::default()
                },
                SubGroup {
                    parameters: vec![param("D", "2", "mm")],
                    features: vec![feature(&["5"])],
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };

        let mut tree = FeatureTree::new(TreeNode::new(NodeKind::Part, "p"));
        let h1 = append_group(&mut tree, 0, &flat);
        let h2 = append_group(&mut tree, 0, &nested);

        let leaves = |t: &FeatureTree, from: NodeId| {
            t.preorder()
                .into_iter()
                .filter(|&n| t.node(n).unwrap().kind == NodeKind::Feature)
                .filter(|&n| {
                    let mut p = t.node(n).unwrap().parent;
                    while let Some(id) = p {
                        if id == from {
                            return true;
                        }
                        p = t.node(id).unwrap().parent;
                    }
                    false
                })
                .count()
        };
        assert_eq!(leaves(&tree, h1), 3);
        assert_eq!(leaves(&tree, h2), 3);
        assert_eq!(tree.children(h2).len(), 2);
        // the empty feature leaf has no tag
        let untagged = tree.children(h1)[2];
        assert!(tree.node(untagged).unwrap().shape_tag().is_none());
    }

    #[test]
    fn test_hole_scenario() {
        let json = r#"{"partId":"1","featureRecognition":{"featureGroups":[{"name":"Hole(s)",
            "color":"(126,10,1)","features":[{"shapeIDCount":"1","shapeIDs":[{"id":"42"}]}]}]}}"#;
        let part: ProcessDataPart = serde_json::from_str(json).unwrap();
        let tree = build_tree(&part, "Part", TreeKind::Features, FoldState::Folded);

        let groups = tree.groups();
        assert_eq!(groups.len(), 1);
        let header = tree.node(groups[0]).unwrap();
        assert_eq!(header.label, "Hole(s)");
        assert_eq!(header.swatch.unwrap().to_u8(), [126, 10, 1]);

        let leaves = tree.children(groups[0]);
        assert_eq!(leaves.len(), 1);
        let leaf = tree.node(leaves[0]).unwrap();
        assert_eq!(leaf.label, "Hole");
        assert_eq!(leaf.shape_ids, vec![42]);
    }

    #[test]
    fn test_error_short_circuits() {
        let part = ProcessDataPart {
            error: Some("Conversion failed".into()),
            feature_recognition: Some(Section::default()),
            ..Default::default()
        };
        let tree = build_tree(&part, "p", TreeKind::Features, FoldState::Folded);
        assert!(tree.is_message());
        assert_eq!(tree.node(0).unwrap().label, "Conversion failed");
    }

    #[test]
    fn test_section_message() {
        let part = ProcessDataPart {
            dfm: Some(Section {
                message: Some("No DFM issues".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let tree = build_tree(&part, "p", TreeKind::Dfm, FoldState::Folded);
        assert!(tree.is_message());
        assert_eq!(tree.node(0).unwrap().label, "No DFM issues");
    }

    #[test]
    fn test_missing_section() {
        let tree = build_tree(
            &ProcessDataPart::default(),
            "p",
            TreeKind::Features,
            FoldState::Folded,
        );
        assert!(tree.is_message());
        assert_eq!(tree.node(0).unwrap().label, NO_DATA_MESSAGE);
    }

    #[test]
    fn test_unfolded_parameters() {
        let part = ProcessDataPart {
            feature_recognition_unfolded: Some(UnfoldedSection {
                parameters: Some(vec![param("Length", "120.456", "mm"), param("Material", "Steel", "")]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let tree = build_tree(&part, "Plate", TreeKind::Features, FoldState::Unfolded);
        let labels: Vec<&str> = tree
            .children(0)
            .iter()
            .map(|&n| tree.node(n).unwrap().label.as_str())
            .collect();
        assert_eq!(labels, vec!["Length: 120.46 mm", "Material: Steel"]);
    }

    #[test]
    fn test_collect_group_shape_ids_dedups_across_subgroups() {
        let group = FeatureGroup {
            name: "Hole(s)".into(),
            sub_groups: Some(vec![
                SubGroup {
                    features: vec![feature(&["3", "4"])],
                    ..Default::default()
                },
                SubGroup {
                    features: vec![feature(&["4", "5"])],
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        assert_eq!(collect_group_shape_ids(&group), vec![3, 4, 5]);
    }

    #[test]
    fn test_builder_is_idempotent() {
        let json = r#"{"partId":"1","dfm":{"featureGroups":[{"name":"Deep Hole(s)",
            "subGroups":[{"parameters":[{"name":"Depth","units":"mm","value":"12"}],
            "features":[{"shapeIDCount":"1","shapeIDs":[{"id":"8"}]}]}]}]}}"#;
        let part: ProcessDataPart = serde_json::from_str(json).unwrap();
        let a = build_tree(&part, "p", TreeKind::Dfm, FoldState::Folded);
        let b = build_tree(&part, "p", TreeKind::Dfm, FoldState::Folded);
        assert_eq!(a, b);
    }
}
