//! Group header layout.
//!
//! Pure function of the column tree, the flattened header fields and their
//! resolved widths. Each group becomes one cell on its level spanning the
//! leaves beneath it.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::column::Column;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderGroupCell {
    pub label: String,
    pub level: usize,
    pub start_leaf_index: usize,
    pub leaf_span: usize,
    /// Pixel offset of the first spanned leaf
    pub left: f32,
    /// Sum of spanned leaf widths
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderLayout {
    /// Group cells per level, top level first. Empty levels are dropped.
    pub levels: Vec<Vec<HeaderGroupCell>>,
    /// Header rows including the leaf row.
    pub depth: usize,
    /// Leaves that sit under at least one group.
    pub grouped_leaves: FxHashSet<String>,
}

impl HeaderLayout {
    pub fn is_grouped(&self, field: &str) -> bool {
        self.grouped_leaves.contains(field)
    }
}

/// Lay out group headers over `leaf_fields`, whose widths are `leaf_widths`
/// (same length and order).
pub fn header_layout(columns: &[Column], leaf_fields: &[&str], leaf_widths: &[f32]) -> HeaderLayout {
    if !columns.iter().any(Column::is_group) {
        return HeaderLayout {
            depth: 1,
            ..HeaderLayout::default()
        };
    }

    let index_of: FxHashMap<&str, usize> = leaf_fields.iter().enumerate().map(|(i, f)| (*f, i)).collect();

    let mut offsets = Vec::with_capacity(leaf_widths.len() + 1);
    let mut acc = 0.0f32;
    offsets.push(acc);
    for w in leaf_widths {
        acc += w;
        offsets.push(acc);
    }

    let mut builder = LayoutBuilder {
        index_of,
        offsets,
        levels: Vec::new(),
        grouped: FxHashSet::default(),
    };
    builder.walk(columns, 0, false);

    let levels: Vec<Vec<HeaderGroupCell>> = builder.levels.into_iter().filter(|l| !l.is_empty()).collect();
    let depth = levels.len() + 1;
    HeaderLayout {
        levels,
        depth,
        grouped_leaves: builder.grouped,
    }
}

struct LayoutBuilder<'a> {
    index_of: FxHashMap<&'a str, usize>,
    /// offsets[i] = left edge of leaf i; offsets[n] = total width
    offsets: Vec<f32>,
    levels: Vec<Vec<HeaderGroupCell>>,
    grouped: FxHashSet<String>,
}

impl LayoutBuilder<'_> {
    fn walk(&mut self, nodes: &[Column], level: usize, under_group: bool) {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, Vec::new);
        }
        for node in nodes {
            if node.is_group() {
                let mut indices = Vec::new();
                self.collect_leaf_indices(node, &mut indices);
                let (Some(&start), Some(&end)) = (indices.iter().min(), indices.iter().max()) else {
                    continue;
                };
                let left = self.offsets.get(start).copied().unwrap_or(0.0);
                let right = self.offsets.get(end + 1).copied().unwrap_or(left);
                self.levels[level].push(HeaderGroupCell {
                    label: node.header.clone(),
                    level,
                    start_leaf_index: start,
                    leaf_span: end - start + 1,
                    left,
                    width: right - left,
                });
                self.walk(&node.children, level + 1, true);
            } else if under_group && self.index_of.contains_key(node.field.as_str()) {
                self.grouped.insert(node.field.clone());
            }
        }
    }

    fn collect_leaf_indices(&self, node: &Column, out: &mut Vec<usize>) {
        if node.is_group() {
            for child in &node.children {
                self.collect_leaf_indices(child, out);
            }
        } else if let Some(&i) = self.index_of.get(node.field.as_str()) {
            out.push(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_columns_have_depth_one() {
        let cols = vec![Column::new("a", "A"), Column::new("b", "B")];
        let layout = header_layout(&cols, &["a", "b"], &[100.0, 100.0]);
        assert_eq!(layout.depth, 1);
        assert!(layout.levels.is_empty());
    }

    #[test]
    fn test_nested_groups() {
        let cols = vec![
            Column::new("id", "ID"),
            Column::group(
                "Person",
                vec![
                    Column::new("name", "Name"),
                    Column::group("Contact", vec![Column::new("email", "Email"), Column::new("phone", "Phone")]),
                ],
            ),
        ];
        let fields = ["__rowNum__", "id", "name", "email", "phone"];
        let widths = [50.0, 60.0, 100.0, 120.0, 80.0];
        let layout = header_layout(&cols, &fields, &widths);

        assert_eq!(layout.depth, 3);
        assert_eq!(layout.levels.len(), 2);

        let person = &layout.levels[0][0];
        assert_eq!(person.label, "Person");
        assert_eq!(person.start_leaf_index, 2);
        assert_eq!(person.leaf_span, 3);
        assert_eq!(person.left, 110.0);
        assert_eq!(person.width, 300.0);

        let contact = &layout.levels[1][0];
        assert_eq!(contact.level, 1);
        assert_eq!(contact.start_leaf_index, 3);
        assert_eq!(contact.leaf_span, 2);
        assert_eq!(contact.width, 200.0);

        assert!(layout.is_grouped("name"));
        assert!(layout.is_grouped("email"));
        assert!(!layout.is_grouped("id"));
    }

    #[test]
    fn test_group_with_hidden_children_is_skipped() {
        let cols = vec![Column::group("G", vec![Column::new("x", "X")]), Column::new("y", "Y")];
        let layout = header_layout(&cols, &["y"], &[100.0]);
        assert!(layout.levels.is_empty());
        assert_eq!(layout.depth, 1);
    }
}
