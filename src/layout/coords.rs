use crate::ir::Position;

use super::error::LayoutError;
use super::types::{LayoutGraph, ResolvedPositions};

/// Walks a laid-out tree from the synthetic root, accumulating parent
/// offsets into absolute positions.
///
/// The root itself is the diagram origin and is not recorded.
pub(crate) fn resolve_positions(root: &LayoutGraph) -> Result<ResolvedPositions, LayoutError> {
    let mut resolved = ResolvedPositions::default();
    let mut stack: Vec<(&LayoutGraph, Position)> = root
        .children
        .iter()
        .rev()
        .map(|child| (child, Position::ZERO))
        .collect();

    while let Some((node, offset)) = stack.pop() {
        let relative = node
            .position()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .ok_or_else(|| LayoutError::MissingPosition(node.id.clone()))?;
        let absolute = offset.offset(relative);
        resolved.relative.insert(node.id.clone(), relative);
        resolved.absolute.insert(node.id.clone(), absolute);
        for child in node.children.iter().rev() {
            stack.push((child, absolute));
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(id: &str, x: f32, y: f32, children: Vec<LayoutGraph>) -> LayoutGraph {
        let mut node = LayoutGraph::node(id, 10.0, 10.0);
        node.x = Some(x);
        node.y = Some(y);
        node.children = children;
        node
    }

    #[test]
    fn accumulates_offsets_through_nesting() {
        let mut root = LayoutGraph::node("root", 0.0, 0.0);
        root.x = Some(500.0);
        root.children = vec![
            placed("A", 5.0, 5.0, Vec::new()),
            placed(
                "B",
                100.0,
                20.0,
                vec![placed("C", 10.0, 30.0, vec![placed("D", 1.0, 2.0, Vec::new())])],
            ),
        ];
        let resolved = resolve_positions(&root).unwrap();
        assert_eq!(resolved.absolute["A"], Position::new(5.0, 5.0));
        assert_eq!(resolved.absolute["A"], resolved.relative["A"]);
        assert_eq!(resolved.absolute["C"], Position::new(110.0, 50.0));
        assert_eq!(resolved.relative["C"], Position::new(10.0, 30.0));
        assert_eq!(resolved.absolute["D"], Position::new(111.0, 52.0));
        assert!(!resolved.absolute.contains_key("root"));
    }

    #[test]
    fn missing_coordinate_is_reported() {
        let mut root = LayoutGraph::node("root", 0.0, 0.0);
        let mut broken = placed("B", 0.0, 0.0, Vec::new());
        broken.y = None;
        root.children = vec![placed("A", 0.0, 0.0, vec![broken])];
        assert_eq!(
            resolve_positions(&root).unwrap_err(),
            LayoutError::MissingPosition("B".to_string())
        );
    }
}
