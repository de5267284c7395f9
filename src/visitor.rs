//! Generic post-order walk over the condition tree.
//!
//! The walk keeps an explicit stack of accumulation frames, one per open
//! composite scope, and delegates all fragment construction to a pluggable
//! [`QueryEmitter`]. Both translation targets share this traversal; they only
//! differ in how leaves and composites are rendered.

use crate::ast::{CollectionCheck, Combinator, Comparison, CompOp, ConditionNode};

/// A fatal translation failure. Translation is pure computation, so any error
/// here is deterministic and will reproduce on the same tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    /// The filter asked for a collection cardinality check, which the search
    /// backend cannot express.
    UnsupportedOperation {
        property: String,
        operator: CompOp,
        check: CollectionCheck,
    },
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::UnsupportedOperation {
                property,
                operator,
                check,
            } => write!(
                f,
                "query contains an illegal operation: {} {} {} {}",
                property, operator, check.kind, check.value
            ),
        }
    }
}

impl std::error::Error for TranslateError {}

/// Builds output fragments for one translation target.
pub trait QueryEmitter {
    type Fragment;

    /// Builds the fragment for a single comparison leaf. `Ok(None)` means the
    /// emitter declines the leaf (an operator it cannot render) and nothing
    /// joins the surrounding composite.
    fn build_leaf(&self, leaf: &Comparison) -> Result<Option<Self::Fragment>, TranslateError>;

    /// Folds one completed composite scope into a single fragment.
    /// `open_frames` counts the frames still open once this scope has been
    /// popped; 1 means the composite is the outermost expression.
    fn build_composite(
        &self,
        combinator: Combinator,
        parts: Vec<Self::Fragment>,
        open_frames: usize,
    ) -> Self::Fragment;
}

/// Translates a condition tree into a single output fragment.
///
/// The frame stack is owned by this call and seeded with one empty root frame,
/// so an emitter can be shared freely across calls and threads. Returns `None`
/// when the tree contributed no fragments at all (for example a lone leaf the
/// emitter declined).
pub fn translate<E: QueryEmitter>(
    root: &ConditionNode,
    emitter: &E,
) -> Result<Option<E::Fragment>, TranslateError> {
    let mut stack: Vec<Vec<E::Fragment>> = vec![Vec::new()];
    walk(root, emitter, &mut stack)?;

    let mut root_frame = stack.pop().unwrap_or_default();
    if root_frame.is_empty() {
        Ok(None)
    } else {
        Ok(Some(root_frame.remove(0)))
    }
}

fn walk<E: QueryEmitter>(
    node: &ConditionNode,
    emitter: &E,
    stack: &mut Vec<Vec<E::Fragment>>,
) -> Result<(), TranslateError> {
    match node {
        ConditionNode::Leaf(leaf) => {
            // A leaf without a usable property name contributes nothing.
            if leaf.property.is_empty() {
                return Ok(());
            }
            if let Some(fragment) = emitter.build_leaf(leaf)? {
                if let Some(frame) = stack.last_mut() {
                    frame.push(fragment);
                }
            }
        }
        ConditionNode::Composite {
            combinator,
            children,
        } => {
            stack.push(Vec::new());
            for child in children {
                walk(child, emitter, stack)?;
            }
            // The scope is complete: fold it and hand the single fragment to
            // the parent frame.
            let parts = stack.pop().unwrap_or_default();
            let fragment = emitter.build_composite(*combinator, parts, stack.len());
            if let Some(frame) = stack.last_mut() {
                frame.push(fragment);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;

    /// A bare-bones emitter that renders leaves as `prop<op>value` and
    /// composites as bracketed lists tagged with the combinator and depth.
    struct DebugEmitter;

    impl QueryEmitter for DebugEmitter {
        type Fragment = String;

        fn build_leaf(&self, leaf: &Comparison) -> Result<Option<String>, TranslateError> {
            let Some(op) = leaf.op.fiql_token() else {
                return Ok(None);
            };
            let value = match &leaf.value {
                Literal::String(s) => s.clone(),
                Literal::Number(n) => n.to_string(),
                other => format!("{:?}", other),
            };
            Ok(Some(format!("{}{}{}", leaf.property, op, value)))
        }

        fn build_composite(
            &self,
            combinator: Combinator,
            parts: Vec<String>,
            open_frames: usize,
        ) -> String {
            format!("{:?}@{}[{}]", combinator, open_frames, parts.join(" "))
        }
    }

    fn str_leaf(property: &str, value: &str) -> ConditionNode {
        ConditionNode::leaf(property, CompOp::Eq, Literal::String(value.to_string()))
    }

    #[test]
    fn test_single_leaf() {
        let result = translate(&str_leaf("a", "b"), &DebugEmitter).unwrap();
        assert_eq!(result, Some("a==b".to_string()));
    }

    #[test]
    fn test_leaf_with_empty_property_is_skipped() {
        let result = translate(&str_leaf("", "b"), &DebugEmitter).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_declined_leaf_is_skipped() {
        let leaf = ConditionNode::leaf(
            "a",
            CompOp::Custom("=approx=".to_string()),
            Literal::String("b".to_string()),
        );
        assert_eq!(translate(&leaf, &DebugEmitter).unwrap(), None);
    }

    #[test]
    fn test_declined_leaf_leaves_no_hole_in_composite() {
        let tree = ConditionNode::Composite {
            combinator: Combinator::And,
            children: vec![
                str_leaf("a", "1"),
                ConditionNode::leaf(
                    "b",
                    CompOp::Custom("=approx=".to_string()),
                    Literal::String("2".to_string()),
                ),
                str_leaf("c", "3"),
            ],
        };
        let result = translate(&tree, &DebugEmitter).unwrap();
        assert_eq!(result, Some("And@1[a==1 c==3]".to_string()));
    }

    #[test]
    fn test_nested_composites_report_depth() {
        let tree = ConditionNode::Composite {
            combinator: Combinator::Or,
            children: vec![
                str_leaf("a", "1"),
                ConditionNode::Composite {
                    combinator: Combinator::And,
                    children: vec![str_leaf("b", "2"), str_leaf("c", "3")],
                },
            ],
        };
        let result = translate(&tree, &DebugEmitter).unwrap();
        // The inner scope closes while the outer frame plus the root frame are
        // still open; the outer scope closes with only the root frame open.
        assert_eq!(result, Some("Or@1[a==1 And@2[b==2 c==3]]".to_string()));
    }

    #[test]
    fn test_children_visit_in_order() {
        let tree = ConditionNode::Composite {
            combinator: Combinator::And,
            children: vec![str_leaf("x", "1"), str_leaf("y", "2"), str_leaf("z", "3")],
        };
        let result = translate(&tree, &DebugEmitter).unwrap();
        assert_eq!(result, Some("And@1[x==1 y==2 z==3]".to_string()));
    }
}
