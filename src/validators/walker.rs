//! Tree walker
//!
//! Every pass is a [`SchemaVisitor`] driven over the document set by
//! [`TreeWalker`]. The walker owns the traversal rules shared by all
//! passes:
//!
//! - pre-order, depth-first, children in document order
//! - each component is visited at most once per pass, however many
//!   include paths reach it
//! - components in the context's skip set are neither visited nor
//!   descended into
//! - an include/import/redefine the visitor descends into continues into
//!   the root of the document it was bound to
//!
//! The traversal uses an explicit stack so long include chains cannot
//! overflow the call stack.

use tracing::trace;

use crate::model::{ComponentId, DocumentId};

use super::context::ValidationContext;

/// One pass over the component trees
pub trait SchemaVisitor {
    /// Visit a component; returns whether to descend into it
    fn visit(&mut self, ctx: &mut ValidationContext, id: ComponentId) -> bool;
}

impl<F> SchemaVisitor for F
where
    F: FnMut(&mut ValidationContext, ComponentId) -> bool,
{
    fn visit(&mut self, ctx: &mut ValidationContext, id: ComponentId) -> bool {
        self(ctx, id)
    }
}

/// Depth-first traversal engine
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeWalker;

impl TreeWalker {
    /// Walk the trees of several documents in order
    ///
    /// Traversal marks are not cleared here; a pass clears them once before
    /// walking its whole document set.
    pub fn walk_documents(
        ctx: &mut ValidationContext,
        documents: &[DocumentId],
        visitor: &mut dyn SchemaVisitor,
    ) -> usize {
        let mut visited = 0;
        for &document in documents {
            let root = ctx.document(document).root;
            visited += Self::walk(ctx, root, visitor);
        }
        visited
    }

    /// Walk one tree, returning the number of components visited
    pub fn walk(
        ctx: &mut ValidationContext,
        root: ComponentId,
        visitor: &mut dyn SchemaVisitor,
    ) -> usize {
        let mut visited = 0;
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if ctx.is_traversed(id) || ctx.is_skipped(id) {
                continue;
            }
            ctx.mark_traversed(id);
            visited += 1;

            let descend = visitor.visit(ctx, id);
            // A fatal raised by the visit prunes immediately
            if !descend || ctx.is_skipped(id) {
                continue;
            }

            let component = ctx.component(id);
            if let Some(target) = component.kind.schema_location().and_then(|l| l.target) {
                trace!(target = target.index(), "following schema location");
                stack.push(ctx.document(target).root);
            }
            stack.extend(component.children.iter().rev().copied());
        }
        visited
    }
}
