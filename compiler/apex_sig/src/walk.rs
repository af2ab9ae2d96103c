//! Graph walker: the transitive closure of types reachable from a root.

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

use apex_ir::{AstProvider, DeclId, DeclKind};
use apex_types::{BitField, Canonicalizer, Member, RecordType, Type, TypeIdx, TypePool};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{SignatureError, TypeIndex};

/// Every type reachable from one root, with the member lists of the
/// complete records among them.
#[derive(Debug)]
pub struct Closure {
    root: TypeIdx,
    nodes: Vec<TypeIdx>,
    members: FxHashMap<TypeIdx, Vec<Member>>,
    pool: TypePool,
}

impl Closure {
    pub fn root(&self) -> TypeIdx {
        self.root
    }

    /// Reachable nodes in discovery order, root first. Each node appears once.
    pub fn nodes(&self) -> &[TypeIdx] {
        &self.nodes
    }

    /// Members of a complete record in declaration order; `None` for
    /// anything else, including incomplete records.
    pub fn members(&self, record: TypeIdx) -> Option<&[Member]> {
        self.members.get(&record).map(Vec::as_slice)
    }

    pub fn pool(&self) -> &TypePool {
        &self.pool
    }

    pub fn get(&self, idx: TypeIdx) -> &Type {
        self.pool.get(idx)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Walks the type graph from an indexed root.
///
/// Uses an explicit LIFO worklist instead of recursion, so deeply nested
/// or long chains of types never touch the call stack. Nodes are marked
/// visited when pushed, which is what makes cycles through pointers
/// terminate.
pub struct GraphWalker<'a, P: AstProvider + ?Sized> {
    ast: &'a P,
    index: &'a TypeIndex,
}

impl<'a, P: AstProvider + ?Sized> GraphWalker<'a, P> {
    pub fn new(ast: &'a P, index: &'a TypeIndex) -> Self {
        GraphWalker { ast, index }
    }

    /// Compute the closure of `root`, which must name a complete type.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn walk(&self, root: &str) -> Result<Closure, SignatureError> {
        let entry = self
            .index
            .get(root)
            .ok_or_else(|| SignatureError::TypeNotFound {
                name: root.to_owned(),
            })?;

        let mut pool = TypePool::new();
        let mut canon = Canonicalizer::new(self.ast, &mut pool);
        let root_idx = canon.lower(entry.ty)?;

        let mut visited = FxHashSet::default();
        let mut nodes = Vec::new();
        let mut members = FxHashMap::default();
        let mut stack = vec![root_idx];
        visited.insert(root_idx);

        while let Some(idx) = stack.pop() {
            nodes.push(idx);
            let node = canon.pool().get(idx).clone();
            tracing::trace!(name = %canon.pool().display_name(idx), "visit");

            let children = match &node {
                Type::Record(record) if record.is_complete() => {
                    let list = self.members(&mut canon, record)?;
                    let children: Vec<TypeIdx> = list.iter().map(|m| m.ty).collect();
                    members.insert(idx, list);
                    children
                }
                Type::Record(record) => {
                    tracing::debug!(name = %record.name, "incomplete record, no members");
                    Vec::new()
                }
                other => other.children(),
            };

            // Reverse so the first child is expanded next.
            for child in children.into_iter().rev() {
                if visited.insert(child) {
                    stack.push(child);
                }
            }
        }

        tracing::debug!(nodes = nodes.len(), "walk complete");
        Ok(Closure {
            root: root_idx,
            nodes,
            members,
            pool,
        })
    }

    fn members(
        &self,
        canon: &mut Canonicalizer<'_, P>,
        record: &RecordType,
    ) -> Result<Vec<Member>, SignatureError> {
        self.ast
            .decl_children(record.decl)
            .iter()
            .filter(|&&child| self.ast.decl_kind(child) == DeclKind::FieldDecl)
            .map(|&field| self.member(canon, record, field))
            .collect()
    }

    fn member(
        &self,
        canon: &mut Canonicalizer<'_, P>,
        record: &RecordType,
        field: DeclId,
    ) -> Result<Member, SignatureError> {
        let malformed = |what| SignatureError::MalformedField {
            record: record.name.clone(),
            field: self.ast.decl_spelling(field).to_owned(),
            what,
        };
        let ty = self.ast.decl_type(field).ok_or_else(|| malformed("type"))?;
        let offset_bits = self
            .ast
            .field_offset_bits(field)
            .ok_or_else(|| malformed("offset"))?;

        Ok(Member {
            name: self.ast.decl_spelling(field).to_owned(),
            spelling: self.ast.type_spelling(ty),
            ty: canon.lower(ty)?,
            offset: offset_bits / 8,
            size: self.ast.size_of(ty),
            bit_field: self.ast.field_bit_width(field).map(|width| BitField {
                width,
                bit_offset: offset_bits,
            }),
        })
    }
}
