//! Record collector: the name index of complete types.


use apex_ir::{AstProvider, DeclId, DeclKind, TypeRef};
use apex_types::{Canonicalizer, Type, TypeIdx, TypePool};
use rustc_hash::FxHashMap;

use crate::SignatureError;

/// Where a named complete type was declared.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct IndexEntry {
    pub decl: DeclId,
    pub ty: TypeRef,
}

/// What to do when a name is completely defined more than once.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum RedefinitionPolicy {
    /// The later definition replaces the earlier one.
    #[default]
    LastWins,
    /// Fail unless both definitions canonicalize to the same type.
    Reject,
}

/// Name → complete type, built once per run and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct TypeIndex {
    entries: FxHashMap<String, IndexEntry>,
}

impl TypeIndex {
    /// Look up a complete struct, union or typedef by name.
    pub fn get(&self, name: &str) -> Option<IndexEntry> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Index every complete struct, union and typedef declaration of the unit.
///
/// The declaration tree is walked once in document order, nested tag
/// definitions included. Member types are never followed.
#[tracing::instrument(level = "debug", skip_all, fields(policy = ?policy))]
pub fn collect_complete_types<P: AstProvider + ?Sized>(
    ast: &P,
    policy: RedefinitionPolicy,
) -> Result<TypeIndex, SignatureError> {
    let mut index = TypeIndex::default();
    let mut scratch = TypePool::new();
    let mut canon = Canonicalizer::new(ast, &mut scratch);

    let mut stack = vec![ast.root()];
    while let Some(decl) = stack.pop() {
        stack.extend(ast.decl_children(decl).iter().rev());

        if !matches!(
            ast.decl_kind(decl),
            DeclKind::StructDecl | DeclKind::UnionDecl | DeclKind::TypedefDecl
        ) {
            continue;
        }
        let name = ast.decl_spelling(decl);
        if name.is_empty() {
            continue;
        }
        let Some(ty) = ast.decl_type(decl) else {
            continue;
        };
        if !ast.size_of(ty).is_some_and(|size| size > 0) {
            continue;
        }

        let entry = IndexEntry { decl, ty };
        if let Some(previous) = index.entries.get(name).copied() {
            if previous.ty != ty {
                tracing::debug!(%name, "complete type redefined");
                if policy == RedefinitionPolicy::Reject
                    && identity(&mut canon, previous.ty)? != identity(&mut canon, ty)?
                {
                    return Err(SignatureError::ConflictingDefinition {
                        name: name.to_owned(),
                        first: ast.type_spelling(previous.ty),
                        second: ast.type_spelling(ty),
                    });
                }
            }
        }
        index.entries.insert(name.to_owned(), entry);
    }

    tracing::debug!(entries = index.len(), "collected complete types");
    Ok(index)
}

/// Canonical identity of a type with typedef names looked through, so
/// `typedef struct S S;` does not conflict with `struct S`.
fn identity<P: AstProvider + ?Sized>(
    canon: &mut Canonicalizer<'_, P>,
    ty: TypeRef,
) -> Result<TypeIdx, SignatureError> {
    let idx = canon.lower(ty)?;
    Ok(match canon.pool().get(idx) {
        Type::Alias(alias) => alias.target,
        _ => idx,
    })
}
