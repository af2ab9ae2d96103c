//! Identity-interning arena of [`Type`] nodes.

#[cfg(test)]
mod tests;

use apex_ir::{DeclId, Qualifiers};
use rustc_hash::FxHashMap;

use crate::{FunctionPointer, Type, TypeIdx};

/// Canonical identity of a node.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum TypeKey {
    Primitive {
        spelling: String,
        decl: Option<DeclId>,
    },
    Alias(DeclId),
    Pointer(TypeIdx),
    FunctionPointer {
        ret: TypeIdx,
        params: Box<[TypeIdx]>,
        variadic: bool,
        prototyped: bool,
    },
    Record(DeclId),
    Array {
        element: TypeIdx,
        len: Option<u64>,
    },
    Qualified {
        quals: Qualifiers,
        inner: TypeIdx,
    },
}

/// Arena of immutable type nodes, one per canonical identity.
///
/// Nodes are never removed or mutated once interned. A node referenced
/// from many places is stored once and shared by index.
#[derive(Default, Debug)]
pub struct TypePool {
    types: Vec<Type>,
    keys: FxHashMap<TypeKey, TypeIdx>,
}

impl TypePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node.
    ///
    /// # Panics
    /// Panics if `idx` was not produced by this pool.
    pub fn get(&self, idx: TypeIdx) -> &Type {
        &self.types[idx.index()]
    }

    /// Number of interned nodes.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All nodes in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeIdx, &Type)> {
        (0u32..).zip(self.types.iter()).map(|(raw, ty)| (TypeIdx::from_raw(raw), ty))
    }

    pub(crate) fn find(&self, key: &TypeKey) -> Option<TypeIdx> {
        self.keys.get(key).copied()
    }

    /// Intern `ty` under `key`, returning the existing node if the identity
    /// is already present.
    pub(crate) fn intern(&mut self, key: TypeKey, ty: Type) -> TypeIdx {
        if let Some(existing) = self.find(&key) {
            return existing;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "pool size is bounded by the number of front-end types"
        )]
        let idx = TypeIdx::from_raw(self.types.len() as u32);
        self.types.push(ty);
        self.keys.insert(key, idx);
        idx
    }

    /// Human-readable name used for sorting and for references to this
    /// node from other signatures.
    pub fn display_name(&self, idx: TypeIdx) -> String {
        match self.get(idx) {
            Type::Primitive(prim) => prim.spelling.clone(),
            Type::Alias(alias) => alias.name.clone(),
            Type::Record(record) => record.name.clone(),
            Type::Pointer(ptr) => {
                let inner = self.display_name(ptr.pointee);
                if inner.ends_with('*') {
                    format!("{inner}*")
                } else {
                    format!("{inner} *")
                }
            }
            Type::FunctionPointer(fp) => self.function_pointer_name(fp, ""),
            Type::Array(arr) => match arr.len {
                Some(len) => format!("{} [{len}]", self.display_name(arr.element)),
                None => format!("{} []", self.display_name(arr.element)),
            },
            Type::Qualified(qual) => match self.get(qual.inner) {
                Type::Pointer(_) => format!("{}{}", self.display_name(qual.inner), qual.quals),
                Type::FunctionPointer(fp) => {
                    self.function_pointer_name(fp, &qual.quals.to_string())
                }
                _ => format!("{} {}", qual.quals, self.display_name(qual.inner)),
            },
        }
    }

    /// `ret (*quals)(params)`.
    fn function_pointer_name(&self, fp: &FunctionPointer, quals: &str) -> String {
        let mut params: Vec<String> = fp.params.iter().map(|p| self.display_name(*p)).collect();
        if fp.variadic {
            params.push("...".to_owned());
        } else if params.is_empty() && fp.prototyped {
            params.push("void".to_owned());
        }
        format!("{} (*{quals})({})", self.display_name(fp.ret), params.join(", "))
    }
}
