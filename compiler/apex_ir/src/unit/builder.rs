//! Incremental construction of a [`TranslationUnit`].

use rustc_hash::FxHashMap;

use super::{
    align_in, size_in, DeclData, FieldLayout, RecordLayout, TranslationUnit, TypeData, TypeEntry,
};
use crate::{DeclId, DeclKind, Qualifiers, RecordKind, TypeRef};

/// Builds a translation unit declaration by declaration.
///
/// Structural types are interned, so asking twice for `int *` returns the
/// same [`TypeRef`]. Records, enums and typedefs are never interned: each
/// call creates a new identity.
pub struct UnitBuilder {
    decls: Vec<DeclData>,
    types: Vec<TypeEntry>,
    interned: FxHashMap<TypeEntry, TypeRef>,
}

impl Default for UnitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitBuilder {
    /// Create a builder holding only the translation-unit root.
    pub fn new() -> Self {
        let root = DeclData {
            kind: DeclKind::TranslationUnit,
            spelling: String::new(),
            children: Vec::new(),
            ty: None,
            field: None,
        };
        UnitBuilder {
            decls: vec![root],
            types: Vec::new(),
            interned: FxHashMap::default(),
        }
    }

    /// The translation-unit root declaration.
    pub fn root(&self) -> DeclId {
        DeclId::from_raw(0)
    }

    /// Append a declaration as the last child of `parent`.
    pub fn add_decl(&mut self, parent: DeclId, kind: DeclKind, spelling: &str) -> DeclId {
        let id = DeclId::from_raw(next_raw(self.decls.len()));
        self.decls.push(DeclData {
            kind,
            spelling: spelling.to_owned(),
            children: Vec::new(),
            ty: None,
            field: None,
        });
        self.decls[parent.index()].children.push(id);
        id
    }

    /// Attach the type a declaration has or introduces.
    pub fn set_decl_type(&mut self, decl: DeclId, ty: TypeRef) {
        self.decls[decl.index()].ty = Some(ty);
    }

    /// Record where a field landed inside its record.
    pub fn set_field_layout(&mut self, decl: DeclId, layout: FieldLayout) {
        self.decls[decl.index()].field = Some(layout);
    }

    /// Kind of a declaration added so far.
    pub fn decl_kind(&self, decl: DeclId) -> DeclKind {
        self.decls[decl.index()].kind
    }

    /// Shape of a type added so far.
    pub fn type_data(&self, ty: TypeRef) -> &TypeData {
        &self.types[ty.index()].data
    }

    /// Qualifiers of a type added so far.
    pub fn qualifiers(&self, ty: TypeRef) -> Qualifiers {
        self.types[ty.index()].quals
    }

    /// Size in bytes of a type added so far; `None` while incomplete.
    pub fn size_of(&self, ty: TypeRef) -> Option<u64> {
        size_in(&self.types, ty)
    }

    /// Alignment in bytes of a type added so far; `None` while incomplete.
    pub fn align_of(&self, ty: TypeRef) -> Option<u64> {
        align_in(&self.types, ty)
    }

    /// A builtin scalar such as `int` or `void`.
    pub fn builtin(&mut self, name: &str, size: Option<u64>, align: u64) -> TypeRef {
        self.intern(TypeData::Builtin {
            name: name.to_owned(),
            size,
            align,
        })
    }

    pub fn pointer(&mut self, pointee: TypeRef, size: u64, align: u64) -> TypeRef {
        self.intern(TypeData::Pointer {
            pointee,
            size,
            align,
        })
    }

    pub fn function(
        &mut self,
        ret: TypeRef,
        params: Vec<TypeRef>,
        variadic: bool,
        prototyped: bool,
    ) -> TypeRef {
        self.intern(TypeData::Function {
            ret,
            params,
            variadic,
            prototyped,
        })
    }

    pub fn array(&mut self, element: TypeRef, len: Option<u64>) -> TypeRef {
        self.intern(TypeData::Array { element, len })
    }

    /// `struct Foo` / `enum Bar` spelled with the keyword.
    pub fn elaborated(&mut self, named: TypeRef) -> TypeRef {
        self.intern(TypeData::Elaborated { named })
    }

    /// `ty` with additional qualifiers.
    ///
    /// Records and enums are wrapped in an elaborated reference first, so
    /// the record handle itself stays the single owner of its layout.
    pub fn qualified(&mut self, ty: TypeRef, quals: Qualifiers) -> TypeRef {
        if quals.is_empty() {
            return ty;
        }
        let base = match self.types[ty.index()].data {
            TypeData::Record { .. } | TypeData::Enum { .. } => self.elaborated(ty),
            _ => ty,
        };
        let entry = &self.types[base.index()];
        let merged = TypeEntry {
            data: entry.data.clone(),
            quals: entry.quals | quals,
        };
        self.intern_entry(merged)
    }

    /// A new typedef name for `underlying`.
    pub fn typedef(
        &mut self,
        decl: DeclId,
        name: &str,
        underlying: TypeRef,
        align: Option<u64>,
    ) -> TypeRef {
        self.push(TypeEntry {
            data: TypeData::Typedef {
                decl,
                name: name.to_owned(),
                underlying,
                align,
            },
            quals: Qualifiers::empty(),
        })
    }

    /// A new, still incomplete record.
    pub fn record(&mut self, decl: DeclId, kind: RecordKind, spelling: &str) -> TypeRef {
        self.push(TypeEntry {
            data: TypeData::Record {
                decl,
                kind,
                spelling: spelling.to_owned(),
                layout: None,
            },
            quals: Qualifiers::empty(),
        })
    }

    /// Complete a record: point it at its defining declaration and fix its layout.
    pub fn complete_record(&mut self, ty: TypeRef, definition: DeclId, complete: RecordLayout) {
        if let TypeData::Record { decl, layout, .. } = &mut self.types[ty.index()].data {
            *decl = definition;
            *layout = Some(complete);
        }
    }

    /// A new enumeration type.
    pub fn enumeration(&mut self, decl: DeclId, spelling: &str, size: u64, align: u64) -> TypeRef {
        self.push(TypeEntry {
            data: TypeData::Enum {
                decl,
                spelling: spelling.to_owned(),
                size,
                align,
            },
            quals: Qualifiers::empty(),
        })
    }

    /// Fix the underlying size of an enumeration once all values are known.
    pub fn complete_enum(&mut self, ty: TypeRef, definition: DeclId, new_size: u64, new_align: u64) {
        if let TypeData::Enum {
            decl, size, align, ..
        } = &mut self.types[ty.index()].data
        {
            *decl = definition;
            *size = new_size;
            *align = new_align;
        }
    }

    /// Freeze the unit.
    pub fn finish(self) -> TranslationUnit {
        TranslationUnit {
            decls: self.decls,
            types: self.types,
        }
    }

    fn intern(&mut self, data: TypeData) -> TypeRef {
        self.intern_entry(TypeEntry {
            data,
            quals: Qualifiers::empty(),
        })
    }

    fn intern_entry(&mut self, entry: TypeEntry) -> TypeRef {
        if let Some(&existing) = self.interned.get(&entry) {
            return existing;
        }
        let ty = self.push(entry.clone());
        self.interned.insert(entry, ty);
        ty
    }

    fn push(&mut self, entry: TypeEntry) -> TypeRef {
        let ty = TypeRef::from_raw(next_raw(self.types.len()));
        self.types.push(entry);
        ty
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "a header with over 4 billion declarations is not a supported input"
)]
fn next_raw(len: usize) -> u32 {
    len as u32
}
