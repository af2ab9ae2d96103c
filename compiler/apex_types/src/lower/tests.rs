use apex_ir::{DeclKind, Qualifiers, RecordLayout, TranslationUnit, UnitBuilder};
use pretty_assertions::assert_eq;

use super::*;

fn lower_all(unit: &TranslationUnit, tys: &[TypeRef]) -> (TypePool, Vec<TypeIdx>) {
    let mut pool = TypePool::new();
    let mut canon = Canonicalizer::new(unit, &mut pool);
    let out = tys
        .iter()
        .map(|ty| canon.lower(*ty))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (pool, out)
}

#[test]
fn alias_chain_keeps_outer_name_and_resolves_target() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let int = b.builtin("int", Some(4), 4);
    let d_a = b.add_decl(root, DeclKind::TypedefDecl, "a_t");
    let a = b.typedef(d_a, "a_t", int, None);
    let d_b = b.add_decl(root, DeclKind::TypedefDecl, "b_t");
    let alias_b = b.typedef(d_b, "b_t", a, None);
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[alias_b, int]);
    let Type::Alias(alias) = pool.get(idx[0]) else {
        panic!("expected an alias, got {:?}", pool.get(idx[0]));
    };
    assert_eq!(alias.name, "b_t");
    assert_eq!(alias.target, idx[1]);
    assert_eq!(pool.display_name(idx[0]), "b_t");
}

#[test]
fn same_handle_lowers_to_same_index() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let int = b.builtin("int", Some(4), 4);
    let decl = b.add_decl(root, DeclKind::StructDecl, "S");
    let rec = b.record(decl, RecordKind::Struct, "struct S");
    b.complete_record(rec, decl, RecordLayout { size: 4, align: 4 });
    let elab = b.elaborated(rec);
    let p = b.pointer(elab, 8, 8);
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[rec, elab, p, p, int, int]);
    assert_eq!(idx[0], idx[1]);
    assert_eq!(idx[2], idx[3]);
    assert_eq!(idx[4], idx[5]);
    assert_eq!(pool.len(), 3);
}

#[test]
fn records_are_stubs_keyed_by_declaration() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let d1 = b.add_decl(root, DeclKind::StructDecl, "S");
    let d2 = b.add_decl(root, DeclKind::UnionDecl, "S");
    let s = b.record(d1, RecordKind::Struct, "struct S");
    b.complete_record(s, d1, RecordLayout { size: 8, align: 4 });
    let u = b.record(d2, RecordKind::Union, "union S");
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[s, u]);
    assert_ne!(idx[0], idx[1]);

    let s = pool.get(idx[0]).as_record().unwrap();
    assert_eq!(s.name, "struct S");
    assert_eq!(s.kind, RecordKind::Struct);
    assert_eq!(s.layout, Some(RecordLayout { size: 8, align: 4 }));
    assert!(s.is_complete());
    assert!(pool.get(idx[0]).children().is_empty());

    let u = pool.get(idx[1]).as_record().unwrap();
    assert_eq!(u.kind, RecordKind::Union);
    assert_eq!(u.layout, None);
    assert!(!u.is_complete());
}

#[test]
fn pointer_to_function_becomes_function_pointer() {
    let mut b = UnitBuilder::new();
    let int = b.builtin("int", Some(4), 4);
    let c = b.builtin("char", Some(1), 1);
    let cc = b.qualified(c, Qualifiers::CONST);
    let pcc = b.pointer(cc, 8, 8);
    let func = b.function(int, vec![int, pcc], false, true);
    let fp = b.pointer(func, 8, 8);
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[fp]);
    let Type::FunctionPointer(fp) = pool.get(idx[0]) else {
        panic!("expected a function pointer");
    };
    assert_eq!(fp.params.len(), 2);
    assert_eq!(fp.size, 8);
    assert!(!fp.variadic);
    assert_eq!(pool.display_name(fp.ret), "int");
    assert_eq!(pool.display_name(idx[0]), "int (*)(int, const char *)");
    assert_eq!(
        pool.get(idx[0]).children(),
        [vec![fp.ret], fp.params.clone()].concat()
    );
}

#[test]
fn pointer_through_function_typedef_is_function_pointer() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let void = b.builtin("void", None, 1);
    let int = b.builtin("int", Some(4), 4);
    let func = b.function(void, vec![int], false, true);
    let decl = b.add_decl(root, DeclKind::TypedefDecl, "callback_fn");
    let alias = b.typedef(decl, "callback_fn", func, None);
    let p = b.pointer(alias, 8, 8);
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[p]);
    assert!(matches!(pool.get(idx[0]), Type::FunctionPointer(_)));
    assert_eq!(pool.display_name(idx[0]), "void (*)(int)");
}

#[test]
fn data_pointers_keep_alias_pointee() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let c = b.builtin("char", Some(1), 1);
    let decl = b.add_decl(root, DeclKind::TypedefDecl, "text");
    let alias = b.typedef(decl, "text", c, None);
    let p = b.pointer(alias, 8, 8);
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[p]);
    let Type::Pointer(ptr) = pool.get(idx[0]) else {
        panic!("expected a data pointer");
    };
    assert!(matches!(pool.get(ptr.pointee), Type::Alias(_)));
    assert_eq!(pool.display_name(idx[0]), "text *");
}

#[test]
fn arrays_lower_with_bounds_and_size() {
    let mut b = UnitBuilder::new();
    let int = b.builtin("int", Some(4), 4);
    let fixed = b.array(int, Some(4));
    let flex = b.array(int, None);
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[fixed, flex]);
    let Type::Array(arr) = pool.get(idx[0]) else {
        panic!("expected an array");
    };
    assert_eq!(arr.len, Some(4));
    assert_eq!(arr.size, Some(16));
    let Type::Array(arr) = pool.get(idx[1]) else {
        panic!("expected an array");
    };
    assert_eq!(arr.len, None);
    assert_eq!(arr.size, None);
    assert_eq!(pool.display_name(idx[1]), "int []");
}

#[test]
fn enums_with_same_spelling_stay_distinct() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let d1 = b.add_decl(root, DeclKind::EnumDecl, "");
    let d2 = b.add_decl(root, DeclKind::EnumDecl, "");
    let e1 = b.enumeration(d1, "enum color", 4, 4);
    let e2 = b.enumeration(d2, "enum color", 4, 4);
    let unit = b.finish();

    let (_, idx) = lower_all(&unit, &[e1, e2]);
    assert_ne!(idx[0], idx[1]);
}

#[test]
fn alias_chain_longer_than_limit_is_rejected() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let mut ty = b.builtin("int", Some(4), 4);
    for step in 0..=MAX_ALIAS_STEPS {
        let name = format!("t{step}");
        let decl = b.add_decl(root, DeclKind::TypedefDecl, &name);
        ty = b.typedef(decl, &name, ty, None);
    }
    let unit = b.finish();

    let mut pool = TypePool::new();
    let err = Canonicalizer::new(&unit, &mut pool).lower(ty).unwrap_err();
    assert_eq!(
        err,
        LowerError::UnterminatedAliasChain {
            spelling: format!("t{MAX_ALIAS_STEPS}"),
            steps: MAX_ALIAS_STEPS,
        }
    );
}

#[test]
fn alias_chain_at_limit_resolves() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let mut ty = b.builtin("int", Some(4), 4);
    for step in 0..MAX_ALIAS_STEPS {
        let name = format!("t{step}");
        let decl = b.add_decl(root, DeclKind::TypedefDecl, &name);
        ty = b.typedef(decl, &name, ty, None);
    }
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[ty]);
    let Type::Alias(alias) = pool.get(idx[0]) else {
        panic!("expected an alias");
    };
    assert_eq!(pool.display_name(alias.target), "int");
}

#[test]
fn qualifiers_are_part_of_every_pointee_identity() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let c = b.builtin("char", Some(1), 1);
    let cc = b.qualified(c, Qualifiers::CONST);
    let decl = b.add_decl(root, DeclKind::StructDecl, "");
    let rec = b.record(decl, RecordKind::Struct, "struct (anonymous)");
    b.complete_record(rec, decl, RecordLayout { size: 4, align: 4 });
    let d_anon = b.add_decl(root, DeclKind::TypedefDecl, "Anon");
    let anon = b.typedef(d_anon, "Anon", rec, None);
    let const_anon = b.qualified(anon, Qualifiers::CONST);
    let const_rec = b.qualified(rec, Qualifiers::CONST | Qualifiers::VOLATILE);
    let pointers = [
        b.pointer(c, 8, 8),
        b.pointer(cc, 8, 8),
        b.pointer(anon, 8, 8),
        b.pointer(const_anon, 8, 8),
        b.pointer(rec, 8, 8),
        b.pointer(const_rec, 8, 8),
    ];
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &pointers);
    let names: Vec<String> = idx.iter().map(|&i| pool.display_name(i)).collect();
    assert_eq!(
        names,
        vec![
            "char *",
            "const char *",
            "Anon *",
            "const Anon *",
            "struct (anonymous) *",
            "const volatile struct (anonymous) *",
        ]
    );
    for pair in idx.chunks(2) {
        assert_ne!(pair[0], pair[1]);
    }

    let Type::Pointer(ptr) = pool.get(idx[3]) else {
        panic!("expected a data pointer");
    };
    let Type::Qualified(qual) = pool.get(ptr.pointee) else {
        panic!("expected a qualified pointee, got {:?}", pool.get(ptr.pointee));
    };
    assert_eq!(qual.quals, Qualifiers::CONST);
    let Type::Pointer(plain) = pool.get(idx[2]) else {
        panic!("expected a data pointer");
    };
    assert_eq!(qual.inner, plain.pointee);
}

#[test]
fn qualified_pointers_spell_their_qualifiers() {
    let mut b = UnitBuilder::new();
    let int = b.builtin("int", Some(4), 4);
    let p = b.pointer(int, 8, 8);
    let const_p = b.qualified(p, Qualifiers::CONST);
    let func = b.function(int, vec![int], false, true);
    let fp = b.pointer(func, 8, 8);
    let const_fp = b.qualified(fp, Qualifiers::CONST);
    let unit = b.finish();

    let (pool, idx) = lower_all(&unit, &[const_p, p, const_fp]);
    assert_eq!(pool.display_name(idx[0]), "int *const");
    assert_eq!(pool.get(idx[0]).children(), vec![idx[1]]);
    assert_eq!(pool.display_name(idx[2]), "int (*const)(int)");
}
