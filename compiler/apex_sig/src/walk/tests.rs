use apex_ir::{
    AstProvider, FieldLayout, RecordKind, RecordLayout, TranslationUnit, TypeRef, UnitBuilder,
};
use pretty_assertions::assert_eq;

use super::*;
use crate::{collect_complete_types, RedefinitionPolicy};

/// Declare a struct and return its declaration and record type. The
/// struct stays incomplete until [`finish_struct`].
fn open_struct(b: &mut UnitBuilder, name: &str) -> (DeclId, TypeRef) {
    let root = b.root();
    let decl = b.add_decl(root, DeclKind::StructDecl, name);
    let ty = b.record(decl, RecordKind::Struct, &format!("struct {name}"));
    b.set_decl_type(decl, ty);
    (decl, ty)
}

fn field(b: &mut UnitBuilder, record: DeclId, name: &str, ty: TypeRef, offset_bits: u64) {
    let decl = b.add_decl(record, DeclKind::FieldDecl, name);
    b.set_decl_type(decl, ty);
    b.set_field_layout(
        decl,
        FieldLayout {
            offset_bits,
            bit_width: None,
        },
    );
}

fn finish_struct(b: &mut UnitBuilder, decl: DeclId, ty: TypeRef, size: u64, align: u64) {
    b.complete_record(ty, decl, RecordLayout { size, align });
}

fn walk(unit: &TranslationUnit, root: &str) -> Result<Closure, SignatureError> {
    let index = collect_complete_types(unit, RedefinitionPolicy::LastWins)?;
    GraphWalker::new(unit, &index).walk(root)
}

fn names(closure: &Closure) -> Vec<String> {
    closure
        .nodes()
        .iter()
        .map(|&idx| closure.pool().display_name(idx))
        .collect()
}

#[test]
fn self_referential_record_terminates() {
    let mut b = UnitBuilder::new();
    let int = b.builtin("int", Some(4), 4);
    let (decl, node) = open_struct(&mut b, "Node");
    let elaborated = b.elaborated(node);
    let next = b.pointer(elaborated, 8, 8);
    field(&mut b, decl, "next", next, 0);
    field(&mut b, decl, "value", int, 64);
    finish_struct(&mut b, decl, node, 16, 8);
    let unit = b.finish();

    let closure = walk(&unit, "Node").unwrap();
    assert_eq!(names(&closure), vec!["struct Node", "struct Node *", "int"]);
    let members = closure.members(closure.root()).unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].ty, closure.nodes()[1]);
}

#[test]
fn mutual_recursion_visits_each_record_once() {
    let mut b = UnitBuilder::new();
    let (a_decl, a) = open_struct(&mut b, "A");
    let (b_decl, b_ty) = open_struct(&mut b, "B");
    let a_elab = b.elaborated(a);
    let b_elab = b.elaborated(b_ty);
    let to_b = b.pointer(b_elab, 8, 8);
    let to_a = b.pointer(a_elab, 8, 8);
    field(&mut b, a_decl, "b", to_b, 0);
    field(&mut b, b_decl, "a", to_a, 0);
    finish_struct(&mut b, a_decl, a, 8, 8);
    finish_struct(&mut b, b_decl, b_ty, 8, 8);
    let unit = b.finish();

    let closure = walk(&unit, "A").unwrap();
    assert_eq!(
        names(&closure),
        vec!["struct A", "struct B *", "struct B", "struct A *"]
    );
    let records = closure
        .nodes()
        .iter()
        .filter(|&&idx| closure.get(idx).as_record().is_some())
        .count();
    assert_eq!(records, 2);
}

#[test]
fn member_offsets_are_bytes() {
    let mut b = UnitBuilder::new();
    let char_ty = b.builtin("char", Some(1), 1);
    let int = b.builtin("int", Some(4), 4);
    let (decl, p) = open_struct(&mut b, "P");
    field(&mut b, decl, "a", char_ty, 0);
    field(&mut b, decl, "b", int, 32);
    finish_struct(&mut b, decl, p, 8, 4);
    let unit = b.finish();

    let closure = walk(&unit, "P").unwrap();
    let members = closure.members(closure.root()).unwrap();
    assert_eq!(members[1].name, "b");
    assert_eq!(members[1].spelling, "int");
    assert_eq!(members[1].offset, 4);
    assert_eq!(members[1].size, Some(4));
    assert_eq!(members[1].bit_field, None);
}

#[test]
fn bit_fields_keep_bit_placement() {
    let mut b = UnitBuilder::new();
    let uint = b.builtin("unsigned int", Some(4), 4);
    let (decl, flags) = open_struct(&mut b, "Flags");
    for (name, offset_bits) in [("lo", 0), ("hi", 13)] {
        let f = b.add_decl(decl, DeclKind::FieldDecl, name);
        b.set_decl_type(f, uint);
        b.set_field_layout(
            f,
            FieldLayout {
                offset_bits,
                bit_width: Some(13),
            },
        );
    }
    finish_struct(&mut b, decl, flags, 4, 4);
    let unit = b.finish();

    let closure = walk(&unit, "Flags").unwrap();
    let hi = &closure.members(closure.root()).unwrap()[1];
    assert_eq!(hi.offset, 1);
    assert_eq!(
        hi.bit_field,
        Some(BitField {
            width: 13,
            bit_offset: 13
        })
    );
}

#[test]
fn incomplete_pointee_is_a_stub_without_members() {
    let mut b = UnitBuilder::new();
    let (_, opaque) = open_struct(&mut b, "Opaque");
    let elaborated = b.elaborated(opaque);
    let handle = b.pointer(elaborated, 8, 8);
    let (decl, holder) = open_struct(&mut b, "Holder");
    field(&mut b, decl, "handle", handle, 0);
    finish_struct(&mut b, decl, holder, 8, 8);
    let unit = b.finish();

    let closure = walk(&unit, "Holder").unwrap();
    assert_eq!(
        names(&closure),
        vec!["struct Holder", "struct Opaque *", "struct Opaque"]
    );
    let opaque_idx = closure.nodes()[2];
    assert!(!closure.get(opaque_idx).as_record().unwrap().is_complete());
    assert!(closure.members(opaque_idx).is_none());
}

#[test]
fn function_pointers_reach_return_and_parameters() {
    let mut b = UnitBuilder::new();
    let root = b.root();
    let int = b.builtin("int", Some(4), 4);
    let long = b.builtin("long", Some(8), 8);
    let (arg_decl, arg) = open_struct(&mut b, "Arg");
    field(&mut b, arg_decl, "n", long, 0);
    finish_struct(&mut b, arg_decl, arg, 8, 8);
    let arg_elab = b.elaborated(arg);
    let arg_ptr = b.pointer(arg_elab, 8, 8);
    let func = b.function(int, vec![arg_ptr], false, true);
    let fn_ptr = b.pointer(func, 8, 8);
    let td = b.add_decl(root, DeclKind::TypedefDecl, "callback");
    let alias = b.typedef(td, "callback", fn_ptr, None);
    b.set_decl_type(td, alias);
    let unit = b.finish();

    let closure = walk(&unit, "callback").unwrap();
    assert_eq!(
        names(&closure),
        vec![
            "callback",
            "int (*)(struct Arg *)",
            "int",
            "struct Arg *",
            "struct Arg",
            "long",
        ]
    );
}

#[test]
fn arrays_expose_their_element() {
    let mut b = UnitBuilder::new();
    let int = b.builtin("int", Some(4), 4);
    let (item_decl, item) = open_struct(&mut b, "Item");
    field(&mut b, item_decl, "id", int, 0);
    finish_struct(&mut b, item_decl, item, 4, 4);
    let item_elab = b.elaborated(item);
    let items = b.array(item_elab, Some(3));
    let (decl, table) = open_struct(&mut b, "Table");
    field(&mut b, decl, "items", items, 0);
    finish_struct(&mut b, decl, table, 12, 4);
    let unit = b.finish();

    let closure = walk(&unit, "Table").unwrap();
    assert_eq!(
        names(&closure),
        vec!["struct Table", "struct Item [3]", "struct Item", "int"]
    );
    assert_eq!(closure.members(closure.root()).unwrap()[0].size, Some(12));
}

#[test]
fn unknown_root_is_not_found() {
    let mut b = UnitBuilder::new();
    open_struct(&mut b, "Opaque");
    let unit = b.finish();

    for name in ["Missing", "Opaque"] {
        let err = walk(&unit, name).unwrap_err();
        assert_eq!(
            err,
            SignatureError::TypeNotFound {
                name: name.to_owned()
            }
        );
    }
}

#[test]
fn field_without_layout_is_malformed() {
    let mut b = UnitBuilder::new();
    let int = b.builtin("int", Some(4), 4);
    let (decl, broken) = open_struct(&mut b, "Broken");
    let f = b.add_decl(decl, DeclKind::FieldDecl, "x");
    b.set_decl_type(f, int);
    finish_struct(&mut b, decl, broken, 4, 4);
    let unit = b.finish();

    let err = walk(&unit, "Broken").unwrap_err();
    assert_eq!(
        err,
        SignatureError::MalformedField {
            record: "struct Broken".to_owned(),
            field: "x".to_owned(),
            what: "offset",
        }
    );
}

#[test]
fn only_field_children_become_members() {
    let mut b = UnitBuilder::new();
    let int = b.builtin("int", Some(4), 4);
    let (decl, outer) = open_struct(&mut b, "Outer");
    let nested = b.add_decl(decl, DeclKind::StructDecl, "Nested");
    let nested_ty = b.record(nested, RecordKind::Struct, "struct Nested");
    b.set_decl_type(nested, nested_ty);
    field(&mut b, decl, "x", int, 0);
    finish_struct(&mut b, decl, outer, 4, 4);
    let unit = b.finish();

    assert_eq!(unit.decl_children(decl).len(), 2);
    let closure = walk(&unit, "Outer").unwrap();
    assert_eq!(closure.members(closure.root()).unwrap().len(), 1);
}
