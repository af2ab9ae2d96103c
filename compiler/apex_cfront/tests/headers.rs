//! End-to-end parses of realistic headers.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use apex_cfront::{parse, Target};
use apex_ir::{AstProvider, DeclId, DeclKind, TranslationUnit};
use pretty_assertions::assert_eq;

const EXTENSION_API: &str = r#"
# 1 "api.h"
typedef unsigned long Size;
typedef unsigned int Oid;
typedef long Datum;
typedef struct MemoryContextData *MemoryContext;

typedef enum NodeTag { T_Invalid = 0, T_List, T_Query = 100 } NodeTag;

typedef struct List {
    NodeTag type;
    int length;
    int max_length;
    union ListCell { void *ptr_value; int int_value; Oid oid_value; } *elements;
    union ListCell initial_elements[];
} List;

typedef Datum (*PGFunction)(struct FunctionCallInfoBaseData *fcinfo);

struct ExtensionApi {
    int version;
    const char *name;
    MemoryContext context;
    PGFunction handlers[4];
    void (*on_exit)(int code, Datum arg);
    unsigned is_trusted : 1,
             is_loaded : 1;
    Size  total_bytes;
};
"#;

fn find(unit: &TranslationUnit, kind: DeclKind, name: &str) -> Option<DeclId> {
    let mut stack = vec![unit.root()];
    let mut found = None;
    while let Some(decl) = stack.pop() {
        if unit.decl_kind(decl) == kind && unit.decl_spelling(decl) == name {
            found = Some(decl);
        }
        stack.extend(unit.decl_children(decl).iter().rev());
    }
    found
}

fn members(unit: &TranslationUnit, record: DeclId) -> Vec<(String, String, u64)> {
    unit.decl_children(record)
        .iter()
        .filter(|&&child| unit.decl_kind(child) == DeclKind::FieldDecl)
        .map(|&child| {
            (
                unit.decl_spelling(child).to_owned(),
                unit.type_spelling(unit.decl_type(child).unwrap()),
                unit.field_offset_bits(child).unwrap(),
            )
        })
        .collect()
}

#[test]
fn extension_api_layout() {
    let unit = parse(EXTENSION_API, "<stdin>", &Target::default()).unwrap();
    let api = find(&unit, DeclKind::StructDecl, "ExtensionApi").unwrap();
    let owned = |name: &str, ty: &str, bits: u64| (name.to_owned(), ty.to_owned(), bits);
    assert_eq!(
        members(&unit, api),
        vec![
            owned("version", "int", 0),
            owned("name", "const char *", 64),
            owned("context", "MemoryContext", 128),
            owned("handlers", "PGFunction [4]", 192),
            owned("on_exit", "void (*)(int, Datum)", 448),
            owned("is_trusted", "unsigned int", 512),
            owned("is_loaded", "unsigned int", 513),
            owned("total_bytes", "Size", 576),
        ]
    );
    let ty = unit.decl_type(api).unwrap();
    assert_eq!(unit.size_of(ty), Some(80));
    assert_eq!(unit.align_of(ty), Some(8));
}

#[test]
fn nested_tags_are_file_scope() {
    let unit = parse(EXTENSION_API, "<stdin>", &Target::default()).unwrap();
    let cell = find(&unit, DeclKind::UnionDecl, "ListCell").unwrap();
    assert_eq!(unit.size_of(unit.decl_type(cell).unwrap()), Some(8));

    let list = find(&unit, DeclKind::StructDecl, "List").unwrap();
    let list_ty = unit.decl_type(list).unwrap();
    assert_eq!(unit.size_of(list_ty), Some(24));

    let tag = find(&unit, DeclKind::EnumDecl, "NodeTag").unwrap();
    assert_eq!(unit.size_of(unit.decl_type(tag).unwrap()), Some(4));
}

#[test]
fn diagnostics_use_line_markers() {
    let source = "# 1 \"outer.h\"\nint a;\n# 40 \"inner.h\" 1\nint b;\nstruct { int x } broken;\n";
    let err = parse(source, "<stdin>", &Target::default()).unwrap_err();
    assert_eq!(err.file, "inner.h");
    assert_eq!(err.line, 41);
    assert_eq!(err.to_string(), format!("inner.h:41:{}: {}", err.col, err.message));
}

#[test]
fn llp64_long_is_four_bytes() {
    let target = Target::from_triple("x86_64-pc-windows-msvc").unwrap();
    let unit = parse("struct W { long l; void *p; };", "w.h", &target).unwrap();
    let w = find(&unit, DeclKind::StructDecl, "W").unwrap();
    let offsets: Vec<u64> = members(&unit, w).into_iter().map(|(_, _, bits)| bits / 8).collect();
    assert_eq!(offsets, vec![0, 8]);
    assert_eq!(unit.size_of(unit.decl_type(w).unwrap()), Some(16));
}

#[test]
fn unpreprocessed_header_with_comments() {
    let source = "\
/*-------------------------------------------------------------------------
 * api.h
 *    Extension entry points.
 *-------------------------------------------------------------------------
 */
#ifndef API_H
#define API_H

/** Handle passed to every hook. */
struct Handle {
    int id;         /* slot * 2 */
    void *state;    /***/
    // trailing
};

#endif /* API_H */
";
    let unit = parse(source, "api.h", &Target::default()).unwrap();
    let handle = find(&unit, DeclKind::StructDecl, "Handle").unwrap();
    let owned = |name: &str, ty: &str, bits: u64| (name.to_owned(), ty.to_owned(), bits);
    assert_eq!(
        members(&unit, handle),
        vec![owned("id", "int", 0), owned("state", "void *", 64)]
    );
}

#[test]
fn oversized_array_is_a_diagnostic() {
    let source = "struct S {\n    char a[0x2000000000000000];\n};\n";
    let err = parse(source, "big.h", &Target::default()).unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.message, "array is too large");
}
