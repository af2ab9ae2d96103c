use pretty_assertions::assert_eq;

use super::*;
use crate::{ArrayType, FunctionPointer, Pointer, PrimitiveType, TypeAlias};

fn prim(pool: &mut TypePool, spelling: &str, size: u64) -> TypeIdx {
    pool.intern(
        TypeKey::Primitive {
            spelling: spelling.to_owned(),
            decl: None,
        },
        Type::Primitive(PrimitiveType {
            spelling: spelling.to_owned(),
            size: Some(size),
            align: Some(size),
        }),
    )
}

fn ptr(pool: &mut TypePool, pointee: TypeIdx) -> TypeIdx {
    pool.intern(
        TypeKey::Pointer(pointee),
        Type::Pointer(Pointer { pointee, size: 8 }),
    )
}

#[test]
fn pool_starts_empty() {
    let pool = TypePool::new();
    assert!(pool.is_empty());
    assert_eq!(pool.len(), 0);
}

#[test]
fn interning_same_key_returns_same_index() {
    let mut pool = TypePool::new();
    let a = prim(&mut pool, "int", 4);
    let b = prim(&mut pool, "int", 4);
    assert_eq!(a, b);
    assert_eq!(pool.len(), 1);

    let c = prim(&mut pool, "char", 1);
    assert_ne!(a, c);
    assert_eq!(pool.len(), 2);
}

#[test]
fn first_node_wins_for_a_key() {
    let mut pool = TypePool::new();
    let first = prim(&mut pool, "long", 8);
    let again = pool.intern(
        TypeKey::Primitive {
            spelling: "long".to_owned(),
            decl: None,
        },
        Type::Primitive(PrimitiveType {
            spelling: "long".to_owned(),
            size: Some(4),
            align: Some(4),
        }),
    );
    assert_eq!(first, again);
    let Type::Primitive(stored) = pool.get(first) else {
        panic!("expected a primitive");
    };
    assert_eq!(stored.size, Some(8));
}

#[test]
fn iter_follows_interning_order() {
    let mut pool = TypePool::new();
    let i = prim(&mut pool, "int", 4);
    let p = ptr(&mut pool, i);
    let order: Vec<TypeIdx> = pool.iter().map(|(idx, _)| idx).collect();
    assert_eq!(order, vec![i, p]);
}

#[test]
fn pointer_names_collapse_stars() {
    let mut pool = TypePool::new();
    let c = prim(&mut pool, "char", 1);
    let pc = ptr(&mut pool, c);
    let ppc = ptr(&mut pool, pc);
    assert_eq!(pool.display_name(pc), "char *");
    assert_eq!(pool.display_name(ppc), "char **");
}

#[test]
fn function_pointer_names_list_parameters() {
    let mut pool = TypePool::new();
    let i = prim(&mut pool, "int", 4);
    let v = pool.intern(
        TypeKey::Primitive {
            spelling: "void".to_owned(),
            decl: None,
        },
        Type::Primitive(PrimitiveType {
            spelling: "void".to_owned(),
            size: None,
            align: None,
        }),
    );

    let mut fp = |ret, params: Vec<TypeIdx>, variadic, prototyped| {
        pool.intern(
            TypeKey::FunctionPointer {
                ret,
                params: params.clone().into_boxed_slice(),
                variadic,
                prototyped,
            },
            Type::FunctionPointer(FunctionPointer {
                ret,
                params,
                variadic,
                prototyped,
                size: 8,
            }),
        )
    };
    let one = fp(i, vec![i], false, true);
    let none = fp(v, Vec::new(), false, true);
    let knr = fp(i, Vec::new(), false, false);
    let vararg = fp(i, vec![i], true, true);

    assert_eq!(pool.display_name(one), "int (*)(int)");
    assert_eq!(pool.display_name(none), "void (*)(void)");
    assert_eq!(pool.display_name(knr), "int (*)()");
    assert_eq!(pool.display_name(vararg), "int (*)(int, ...)");
}

#[test]
fn array_and_alias_names() {
    let mut pool = TypePool::new();
    let i = prim(&mut pool, "int", 4);
    let fixed = pool.intern(
        TypeKey::Array {
            element: i,
            len: Some(4),
        },
        Type::Array(ArrayType {
            element: i,
            len: Some(4),
            size: Some(16),
        }),
    );
    let flex = pool.intern(
        TypeKey::Array {
            element: i,
            len: None,
        },
        Type::Array(ArrayType {
            element: i,
            len: None,
            size: None,
        }),
    );
    let alias = pool.intern(
        TypeKey::Alias(apex_ir::DeclId::from_raw(3)),
        Type::Alias(TypeAlias {
            name: "myint".to_owned(),
            target: i,
        }),
    );
    assert_eq!(pool.display_name(fixed), "int [4]");
    assert_eq!(pool.display_name(flex), "int []");
    assert_eq!(pool.display_name(alias), "myint");
}
