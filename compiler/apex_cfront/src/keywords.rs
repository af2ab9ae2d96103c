//! C keyword resolution.
//!
//! Identifiers are lexed uniformly and resolved here, so GNU alternate
//! spellings (`__const__`, `__restrict`, `__signed__`, ...) map onto the
//! same keyword as their standard form.

/// A keyword the declaration parser acts on.
///
/// Statement keywords are absent: function bodies are skipped by brace
/// matching and never tokenized beyond that.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum Keyword {
    // Storage classes and function specifiers
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
    ThreadLocal,
    Inline,
    Noreturn,
    // Qualifiers
    Const,
    Volatile,
    Restrict,
    Atomic,
    /// Clang nullability annotations; accepted and dropped.
    Nullability,
    // Type specifiers
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Signed,
    Unsigned,
    Bool,
    Complex,
    Int128,
    Int128T,
    UInt128T,
    Float16,
    Float32,
    Float64,
    Float128,
    Float32x,
    Float64x,
    VaList,
    Struct,
    Union,
    Enum,
    // Operators and GNU extensions
    Sizeof,
    Alignof,
    Alignas,
    Attribute,
    Declspec,
    Asm,
    Extension,
    StaticAssert,
    Offsetof,
}

/// Look up a keyword by its spelling.
pub(crate) fn lookup(text: &str) -> Option<Keyword> {
    let keyword = match text {
        "typedef" => Keyword::Typedef,
        "extern" => Keyword::Extern,
        "static" => Keyword::Static,
        "auto" => Keyword::Auto,
        "register" => Keyword::Register,
        "_Thread_local" | "thread_local" | "__thread" => Keyword::ThreadLocal,
        "inline" | "__inline" | "__inline__" => Keyword::Inline,
        "_Noreturn" | "__noreturn__" => Keyword::Noreturn,

        "const" | "__const" | "__const__" => Keyword::Const,
        "volatile" | "__volatile" | "__volatile__" => Keyword::Volatile,
        "restrict" | "__restrict" | "__restrict__" => Keyword::Restrict,
        "_Atomic" => Keyword::Atomic,
        "_Nonnull" | "_Nullable" | "_Null_unspecified" | "__unaligned" => Keyword::Nullability,

        "void" => Keyword::Void,
        "char" => Keyword::Char,
        "short" => Keyword::Short,
        "int" => Keyword::Int,
        "long" => Keyword::Long,
        "float" => Keyword::Float,
        "double" => Keyword::Double,
        "signed" | "__signed" | "__signed__" => Keyword::Signed,
        "unsigned" => Keyword::Unsigned,
        "_Bool" | "bool" => Keyword::Bool,
        "_Complex" | "__complex__" => Keyword::Complex,
        "__int128" => Keyword::Int128,
        "__int128_t" => Keyword::Int128T,
        "__uint128_t" => Keyword::UInt128T,
        "_Float16" | "__fp16" => Keyword::Float16,
        "_Float32" => Keyword::Float32,
        "_Float64" => Keyword::Float64,
        "_Float128" | "__float128" => Keyword::Float128,
        "_Float32x" => Keyword::Float32x,
        "_Float64x" => Keyword::Float64x,
        "__builtin_va_list" => Keyword::VaList,
        "struct" => Keyword::Struct,
        "union" => Keyword::Union,
        "enum" => Keyword::Enum,

        "sizeof" => Keyword::Sizeof,
        "_Alignof" | "alignof" | "__alignof" | "__alignof__" => Keyword::Alignof,
        "_Alignas" | "alignas" => Keyword::Alignas,
        "__attribute__" | "__attribute" => Keyword::Attribute,
        "__declspec" => Keyword::Declspec,
        "asm" | "__asm" | "__asm__" => Keyword::Asm,
        "__extension__" => Keyword::Extension,
        "_Static_assert" | "static_assert" => Keyword::StaticAssert,
        "__builtin_offsetof" => Keyword::Offsetof,
        _ => return None,
    };
    Some(keyword)
}
