//! Driver runs against headers written to disk.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Output};

use apexc::{compiler_args, run, Command, Error, Options};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const API_HEADER: &str = "\
typedef struct MemoryContextData *MemoryContext;
typedef long Datum;

struct ApiHooks {
    Datum (*call)(int argc, Datum *argv);
};

typedef struct ExtensionApi {
    int version;
    MemoryContext context;
    struct ApiHooks hooks;
} ExtensionApi;
";

fn write_header(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn options(args: &[&str]) -> Options {
    match Options::parse(args.iter().copied()).unwrap() {
        Command::Analyze(options) => options,
        other => panic!("expected analyze, got {other:?}"),
    }
}

fn apex(args: &[&str]) -> Output {
    Process::new(env!("CARGO_BIN_EXE_apex"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn self_contained_header_without_toolchain() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_header(&dir, "api.h", API_HEADER);
    let header = header.to_str().unwrap();

    let out = run(&options(&["--no-preprocess", "ExtensionApi", header])).unwrap();
    assert_eq!(
        out,
        "\
Datum: long

Datum (*)(int, Datum *)

Datum *

ExtensionApi: struct ExtensionApi (size 24, align 8):
- version:
    type: int
    size: 4
    offset: 0
- context:
    type: MemoryContext
    size: 8
    offset: 8
- hooks:
    type: struct ApiHooks
    size: 8
    offset: 16

MemoryContext: struct MemoryContextData *

int

long

struct ApiHooks (size 8, align 8):
- call:
    type: Datum (*)(int, Datum *)
    size: 8
    offset: 0

struct ExtensionApi (size 24, align 8):
- version:
    type: int
    size: 4
    offset: 0
- context:
    type: MemoryContext
    size: 8
    offset: 8
- hooks:
    type: struct ApiHooks
    size: 8
    offset: 16

struct MemoryContextData

struct MemoryContextData *
"
    );
}

#[test]
fn target_changes_layout() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_header(&dir, "api.h", API_HEADER);
    let header = header.to_str().unwrap();

    let out = run(&options(&[
        "--no-preprocess",
        "--target=i686-unknown-linux-gnu",
        "ExtensionApi",
        header,
    ]))
    .unwrap();
    assert!(out.contains("struct ExtensionApi (size 12, align 4):"), "{out}");
}

#[test]
fn errors_carry_their_cause() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_header(&dir, "broken.h", "struct S { int x } ;\n");
    let header = header.to_str().unwrap();

    let err = run(&options(&["--no-preprocess", "S", header])).unwrap_err();
    assert!(matches!(&err, Error::Parse(parse) if parse.line == 1), "{err}");

    let good = write_header(&dir, "good.h", "struct S { int x; };\n");
    let good = good.to_str().unwrap();
    let err = run(&options(&["--no-preprocess", "Missing", good])).unwrap_err();
    assert_eq!(
        err.to_string(),
        "type `Missing` not found (or not complete) in translation unit"
    );

    let sparc = options(&["--no-preprocess", "--target=sparc-sun-solaris", "S", good]);
    let err = run(&sparc).unwrap_err();
    assert!(matches!(err, Error::Target(_)), "{err}");
}

#[test]
fn non_executable_pg_config_is_a_toolchain_error() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_header(&dir, "api.h", API_HEADER);
    let header = header.to_str().unwrap();
    let fake = write_header(&dir, "pg_config", "");
    let fake = fake.to_str().unwrap();

    let err = run(&options(&["--pg_config", fake, "ExtensionApi", header])).unwrap_err();
    assert!(matches!(err, Error::Toolchain(_)), "{err}");
}

#[test]
fn argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_header(&dir, "api.h", API_HEADER);
    let header_str = header.to_str().unwrap();

    let opts = options(&["-I", "extra", "-DPG=1", "ExtensionApi", header_str]);
    let args = compiler_args(&opts, Some(Path::new("/pg/server")));
    assert_eq!(
        args,
        vec![
            "--target=x86_64-unknown-linux-gnu".to_owned(),
            "-I/pg/server".to_owned(),
            format!("-I{}", dir.path().display()),
            "-Iextra".to_owned(),
            "-DPG=1".to_owned(),
        ]
    );
}

#[test]
fn exit_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_header(&dir, "api.h", API_HEADER);
    let header = header.to_str().unwrap();

    let ok = apex(&["--no-preprocess", "ExtensionApi", header]);
    assert_eq!(ok.status.code(), Some(0));
    assert!(String::from_utf8(ok.stdout)
        .unwrap()
        .starts_with("Datum: long\n"));
    assert!(ok.stderr.is_empty());

    let missing = apex(&["--no-preprocess", "Nope", header]);
    assert_eq!(missing.status.code(), Some(1));
    assert!(missing.stdout.is_empty());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("type `Nope` not found"));

    let usage = apex(&["--bogus"]);
    assert_eq!(usage.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&usage.stderr).contains("unknown option `--bogus`"));

    let help = apex(&["--help"]);
    assert_eq!(help.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&help.stdout).starts_with("Usage: apex"));
}

#[test]
fn comments_and_oversized_arrays_without_toolchain() {
    let dir = tempfile::tempdir().unwrap();
    let commented = write_header(
        &dir,
        "c.h",
        "/* hdr */\nstruct S {\n    int a; /** doc */\n    char b; /***/\n};\n",
    );
    let out = apex(&["--no-preprocess", "S", commented.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8(out.stdout)
        .unwrap()
        .contains("struct S (size 8, align 4):"));

    let huge = write_header(&dir, "huge.h", "struct S { char a[0x2000000000000000]; };\n");
    let out = apex(&["--no-preprocess", "S", huge.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("huge.h:1:19: array is too large"), "{stderr}");
}
