use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use super::*;

/// An existing file to stand in for the header.
fn existing_file() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src/options/tests.rs")
        .display()
        .to_string()
}

fn analyze(args: &[&str]) -> Options {
    match Options::parse(args.iter().copied()).unwrap() {
        Command::Analyze(options) => options,
        other => panic!("expected analyze, got {other:?}"),
    }
}

#[test]
fn defaults() {
    let header = existing_file();
    let options = analyze(&["ExtensionApi", &header]);
    assert_eq!(
        options,
        Options {
            api_type: "ExtensionApi".to_owned(),
            header: PathBuf::from(&header),
            pg_config: None,
            target: "x86_64-unknown-linux-gnu".to_owned(),
            cc: None,
            includes: Vec::new(),
            defines: Vec::new(),
            preprocess: true,
            policy: RedefinitionPolicy::LastWins,
            verbose: false,
        }
    );
}

#[test]
fn every_option() {
    let header = existing_file();
    let options = analyze(&[
        "--target",
        "aarch64-apple-darwin",
        "-I",
        "inc",
        "-Iother",
        "-DFOO=1",
        "-D",
        "BAR",
        "--cc=/usr/bin/gcc",
        "--no-preprocess",
        "--strict-redefinitions",
        "-v",
        "Api",
        &header,
    ]);
    assert_eq!(options.target, "aarch64-apple-darwin");
    assert_eq!(
        options.includes,
        vec![PathBuf::from("inc"), PathBuf::from("other")]
    );
    assert_eq!(options.defines, vec!["FOO=1".to_owned(), "BAR".to_owned()]);
    assert_eq!(options.cc, Some(PathBuf::from("/usr/bin/gcc")));
    assert!(!options.preprocess);
    assert_eq!(options.policy, RedefinitionPolicy::Reject);
    assert!(options.verbose);
    assert_eq!(options.api_type, "Api");
}

#[test]
fn help_and_version_win() {
    assert_eq!(Options::parse(["--help", "bogus"]).unwrap(), Command::Help);
    assert_eq!(Options::parse(["-V"]).unwrap(), Command::Version);
}

#[test]
fn usage_errors() {
    let header = existing_file();
    let cases: Vec<(Vec<&str>, UsageError)> = vec![
        (vec![], UsageError::MissingArgument("api_type")),
        (vec!["Api"], UsageError::MissingArgument("header_file")),
        (
            vec!["Api", &header, "extra"],
            UsageError::UnexpectedArgument("extra".to_owned()),
        ),
        (
            vec!["--frobnicate", "Api", &header],
            UsageError::UnknownOption("--frobnicate".to_owned()),
        ),
        (
            vec!["Api", &header, "--target"],
            UsageError::MissingValue("--target".to_owned()),
        ),
        (
            vec!["Api", "/definitely/not/here.h"],
            UsageError::NoSuchHeader("/definitely/not/here.h".to_owned()),
        ),
        (
            vec!["--pg_config", "/no/pg_config", "Api", &header],
            UsageError::NoSuchPgConfig("/no/pg_config".to_owned()),
        ),
    ];
    for (args, expected) in cases {
        assert_eq!(Options::parse(args.clone()).unwrap_err(), expected, "{args:?}");
    }
}

#[test]
fn usage_lists_every_option() {
    for flag in [
        "--pg_config",
        "--target",
        "--cc",
        "-I",
        "-D",
        "--no-preprocess",
        "--strict-redefinitions",
        "--verbose",
        "--help",
        "--version",
    ] {
        assert!(USAGE.contains(flag), "{flag} missing from usage");
    }
}
