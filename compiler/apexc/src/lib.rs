//! The apex driver.
//!
//! Resolves the toolchain, preprocesses the header, parses it for the
//! selected target and renders the signature of one API type. The `apex`
//! binary is a thin wrapper around [`run`].

mod options;
pub mod toolchain;

pub use options::{Command, Options, UsageError, USAGE};
pub use toolchain::ToolchainError;

use std::path::{Path, PathBuf};
use std::sync::Once;

use apex_cfront::{ParseError, Target, TargetError};
use apex_sig::{analyze, AnalyzeOptions, SignatureError};

/// Any failure after the command line was accepted. Exit status 1.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("cannot read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

static TRACING_INIT: Once = Once::new();

/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `warn`, or `debug`
/// with `verbose`. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        let default = if verbose { "debug" } else { "warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let tree = tracing_tree::HierarchicalLayer::new(2)
            .with_writer(std::io::stderr)
            .with_targets(true);
        // Another subscriber may already be installed by an embedding program.
        let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
    });
}

/// Preprocessor arguments, in order: the target, the server include
/// directory, the header's own directory, then user `-I` and `-D`.
pub fn compiler_args(options: &Options, include_dir: Option<&Path>) -> Vec<String> {
    let mut args = vec![format!("--target={}", options.target)];
    if let Some(dir) = include_dir {
        args.push(format!("-I{}", dir.display()));
    }
    args.push(format!("-I{}", header_dir(&options.header).display()));
    args.extend(
        options
            .includes
            .iter()
            .map(|dir| format!("-I{}", dir.display())),
    );
    args.extend(options.defines.iter().map(|define| format!("-D{define}")));
    args
}

fn header_dir(header: &Path) -> &Path {
    match header.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Produce the complete signature text for `options`.
///
/// Nothing is printed here; the caller writes the result only once the
/// whole signature has been rendered.
#[tracing::instrument(level = "debug", skip_all, fields(api_type = %options.api_type))]
pub fn run(options: &Options) -> Result<String, Error> {
    let target = Target::from_triple(&options.target)?;
    let source = if options.preprocess {
        let pg_config = toolchain::resolve_pg_config(options.pg_config.as_deref())?;
        let include_dir = toolchain::server_include_dir(&pg_config)?;
        let cc = toolchain::resolve_preprocessor(options.cc.as_deref())?;
        let args = compiler_args(options, Some(&include_dir));
        toolchain::preprocess(&cc, &args, &options.header)?
    } else {
        std::fs::read_to_string(&options.header).map_err(|source| Error::Read {
            path: options.header.clone(),
            source,
        })?
    };

    let file_name = options.header.display().to_string();
    let unit = apex_cfront::parse(&source, &file_name, &target)?;
    let signature = analyze(
        &unit,
        &options.api_type,
        AnalyzeOptions {
            policy: options.policy,
        },
    )?;
    tracing::debug!(blocks = signature.len(), "rendered signature");
    Ok(signature.to_string())
}
