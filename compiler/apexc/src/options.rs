//! Command-line options.

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

use std::path::PathBuf;

use apex_cfront::Target;
use apex_sig::RedefinitionPolicy;

pub const USAGE: &str = "\
Usage: apex [options] <api_type> <header_file>

Print the type signature of <api_type> as declared in <header_file>.

Options:
  --pg_config <path>       pg_config executable (default: search PATH)
  --target <triple>        Target triple (default: x86_64-unknown-linux-gnu)
  --cc <path>              Preprocessor driver (default: clang from PATH)
  -I <dir>                 Add an include directory
  -D <name[=value]>        Define a macro
  --no-preprocess          Parse the header as-is (self-contained headers)
  --strict-redefinitions   Fail when a type name is defined twice differently
  -v, --verbose            Debug logging to stderr
  -h, --help               Print this help
  -V, --version            Print the version";

/// Everything one `apex` run needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub api_type: String,
    pub header: PathBuf,
    pub pg_config: Option<PathBuf>,
    pub target: String,
    pub cc: Option<PathBuf>,
    pub includes: Vec<PathBuf>,
    pub defines: Vec<String>,
    /// `false` with `--no-preprocess`.
    pub preprocess: bool,
    pub policy: RedefinitionPolicy,
    pub verbose: bool,
}

/// What the command line asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Analyze(Options),
    Help,
    Version,
}

/// A command line that does not parse. Exit status 2.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("option `{0}` requires a value")]
    MissingValue(String),

    #[error("missing <{0}> argument")]
    MissingArgument(&'static str),

    #[error("unexpected argument `{0}`")]
    UnexpectedArgument(String),

    #[error("header file `{0}` does not exist")]
    NoSuchHeader(String),

    #[error("pg_config `{0}` does not exist")]
    NoSuchPgConfig(String),
}

impl Options {
    /// Parse arguments, without the program name.
    ///
    /// Value options accept both `--opt value` and `--opt=value`; `-I` and
    /// `-D` also take the value attached (`-Iinclude`).
    pub fn parse<I>(args: I) -> Result<Command, UsageError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let mut positional = Vec::new();
        let mut pg_config = None;
        let mut target = None;
        let mut cc = None;
        let mut includes = Vec::new();
        let mut defines = Vec::new();
        let mut preprocess = true;
        let mut policy = RedefinitionPolicy::LastWins;
        let mut verbose = false;

        while let Some(arg) = args.next() {
            if let Some(dir) = arg.strip_prefix("-I").filter(|d| !d.is_empty()) {
                includes.push(PathBuf::from(dir));
                continue;
            }
            if let Some(define) = arg.strip_prefix("-D").filter(|d| !d.is_empty()) {
                defines.push(define.to_owned());
                continue;
            }

            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_owned())),
                _ => (arg.as_str(), None),
            };
            let mut value = |name: &str| match inline.clone() {
                Some(value) => Ok(value),
                None => args
                    .next()
                    .ok_or_else(|| UsageError::MissingValue(name.to_owned())),
            };

            match flag {
                "-h" | "--help" => return Ok(Command::Help),
                "-V" | "--version" => return Ok(Command::Version),
                "-v" | "--verbose" => verbose = true,
                "--no-preprocess" => preprocess = false,
                "--strict-redefinitions" => policy = RedefinitionPolicy::Reject,
                "--pg_config" | "--pg-config" => pg_config = Some(PathBuf::from(value(flag)?)),
                "--target" => target = Some(value(flag)?),
                "--cc" => cc = Some(PathBuf::from(value(flag)?)),
                "-I" => includes.push(PathBuf::from(value(flag)?)),
                "-D" => defines.push(value(flag)?),
                _ if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(UsageError::UnknownOption(flag.to_owned()));
                }
                _ => positional.push(flag.to_owned()),
            }
        }

        let mut positional = positional.into_iter();
        let api_type = positional
            .next()
            .ok_or(UsageError::MissingArgument("api_type"))?;
        let header = positional
            .next()
            .map(PathBuf::from)
            .ok_or(UsageError::MissingArgument("header_file"))?;
        if let Some(extra) = positional.next() {
            return Err(UsageError::UnexpectedArgument(extra));
        }
        if !header.is_file() {
            return Err(UsageError::NoSuchHeader(header.display().to_string()));
        }
        if let Some(path) = &pg_config {
            if !path.is_file() {
                return Err(UsageError::NoSuchPgConfig(path.display().to_string()));
            }
        }

        Ok(Command::Analyze(Options {
            api_type,
            header,
            pg_config,
            target: target.unwrap_or_else(|| Target::DEFAULT_TRIPLE.to_owned()),
            cc,
            includes,
            defines,
            preprocess,
            policy,
            verbose,
        }))
    }
}
