//! External tools: `pg_config` and the C preprocessor.
//!
//! Every failure here is reported before any parsing starts.


use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Default preprocessor driver, looked up on `PATH`.
pub const DEFAULT_PREPROCESSOR: &str = "clang";

/// `pg_config` or the preprocessor could not be found or did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("cannot find `{program}`: {reason}")]
    NotFound { program: String, reason: String },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed ({status}){}", stderr_suffix(.stderr))]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{program}` printed output that is not UTF-8")]
    NotUtf8 { program: String },

    #[error("`{program}` printed no include directory")]
    EmptyIncludeDir { program: String },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

/// The `pg_config` to ask for include directories: `explicit` when given,
/// otherwise the first one on `PATH`.
pub fn resolve_pg_config(explicit: Option<&Path>) -> Result<PathBuf, ToolchainError> {
    resolve("pg_config", explicit)
}

/// The preprocessor driver: `explicit` when given, otherwise `clang` from `PATH`.
pub fn resolve_preprocessor(explicit: Option<&Path>) -> Result<PathBuf, ToolchainError> {
    resolve(DEFAULT_PREPROCESSOR, explicit)
}

fn resolve(default: &str, explicit: Option<&Path>) -> Result<PathBuf, ToolchainError> {
    let wanted = explicit.map_or_else(|| PathBuf::from(default), Path::to_path_buf);
    let found = which::which(&wanted).map_err(|err| ToolchainError::NotFound {
        program: wanted.display().to_string(),
        reason: err.to_string(),
    })?;
    tracing::debug!(program = %found.display(), "resolved tool");
    Ok(found)
}

/// Server-side include directory reported by `pg_config --includedir-server`.
pub fn server_include_dir(pg_config: &Path) -> Result<PathBuf, ToolchainError> {
    let stdout = run_tool(pg_config, &["--includedir-server".to_owned()])?;
    let dir = stdout.trim();
    if dir.is_empty() {
        return Err(ToolchainError::EmptyIncludeDir {
            program: pg_config.display().to_string(),
        });
    }
    Ok(PathBuf::from(dir))
}

/// Run `<cc> -E -x c <args> <header>` and return the preprocessed text.
///
/// Line markers are kept so diagnostics point into the original headers.
pub fn preprocess(cc: &Path, args: &[String], header: &Path) -> Result<String, ToolchainError> {
    let mut full = vec!["-E".to_owned(), "-x".to_owned(), "c".to_owned()];
    full.extend_from_slice(args);
    full.push(header.display().to_string());
    run_tool(cc, &full)
}

fn run_tool(program: &Path, args: &[String]) -> Result<String, ToolchainError> {
    let name = program.display().to_string();
    tracing::debug!(program = %name, args = ?args, "running");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ToolchainError::Spawn {
            program: name.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(ToolchainError::Failed {
            program: name,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    String::from_utf8(output.stdout).map_err(|_| ToolchainError::NotUtf8 { program: name })
}
