//! Byte offsets to presumed `file:line:col` locations.
//!
//! Preprocessed input is one stream with line markers (`# 12 "foo.h" 1`)
//! saying which header and line the following text came from. The map
//! records every marker and answers lookups relative to the nearest one
//! before the offset.


/// A `file:line:col` location, 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

#[derive(Clone, Debug)]
struct LineMarker {
    /// Physical line (0-based) the marker applies from.
    physical: u32,
    file: String,
    /// Presumed line number of `physical`.
    line: u32,
}

/// Line table plus line markers for one source text.
#[derive(Clone, Debug)]
pub struct SourceMap {
    file: String,
    /// Byte offset of each line start.
    line_starts: Vec<u32>,
    markers: Vec<LineMarker>,
}

impl SourceMap {
    /// Build the line table for `source`, attributed to `file` until the
    /// first line marker.
    pub fn new(file: &str, source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset_u32(i + 1));
            }
        }
        SourceMap {
            file: file.to_owned(),
            line_starts,
            markers: Vec::new(),
        }
    }

    /// Record that the line after the one containing `offset` is line
    /// `line` of `file`.
    pub(crate) fn add_marker(&mut self, offset: u32, file: Option<String>, line: u32) {
        let physical = self.physical_line(offset) + 1;
        let file = file
            .or_else(|| self.markers.last().map(|m| m.file.clone()))
            .unwrap_or_else(|| self.file.clone());
        self.markers.push(LineMarker {
            physical,
            file,
            line,
        });
    }

    /// 0-based physical line containing `offset`.
    fn physical_line(&self, offset: u32) -> u32 {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        offset_u32(idx)
    }

    /// Presumed location of a byte offset.
    pub fn locate(&self, source: &str, offset: u32) -> Location {
        let physical = self.physical_line(offset);
        let line_start = self.line_starts[physical as usize] as usize;
        let end = (offset as usize).min(source.len());
        let col = source
            .get(line_start..end)
            .map_or(1, |text| offset_u32(text.chars().count()) + 1);

        let marker = self
            .markers
            .iter()
            .rev()
            .find(|marker| marker.physical <= physical);
        match marker {
            Some(marker) => Location {
                file: marker.file.clone(),
                line: marker.line + (physical - marker.physical),
                col,
            },
            None => Location {
                file: self.file.clone(),
                line: physical + 1,
                col,
            },
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "headers larger than 4 GiB are not supported"
)]
fn offset_u32(n: usize) -> u32 {
    n as u32
}

/// Parse the body of a `#` directive as a line marker.
///
/// Accepts `# 12 "file.h" 1 3` (GNU) and `#line 12 "file.h"`. Returns
/// `None` for any other directive.
pub(crate) fn parse_line_marker(directive: &str) -> Option<(u32, Option<String>)> {
    let body = directive.trim_start().strip_prefix('#')?.trim_start();
    let body = body
        .strip_prefix("line")
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_whitespace()))
        .unwrap_or(body)
        .trim_start();

    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let line = body[..digits].parse().ok()?;
    let rest = body[digits..].trim_start();
    let file = rest
        .strip_prefix('"')
        .and_then(|quoted| quoted.find('"').map(|end| unescape_path(&quoted[..end])));
    Some((line, file))
}

fn unescape_path(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
