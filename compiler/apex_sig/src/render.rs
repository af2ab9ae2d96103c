//! Signature engine: deterministic text for a closure.


use std::fmt::{self, Write as _};

use apex_types::{Member, Type, TypeIdx};

use crate::Closure;

/// The signature of one type of the closure.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SignatureBlock {
    /// Sort key; also how other blocks refer to this type.
    pub display_name: String,
    pub text: String,
}

/// Sorted signature blocks of a whole closure.
///
/// `Display` joins the blocks with one blank line and ends with a newline.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Signature {
    blocks: Vec<SignatureBlock>,
}

impl Signature {
    pub fn blocks(&self) -> &[SignatureBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            writeln!(f, "{}", block.text)?;
        }
        Ok(())
    }
}

/// Render every node of the closure and sort the blocks.
///
/// Order is by display name, then by rendered text; the sort is stable,
/// so blocks equal in both keep discovery order.
#[tracing::instrument(level = "debug", skip_all, fields(nodes = closure.len()))]
pub fn render(closure: &Closure) -> Signature {
    let mut blocks: Vec<SignatureBlock> = closure
        .nodes()
        .iter()
        .map(|&idx| SignatureBlock {
            display_name: closure.pool().display_name(idx),
            text: signature_of(closure, idx),
        })
        .collect();
    blocks.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.text.cmp(&b.text))
    });
    Signature { blocks }
}

/// Signature text of a single node.
pub fn signature_of(closure: &Closure, idx: TypeIdx) -> String {
    match closure.get(idx) {
        Type::Primitive(prim) => prim.spelling.clone(),
        Type::Alias(alias) => format!("{}: {}", alias.name, signature_of(closure, alias.target)),
        Type::Pointer(_) | Type::FunctionPointer(_) | Type::Array(_) | Type::Qualified(_) => {
            closure.pool().display_name(idx)
        }
        Type::Record(record) => {
            let (Some(layout), Some(members)) = (record.layout, closure.members(idx)) else {
                return record.name.clone();
            };
            let header = format!(
                "{} (size {}, align {})",
                record.name, layout.size, layout.align
            );
            if members.is_empty() {
                return format!("{header} []");
            }
            let mut out = format!("{header}:");
            for member in members {
                out.push('\n');
                member_block(&mut out, member);
            }
            out
        }
    }
}

fn member_block(out: &mut String, member: &Member) {
    let name = if member.name.is_empty() {
        "(anonymous)"
    } else {
        &member.name
    };
    let _ = write!(out, "- {name}:\n    type: {}\n    size: ", member.spelling);
    let _ = match member.size {
        Some(size) => write!(out, "{size}"),
        None => write!(out, "incomplete"),
    };
    let _ = write!(out, "\n    offset: {}", member.offset);
    if let Some(bits) = member.bit_field {
        let _ = write!(
            out,
            "\n    bit_offset: {}\n    bit_width: {}",
            bits.bit_offset, bits.width
        );
    }
}
