//! SysV-style record layout.
//!
//! Struct members are placed in declaration order at the next offset that
//! satisfies their alignment; the record is padded to a multiple of its
//! largest member alignment. Bit-fields share storage with their
//! neighbours until one would straddle a unit of its declared type.
//! Unions put every member at offset zero.


use apex_ir::{FieldLayout, RecordKind, RecordLayout};

/// What layout needs to know about one member.
#[derive(Copy, Clone, Debug)]
pub(crate) struct FieldSpec {
    /// Size of the member's type; `None` only for a flexible array.
    pub(crate) size: Option<u64>,
    /// Natural alignment of the member's type.
    pub(crate) align: u64,
    pub(crate) bit_width: Option<u32>,
    /// Unnamed bit-fields do not affect record alignment.
    pub(crate) named: bool,
    /// `aligned(N)` or `_Alignas(N)` on the member.
    pub(crate) align_attr: Option<u64>,
    /// `packed` on the member itself.
    pub(crate) packed: bool,
}

/// Record-level attributes.
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct RecordAttrs {
    pub(crate) packed: bool,
    pub(crate) align: Option<u64>,
}

/// Placement of every member plus the record's own size and alignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Laid {
    pub(crate) fields: Vec<FieldLayout>,
    pub(crate) record: RecordLayout,
}

/// A record whose size in bits does not fit `u64`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct TooLarge;

/// Lay out a struct or union.
pub(crate) fn layout_record(
    kind: RecordKind,
    fields: &[FieldSpec],
    attrs: RecordAttrs,
) -> Result<Laid, TooLarge> {
    match kind {
        RecordKind::Struct => layout_struct(fields, attrs),
        RecordKind::Union => layout_union(fields, attrs),
    }
}

fn field_align(field: &FieldSpec, attrs: RecordAttrs) -> u64 {
    let natural = if attrs.packed || field.packed {
        1
    } else {
        field.align
    };
    match field.align_attr {
        Some(attr) => natural.max(attr),
        None => natural,
    }
}

fn to_bits(bytes: u64) -> Result<u64, TooLarge> {
    bytes.checked_mul(8).ok_or(TooLarge)
}

fn layout_struct(fields: &[FieldSpec], attrs: RecordAttrs) -> Result<Laid, TooLarge> {
    let mut bits = 0u64;
    let mut align = 1u64;
    let mut placed = Vec::with_capacity(fields.len());

    for field in fields {
        let fa = field_align(field, attrs);
        match field.bit_width {
            Some(0) => {
                bits = round_up(bits, to_bits(field.align)?)?;
                placed.push(FieldLayout {
                    offset_bits: bits,
                    bit_width: Some(0),
                });
            }
            Some(width) => {
                let unit = to_bits(field.size.unwrap_or(0))?;
                let bit_width = Some(width);
                let width = u64::from(width);
                let tight = attrs.packed || field.packed;
                if !tight && unit > 0 && (bits % unit) + width > unit {
                    bits = round_up(bits, to_bits(fa)?)?;
                }
                if field.align_attr.is_some() {
                    bits = round_up(bits, to_bits(fa)?)?;
                }
                placed.push(FieldLayout {
                    offset_bits: bits,
                    bit_width,
                });
                bits = bits.checked_add(width).ok_or(TooLarge)?;
                if field.named {
                    align = align.max(fa);
                }
            }
            None => {
                bits = round_up(bits, to_bits(fa)?)?;
                placed.push(FieldLayout {
                    offset_bits: bits,
                    bit_width: None,
                });
                bits = bits
                    .checked_add(to_bits(field.size.unwrap_or(0))?)
                    .ok_or(TooLarge)?;
                align = align.max(fa);
            }
        }
    }

    if let Some(attr) = attrs.align {
        align = align.max(attr);
    }
    let size = round_up(bits.div_ceil(8), align)?;
    to_bits(size)?;
    Ok(Laid {
        fields: placed,
        record: RecordLayout { size, align },
    })
}

fn layout_union(fields: &[FieldSpec], attrs: RecordAttrs) -> Result<Laid, TooLarge> {
    let mut size = 0u64;
    let mut align = 1u64;
    let mut placed = Vec::with_capacity(fields.len());

    for field in fields {
        let fa = field_align(field, attrs);
        let bytes = match field.bit_width {
            Some(width) => u64::from(width).div_ceil(8),
            None => field.size.unwrap_or(0),
        };
        placed.push(FieldLayout {
            offset_bits: 0,
            bit_width: field.bit_width,
        });
        if field.bit_width != Some(0) && (field.named || field.bit_width.is_none()) {
            align = align.max(fa);
        }
        size = size.max(bytes);
    }

    if let Some(attr) = attrs.align {
        align = align.max(attr);
    }
    let size = round_up(size, align)?;
    to_bits(size)?;
    Ok(Laid {
        fields: placed,
        record: RecordLayout { size, align },
    })
}

fn round_up(value: u64, align: u64) -> Result<u64, TooLarge> {
    if align <= 1 {
        Ok(value)
    } else {
        value.div_ceil(align).checked_mul(align).ok_or(TooLarge)
    }
}
