use crate::payload::Payload;
use rand::Rng;
use tracing::debug;

/// Marker appended by the `Extend` transform.
const EXTEND_MARKER: &[u8] = b"AAAA";
/// Mask used by the `XorMask` transform.
const XOR_MASK: u8 = 0xAA;
/// Tokens inserted by the `FormatCode` transform.
const FORMAT_CODES: [&[u8]; 3] = [b"%s", b"%n", b"%x"];

/// The fixed catalog of single-field transformations.
///
/// `Truncate`, `Extend`, and `Blank` operate on the whole field; all other
/// kinds act at a byte position chosen uniformly within the field. Fixed-width
/// writes (`MaxInt`, `MinInt`) clamp to the field length instead of indexing
/// out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Truncate,
    Extend,
    Blank,
    NullInsert,
    NewlineInsert,
    DelimiterInsert,
    MaxInt,
    MinInt,
    SignFlip,
    FormatCode,
    BitFlip,
    ByteInvert,
    XorMask,
}

impl MutationKind {
    /// Every catalog entry, in id order. Random selection draws uniformly
    /// from this table.
    pub const CATALOG: [MutationKind; 13] = [
        MutationKind::Truncate,
        MutationKind::Extend,
        MutationKind::Blank,
        MutationKind::NullInsert,
        MutationKind::NewlineInsert,
        MutationKind::DelimiterInsert,
        MutationKind::MaxInt,
        MutationKind::MinInt,
        MutationKind::SignFlip,
        MutationKind::FormatCode,
        MutationKind::BitFlip,
        MutationKind::ByteInvert,
        MutationKind::XorMask,
    ];

    /// Applies this transform to `field` at `position`, returning the new
    /// field value. `position` is ignored by whole-field transforms and is
    /// expected to be within `field.len()` for the rest.
    pub fn apply<R: Rng + ?Sized>(
        self,
        field: &[u8],
        position: usize,
        rng: &mut R,
    ) -> Vec<u8> {
        let mut out = field.to_vec();
        match self {
            MutationKind::Truncate => {
                out.pop();
            }
            MutationKind::Extend => {
                out.extend_from_slice(EXTEND_MARKER);
            }
            MutationKind::Blank => {
                out.clear();
            }
            MutationKind::NullInsert => {
                if let Some(byte) = out.get_mut(position) {
                    *byte = 0x00;
                }
            }
            MutationKind::NewlineInsert => {
                if let Some(byte) = out.get_mut(position) {
                    *byte = b'\n';
                }
            }
            MutationKind::DelimiterInsert => {
                if let Some(byte) = out.get_mut(position) {
                    *byte = b';';
                }
            }
            MutationKind::MaxInt => overwrite_le_u32(&mut out, position, 0x7FFF_FFFF),
            MutationKind::MinInt => overwrite_le_u32(&mut out, position, 0x8000_0000),
            MutationKind::SignFlip => {
                if let Some(byte) = out.get_mut(position) {
                    *byte = (*byte as i8).wrapping_neg() as u8;
                }
            }
            MutationKind::FormatCode => {
                let code = FORMAT_CODES[rng.random_range(0..FORMAT_CODES.len())];
                let position = position.min(out.len());
                out.splice(position..position, code.iter().copied());
            }
            MutationKind::BitFlip => {
                if let Some(byte) = out.get_mut(position) {
                    *byte ^= 1 << rng.random_range(0..8u32);
                }
            }
            MutationKind::ByteInvert => {
                if let Some(byte) = out.get_mut(position) {
                    *byte = !*byte;
                }
            }
            MutationKind::XorMask => {
                if let Some(byte) = out.get_mut(position) {
                    *byte ^= XOR_MASK;
                }
            }
        }
        out
    }
}

/// Writes the little-endian encoding of `value` at `position`, clamped to
/// the field length. Bytes past the end are dropped rather than grown.
fn overwrite_le_u32(field: &mut [u8], position: usize, value: u32) {
    for (offset, encoded_byte) in value.to_le_bytes().iter().enumerate() {
        if let Some(target) = field.get_mut(position + offset) {
            *target = *encoded_byte;
        }
    }
}

/// A `Mutator` transforms one payload into a new, potentially corrupted one.
pub trait Mutator<R: Rng + ?Sized> {
    /// Produces a new payload with exactly one field mutated, or an unchanged
    /// clone when no eligible field exists.
    fn mutate(&self, payload: &Payload, rng: &mut R) -> Payload;
}

/// The catalog-driven mutator: picks one non-initial line, one transform
/// uniformly at random, and one byte position within the field, then applies
/// the transform.
///
/// The first line is never selected, keeping the protocol request line
/// structurally valid. Payloads with fewer than two lines, or whose chosen
/// field is empty, are returned unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldMutator;

impl FieldMutator {
    pub fn new() -> Self {
        FieldMutator
    }
}

impl<R: Rng + ?Sized> Mutator<R> for FieldMutator {
    fn mutate(&self, payload: &Payload, rng: &mut R) -> Payload {
        if payload.line_count() < 2 {
            debug!(
                lines = payload.line_count(),
                "no eligible field to mutate, returning payload unchanged"
            );
            return payload.clone();
        }

        let line_index = rng.random_range(1..payload.line_count());
        let field = &payload.lines()[line_index].value;
        if field.is_empty() {
            debug!(line_index, "chosen field is empty, returning payload unchanged");
            return payload.clone();
        }

        let kind = MutationKind::CATALOG[rng.random_range(0..MutationKind::CATALOG.len())];
        let position = rng.random_range(0..field.len());
        let mutated_value = kind.apply(field, position, rng);

        payload.with_value(line_index, mutated_value)
    }
}
