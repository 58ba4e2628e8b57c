// Shared constants, element types and index helpers.

use serde::{Deserialize, Serialize};

/// Maximum number of dimensions a variable may have.
pub const WALK_MAX_DIM: usize = 1024;

/// Separator between chunk indices in a chunk key (`"0.1.2"`).
pub const CHUNK_KEY_SEPARATOR: char = '.';

/// Environment variable that disables every transfer optimization.
pub const WALK_NO_OPTIMIZE_ENV: &str = "CHUNKWALK_NO_OPTIMIZE";

/// The atomic element types a variable can hold.
///
/// `Opaque` covers fixed-size element types with no byte-order meaning beyond
/// their width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
    UByte,
    UShort,
    UInt,
    Int64,
    UInt64,
    Opaque(usize),
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            ElementType::Byte | ElementType::Char | ElementType::UByte => 1,
            ElementType::Short | ElementType::UShort => 2,
            ElementType::Int | ElementType::UInt | ElementType::Float => 4,
            ElementType::Double | ElementType::Int64 | ElementType::UInt64 => 8,
            ElementType::Opaque(n) => *n,
        }
    }

    /// Numeric and character types; everything but `Opaque`.
    pub fn is_atomic(&self) -> bool {
        !matches!(self, ElementType::Opaque(_))
    }

    /// Look up a type from its netCDF type code.
    pub fn from_type_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ElementType::Byte),
            2 => Some(ElementType::Char),
            3 => Some(ElementType::Short),
            4 => Some(ElementType::Int),
            5 => Some(ElementType::Float),
            6 => Some(ElementType::Double),
            7 => Some(ElementType::UByte),
            8 => Some(ElementType::UShort),
            9 => Some(ElementType::UInt),
            10 => Some(ElementType::Int64),
            11 => Some(ElementType::UInt64),
            _ => None,
        }
    }
}

/// Byte order of stored or in-memory data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the running machine.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    /// Whether elements must be byte-swapped when moving between `storage`
    /// and `memory`.
    pub fn swap_required(storage: Endianness, memory: Endianness) -> bool {
        storage != memory
    }
}

/// Floor division on non-negative integers.
#[inline]
pub fn floor_div(x: u64, y: u64) -> u64 {
    x / y
}

/// Ceiling division on non-negative integers.
#[inline]
pub fn ceil_div(x: u64, y: u64) -> u64 {
    if x % y == 0 {
        x / y
    } else {
        x / y + 1
    }
}

/// Convert a row-major multidimensional index into a linear position.
///
/// # Arguments
/// * `index` - The multidimensional index
/// * `extents` - The extent of each dimension
///
/// # Returns
/// `Σ index[i] * Π_{j>i} extents[j]`, evaluated with Horner's method.
pub fn multidim_to_unidim(index: &[u64], extents: &[u64]) -> u64 {
    let mut offset = 0;
    for (i, extent) in index.iter().zip(extents) {
        offset = offset * extent + i;
    }
    offset
}

/// Convert a linear position into a row-major multidimensional index.
pub fn unidim_to_multidim(mut offset: u64, extents: &[u64], index: &mut [u64]) {
    for i in (0..extents.len()).rev() {
        index[i] = offset % extents[i];
        offset /= extents[i];
    }
}

/// Product of a shape, or `None` on overflow. The empty shape has one element.
pub fn checked_product(shape: &[u64]) -> Option<u64> {
    shape.iter().try_fold(1u64, |acc, &n| acc.checked_mul(n))
}

/// Build the storage key of a chunk, e.g. `[0, 1, 2]` -> `"0.1.2"`.
///
/// Scalar variables use the single key `"0"`.
pub fn chunk_key(indices: &[u64]) -> String {
    if indices.is_empty() {
        return "0".to_string();
    }
    let mut key = String::new();
    for (i, index) in indices.iter().enumerate() {
        if i > 0 {
            key.push(CHUNK_KEY_SEPARATOR);
        }
        key.push_str(&index.to_string());
    }
    key
}
