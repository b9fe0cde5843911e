use half::{bf16, f16};

/// Defines the element types the reduction engine can read from input
/// buffers and write to output buffers.
///
/// Accumulation always happens in `f32` regardless of the storage type, so
/// narrow types (16-bit floats, small integers) do not lose precision inside
/// the reduction itself, only at the final store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating-point type.
    F32,
    /// 16-bit IEEE floating-point type.
    F16,
    /// 16-bit brain floating-point type.
    BF16,
    /// 32-bit signed integer type.
    I32,
    /// 8-bit signed integer type.
    I8,
    /// 8-bit unsigned integer type.
    U8,
    /// Boolean type, stored one byte per element (0 or 1).
    Bool,
}

impl DType {
    /// Size in bytes of one element of this type.
    pub fn size_of(&self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F16 | DType::BF16 => 2,
            DType::I8 | DType::U8 | DType::Bool => 1,
        }
    }

    /// Whether this is a floating-point storage type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F16 | DType::BF16)
    }

    /// The precision reductions accumulate in for this storage type.
    ///
    /// Every supported storage type is 32 bits or narrower, so a single
    /// `f32` accumulator covers all of them; integer algorithms stay exact
    /// as long as intermediate magnitudes fit the f32 mantissa.
    pub fn accumulation(self) -> DType {
        DType::F32
    }
}

/// Reads element `idx` of a raw buffer holding `dtype` elements, widened to
/// the f32 accumulation precision. Boolean elements read as 0.0 / 1.0.
#[inline]
pub(crate) fn load_f32(dtype: DType, bytes: &[u8], idx: usize) -> f32 {
    let off = idx * dtype.size_of();
    match dtype {
        DType::F32 => f32::from_ne_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]]),
        DType::F16 => f16::from_ne_bytes([bytes[off], bytes[off + 1]]).to_f32(),
        DType::BF16 => bf16::from_ne_bytes([bytes[off], bytes[off + 1]]).to_f32(),
        DType::I32 => {
            i32::from_ne_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]]) as f32
        }
        DType::I8 => bytes[off] as i8 as f32,
        DType::U8 => bytes[off] as f32,
        DType::Bool => {
            if bytes[off] != 0 {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Writes `value` as element `idx` of a raw `dtype` buffer, narrowing from
/// the f32 accumulation precision.
///
/// Integer targets saturate at the type bounds; `round_to_zero` selects
/// truncation instead of round-to-nearest when narrowing to integers.
#[inline]
pub(crate) fn store_f32(dtype: DType, bytes: &mut [u8], idx: usize, value: f32, round_to_zero: bool) {
    let off = idx * dtype.size_of();
    match dtype {
        DType::F32 => bytes[off..off + 4].copy_from_slice(&value.to_ne_bytes()),
        DType::F16 => bytes[off..off + 2].copy_from_slice(&f16::from_f32(value).to_ne_bytes()),
        DType::BF16 => bytes[off..off + 2].copy_from_slice(&bf16::from_f32(value).to_ne_bytes()),
        DType::I32 => {
            let v = narrow_to_int(value, round_to_zero);
            // `as` casts from f32 to i32 already saturate in Rust
            bytes[off..off + 4].copy_from_slice(&(v as i32).to_ne_bytes());
        }
        DType::I8 => {
            let v = narrow_to_int(value, round_to_zero);
            bytes[off] = (v as i8) as u8;
        }
        DType::U8 => {
            let v = narrow_to_int(value, round_to_zero);
            bytes[off] = v as u8;
        }
        DType::Bool => {
            bytes[off] = (value != 0.0) as u8;
        }
    }
}

#[inline]
fn narrow_to_int(value: f32, round_to_zero: bool) -> f32 {
    if round_to_zero {
        value.trunc()
    } else {
        value.round()
    }
}

/// Packs an `f32` slice into a native-endian byte buffer, the element layout
/// the engine's byte-oriented views expect.
pub fn pack_f32(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_ne_bytes());
    }
    out
}

/// Unpacks a native-endian byte buffer into `f32` values.
pub fn unpack_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
