use crate::error::ReductorError;
use crate::layout::TensorDesc;
use crate::types::{load_f32, store_f32};

/// A read-only, typed, strided view over a caller-owned byte buffer.
///
/// The engine never allocates or frees the memory behind a view; it only
/// validates that the buffer is large enough for the described shape,
/// layout and element type.
#[derive(Debug)]
pub struct TensorView<'a> {
    pub desc: TensorDesc,
    pub data: &'a [u8],
}

impl<'a> TensorView<'a> {
    pub fn new(desc: TensorDesc, data: &'a [u8]) -> Result<Self, ReductorError> {
        let expected = desc.byte_len()?;
        if data.len() != expected {
            return Err(ReductorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
                operation: "TensorView::new".to_string(),
            });
        }
        Ok(TensorView { desc, data })
    }

    /// Reads the physical element at `idx`, widened to f32.
    #[inline]
    pub(crate) fn load(&self, idx: usize) -> f32 {
        load_f32(self.desc.dtype, self.data, idx)
    }
}

/// A mutable view over the caller-owned output buffer.
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    pub desc: TensorDesc,
    pub data: &'a mut [u8],
}

impl<'a> TensorViewMut<'a> {
    pub fn new(desc: TensorDesc, data: &'a mut [u8]) -> Result<Self, ReductorError> {
        let expected = desc.byte_len()?;
        if data.len() != expected {
            return Err(ReductorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
                operation: "TensorViewMut::new".to_string(),
            });
        }
        Ok(TensorViewMut { desc, data })
    }

    /// Writes the physical element at `idx`, narrowing from f32.
    #[inline]
    pub(crate) fn store(&mut self, idx: usize, value: f32, round_to_zero: bool) {
        store_f32(self.desc.dtype, self.data, idx, value, round_to_zero);
    }
}
