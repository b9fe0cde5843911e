use crate::error::ReductorError;
use crate::types::DType;

/// Physical memory ordering of a tensor's axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceLayoutType {
    /// Planar (channels-first) order: N, C, D, H, W.
    Planar,
    /// Channel-last order: N, D, H, W, C.
    ChannelLast,
    /// Channels-first with the channel axis split into fixed-width blocks:
    /// N, C/block, D, H, W, block. The last block may carry padding lanes
    /// when the channel count is not a multiple of the block width.
    Blocked { block: usize },
}

impl ReduceLayoutType {
    /// Whether logical element order matches physical element order, i.e.
    /// a full logical scan is one linear pass over memory.
    pub fn is_contiguous(&self) -> bool {
        matches!(self, ReduceLayoutType::Planar)
    }
}

/// Logical tensor dimensions folded onto the five canonical axes
/// N, C, D, H, W. Ranks below five map positionally: rank 4 is N,C,H,W
/// (D = 1), rank 3 is N,C,W, rank 2 is N,C, rank 1 is C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalDims {
    pub n: usize,
    pub c: usize,
    pub d: usize,
    pub h: usize,
    pub w: usize,
}

impl CanonicalDims {
    pub fn numel(&self) -> usize {
        self.n * self.c * self.d * self.h * self.w
    }

    /// Maps a logical axis of a rank-`rank` shape onto its canonical slot
    /// (0 = N, 1 = C, 2 = D, 3 = H, 4 = W).
    pub(crate) fn canonical_slot(rank: usize, axis: usize) -> usize {
        debug_assert!(axis < rank && rank <= 5);
        match rank {
            5 => axis,
            4 => [0, 1, 3, 4][axis],
            3 => [0, 1, 4][axis],
            2 => [0, 1][axis],
            1 => 1, // a lone axis is the channel axis
            _ => 0,
        }
    }

    pub(crate) fn from_shape(shape: &[usize]) -> Result<Self, ReductorError> {
        if shape.len() > 5 {
            return Err(ReductorError::UnsupportedOperation(format!(
                "tensors of rank {} exceed the 5D canonical form",
                shape.len()
            )));
        }
        let mut dims = CanonicalDims { n: 1, c: 1, d: 1, h: 1, w: 1 };
        for (axis, &size) in shape.iter().enumerate() {
            match Self::canonical_slot(shape.len(), axis) {
                0 => dims.n = size,
                1 => dims.c = size,
                2 => dims.d = size,
                3 => dims.h = size,
                _ => dims.w = size,
            }
        }
        Ok(dims)
    }
}

/// Shape, element type and physical layout of a tensor buffer. The engine
/// receives these from the caller; it never owns the described memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDesc {
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub layout: ReduceLayoutType,
}

impl TensorDesc {
    pub fn new(shape: Vec<usize>, dtype: DType, layout: ReduceLayoutType) -> Self {
        TensorDesc { shape, dtype, layout }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Logical element count (padding lanes excluded).
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub(crate) fn canonical(&self) -> Result<CanonicalDims, ReductorError> {
        CanonicalDims::from_shape(&self.shape)
    }

    /// Channel capacity of the physical buffer: the channel count rounded
    /// up to a whole number of blocks for blocked layouts, the plain
    /// channel count otherwise.
    pub fn padded_channels(&self) -> Result<usize, ReductorError> {
        let c = self.canonical()?.c;
        match self.layout {
            ReduceLayoutType::Blocked { block } => {
                if block == 0 {
                    return Err(ReductorError::PaddingInconsistency {
                        message: "blocked layout with block size 0".to_string(),
                    });
                }
                Ok(c.div_ceil(block) * block)
            }
            _ => Ok(c),
        }
    }

    /// Physical element count of the buffer, padding lanes included. Only
    /// blocked layouts diverge from the logical count; they are the only
    /// layout bound by the 5D canonical form here, so planar tensors of any
    /// rank can size their buffers.
    pub fn physical_numel(&self) -> Result<usize, ReductorError> {
        match self.layout {
            ReduceLayoutType::Blocked { .. } => {
                let dims = self.canonical()?;
                Ok(dims.n * self.padded_channels()? * dims.d * dims.h * dims.w)
            }
            _ => Ok(self.numel()),
        }
    }

    /// Physical buffer size in bytes.
    pub fn byte_len(&self) -> Result<usize, ReductorError> {
        Ok(self.physical_numel()? * self.dtype.size_of())
    }
}

/// Physical element index of logical coordinate (b, c, d, h, w) under the
/// given layout and canonical dims. `padded_c` is the channel capacity of
/// the buffer (equal to `dims.c` for non-blocked layouts).
#[inline]
pub(crate) fn element_index(
    layout: ReduceLayoutType,
    dims: &CanonicalDims,
    padded_c: usize,
    b: usize,
    c: usize,
    d: usize,
    h: usize,
    w: usize,
) -> usize {
    match layout {
        ReduceLayoutType::Planar => {
            ((((b * dims.c + c) * dims.d + d) * dims.h + h) * dims.w) + w
        }
        ReduceLayoutType::ChannelLast => {
            ((((b * dims.d + d) * dims.h + h) * dims.w + w) * dims.c) + c
        }
        ReduceLayoutType::Blocked { block } => {
            let cb = padded_c / block;
            let outer = c / block;
            let inner = c % block;
            (((((b * cb + outer) * dims.d + d) * dims.h + h) * dims.w + w) * block) + inner
        }
    }
}
