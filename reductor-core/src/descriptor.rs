use crate::algorithm::ReduceAlgorithm;
use crate::types::DType;

/// A post-operation fused into the reduction's output-writing pass.
///
/// Per-channel operands (scale, shift) are not stored here; the caller
/// supplies them at run time as broadcast slices, one value per retained
/// output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOp {
    /// `y = y * scale[c] + shift[c]`, broadcast along the channel axis.
    ScaleShift,
    /// `y = max(y, 0)`.
    Relu,
}

/// Immutable per-instance configuration of a reduction operator.
///
/// Built once when the operator is instantiated; shape-dependent state
/// (axis validation, layout plan, kernel binding) is derived from it at
/// each shape generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceDescriptor {
    pub algorithm: ReduceAlgorithm,
    /// Raw axis indices as requested; negative values wrap around the rank.
    pub axes: Vec<isize>,
    /// When true, reduced axes stay in the output with size 1; when false
    /// they are removed.
    pub keep_dims: bool,
    pub src_dtype: DType,
    pub dst_dtype: DType,
    /// Keep the fused post-op chain in accumulation precision and narrow
    /// only once at the very end.
    pub fuse_low_precision: bool,
    /// Truncate instead of round when narrowing to integer types.
    pub round_to_zero: bool,
    pub post_ops: Vec<PostOp>,
}

impl ReduceDescriptor {
    pub fn new(
        algorithm: ReduceAlgorithm,
        axes: Vec<isize>,
        keep_dims: bool,
        src_dtype: DType,
        dst_dtype: DType,
    ) -> Self {
        ReduceDescriptor {
            algorithm,
            axes,
            keep_dims,
            src_dtype,
            dst_dtype,
            fuse_low_precision: false,
            round_to_zero: false,
            post_ops: Vec::new(),
        }
    }

    pub fn with_post_ops(mut self, post_ops: Vec<PostOp>) -> Self {
        self.post_ops = post_ops;
        self
    }

    pub fn with_round_to_zero(mut self, round_to_zero: bool) -> Self {
        self.round_to_zero = round_to_zero;
        self
    }

    pub fn with_low_precision_fusion(mut self, fuse: bool) -> Self {
        self.fuse_low_precision = fuse;
        self
    }

    /// The precision reductions accumulate in: the accumulation type of the
    /// wider storage side.
    pub fn accumulation_dtype(&self) -> DType {
        let wider = if self.src_dtype.size_of() >= self.dst_dtype.size_of() {
            self.src_dtype
        } else {
            self.dst_dtype
        };
        wider.accumulation()
    }

    /// Whether the final store narrows below the accumulation precision.
    pub fn narrows_output(&self) -> bool {
        self.dst_dtype != self.accumulation_dtype()
    }
}
