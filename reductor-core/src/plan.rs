use crate::descriptor::ReduceDescriptor;
use crate::error::ReductorError;
use crate::layout::{CanonicalDims, ReduceLayoutType, TensorDesc};
use log::trace;

/// Normalizes a raw axis list against a concrete rank: wraps negative
/// indices, validates bounds, sorts and de-duplicates.
pub(crate) fn normalize_axes(raw: &[isize], rank: usize) -> Result<Vec<usize>, ReductorError> {
    let mut axes = Vec::with_capacity(raw.len());
    for &axis in raw {
        let wrapped = if axis < 0 { axis + rank as isize } else { axis };
        if wrapped < 0 || wrapped as usize >= rank {
            return Err(ReductorError::InvalidAxis { axis, rank });
        }
        axes.push(wrapped as usize);
    }
    axes.sort_unstable();
    axes.dedup();
    Ok(axes)
}

/// Folds runs of adjacent axes with the same reduce status into single
/// dimensions. Valid only for contiguous (planar) tensors, where merging
/// neighbors preserves the flat element order; this is how shapes beyond
/// the 5D canonical form stay representable.
pub(crate) fn collapse_adjacent(shape: &[usize], axes: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut merged_shape = Vec::new();
    let mut merged_axes = Vec::new();
    let mut i = 0;
    while i < shape.len() {
        let reduced = axes.binary_search(&i).is_ok();
        let mut size = shape[i];
        let mut j = i + 1;
        while j < shape.len() && axes.binary_search(&j).is_ok() == reduced {
            size *= shape[j];
            j += 1;
        }
        if reduced {
            merged_axes.push(merged_shape.len());
        }
        merged_shape.push(size);
        i = j;
    }
    (merged_shape, merged_axes)
}

/// Shape-generation state derived from a [`ReduceDescriptor`] and a concrete
/// input description. Recomputed whenever the shape or layout changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub layout: ReduceLayoutType,
    /// Normalized, sorted, de-duplicated logical axes being reduced.
    pub axes: Vec<usize>,
    pub rank: usize,

    // Canonical per-dimension reduce flags
    pub reduce_n: bool,
    pub reduce_c: bool,
    pub reduce_d: bool,
    pub reduce_h: bool,
    pub reduce_w: bool,

    /// Canonical input dims (IB, IC, ID, IH, IW).
    pub src: CanonicalDims,
    /// Canonical output dims: input dims with reduced axes collapsed to 1.
    pub dst: CanonicalDims,
    /// Channel capacity of the input buffer (equals `src.c` unless blocked).
    pub padded_src_channels: usize,

    // Fast contiguous-span patterns
    pub reduce_all: bool,
    pub reduce_dh: bool,
    pub reduce_cdw: bool,

    /// Output shape with reduced axes kept as size 1.
    pub kept_shape: Vec<usize>,
    /// Output shape with reduced axes removed.
    pub squeezed_shape: Vec<usize>,

    /// True count of elements folded into each output value; this is the
    /// mean divisor and never counts blocked padding lanes.
    pub reduced_count: usize,
}

impl LayoutPlan {
    pub fn build(desc: &ReduceDescriptor, input: &TensorDesc) -> Result<Self, ReductorError> {
        let rank = input.rank();
        let axes = normalize_axes(&desc.axes, rank)?;
        if axes.is_empty() && desc.algorithm.requires_reduced_axis() {
            return Err(ReductorError::EmptyAxisSet {
                algorithm: desc.algorithm,
            });
        }

        // Beyond-5D contiguous shapes collapse mergeable neighbors before
        // canonicalization; what still does not fit is rejected there.
        let (work_shape, work_axes) = if rank > 5 && input.layout.is_contiguous() {
            collapse_adjacent(&input.shape, &axes)
        } else {
            (input.shape.clone(), axes.clone())
        };
        let work_rank = work_shape.len();
        let src = CanonicalDims::from_shape(&work_shape)?;
        let padded_src_channels = match input.layout {
            ReduceLayoutType::Blocked { .. } => input.padded_channels()?,
            _ => src.c,
        };

        let mut reduce_flags = [false; 5];
        for &axis in &work_axes {
            reduce_flags[CanonicalDims::canonical_slot(work_rank, axis)] = true;
        }
        let [reduce_n, reduce_c, reduce_d, reduce_h, reduce_w] = reduce_flags;

        let dst = CanonicalDims {
            n: if reduce_n { 1 } else { src.n },
            c: if reduce_c { 1 } else { src.c },
            d: if reduce_d { 1 } else { src.d },
            h: if reduce_h { 1 } else { src.h },
            w: if reduce_w { 1 } else { src.w },
        };

        // Size-1 dims count as reduced for pattern detection: collapsing
        // them is a no-op either way.
        let eff_c = reduce_c || src.c == 1;
        let eff_d = reduce_d || src.d == 1;
        let eff_h = reduce_h || src.h == 1;
        let eff_w = reduce_w || src.w == 1;

        let reduce_all =
            !axes.is_empty() && eff_c && eff_d && eff_h && eff_w && input.layout.is_contiguous();
        let reduce_dh = !reduce_all
            && reduce_d
            && reduce_h
            && !reduce_n
            && !reduce_c
            && !reduce_w
            && src.d * src.h > 1;
        let reduce_cdw = !reduce_all
            && reduce_c
            && reduce_d
            && reduce_w
            && !reduce_n
            && !reduce_h
            && matches!(input.layout, ReduceLayoutType::Blocked { .. });

        let mut kept_shape = Vec::with_capacity(rank);
        let mut squeezed_shape = Vec::with_capacity(rank);
        for (axis, &size) in input.shape.iter().enumerate() {
            if axes.binary_search(&axis).is_ok() {
                kept_shape.push(1);
            } else {
                kept_shape.push(size);
                squeezed_shape.push(size);
            }
        }

        let reduced_count: usize = input
            .shape
            .iter()
            .enumerate()
            .filter(|(axis, _)| axes.binary_search(axis).is_ok())
            .map(|(_, &size)| size)
            .product();

        trace!(
            "layout plan: axes={:?} flags=[n:{} c:{} d:{} h:{} w:{}] all={} dh={} cdw={}",
            axes, reduce_n, reduce_c, reduce_d, reduce_h, reduce_w, reduce_all, reduce_dh, reduce_cdw
        );

        Ok(LayoutPlan {
            layout: input.layout,
            axes,
            rank,
            reduce_n,
            reduce_c,
            reduce_d,
            reduce_h,
            reduce_w,
            src,
            dst,
            padded_src_channels,
            reduce_all,
            reduce_dh,
            reduce_cdw,
            kept_shape,
            squeezed_shape,
            reduced_count,
        })
    }

    /// The logical output shape the caller's output descriptor must match.
    pub fn output_shape(&self, keep_dims: bool) -> &[usize] {
        if keep_dims {
            &self.kept_shape
        } else {
            &self.squeezed_shape
        }
    }

    /// An empty axis set reduces nothing: the call degenerates to a copy.
    pub fn is_noop(&self) -> bool {
        self.axes.is_empty()
    }
}
