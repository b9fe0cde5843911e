use crate::layout::{element_index, CanonicalDims, ReduceLayoutType};
use crate::view::TensorView;

/// Copies a tensor into planar logical order, widening to f32.
///
/// This is the LayoutConvert step feeding the compiled kernels: they
/// consume contiguous planar f32 spans, so channel-last and blocked inputs
/// (and narrow-precision planar inputs) are staged once into the conversion
/// scratch. Blocked padding lanes are dropped by the copy.
pub(crate) fn to_planar_f32(view: &TensorView<'_>, dims: &CanonicalDims, padded_c: usize, dst: &mut [f32]) {
    debug_assert_eq!(dst.len(), dims.numel());
    match view.desc.layout {
        ReduceLayoutType::Planar => {
            // Already in logical order; only the element type changes
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = view.load(i);
            }
        }
        ReduceLayoutType::ChannelLast | ReduceLayoutType::Blocked { .. } => {
            let mut out = 0;
            for b in 0..dims.n {
                for c in 0..dims.c {
                    for d in 0..dims.d {
                        for h in 0..dims.h {
                            for w in 0..dims.w {
                                let idx = element_index(view.desc.layout, dims, padded_c, b, c, d, h, w);
                                dst[out] = view.load(idx);
                                out += 1;
                            }
                        }
                    }
                }
            }
        }
    }
}
