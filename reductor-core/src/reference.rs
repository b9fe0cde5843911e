use crate::algorithm::ReduceAlgorithm;
use crate::layout::element_index;
use crate::plan::LayoutPlan;
use crate::view::TensorView;
use rayon::prelude::*;

/// Portable scalar reduction, usable for any algorithm, layout and
/// precision combination.
///
/// Walks logical coordinates and resolves each one through the layout's
/// physical indexing, so channel-last and blocked inputs need no prior
/// conversion; blocked padding lanes are never visited because the channel
/// loop runs over the real channel count. Work items (output elements) are
/// independent and fan out over the rayon pool.
pub(crate) fn reduce_into(
    view: &TensorView<'_>,
    plan: &LayoutPlan,
    algorithm: ReduceAlgorithm,
    acc: &mut [f32],
) {
    let dst = plan.dst;
    let src = plan.src;
    debug_assert_eq!(acc.len(), dst.numel());

    acc.par_iter_mut().enumerate().for_each(|(out_flat, slot)| {
        // Decode the flat output index into retained canonical coordinates
        let ow = out_flat % dst.w;
        let rest = out_flat / dst.w;
        let oh = rest % dst.h;
        let rest = rest / dst.h;
        let od = rest % dst.d;
        let rest = rest / dst.d;
        let oc = rest % dst.c;
        let ob = rest / dst.c;

        let b_range = if plan.reduce_n { 0..src.n } else { ob..ob + 1 };
        let mut folded = algorithm.init_value();
        for b in b_range {
            let c_range = if plan.reduce_c { 0..src.c } else { oc..oc + 1 };
            for c in c_range {
                let d_range = if plan.reduce_d { 0..src.d } else { od..od + 1 };
                for d in d_range {
                    let h_range = if plan.reduce_h { 0..src.h } else { oh..oh + 1 };
                    for h in h_range {
                        let w_range = if plan.reduce_w { 0..src.w } else { ow..ow + 1 };
                        for w in w_range {
                            let idx = element_index(
                                plan.layout,
                                &src,
                                plan.padded_src_channels,
                                b,
                                c,
                                d,
                                h,
                                w,
                            );
                            folded = algorithm.combine(folded, view.load(idx));
                        }
                    }
                }
            }
        }
        *slot = folded;
    });
}
