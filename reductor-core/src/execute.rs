use crate::algorithm::ReduceAlgorithm;
use crate::convert::to_planar_f32;
use crate::descriptor::{PostOp, ReduceDescriptor};
use crate::error::ReductorError;
use crate::kernel::CompiledKernel;
use crate::layout::{element_index, CanonicalDims, ReduceLayoutType};
use crate::memory::ScratchArena;
use crate::plan::LayoutPlan;
use crate::selector::KernelBinding;
use crate::view::{TensorView, TensorViewMut};
use log::trace;
use rayon::prelude::*;

/// Per-channel broadcast operands for fused post-ops, supplied by the
/// caller at run time. Slices are indexed by the retained output channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostOpData<'a> {
    pub scale: Option<&'a [f32]>,
    pub shift: Option<&'a [f32]>,
}

/// Execution progress, for tracing. The driver advances strictly
/// `Idle -> LayoutConvert -> Reduce -> PostProcess -> Done`; failures
/// surface as errors before any output byte is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LayoutConvert,
    Reduce,
    PostProcess,
    Done,
}

/// Runs one reduction: stages the input if the binding requires a planar
/// view, folds into the f32 accumulation buffer, then post-processes into
/// the caller's output buffer.
pub(crate) fn execute(
    desc: &ReduceDescriptor,
    plan: &LayoutPlan,
    binding: &KernelBinding,
    input: &TensorView<'_>,
    output: &mut TensorViewMut<'_>,
    post_data: &PostOpData<'_>,
    arena: &mut ScratchArena,
) -> Result<(), ReductorError> {
    // All fatal validation happens before the first output write
    validate_post_ops(desc, plan, post_data)?;

    let acc_len = plan.dst.numel();
    let algorithm = desc.algorithm;

    match binding {
        KernelBinding::Reference => {
            trace!("stage {:?}: skipped (reference path)", Stage::LayoutConvert);
            trace!("stage {:?}: reference functor", Stage::Reduce);
            let acc = arena.accumulation_f32(acc_len);
            crate::reference::reduce_into(input, plan, algorithm, acc);
        }
        KernelBinding::Compiled { primary, aux } => {
            let conv_len = input.desc.numel();
            let (conv, acc) = arena.conversion_and_accumulation(conv_len, acc_len);
            trace!("stage {:?}: staging planar f32 view", Stage::LayoutConvert);
            to_planar_f32(input, &plan.src, plan.padded_src_channels, conv);
            trace!("stage {:?}: compiled kernel, tile {}", Stage::Reduce, primary.tile);
            reduce_compiled(plan, algorithm, primary, aux.as_ref(), conv, acc);
        }
    }

    trace!("stage {:?}", Stage::PostProcess);
    post_process(desc, plan, output, post_data, arena)?;
    trace!("stage {:?}", Stage::Done);
    Ok(())
}

fn validate_post_ops(
    desc: &ReduceDescriptor,
    plan: &LayoutPlan,
    post_data: &PostOpData<'_>,
) -> Result<(), ReductorError> {
    for op in &desc.post_ops {
        if let PostOp::ScaleShift = op {
            let channels = plan.dst.c;
            for (name, slice) in [("scale", post_data.scale), ("shift", post_data.shift)] {
                let slice = slice.ok_or_else(|| {
                    ReductorError::UnsupportedOperation(format!(
                        "fused scale/shift post-op requires a per-channel {name} buffer"
                    ))
                })?;
                if slice.len() != channels {
                    return Err(ReductorError::BufferSizeMismatch {
                        expected: channels,
                        actual: slice.len(),
                        operation: format!("post-op {name} broadcast"),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Folds one strided span using the primary kernel for whole tiles and the
/// auxiliary kernel for the ragged remainder.
fn reduce_span(
    algorithm: ReduceAlgorithm,
    primary: &CompiledKernel,
    aux: Option<&CompiledKernel>,
    src: &[f32],
    start: usize,
    stride: usize,
    len: usize,
) -> f32 {
    let main = len - len % primary.tile;
    let mut folded = if main > 0 {
        primary.process(src, start, stride, main)
    } else {
        algorithm.init_value()
    };
    if len > main {
        // The selector pairs an aux kernel with every tile > 1; a scalar
        // fold covers the (unreachable) unpaired case without panicking
        let rest = match aux {
            Some(aux) => aux.process(src, start + main * stride, stride, len - main),
            None => {
                let mut acc = algorithm.init_value();
                for k in main..len {
                    acc = algorithm.combine(acc, src[start + k * stride]);
                }
                acc
            }
        };
        folded = algorithm.merge(folded, rest);
    }
    folded
}

/// Compiled-path drivers for the three fast span patterns. `src` is the
/// planar f32 staging view in logical order.
fn reduce_compiled(
    plan: &LayoutPlan,
    algorithm: ReduceAlgorithm,
    primary: &CompiledKernel,
    aux: Option<&CompiledKernel>,
    src: &[f32],
    acc: &mut [f32],
) {
    let dims = plan.src;
    if plan.reduce_all {
        let per_batch = dims.c * dims.d * dims.h * dims.w;
        if plan.reduce_n {
            let folded = (0..dims.n)
                .into_par_iter()
                .map(|b| reduce_span(algorithm, primary, aux, src, b * per_batch, 1, per_batch))
                .reduce(|| algorithm.init_value(), |a, b| algorithm.merge(a, b));
            acc[0] = folded;
        } else {
            acc.par_iter_mut().enumerate().for_each(|(b, slot)| {
                *slot = reduce_span(algorithm, primary, aux, src, b * per_batch, 1, per_batch);
            });
        }
    } else if plan.reduce_dh {
        // One span of D*H elements with stride W per retained (b, c, w)
        acc.par_iter_mut().enumerate().for_each(|(f, slot)| {
            let w = f % dims.w;
            let rest = f / dims.w;
            let c = rest % dims.c;
            let b = rest / dims.c;
            let start = (b * dims.c + c) * dims.d * dims.h * dims.w + w;
            *slot = reduce_span(algorithm, primary, aux, src, start, dims.w, dims.d * dims.h);
        });
    } else {
        debug_assert!(plan.reduce_cdw);
        // W-contiguous spans per (c, d), merged per retained (b, h)
        acc.par_iter_mut().enumerate().for_each(|(f, slot)| {
            let h = f % dims.h;
            let b = f / dims.h;
            let mut folded = algorithm.init_value();
            for c in 0..dims.c {
                for d in 0..dims.d {
                    let start = (((b * dims.c + c) * dims.d + d) * dims.h + h) * dims.w;
                    let partial = reduce_span(algorithm, primary, aux, src, start, 1, dims.w);
                    folded = algorithm.merge(folded, partial);
                }
            }
            *slot = folded;
        });
    }
}

/// Finalizes accumulators (mean division, norm/log transforms), applies the
/// fused post-op chain and writes the output in its physical layout.
/// Blocked output padding lanes are zero-filled.
fn post_process(
    desc: &ReduceDescriptor,
    plan: &LayoutPlan,
    output: &mut TensorViewMut<'_>,
    post_data: &PostOpData<'_>,
    arena: &mut ScratchArena,
) -> Result<(), ReductorError> {
    let acc_len = plan.dst.numel();
    let out_layout = output.desc.layout;
    if output.desc.numel() != acc_len {
        return Err(ReductorError::ShapeMismatch {
            expected: plan.output_shape(desc.keep_dims).to_vec(),
            actual: output.desc.shape.clone(),
            operation: "reduce post-process".to_string(),
        });
    }

    // Contiguous outputs store at the flat logical index; everything else
    // re-encodes through the canonical form (which caps those layouts at
    // rank 5).
    let out_physical = if out_layout.is_contiguous() {
        None
    } else {
        Some((output.desc.canonical()?, output.desc.padded_channels()?))
    };

    // Divisor excludes blocked padding lanes by construction; an empty
    // reduced extent degenerates to the identity result rather than NaN.
    let divisor = plan.reduced_count.max(1) as f32;
    let stage_in_fusion = desc.fuse_low_precision && !desc.post_ops.is_empty();
    // validate_post_ops has already checked presence and length
    let scale = post_data.scale.unwrap_or(&[]);
    let shift = post_data.shift.unwrap_or(&[]);

    if let Some((dims, padded_c)) = &out_physical {
        if *padded_c != dims.c {
            output.data.fill(0);
        }
    }
    let store_index = |f: usize| match &out_physical {
        None => f,
        Some((dims, padded_c)) => physical_output_index(f, dims, *padded_c, out_layout),
    };

    if stage_in_fusion {
        let (acc, fusion) = arena.accumulation_and_fusion(acc_len, acc_len);
        for f in 0..acc_len {
            let oc = channel_of(f, &plan.dst);
            fusion[f] = apply_post_chain(desc, algo_final(desc, acc[f], divisor), oc, scale, shift);
        }
        for f in 0..acc_len {
            output.store(store_index(f), fusion[f], desc.round_to_zero);
        }
        return Ok(());
    }

    let acc = arena.accumulation_f32(acc_len);
    for f in 0..acc_len {
        let oc = channel_of(f, &plan.dst);
        let v = apply_post_chain(desc, algo_final(desc, acc[f], divisor), oc, scale, shift);
        output.store(store_index(f), v, desc.round_to_zero);
    }
    Ok(())
}

#[inline]
fn algo_final(desc: &ReduceDescriptor, acc: f32, divisor: f32) -> f32 {
    desc.algorithm.finalize(acc, divisor)
}

#[inline]
fn apply_post_chain(
    desc: &ReduceDescriptor,
    mut v: f32,
    channel: usize,
    scale: &[f32],
    shift: &[f32],
) -> f32 {
    for op in &desc.post_ops {
        v = match op {
            PostOp::ScaleShift => v * scale[channel] + shift[channel],
            PostOp::Relu => v.max(0.0),
        };
    }
    v
}

/// Retained channel coordinate of a flat accumulator index.
#[inline]
fn channel_of(flat: usize, dst: &CanonicalDims) -> usize {
    (flat / (dst.d * dst.h * dst.w)) % dst.c
}

/// Physical element index in the output buffer for the flat logical index
/// `flat`. Accumulators are in row-major logical order, which matches the
/// row-major order of both the kept and the squeezed output shape.
#[inline]
fn physical_output_index(
    flat: usize,
    out_dims: &CanonicalDims,
    out_padded_c: usize,
    layout: ReduceLayoutType,
) -> usize {
    let w = flat % out_dims.w;
    let rest = flat / out_dims.w;
    let h = rest % out_dims.h;
    let rest = rest / out_dims.h;
    let d = rest % out_dims.d;
    let rest = rest / out_dims.d;
    let c = rest % out_dims.c;
    let b = rest / out_dims.c;
    element_index(layout, out_dims, out_padded_c, b, c, d, h, w)
}
