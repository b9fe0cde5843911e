use crate::descriptor::ReduceDescriptor;
use crate::error::ReductorError;
use crate::layout::TensorDesc;
use crate::plan::LayoutPlan;
use log::debug;

/// Scratch byte sizes required for one shape generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScratchRequirements {
    /// Planar f32 copy of the input when the compiled kernel cannot consume
    /// the input layout or precision directly.
    pub conversion_bytes: usize,
    /// Intermediate f32 accumulation buffer, one slot per logical output
    /// element.
    pub accumulation_bytes: usize,
    /// Staging buffer for the fused post-op chain when the output narrows
    /// below accumulation precision.
    pub fusion_bytes: usize,
}

impl ScratchRequirements {
    /// Computes the worst-case scratch for the given plan and descriptor.
    /// `compiled` says whether the selected binding is a compiled kernel;
    /// only compiled kernels consume the planar staging view, the reference
    /// path reads the caller's buffer in place.
    pub fn compute(
        desc: &ReduceDescriptor,
        plan: &LayoutPlan,
        input: &TensorDesc,
        compiled: bool,
    ) -> Result<Self, ReductorError> {
        const F32_SIZE: usize = 4;

        // Compiled kernels consume contiguous planar f32 spans, so the
        // input is staged once: a layout conversion for channel-last and
        // blocked inputs, a widening copy for narrow planar ones.
        let conversion_bytes = if compiled {
            input.numel() * F32_SIZE
        } else {
            0
        };

        let accumulation_bytes = plan.dst.numel() * F32_SIZE;

        let fusion_bytes = if desc.fuse_low_precision && !desc.post_ops.is_empty() {
            plan.dst.numel() * F32_SIZE
        } else {
            0
        };

        Ok(ScratchRequirements {
            conversion_bytes,
            accumulation_bytes,
            fusion_bytes,
        })
    }
}

/// Role-indexed scratch arena owned by one operator instance.
///
/// Buffers grow to the worst case seen across shape generations and are
/// reused verbatim for equal or smaller requirements; they are reset, not
/// freed, between calls. One in-flight execution owns the whole arena
/// (`&mut` access), so no locking is needed. Storage is f32-slotted, the
/// accumulation precision every role stages data in.
#[derive(Debug, Default)]
pub struct ScratchArena {
    conversion: Vec<f32>,
    accumulation: Vec<f32>,
    fusion: Vec<f32>,
}

impl ScratchArena {
    pub fn new() -> Self {
        ScratchArena::default()
    }

    /// Grows any buffer whose requirement increased. Shrinking never
    /// reallocates.
    pub fn prepare(&mut self, req: &ScratchRequirements) {
        if self.conversion.len() * 4 < req.conversion_bytes
            || self.accumulation.len() * 4 < req.accumulation_bytes
            || self.fusion.len() * 4 < req.fusion_bytes
        {
            debug!(
                "growing scratch arena: conversion {} -> {} bytes, accumulation {} -> {}, fusion {} -> {}",
                self.conversion.len() * 4,
                req.conversion_bytes,
                self.accumulation.len() * 4,
                req.accumulation_bytes,
                self.fusion.len() * 4,
                req.fusion_bytes
            );
        }
        grow(&mut self.conversion, req.conversion_bytes);
        grow(&mut self.accumulation, req.accumulation_bytes);
        grow(&mut self.fusion, req.fusion_bytes);
    }

    /// The accumulation buffer viewed as `len` f32 slots.
    pub(crate) fn accumulation_f32(&mut self, len: usize) -> &mut [f32] {
        grow(&mut self.accumulation, len * 4);
        &mut self.accumulation[..len]
    }

    /// Conversion and accumulation views borrowed together, for the
    /// convert-then-reduce sequence that stages into one and folds into the
    /// other.
    pub(crate) fn conversion_and_accumulation(
        &mut self,
        conv_len: usize,
        acc_len: usize,
    ) -> (&mut [f32], &mut [f32]) {
        grow(&mut self.conversion, conv_len * 4);
        grow(&mut self.accumulation, acc_len * 4);
        (
            &mut self.conversion[..conv_len],
            &mut self.accumulation[..acc_len],
        )
    }

    /// Accumulation (read) and fusion staging (write) views borrowed
    /// together, for the low-precision-fusion post-op pass.
    pub(crate) fn accumulation_and_fusion(
        &mut self,
        acc_len: usize,
        fusion_len: usize,
    ) -> (&[f32], &mut [f32]) {
        grow(&mut self.accumulation, acc_len * 4);
        grow(&mut self.fusion, fusion_len * 4);
        (&self.accumulation[..acc_len], &mut self.fusion[..fusion_len])
    }

    #[cfg(test)]
    pub(crate) fn capacity_bytes(&self) -> (usize, usize, usize) {
        (
            self.conversion.len() * 4,
            self.accumulation.len() * 4,
            self.fusion.len() * 4,
        )
    }
}

fn grow(buf: &mut Vec<f32>, bytes: usize) {
    let slots = bytes.div_ceil(4);
    if buf.len() < slots {
        buf.resize(slots, 0.0);
    }
}
