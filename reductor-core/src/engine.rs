use crate::capability::CpuCapabilities;
use crate::descriptor::ReduceDescriptor;
use crate::error::ReductorError;
use crate::execute::{execute, PostOpData};
use crate::kernel::KernelConfig;
use crate::layout::{ReduceLayoutType, TensorDesc};
use crate::memory::{ScratchArena, ScratchRequirements};
use crate::plan::LayoutPlan;
use crate::selector::{fast_path_available, KernelBinding, KernelSelector};
use crate::view::{TensorView, TensorViewMut};
use log::debug;
use std::sync::Arc;

/// State derived for one shape/precision generation: rebuilt whenever the
/// concrete input shape or layout changes, reused verbatim otherwise.
#[derive(Debug)]
struct Generation {
    key: (Vec<usize>, ReduceLayoutType),
    plan: LayoutPlan,
    binding: Arc<KernelBinding>,
}

/// The reduction execution engine for one operator instance.
///
/// Construction takes the immutable [`ReduceDescriptor`]; per-call inputs
/// and outputs are caller-owned buffer views. One engine serves one
/// in-flight execution at a time (`run` takes `&mut self` for the scratch
/// arena); concurrent calls need distinct instances.
///
/// # Example
/// ```
/// use reductor_core::{
///     DType, PostOpData, ReduceAlgorithm, ReduceDescriptor, ReduceEngine,
///     ReduceLayoutType, TensorDesc, TensorView, TensorViewMut, pack_f32, unpack_f32,
/// };
///
/// let desc = ReduceDescriptor::new(
///     ReduceAlgorithm::Sum, vec![1], true, DType::F32, DType::F32,
/// );
/// let mut engine = ReduceEngine::new(desc);
///
/// let src = pack_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
/// let input = TensorView::new(
///     TensorDesc::new(vec![2, 3], DType::F32, ReduceLayoutType::Planar), &src,
/// ).unwrap();
/// let mut dst = vec![0u8; 8];
/// let mut output = TensorViewMut::new(
///     TensorDesc::new(vec![2, 1], DType::F32, ReduceLayoutType::Planar), &mut dst,
/// ).unwrap();
///
/// engine.run(&input, &mut output, &PostOpData::default()).unwrap();
/// assert_eq!(unpack_f32(&dst), vec![6.0, 15.0]);
/// ```
#[derive(Debug)]
pub struct ReduceEngine {
    descriptor: ReduceDescriptor,
    capabilities: CpuCapabilities,
    selector: KernelSelector,
    arena: ScratchArena,
    generation: Option<Generation>,
}

impl ReduceEngine {
    /// Creates an engine for the descriptor, probing the running CPU.
    pub fn new(descriptor: ReduceDescriptor) -> Self {
        Self::with_capabilities(descriptor, CpuCapabilities::detect())
    }

    /// Creates an engine with explicit capability flags. Tests use this to
    /// pin kernel selection regardless of the host.
    pub fn with_capabilities(descriptor: ReduceDescriptor, capabilities: CpuCapabilities) -> Self {
        ReduceEngine {
            descriptor,
            capabilities,
            selector: KernelSelector::new(),
            arena: ScratchArena::new(),
            generation: None,
        }
    }

    pub fn descriptor(&self) -> &ReduceDescriptor {
        &self.descriptor
    }

    /// The logical output shape this engine will produce for an input
    /// shape, honoring `keep_dims`. Surrounding shape inference must agree
    /// with this or `run` fails with `ShapeMismatch`.
    pub fn output_shape(&self, input: &TensorDesc) -> Result<Vec<usize>, ReductorError> {
        let plan = LayoutPlan::build(&self.descriptor, input)?;
        Ok(plan.output_shape(self.descriptor.keep_dims).to_vec())
    }

    /// Whether this engine's (algorithm, layout, precision) combination has
    /// a compiled fast path on the probed hardware. Collaborators use this
    /// to decide in-place eligibility and fusion wiring before execution.
    pub fn can_use_fast_path(&self, layout: ReduceLayoutType) -> bool {
        fast_path_available(
            self.descriptor.algorithm,
            layout,
            self.descriptor.src_dtype,
            self.descriptor.dst_dtype,
            &self.capabilities,
        )
    }

    /// Executes one reduction from `input` into `output`.
    ///
    /// The engine never allocates the output; the caller supplies it in the
    /// layout negotiated by the surrounding graph. All fatal conditions
    /// (`InvalidAxis`, `ShapeMismatch`, buffer/dtype mismatches,
    /// `PaddingInconsistency`) surface before any output byte is written.
    pub fn run(
        &mut self,
        input: &TensorView<'_>,
        output: &mut TensorViewMut<'_>,
        post_data: &PostOpData<'_>,
    ) -> Result<(), ReductorError> {
        if input.desc.dtype != self.descriptor.src_dtype {
            return Err(ReductorError::DataTypeMismatch {
                expected: self.descriptor.src_dtype,
                actual: input.desc.dtype,
                operation: "reduce input".to_string(),
            });
        }
        if output.desc.dtype != self.descriptor.dst_dtype {
            return Err(ReductorError::DataTypeMismatch {
                expected: self.descriptor.dst_dtype,
                actual: output.desc.dtype,
                operation: "reduce output".to_string(),
            });
        }

        self.prepare(&input.desc)?;
        let generation = match &self.generation {
            Some(generation) => generation,
            None => {
                return Err(ReductorError::InternalError(
                    "shape generation missing after prepare".to_string(),
                ))
            }
        };
        let plan = &generation.plan;

        let expected = plan.output_shape(self.descriptor.keep_dims);
        if output.desc.shape != expected {
            return Err(ReductorError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: output.desc.shape.clone(),
                operation: "reduce output".to_string(),
            });
        }

        if plan.is_noop() {
            return copy_noop(&self.descriptor, input, output);
        }

        execute(
            &self.descriptor,
            plan,
            &generation.binding,
            input,
            output,
            post_data,
            &mut self.arena,
        )
    }

    /// Rebuilds plan, kernel binding and scratch sizing when the shape
    /// generation changes; a repeated shape reuses everything.
    fn prepare(&mut self, input: &TensorDesc) -> Result<(), ReductorError> {
        let key = (input.shape.clone(), input.layout);
        if let Some(generation) = &self.generation {
            if generation.key == key {
                return Ok(());
            }
        }

        let plan = LayoutPlan::build(&self.descriptor, input)?;
        let config = KernelConfig {
            layout: input.layout,
            algorithm: self.descriptor.algorithm,
            src_dtype: self.descriptor.src_dtype,
            dst_dtype: self.descriptor.dst_dtype,
            fuse_low_precision: self.descriptor.fuse_low_precision,
            round_to_zero: self.descriptor.round_to_zero,
        };
        let binding = self.selector.select(config, &plan, &self.capabilities);
        debug!(
            "new shape generation {:?}: {} path",
            key,
            if binding.is_compiled() { "compiled" } else { "reference" }
        );

        let requirements =
            ScratchRequirements::compute(&self.descriptor, &plan, input, binding.is_compiled())?;
        self.arena.prepare(&requirements);
        self.generation = Some(Generation { key, plan, binding });
        Ok(())
    }
}

/// Empty-axis-set execution: a pure copy. Bit-exact when layouts and
/// element types match; otherwise re-laid-out and narrowed element by
/// element.
fn copy_noop(
    desc: &ReduceDescriptor,
    input: &TensorView<'_>,
    output: &mut TensorViewMut<'_>,
) -> Result<(), ReductorError> {
    if input.desc.layout == output.desc.layout && input.desc.dtype == output.desc.dtype {
        output.data.copy_from_slice(input.data);
        return Ok(());
    }

    let dims = input.desc.canonical()?;
    let in_padded_c = input.desc.padded_channels()?;
    let out_padded_c = output.desc.padded_channels()?;
    if out_padded_c != dims.c {
        output.data.fill(0);
    }
    for b in 0..dims.n {
        for c in 0..dims.c {
            for d in 0..dims.d {
                for h in 0..dims.h {
                    for w in 0..dims.w {
                        let src_idx = crate::layout::element_index(
                            input.desc.layout, &dims, in_padded_c, b, c, d, h, w,
                        );
                        let dst_idx = crate::layout::element_index(
                            output.desc.layout, &dims, out_padded_c, b, c, d, h, w,
                        );
                        let v = input.load(src_idx);
                        output.store(dst_idx, v, desc.round_to_zero);
                    }
                }
            }
        }
    }
    Ok(())
}
