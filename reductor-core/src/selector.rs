use crate::algorithm::ReduceAlgorithm;
use crate::capability::CpuCapabilities;
use crate::kernel::{CompiledKernel, KernelConfig};
use crate::layout::ReduceLayoutType;
use crate::plan::LayoutPlan;
use crate::types::DType;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The kernel choice for one shape/precision generation.
#[derive(Debug, Clone)]
pub enum KernelBinding {
    /// A compiled primary kernel, plus the auxiliary single-lane kernel
    /// that finishes ragged remainders when the primary tile does not
    /// divide a span.
    Compiled {
        primary: CompiledKernel,
        aux: Option<CompiledKernel>,
    },
    /// The portable scalar path.
    Reference,
}

impl KernelBinding {
    pub fn is_compiled(&self) -> bool {
        matches!(self, KernelBinding::Compiled { .. })
    }
}

/// Whether a (algorithm, layout, precision) combination can use a compiled
/// fast path at all on the given hardware. Surrounding collaborators use
/// this to decide in-place eligibility and fusion compatibility before
/// wiring the graph; it does not account for the per-shape axis pattern.
pub fn fast_path_available(
    algorithm: ReduceAlgorithm,
    layout: ReduceLayoutType,
    src_dtype: DType,
    dst_dtype: DType,
    caps: &CpuCapabilities,
) -> bool {
    let config = KernelConfig {
        layout,
        algorithm,
        src_dtype,
        dst_dtype,
        fuse_low_precision: false,
        round_to_zero: false,
    };
    CompiledKernel::compile(config, caps, caps.max_lanes_f32()).is_some()
}

/// Config-keyed cache of kernel bindings.
///
/// Reads are shared; a miss takes the write guard, rebuilds once and
/// publishes the finished binding, so no caller ever observes a partially
/// built one. Compilation failure silently produces the reference binding.
#[derive(Debug, Default)]
pub struct KernelSelector {
    cache: RwLock<HashMap<KernelConfig, Arc<KernelBinding>>>,
}

impl KernelSelector {
    pub fn new() -> Self {
        KernelSelector::default()
    }

    /// Chooses a binding for the given config, plan and hardware.
    ///
    /// Policy: the compiled path applies only when the axis pattern is one
    /// of the fast contiguous-span patterns (ReduceAll / ReduceDH /
    /// ReduceCDW) and a kernel exists for the precision pair and hardware;
    /// every other case takes the reference path.
    pub fn select(
        &self,
        config: KernelConfig,
        plan: &LayoutPlan,
        caps: &CpuCapabilities,
    ) -> Arc<KernelBinding> {
        if !(plan.reduce_all || plan.reduce_dh || plan.reduce_cdw) {
            return Arc::new(KernelBinding::Reference);
        }

        if let Some(binding) = self.cache.read().unwrap().get(&config) {
            return Arc::clone(binding);
        }

        let mut cache = self.cache.write().unwrap();
        // Another writer may have built it between the guards
        if let Some(binding) = cache.get(&config) {
            return Arc::clone(binding);
        }

        let binding = match CompiledKernel::compile(config, caps, caps.max_lanes_f32()) {
            Some(primary) => {
                let aux = if primary.tile > 1 {
                    CompiledKernel::compile(config, caps, 1)
                } else {
                    None
                };
                Arc::new(KernelBinding::Compiled { primary, aux })
            }
            None => {
                debug!(
                    "no compiled kernel for {:?} on {:?}; using reference path",
                    config, caps
                );
                Arc::new(KernelBinding::Reference)
            }
        };
        cache.insert(config, Arc::clone(&binding));
        binding
    }
}
