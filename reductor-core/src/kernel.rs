use crate::algorithm::ReduceAlgorithm;
use crate::capability::CpuCapabilities;
use crate::layout::ReduceLayoutType;
use crate::types::DType;

/// Cache key for a compiled kernel: everything that changes the generated
/// code, nothing that changes per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelConfig {
    pub layout: ReduceLayoutType,
    pub algorithm: ReduceAlgorithm,
    pub src_dtype: DType,
    pub dst_dtype: DType,
    pub fuse_low_precision: bool,
    pub round_to_zero: bool,
}

/// A reduction span kernel: folds `len` elements of `src`, starting at
/// `start` and separated by `stride`, into one partial accumulator using
/// `lanes` independent accumulation lanes. `len` must be a multiple of
/// `lanes`; ragged remainders belong to the auxiliary kernel.
pub(crate) type SpanFn = fn(src: &[f32], start: usize, stride: usize, len: usize, lanes: usize) -> f32;

const MAX_LANES: usize = 16;

macro_rules! span_kernel {
    ($name:ident, $init:expr, $premap:expr, $merge:expr) => {
        fn $name(src: &[f32], start: usize, stride: usize, len: usize, lanes: usize) -> f32 {
            debug_assert!(lanes >= 1 && lanes <= MAX_LANES);
            debug_assert_eq!(len % lanes, 0);
            let premap = $premap;
            let merge = $merge;
            let mut acc = [$init; MAX_LANES];
            let mut i = 0;
            while i < len {
                for l in 0..lanes {
                    let v = src[start + (i + l) * stride];
                    acc[l] = merge(acc[l], premap(v));
                }
                i += lanes;
            }
            let mut folded = $init;
            for &a in &acc[..lanes] {
                folded = merge(folded, a);
            }
            folded
        }
    };
}

span_kernel!(span_sum, 0.0f32, |v: f32| v, |a: f32, b: f32| a + b);
span_kernel!(span_abs_sum, 0.0f32, |v: f32| v.abs(), |a: f32, b: f32| a + b);
span_kernel!(span_square_sum, 0.0f32, |v: f32| v * v, |a: f32, b: f32| a + b);
span_kernel!(span_exp_sum, 0.0f32, |v: f32| v.exp(), |a: f32, b: f32| a + b);
span_kernel!(span_max, f32::NEG_INFINITY, |v: f32| v, |a: f32, b: f32| a.max(b));
span_kernel!(span_min, f32::INFINITY, |v: f32| v, |a: f32, b: f32| a.min(b));
span_kernel!(span_prod, 1.0f32, |v: f32| v, |a: f32, b: f32| a * b);

fn span_fn_for(algorithm: ReduceAlgorithm) -> Option<SpanFn> {
    Some(match algorithm {
        ReduceAlgorithm::Sum | ReduceAlgorithm::Mean | ReduceAlgorithm::LogSum => span_sum,
        ReduceAlgorithm::L1 => span_abs_sum,
        ReduceAlgorithm::L2 | ReduceAlgorithm::SumSquare => span_square_sum,
        ReduceAlgorithm::LogSumExp => span_exp_sum,
        ReduceAlgorithm::Max => span_max,
        ReduceAlgorithm::Min => span_min,
        ReduceAlgorithm::Prod => span_prod,
        // Logical reductions stay on the reference path
        ReduceAlgorithm::And | ReduceAlgorithm::Or => return None,
    })
}

/// An opaque compiled span kernel. Immutable once built; shared through the
/// selector's binding cache.
#[derive(Clone)]
pub struct CompiledKernel {
    pub config: KernelConfig,
    /// Lane count the kernel was compiled for; spans it processes must be
    /// whole multiples of this.
    pub tile: usize,
    ker: SpanFn,
}

impl std::fmt::Debug for CompiledKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledKernel")
            .field("config", &self.config)
            .field("tile", &self.tile)
            .finish()
    }
}

impl CompiledKernel {
    /// Builds a kernel for `config` on hardware described by `caps`.
    ///
    /// Returns `None` when no kernel exists for the precision pair, the
    /// algorithm, or the hardware level. That is not an error; callers
    /// route to the reference path.
    pub fn compile(config: KernelConfig, caps: &CpuCapabilities, tile: usize) -> Option<Self> {
        if !caps.supports_compiled() {
            return None;
        }
        if !config.src_dtype.is_float() || !config.dst_dtype.is_float() {
            return None;
        }
        if tile == 0 || tile > MAX_LANES || tile > caps.max_lanes_f32() {
            return None;
        }
        let ker = span_fn_for(config.algorithm)?;
        Some(CompiledKernel { config, tile, ker })
    }

    /// Reduces one span into a partial accumulator. `len` must be a
    /// multiple of the kernel's tile.
    #[inline]
    pub(crate) fn process(&self, src: &[f32], start: usize, stride: usize, len: usize) -> f32 {
        (self.ker)(src, start, stride, len, self.tile)
    }
}
