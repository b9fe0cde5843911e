//! # reductor-core
//!
//! CPU tensor-reduction execution engine: computes reductions (sum, mean,
//! max, min, product, norms, logical AND/OR) over arbitrary axis subsets of
//! N-dimensional tensors, across planar, channel-last and blocked memory
//! layouts, with optional fused post-processing and mixed precision.
//!
//! The engine selects between compiled span kernels (for the fast
//! contiguous-span axis patterns) and a portable scalar reference path, and
//! falls back to the reference path transparently whenever no kernel covers
//! the precision pair, layout or hardware.

pub mod algorithm;
pub mod capability;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod layout;
pub mod memory;
pub mod plan;
pub mod selector;
pub mod types;
pub mod view;

mod convert;
mod execute;
mod reference;

pub use algorithm::ReduceAlgorithm;
pub use capability::CpuCapabilities;
pub use descriptor::{PostOp, ReduceDescriptor};
pub use engine::ReduceEngine;
pub use error::ReductorError;
pub use execute::PostOpData;
pub use layout::{ReduceLayoutType, TensorDesc};
pub use memory::{ScratchArena, ScratchRequirements};
pub use plan::LayoutPlan;
pub use selector::{fast_path_available, KernelBinding, KernelSelector};
pub use types::{pack_f32, unpack_f32, DType};
pub use view::{TensorView, TensorViewMut};
