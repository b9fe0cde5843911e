/// Runtime SIMD capability flags for the executing CPU.
///
/// Probed once per engine and cached in the kernel binding, never re-probed
/// per call. Tests construct fixed instances to pin down selection behavior
/// on any host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCapabilities {
    pub sse2: bool,
    pub avx2: bool,
    pub avx512: bool,
}

impl CpuCapabilities {
    /// Probes the running CPU.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            CpuCapabilities {
                sse2: std::arch::is_x86_feature_detected!("sse2"),
                avx2: std::arch::is_x86_feature_detected!("avx2"),
                avx512: std::arch::is_x86_feature_detected!("avx512f"),
            }
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            // Non-x86 targets take the reference path
            CpuCapabilities::none()
        }
    }

    /// No SIMD support at all; forces the reference path everywhere.
    pub const fn none() -> Self {
        CpuCapabilities {
            sse2: false,
            avx2: false,
            avx512: false,
        }
    }

    /// Full support, for deterministic fast-path tests.
    pub const fn full() -> Self {
        CpuCapabilities {
            sse2: true,
            avx2: true,
            avx512: true,
        }
    }

    /// Whether any compiled kernel can run at all.
    pub fn supports_compiled(&self) -> bool {
        self.sse2 || self.avx2 || self.avx512
    }

    /// f32 lanes of the widest available vector unit.
    pub fn max_lanes_f32(&self) -> usize {
        if self.avx512 {
            16
        } else if self.avx2 {
            8
        } else if self.sse2 {
            4
        } else {
            1
        }
    }
}
