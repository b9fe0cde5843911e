/// The reduction algorithms the engine supports.
///
/// Every algorithm decomposes into three steps over f32 accumulators:
/// an element pre-map folded into [`combine`](ReduceAlgorithm::combine),
/// an associative/commutative merge of partial accumulators
/// ([`merge`](ReduceAlgorithm::merge)), and a final scalar transform
/// ([`finalize`](ReduceAlgorithm::finalize)). Partial results may therefore
/// be computed in any order and over any split of the reduced span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceAlgorithm {
    /// Sum of elements.
    Sum,
    /// Arithmetic mean: sum divided by the true element count.
    Mean,
    /// Maximum element.
    Max,
    /// Minimum element.
    Min,
    /// Product of elements.
    Prod,
    /// L1 norm: sum of absolute values.
    L1,
    /// L2 norm: square root of the sum of squares.
    L2,
    /// Sum of squares (L2 without the final square root).
    SumSquare,
    /// Natural log of the sum.
    LogSum,
    /// Natural log of the sum of exponentials.
    LogSumExp,
    /// Logical AND over elements (non-zero is true).
    And,
    /// Logical OR over elements (non-zero is true).
    Or,
}

impl ReduceAlgorithm {
    /// The identity value accumulation starts from.
    pub fn init_value(self) -> f32 {
        match self {
            ReduceAlgorithm::Max => f32::NEG_INFINITY,
            ReduceAlgorithm::Min => f32::INFINITY,
            ReduceAlgorithm::Prod | ReduceAlgorithm::And => 1.0,
            _ => 0.0,
        }
    }

    /// Folds one input element into an accumulator. The element pre-map
    /// (abs, square, exp, boolean test) happens here.
    #[inline]
    pub fn combine(self, acc: f32, v: f32) -> f32 {
        match self {
            ReduceAlgorithm::Sum
            | ReduceAlgorithm::Mean
            | ReduceAlgorithm::LogSum => acc + v,
            ReduceAlgorithm::Max => acc.max(v),
            ReduceAlgorithm::Min => acc.min(v),
            ReduceAlgorithm::Prod => acc * v,
            ReduceAlgorithm::L1 => acc + v.abs(),
            ReduceAlgorithm::L2 | ReduceAlgorithm::SumSquare => acc + v * v,
            ReduceAlgorithm::LogSumExp => acc + v.exp(),
            ReduceAlgorithm::And => ((acc != 0.0) && (v != 0.0)) as u8 as f32,
            ReduceAlgorithm::Or => ((acc != 0.0) || (v != 0.0)) as u8 as f32,
        }
    }

    /// Merges two partial accumulators. Unlike [`combine`](Self::combine)
    /// this never re-applies the element pre-map.
    #[inline]
    pub fn merge(self, a: f32, b: f32) -> f32 {
        match self {
            ReduceAlgorithm::Sum
            | ReduceAlgorithm::Mean
            | ReduceAlgorithm::LogSum
            | ReduceAlgorithm::L1
            | ReduceAlgorithm::L2
            | ReduceAlgorithm::SumSquare
            | ReduceAlgorithm::LogSumExp => a + b,
            ReduceAlgorithm::Max => a.max(b),
            ReduceAlgorithm::Min => a.min(b),
            ReduceAlgorithm::Prod => a * b,
            ReduceAlgorithm::And => ((a != 0.0) && (b != 0.0)) as u8 as f32,
            ReduceAlgorithm::Or => ((a != 0.0) || (b != 0.0)) as u8 as f32,
        }
    }

    /// Final scalar transform applied once per output element. `divisor` is
    /// the true count of reduced elements, excluding blocked-layout padding
    /// lanes; only mean-type algorithms consume it.
    #[inline]
    pub fn finalize(self, acc: f32, divisor: f32) -> f32 {
        match self {
            ReduceAlgorithm::Mean => acc / divisor,
            ReduceAlgorithm::L2 => acc.sqrt(),
            ReduceAlgorithm::LogSum | ReduceAlgorithm::LogSumExp => acc.ln(),
            _ => acc,
        }
    }

    /// Whether the final store needs the reduced-element divisor.
    pub fn needs_division(self) -> bool {
        matches!(self, ReduceAlgorithm::Mean)
    }

    /// Whether chaining reductions over complementary axis sets equals one
    /// combined reduction. Holds for algorithms whose finalize step is the
    /// identity and whose combine equals merge.
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            ReduceAlgorithm::Sum
                | ReduceAlgorithm::Max
                | ReduceAlgorithm::Min
                | ReduceAlgorithm::Prod
                | ReduceAlgorithm::And
                | ReduceAlgorithm::Or
        )
    }

    /// Algorithms whose per-element pre-map or finalize step is not the
    /// identity cannot degenerate into a plain copy, so they demand at
    /// least one reduced axis.
    pub fn requires_reduced_axis(self) -> bool {
        matches!(
            self,
            ReduceAlgorithm::L1
                | ReduceAlgorithm::L2
                | ReduceAlgorithm::SumSquare
                | ReduceAlgorithm::LogSum
                | ReduceAlgorithm::LogSumExp
        )
    }
}
