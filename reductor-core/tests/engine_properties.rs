use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reductor_core::{
    pack_f32, unpack_f32, CpuCapabilities, DType, PostOp, PostOpData, ReduceAlgorithm,
    ReduceDescriptor, ReduceEngine, ReduceLayoutType, ReductorError, TensorDesc, TensorView,
    TensorViewMut,
};

fn random_data(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-4.0..4.0)).collect()
}

/// Naive planar reduction oracle over logical coordinates.
fn naive_reduce(
    data: &[f32],
    shape: &[usize],
    axes: &[usize],
    algorithm: ReduceAlgorithm,
    keep_dims: bool,
) -> (Vec<usize>, Vec<f32>) {
    let rank = shape.len();
    let mut out_shape = Vec::new();
    for (i, &s) in shape.iter().enumerate() {
        if axes.contains(&i) {
            if keep_dims {
                out_shape.push(1);
            }
        } else {
            out_shape.push(s);
        }
    }
    let out_numel: usize = out_shape.iter().product::<usize>().max(1);
    let mut acc = vec![algorithm.init_value(); out_numel];

    let numel: usize = shape.iter().product();
    let mut coords = vec![0usize; rank];
    for flat in 0..numel {
        // decode planar row-major coords
        let mut rest = flat;
        for i in (0..rank).rev() {
            coords[i] = rest % shape[i];
            rest /= shape[i];
        }
        let mut out_flat = 0;
        for (i, &c) in coords.iter().enumerate() {
            if !axes.contains(&i) {
                out_flat = out_flat * shape[i] + c;
            }
        }
        acc[out_flat] = algorithm.combine(acc[out_flat], data[flat]);
    }

    let divisor: usize = axes.iter().map(|&a| shape[a]).product::<usize>().max(1);
    for v in &mut acc {
        *v = algorithm.finalize(*v, divisor as f32);
    }
    (out_shape, acc)
}

fn run_engine(
    algorithm: ReduceAlgorithm,
    axes: Vec<isize>,
    keep_dims: bool,
    shape: Vec<usize>,
    layout: ReduceLayoutType,
    bytes: &[u8],
    caps: CpuCapabilities,
) -> Vec<f32> {
    let desc = ReduceDescriptor::new(algorithm, axes, keep_dims, DType::F32, DType::F32);
    let mut engine = ReduceEngine::with_capabilities(desc, caps);
    let input_desc = TensorDesc::new(shape, DType::F32, layout);
    let input = TensorView::new(input_desc.clone(), bytes).unwrap();
    let out_shape = engine.output_shape(&input_desc).unwrap();
    let out_desc = TensorDesc::new(out_shape, DType::F32, ReduceLayoutType::Planar);
    let mut out_bytes = vec![0u8; out_desc.byte_len().unwrap()];
    let mut output = TensorViewMut::new(out_desc, &mut out_bytes).unwrap();
    engine
        .run(&input, &mut output, &PostOpData::default())
        .unwrap();
    unpack_f32(&out_bytes)
}

#[test]
fn test_sum_axes_1_3_concrete_scenario() {
    // [2,3,4,5], reduce {1,3}, sum, keep_dims -> [2,1,4,1]
    let shape = vec![2usize, 3, 4, 5];
    let data: Vec<f32> = (0..120).map(|i| i as f32).collect();
    let bytes = pack_f32(&data);

    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![1, 3], true, DType::F32, DType::F32);
    let engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(shape.clone(), DType::F32, ReduceLayoutType::Planar);
    assert_eq!(engine.output_shape(&input_desc).unwrap(), vec![2, 1, 4, 1]);

    let got = run_engine(
        ReduceAlgorithm::Sum,
        vec![1, 3],
        true,
        shape.clone(),
        ReduceLayoutType::Planar,
        &bytes,
        CpuCapabilities::detect(),
    );
    let (oracle_shape, want) = naive_reduce(&data, &shape, &[1, 3], ReduceAlgorithm::Sum, true);
    assert_eq!(oracle_shape, vec![2, 1, 4, 1]);
    assert_eq!(got.len(), 8);
    for (g, w) in got.iter().zip(&want) {
        // each output folds exactly 15 inputs
        assert_relative_eq!(*g, *w, max_relative = 1e-6);
    }
}

#[test]
fn test_keep_dims_variants_are_pure_reshape() {
    let shape = vec![2usize, 3, 4];
    let data = random_data(24, 7);
    let bytes = pack_f32(&data);
    for algorithm in [ReduceAlgorithm::Sum, ReduceAlgorithm::Mean, ReduceAlgorithm::Max] {
        let kept = run_engine(
            algorithm,
            vec![1],
            true,
            shape.clone(),
            ReduceLayoutType::Planar,
            &bytes,
            CpuCapabilities::detect(),
        );
        let squeezed = run_engine(
            algorithm,
            vec![1],
            false,
            shape.clone(),
            ReduceLayoutType::Planar,
            &bytes,
            CpuCapabilities::detect(),
        );
        // identical data, only the shape differs
        assert_eq!(kept, squeezed);
    }
}

#[test]
fn test_chained_complement_equals_union() {
    let shape = vec![2usize, 3, 4, 5];
    let data = random_data(120, 11);
    let bytes = pack_f32(&data);
    for algorithm in [
        ReduceAlgorithm::Sum,
        ReduceAlgorithm::Max,
        ReduceAlgorithm::Min,
        ReduceAlgorithm::Prod,
    ] {
        assert!(algorithm.is_associative());
        let union = run_engine(
            algorithm,
            vec![1, 3],
            true,
            shape.clone(),
            ReduceLayoutType::Planar,
            &bytes,
            CpuCapabilities::detect(),
        );
        let first = run_engine(
            algorithm,
            vec![1],
            true,
            shape.clone(),
            ReduceLayoutType::Planar,
            &bytes,
            CpuCapabilities::detect(),
        );
        let chained = run_engine(
            algorithm,
            vec![3],
            true,
            vec![2, 1, 4, 5],
            ReduceLayoutType::Planar,
            &pack_f32(&first),
            CpuCapabilities::detect(),
        );
        for (u, c) in union.iter().zip(&chained) {
            assert_relative_eq!(*u, *c, max_relative = 1e-4, epsilon = 1e-5);
        }
    }
}

#[test]
fn test_compiled_and_reference_paths_agree() {
    // (shape, axes) pairs hitting ReduceAll, ReduceDH and a generic pattern
    let cases: Vec<(Vec<usize>, Vec<isize>)> = vec![
        (vec![2, 3, 4, 5], vec![1, 2, 3]),
        (vec![2, 3, 4, 5, 6], vec![2, 3]),
        (vec![4, 7], vec![1]),
    ];
    for (shape, axes) in cases {
        let numel: usize = shape.iter().product();
        let data = random_data(numel, 13);
        let bytes = pack_f32(&data);
        for algorithm in [
            ReduceAlgorithm::Sum,
            ReduceAlgorithm::Mean,
            ReduceAlgorithm::Max,
            ReduceAlgorithm::Min,
            ReduceAlgorithm::L1,
            ReduceAlgorithm::L2,
        ] {
            let fast = run_engine(
                algorithm,
                axes.clone(),
                true,
                shape.clone(),
                ReduceLayoutType::Planar,
                &bytes,
                CpuCapabilities::full(),
            );
            let reference = run_engine(
                algorithm,
                axes.clone(),
                true,
                shape.clone(),
                ReduceLayoutType::Planar,
                &bytes,
                CpuCapabilities::none(),
            );
            for (f, r) in fast.iter().zip(&reference) {
                assert_relative_eq!(*f, *r, max_relative = 1e-4, epsilon = 1e-5);
            }
        }
    }
}

/// Lays planar logical data out in blocked physical order, poisoning the
/// padding lanes so any read of them surfaces as NaN in the result.
fn pack_blocked(planar: &[f32], shape: &[usize], block: usize) -> Vec<u8> {
    let (n, c, d, h, w) = match *shape {
        [n, c, d, h, w] => (n, c, d, h, w),
        [n, c, h, w] => (n, c, 1usize, h, w),
        _ => panic!("unsupported rank for blocked packing"),
    };
    let padded_c = c.div_ceil(block) * block;
    let cb = padded_c / block;
    let mut physical = vec![f32::NAN; n * padded_c * d * h * w];
    for b in 0..n {
        for ch in 0..c {
            for z in 0..d {
                for y in 0..h {
                    for x in 0..w {
                        let src = (((b * c + ch) * d + z) * h + y) * w + x;
                        let dst = (((((b * cb + ch / block) * d + z) * h + y) * w + x) * block)
                            + ch % block;
                        physical[dst] = planar[src];
                    }
                }
            }
        }
    }
    pack_f32(&physical)
}

#[test]
fn test_blocked_cdw_compiled_matches_reference() {
    // axes {C, D, W} of a blocked tensor drive the merged W-span kernel path
    let shape = vec![2usize, 6, 3, 4, 5];
    let planar = random_data(720, 37);
    let bytes = pack_blocked(&planar, &shape, 4);
    for algorithm in [
        ReduceAlgorithm::Sum,
        ReduceAlgorithm::Mean,
        ReduceAlgorithm::Max,
        ReduceAlgorithm::Min,
    ] {
        let fast = run_engine(
            algorithm,
            vec![1, 2, 4],
            true,
            shape.clone(),
            ReduceLayoutType::Blocked { block: 4 },
            &bytes,
            CpuCapabilities::full(),
        );
        let reference = run_engine(
            algorithm,
            vec![1, 2, 4],
            true,
            shape.clone(),
            ReduceLayoutType::Blocked { block: 4 },
            &bytes,
            CpuCapabilities::none(),
        );
        let (_, want) = naive_reduce(&planar, &shape, &[1, 2, 4], algorithm, true);
        for ((f, r), w) in fast.iter().zip(&reference).zip(&want) {
            assert!(f.is_finite(), "padding lane leaked into {algorithm:?}");
            assert_relative_eq!(*f, *r, max_relative = 1e-4, epsilon = 1e-5);
            assert_relative_eq!(*f, *w, max_relative = 1e-4, epsilon = 1e-5);
        }
    }
}

#[test]
fn test_blocked_dh_compiled_matches_reference() {
    // axes {D, H} of a blocked tensor: the strided-span kernel consumes the
    // staged planar view, so padding must be dropped by the conversion
    let shape = vec![2usize, 6, 3, 4, 5];
    let planar = random_data(720, 41);
    let bytes = pack_blocked(&planar, &shape, 4);
    for algorithm in [ReduceAlgorithm::Sum, ReduceAlgorithm::Mean, ReduceAlgorithm::Max] {
        let fast = run_engine(
            algorithm,
            vec![2, 3],
            true,
            shape.clone(),
            ReduceLayoutType::Blocked { block: 4 },
            &bytes,
            CpuCapabilities::full(),
        );
        let reference = run_engine(
            algorithm,
            vec![2, 3],
            true,
            shape.clone(),
            ReduceLayoutType::Blocked { block: 4 },
            &bytes,
            CpuCapabilities::none(),
        );
        let (_, want) = naive_reduce(&planar, &shape, &[2, 3], algorithm, true);
        for ((f, r), w) in fast.iter().zip(&reference).zip(&want) {
            assert!(f.is_finite(), "padding lane leaked into {algorithm:?}");
            assert_relative_eq!(*f, *r, max_relative = 1e-4, epsilon = 1e-5);
            assert_relative_eq!(*f, *w, max_relative = 1e-4, epsilon = 1e-5);
        }
    }
}

#[test]
fn test_rank_six_planar_reduction() {
    // beyond-5D shapes fold mergeable neighbors into the canonical form
    let shape = vec![2usize, 3, 4, 5, 2, 3];
    let data = random_data(720, 31);
    let bytes = pack_f32(&data);

    let got = run_engine(
        ReduceAlgorithm::Sum,
        vec![2, 3],
        true,
        shape.clone(),
        ReduceLayoutType::Planar,
        &bytes,
        CpuCapabilities::detect(),
    );
    let (oracle_shape, want) = naive_reduce(&data, &shape, &[2, 3], ReduceAlgorithm::Sum, true);
    assert_eq!(oracle_shape, vec![2, 3, 1, 1, 2, 3]);
    for (g, w) in got.iter().zip(&want) {
        assert_relative_eq!(*g, *w, max_relative = 1e-4, epsilon = 1e-5);
    }

    // reducing every axis collapses to one span over the whole buffer
    let got = run_engine(
        ReduceAlgorithm::Mean,
        vec![0, 1, 2, 3, 4, 5],
        false,
        shape,
        ReduceLayoutType::Planar,
        &bytes,
        CpuCapabilities::full(),
    );
    let want = data.iter().sum::<f32>() / 720.0;
    assert_relative_eq!(got[0], want, max_relative = 1e-4);
}

#[test]
fn test_channel_last_matches_planar_through_engine() {
    let shape = vec![2usize, 3, 4, 5];
    let planar_data = random_data(120, 17);

    // repack into channel-last physical order (n, h, w, c)
    let (n, c, h, w) = (2usize, 3usize, 4usize, 5usize);
    let mut nhwc = vec![0.0f32; 120];
    for b in 0..n {
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    let planar_idx = ((b * c + ch) * h + y) * w + x;
                    let nhwc_idx = ((b * h + y) * w + x) * c + ch;
                    nhwc[nhwc_idx] = planar_data[planar_idx];
                }
            }
        }
    }

    for algorithm in [ReduceAlgorithm::Sum, ReduceAlgorithm::Mean, ReduceAlgorithm::Min] {
        let a = run_engine(
            algorithm,
            vec![1],
            true,
            shape.clone(),
            ReduceLayoutType::Planar,
            &pack_f32(&planar_data),
            CpuCapabilities::detect(),
        );
        let b = run_engine(
            algorithm,
            vec![1],
            true,
            shape.clone(),
            ReduceLayoutType::ChannelLast,
            &pack_f32(&nhwc),
            CpuCapabilities::detect(),
        );
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(*x, *y, max_relative = 1e-5, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_blocked_mean_divisor_excludes_padding() {
    // 6 real channels padded to one block of 8 with poisoned pad lanes
    let block = 8usize;
    let channels = 6usize;
    let mut physical = vec![555.0f32; block];
    for c in 0..channels {
        physical[c] = (c + 1) as f32;
    }
    let got = run_engine(
        ReduceAlgorithm::Mean,
        vec![1],
        true,
        vec![1, channels, 1, 1],
        ReduceLayoutType::Blocked { block },
        &pack_f32(&physical),
        CpuCapabilities::detect(),
    );
    // divisor is 6, not 8
    assert_relative_eq!(got[0], 21.0 / 6.0, max_relative = 1e-6);
}

#[test]
fn test_blocked_mean_all_pad_counts() {
    let block = 8usize;
    for pad in 0..block {
        let channels = block - pad;
        let mut physical = vec![-999.0f32; block];
        for (c, v) in physical.iter_mut().take(channels).enumerate() {
            *v = (c + 1) as f32;
        }
        let got = run_engine(
            ReduceAlgorithm::Mean,
            vec![1],
            true,
            vec![1, channels, 1, 1],
            ReduceLayoutType::Blocked { block },
            &pack_f32(&physical),
            CpuCapabilities::detect(),
        );
        let want: f32 = (1..=channels).sum::<usize>() as f32 / channels as f32;
        assert_relative_eq!(got[0], want, max_relative = 1e-6);
    }
}

#[test]
fn test_empty_axis_set_is_bitwise_copy() {
    let shape = vec![2usize, 3, 4];
    let data = random_data(24, 23);
    let bytes = pack_f32(&data);
    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![], true, DType::F32, DType::F32);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(shape.clone(), DType::F32, ReduceLayoutType::Planar);
    let input = TensorView::new(input_desc.clone(), &bytes).unwrap();
    let mut out_bytes = vec![0u8; bytes.len()];
    let mut output = TensorViewMut::new(input_desc, &mut out_bytes).unwrap();
    engine
        .run(&input, &mut output, &PostOpData::default())
        .unwrap();
    assert_eq!(out_bytes, bytes);
}

#[test]
fn test_finalize_through_engine() {
    let data = vec![3.0f32, 4.0];
    let got = run_engine(
        ReduceAlgorithm::L2,
        vec![0],
        true,
        vec![2],
        ReduceLayoutType::Planar,
        &pack_f32(&data),
        CpuCapabilities::detect(),
    );
    assert_relative_eq!(got[0], 5.0, max_relative = 1e-6);

    let data = vec![0.0f32, 1.0, 2.0];
    let got = run_engine(
        ReduceAlgorithm::LogSumExp,
        vec![0],
        true,
        vec![3],
        ReduceLayoutType::Planar,
        &pack_f32(&data),
        CpuCapabilities::detect(),
    );
    let want = (1.0 + 1.0f32.exp() + 2.0f32.exp()).ln();
    assert_relative_eq!(got[0], want, max_relative = 1e-5);
}

#[test]
fn test_logical_reductions() {
    let desc = ReduceDescriptor::new(ReduceAlgorithm::And, vec![1], false, DType::Bool, DType::Bool);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(vec![2, 3], DType::Bool, ReduceLayoutType::Planar);
    let data: Vec<u8> = vec![1, 1, 1, 1, 0, 1];
    let input = TensorView::new(input_desc.clone(), &data).unwrap();
    let out_desc = TensorDesc::new(vec![2], DType::Bool, ReduceLayoutType::Planar);
    let mut out = vec![0u8; 2];
    let mut output = TensorViewMut::new(out_desc, &mut out).unwrap();
    engine
        .run(&input, &mut output, &PostOpData::default())
        .unwrap();
    assert_eq!(out, vec![1, 0]);

    let desc = ReduceDescriptor::new(ReduceAlgorithm::Or, vec![1], false, DType::Bool, DType::Bool);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(vec![2, 3], DType::Bool, ReduceLayoutType::Planar);
    let data: Vec<u8> = vec![0, 0, 0, 0, 1, 0];
    let input = TensorView::new(input_desc, &data).unwrap();
    let out_desc = TensorDesc::new(vec![2], DType::Bool, ReduceLayoutType::Planar);
    let mut out = vec![9u8; 2];
    let mut output = TensorViewMut::new(out_desc, &mut out).unwrap();
    engine
        .run(&input, &mut output, &PostOpData::default())
        .unwrap();
    assert_eq!(out, vec![0, 1]);
}

#[test]
fn test_fused_post_ops() {
    // mean over H,W then y = y * scale[c] + shift[c], then relu
    let desc = ReduceDescriptor::new(
        ReduceAlgorithm::Mean,
        vec![2, 3],
        true,
        DType::F32,
        DType::F32,
    )
    .with_post_ops(vec![PostOp::ScaleShift, PostOp::Relu]);
    let mut engine = ReduceEngine::new(desc);

    let input_desc = TensorDesc::new(vec![1, 2, 2, 2], DType::F32, ReduceLayoutType::Planar);
    let data = pack_f32(&[1.0, 2.0, 3.0, 4.0, -1.0, -2.0, -3.0, -4.0]);
    let input = TensorView::new(input_desc, &data).unwrap();
    let out_desc = TensorDesc::new(vec![1, 2, 1, 1], DType::F32, ReduceLayoutType::Planar);
    let mut out_bytes = vec![0u8; 8];
    let mut output = TensorViewMut::new(out_desc, &mut out_bytes).unwrap();

    let scale = vec![2.0f32, 2.0];
    let shift = vec![0.5f32, 0.5];
    let post = PostOpData {
        scale: Some(&scale),
        shift: Some(&shift),
    };
    engine.run(&input, &mut output, &post).unwrap();
    let got = unpack_f32(&out_bytes);
    // channel 0: mean 2.5 -> 5.5; channel 1: mean -2.5 -> -4.5 -> relu 0
    assert_relative_eq!(got[0], 5.5, max_relative = 1e-6);
    assert_relative_eq!(got[1], 0.0);
}

#[test]
fn test_missing_post_op_data_fails_before_write() {
    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![1], true, DType::F32, DType::F32)
        .with_post_ops(vec![PostOp::ScaleShift]);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(vec![1, 4], DType::F32, ReduceLayoutType::Planar);
    let data = pack_f32(&[1.0, 2.0, 3.0, 4.0]);
    let input = TensorView::new(input_desc, &data).unwrap();
    let out_desc = TensorDesc::new(vec![1, 1], DType::F32, ReduceLayoutType::Planar);
    let sentinel = pack_f32(&[42.0]);
    let mut out_bytes = sentinel.clone();
    let mut output = TensorViewMut::new(out_desc, &mut out_bytes).unwrap();
    let err = engine
        .run(&input, &mut output, &PostOpData::default())
        .unwrap_err();
    assert!(matches!(err, ReductorError::UnsupportedOperation(_)));
    // no partial write happened
    assert_eq!(out_bytes, sentinel);
}

#[test]
fn test_f16_output_narrowing() {
    use half::f16;
    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![0], true, DType::F32, DType::F16);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(vec![3], DType::F32, ReduceLayoutType::Planar);
    let data = pack_f32(&[0.1, 0.2, 0.3]);
    let input = TensorView::new(input_desc, &data).unwrap();
    let out_desc = TensorDesc::new(vec![1], DType::F16, ReduceLayoutType::Planar);
    let mut out_bytes = vec![0u8; 2];
    let mut output = TensorViewMut::new(out_desc, &mut out_bytes).unwrap();
    engine
        .run(&input, &mut output, &PostOpData::default())
        .unwrap();
    let got = f16::from_ne_bytes([out_bytes[0], out_bytes[1]]).to_f32();
    assert_relative_eq!(got, 0.6, max_relative = 1e-2);
}

#[test]
fn test_round_to_zero_narrowing() {
    let desc = ReduceDescriptor::new(ReduceAlgorithm::Mean, vec![0], true, DType::F32, DType::I32)
        .with_round_to_zero(true);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(vec![4], DType::F32, ReduceLayoutType::Planar);
    let data = pack_f32(&[1.0, 2.0, 3.0, 5.0]); // mean 2.75
    let input = TensorView::new(input_desc, &data).unwrap();
    let out_desc = TensorDesc::new(vec![1], DType::I32, ReduceLayoutType::Planar);
    let mut out_bytes = vec![0u8; 4];
    let mut output = TensorViewMut::new(out_desc, &mut out_bytes).unwrap();
    engine
        .run(&input, &mut output, &PostOpData::default())
        .unwrap();
    let got = i32::from_ne_bytes([out_bytes[0], out_bytes[1], out_bytes[2], out_bytes[3]]);
    assert_eq!(got, 2); // truncated, not rounded to 3
}

#[test]
fn test_invalid_axis_and_shape_mismatch() {
    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![4], true, DType::F32, DType::F32);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(vec![2, 3], DType::F32, ReduceLayoutType::Planar);
    let data = pack_f32(&[0.0; 6]);
    let input = TensorView::new(input_desc.clone(), &data).unwrap();
    let out_desc = TensorDesc::new(vec![2, 1], DType::F32, ReduceLayoutType::Planar);
    let mut out_bytes = vec![0u8; 8];
    let mut output = TensorViewMut::new(out_desc, &mut out_bytes).unwrap();
    assert!(matches!(
        engine.run(&input, &mut output, &PostOpData::default()),
        Err(ReductorError::InvalidAxis { axis: 4, rank: 2 })
    ));

    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![1], true, DType::F32, DType::F32);
    let mut engine = ReduceEngine::new(desc);
    let input = TensorView::new(input_desc, &data).unwrap();
    let bad_out_desc = TensorDesc::new(vec![2, 3], DType::F32, ReduceLayoutType::Planar);
    let mut bad_bytes = vec![0u8; 24];
    let mut output = TensorViewMut::new(bad_out_desc, &mut bad_bytes).unwrap();
    assert!(matches!(
        engine.run(&input, &mut output, &PostOpData::default()),
        Err(ReductorError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_dtype_mismatch_rejected() {
    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![1], true, DType::F32, DType::F32);
    let mut engine = ReduceEngine::new(desc);
    let input_desc = TensorDesc::new(vec![2, 3], DType::I32, ReduceLayoutType::Planar);
    let data = vec![0u8; 24];
    let input = TensorView::new(input_desc, &data).unwrap();
    let out_desc = TensorDesc::new(vec![2, 1], DType::F32, ReduceLayoutType::Planar);
    let mut out_bytes = vec![0u8; 8];
    let mut output = TensorViewMut::new(out_desc, &mut out_bytes).unwrap();
    assert!(matches!(
        engine.run(&input, &mut output, &PostOpData::default()),
        Err(ReductorError::DataTypeMismatch { .. })
    ));
}

#[test]
fn test_capability_query() {
    let desc = ReduceDescriptor::new(ReduceAlgorithm::Sum, vec![1], true, DType::F32, DType::F32);
    let engine = ReduceEngine::with_capabilities(desc, CpuCapabilities::full());
    assert!(engine.can_use_fast_path(ReduceLayoutType::Planar));

    let desc = ReduceDescriptor::new(ReduceAlgorithm::And, vec![1], true, DType::Bool, DType::Bool);
    let engine = ReduceEngine::with_capabilities(desc, CpuCapabilities::full());
    assert!(!engine.can_use_fast_path(ReduceLayoutType::Planar));
}
