//! Results must not depend on the worker count

mod common;

use common::create_cpu_context_with_threads;
use ndexec::prelude::*;
use proptest::prelude::*;

fn pseudo_random(len: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64) * 2.0 - 1.0
        })
        .collect()
}

fn sequential() -> CpuContext {
    create_cpu_context_with_threads(1, 1)
}

fn parallel() -> CpuContext {
    create_cpu_context_with_threads(4, 1)
}

fn bits(a: &NDArray) -> Vec<u64> {
    a.to_vec::<f64>().unwrap().into_iter().map(f64::to_bits).collect()
}

#[cfg(feature = "rayon")]
#[test]
fn test_thread_count_is_honoured() {
    assert_eq!(sequential().num_threads(), 1);
    assert_eq!(parallel().num_threads(), 4);
    assert_eq!(parallel().min_chunk_len(), 1);
}

#[test]
fn test_conv2d_bit_identical() {
    let input = NDArray::from_slice(&pseudo_random(2 * 3 * 9 * 9, 7), &[2, 3, 9, 9]).unwrap();
    let weight = NDArray::from_slice(&pseudo_random(3 * 3 * 3 * 5, 8), &[3, 3, 3, 5]).unwrap();
    let bias = NDArray::from_slice(&pseudo_random(5, 9), &[5]).unwrap();
    let options = Conv2dOptions::default()
        .with_padding(PaddingMode::Same)
        .with_stride((2, 1));
    let a = sequential().conv2d(&input, &weight, Some(&bias), &options).unwrap();
    let b = parallel().conv2d(&input, &weight, Some(&bias), &options).unwrap();
    assert_eq!(bits(&a), bits(&b));
}

#[test]
fn test_tile_bp_bit_identical() {
    let input = NDArray::from_slice(&[0.0f64; 6], &[2, 3]).unwrap();
    let grad = NDArray::from_slice(&pseudo_random(2 * 3 * 4 * 5, 3), &[8, 15]).unwrap();
    let a = sequential().tile_bp(&input, &grad, &[4, 5]).unwrap();
    let b = parallel().tile_bp(&input, &grad, &[4, 5]).unwrap();
    assert_eq!(bits(&a), bits(&b));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_reductions_bit_identical(
        shape in prop::collection::vec(1usize..6, 1..4),
        axis_mask in prop::collection::vec(any::<bool>(), 3),
        keep_dims in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let len = shape.iter().product();
        let x = NDArray::from_slice(&pseudo_random(len, seed), &shape).unwrap();
        let axes: Vec<isize> = (0..shape.len())
            .filter(|&d| axis_mask[d])
            .map(|d| d as isize)
            .collect();
        let (seq, par) = (sequential(), parallel());

        prop_assert_eq!(bits(&seq.sum(&x, &axes, keep_dims).unwrap()), bits(&par.sum(&x, &axes, keep_dims).unwrap()));
        prop_assert_eq!(bits(&seq.prod(&x, &axes, keep_dims).unwrap()), bits(&par.prod(&x, &axes, keep_dims).unwrap()));
        prop_assert_eq!(bits(&seq.max(&x, &axes, keep_dims).unwrap()), bits(&par.max(&x, &axes, keep_dims).unwrap()));

        let (m1, v1) = seq.moments(&x, &axes, keep_dims).unwrap();
        let (m2, v2) = par.moments(&x, &axes, keep_dims).unwrap();
        prop_assert_eq!(bits(&m1), bits(&m2));
        prop_assert_eq!(bits(&v1), bits(&v2));
    }

    #[test]
    fn prop_segment_sum_bit_identical(
        rows in 1usize..40,
        cols in 1usize..5,
        num_classes in 1usize..6,
        seed in any::<u64>(),
    ) {
        let data = NDArray::from_slice(&pseudo_random(rows * cols, seed), &[rows, cols]).unwrap();
        let ids: Vec<i32> = (0..rows).map(|r| ((r * 7 + seed as usize) % num_classes) as i32).collect();
        let ids = NDArray::from_slice(&ids, &[rows]).unwrap();
        let (seq, par) = (sequential(), parallel());

        let a = seq.unsorted_segment_sum(&data, &ids, num_classes).unwrap();
        let b = par.unsorted_segment_sum(&data, &ids, num_classes).unwrap();
        prop_assert_eq!(bits(&a), bits(&b));

        let grad = NDArray::from_slice(&pseudo_random(num_classes * cols, !seed), &[num_classes, cols]).unwrap();
        let (a, _) = seq.unsorted_segment_min_bp(&data, &ids, &grad, num_classes).unwrap();
        let (b, _) = par.unsorted_segment_min_bp(&data, &ids, &grad, num_classes).unwrap();
        prop_assert_eq!(bits(&a), bits(&b));
    }
}
