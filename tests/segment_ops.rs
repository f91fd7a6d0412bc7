//! Unsorted segment reductions and their gradients

mod common;

use common::{assert_allclose_f32, create_cpu_context, init_tracing};
use ndexec::error::ErrorKind;
use ndexec::prelude::*;

#[test]
fn test_segment_min_reference_example() {
    init_tracing();
    let ctx = create_cpu_context();
    let data = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 0.0, 5.0, 5.0], &[3, 2]).unwrap();
    let ids = NDArray::from_slice(&[0i32, 1, 0], &[3]).unwrap();
    let out = ctx.unsorted_segment_min(&data, &ids, 2).unwrap();
    assert_eq!(out.shape(), &[2, 2]);
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![1.0, 0.0, 3.0, 0.0]);
}

#[test]
fn test_out_of_range_id_names_value_and_bound() {
    let ctx = create_cpu_context();
    let data = NDArray::from_slice(&[1.0f64, 2.0, 3.0], &[3]).unwrap();
    let ids = NDArray::from_slice(&[0i64, 1, 3], &[3]).unwrap();
    let err = ctx.unsorted_segment_sum(&data, &ids, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    let msg = err.to_string();
    assert!(msg.contains("got 3"), "{msg}");
    assert!(msg.contains("[0, 2)"), "{msg}");
}

#[test]
fn test_large_id_reported_exactly() {
    let ctx = create_cpu_context();
    let data = NDArray::from_slice(&[1i64], &[1]).unwrap();
    let ids = NDArray::from_slice(&[9_007_199_254_740_993i64], &[1]).unwrap();
    let err = ctx.unsorted_segment_sum(&data, &ids, 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert!(err.to_string().contains("got 9007199254740993"), "{err}");
}

#[test]
fn test_i64_segment_sum_is_exact() {
    let ctx = create_cpu_context();
    let big = 9_007_199_254_740_993i64;
    let data = NDArray::from_slice(&[big, 0], &[2]).unwrap();
    let ids = NDArray::from_slice(&[0i32, 0], &[2]).unwrap();
    let out = ctx.unsorted_segment_sum(&data, &ids, 1).unwrap();
    assert_eq!(out.to_vec::<i64>().unwrap(), vec![big]);

    let data = NDArray::from_slice(&[100i32; 5], &[5]).unwrap();
    let ids = NDArray::from_slice(&[0i32; 5], &[5]).unwrap();
    let out = ctx.unsorted_segment_prod(&data, &ids, 1).unwrap();
    assert_eq!(out.to_vec::<i32>().unwrap(), vec![1_410_065_408]);
}

#[test]
fn test_every_reduction_on_rank_three_data() {
    let ctx = create_cpu_context();
    // rows are 2x2 blocks
    let data = NDArray::from_slice(
        &[
            1.0f32, 2.0, 3.0, 4.0, //
            5.0, 6.0, 7.0, 8.0, //
            -1.0, 0.5, 2.0, 1.0,
        ],
        &[3, 2, 2],
    )
    .unwrap();
    let ids = NDArray::from_slice(&[1i32, 0, 1], &[3]).unwrap();

    let sum = ctx.unsorted_segment_sum(&data, &ids, 2).unwrap();
    assert_eq!(sum.shape(), &[2, 2, 2]);
    assert_allclose_f32(
        &sum.to_vec::<f32>().unwrap(),
        &[5.0, 6.0, 7.0, 8.0, 0.0, 2.5, 5.0, 5.0],
        1e-6,
        1e-6,
        "segment sum",
    );

    let mean = ctx.unsorted_segment_mean(&data, &ids, 2).unwrap();
    assert_allclose_f32(
        &mean.to_vec::<f32>().unwrap(),
        &[5.0, 6.0, 7.0, 8.0, 0.0, 1.25, 2.5, 2.5],
        1e-6,
        1e-6,
        "segment mean",
    );

    let prod = ctx.unsorted_segment_prod(&data, &ids, 2).unwrap();
    assert_allclose_f32(
        &prod.to_vec::<f32>().unwrap(),
        &[5.0, 6.0, 7.0, 8.0, -1.0, 1.0, 6.0, 4.0],
        1e-6,
        1e-6,
        "segment prod",
    );

    let max = ctx.unsorted_segment_max(&data, &ids, 2).unwrap();
    assert_eq!(
        max.to_vec::<f32>().unwrap(),
        vec![5.0, 6.0, 7.0, 8.0, 1.0, 2.0, 3.0, 4.0]
    );
}

#[test]
fn test_empty_class_holds_identity() {
    let ctx = create_cpu_context();
    let data = NDArray::from_slice(&[4i32, 9], &[2]).unwrap();
    let ids = NDArray::from_slice(&[2i32, 2], &[2]).unwrap();
    let max = ctx.unsorted_segment_max(&data, &ids, 3).unwrap();
    assert_eq!(max.to_vec::<i32>().unwrap(), vec![i32::MIN, i32::MIN, 9]);
    let sum = ctx.unsorted_segment_sum(&data, &ids, 3).unwrap();
    assert_eq!(sum.to_vec::<i32>().unwrap(), vec![0, 0, 13]);
}

#[test]
fn test_ids_length_must_match_rows() {
    let ctx = create_cpu_context();
    let data = NDArray::from_slice(&[1.0f32, 2.0, 3.0], &[3]).unwrap();
    let ids = NDArray::from_slice(&[0i32, 1], &[2]).unwrap();
    assert!(ctx.unsorted_segment_min(&data, &ids, 2).is_err());
}

#[test]
fn test_max_bp_routes_gradient_to_extremum() {
    let ctx = create_cpu_context();
    let data = NDArray::from_slice(&[1.0f32, 9.0, 4.0, 2.0, 4.0, 3.0], &[3, 2]).unwrap();
    let ids = NDArray::from_slice(&[0i32, 0, 1], &[3]).unwrap();
    let grad = NDArray::from_slice(&[10.0f32, 20.0, 30.0, 40.0], &[2, 2]).unwrap();

    let (d_data, d_ids) = ctx.unsorted_segment_max_bp(&data, &ids, &grad, 2).unwrap();
    assert_eq!(d_data.shape(), &[3, 2]);
    assert_eq!(
        d_data.to_vec::<f32>().unwrap(),
        vec![0.0, 20.0, 10.0, 0.0, 30.0, 40.0]
    );
    assert_eq!(d_ids.shape(), ids.shape());
    assert_eq!(d_ids.dtype(), ids.dtype());
    assert!(d_ids.to_vec::<i32>().unwrap().iter().all(|&v| v == 0));
}

#[test]
fn test_min_bp_first_row_wins_ties() {
    let ctx = create_cpu_context();
    let data = NDArray::from_slice(&[2.0f64, 2.0, 5.0], &[3]).unwrap();
    let ids = NDArray::from_slice(&[0i64, 0, 0], &[3]).unwrap();
    let grad = NDArray::from_slice(&[7.0f64], &[1]).unwrap();
    let (d_data, _) = ctx.unsorted_segment_min_bp(&data, &ids, &grad, 1).unwrap();
    assert_eq!(d_data.to_vec::<f64>().unwrap(), vec![7.0, 0.0, 0.0]);
}
