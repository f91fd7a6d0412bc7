//! Generic reductions over integer and float arrays

mod common;

use common::create_cpu_context;
use ndexec::prelude::*;

#[test]
fn test_i64_sum_beyond_f64_mantissa() {
    let ctx = create_cpu_context();
    let big = 9_007_199_254_740_993i64;
    let a = NDArray::from_slice(&[big, 0], &[2]).unwrap();
    let total = ctx.sum(&a, &[], false).unwrap();
    assert_eq!(total.to_vec::<i64>().unwrap(), vec![big]);
    let mean = ctx.mean(&a, &[], false).unwrap();
    assert_eq!(mean.to_vec::<i64>().unwrap(), vec![big / 2]);
}

#[test]
fn test_u64_sum_above_i64_max() {
    let ctx = create_cpu_context();
    let a = NDArray::from_slice(&[u64::MAX - 1, 1], &[2]).unwrap();
    let total = ctx.sum(&a, &[0], false).unwrap();
    assert_eq!(total.to_vec::<u64>().unwrap(), vec![u64::MAX]);
}

#[test]
fn test_integer_prod_wraps() {
    let ctx = create_cpu_context();
    let a = NDArray::from_slice(&[100i32; 10], &[2, 5]).unwrap();
    let rows = ctx.prod(&a, &[1], false).unwrap();
    assert_eq!(rows.to_vec::<i32>().unwrap(), vec![100i32.wrapping_pow(5); 2]);
    assert_eq!(rows.to_vec::<i32>().unwrap()[0], 1_410_065_408);
}

#[test]
fn test_float_sum_is_unchanged() {
    let ctx = create_cpu_context();
    let a = NDArray::from_slice(&[0.5f32, 1.5, 2.0, 4.0], &[2, 2]).unwrap();
    let cols = ctx.sum(&a, &[0], false).unwrap();
    assert_eq!(cols.to_vec::<f32>().unwrap(), vec![2.5, 5.5]);
}
