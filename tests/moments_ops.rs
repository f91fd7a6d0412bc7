//! Variance, standard deviation and moments

mod common;

use common::{assert_allclose_f64, create_cpu_context};
use ndexec::error::ErrorKind;
use ndexec::prelude::*;

fn sample() -> NDArray {
    // 2 x 3 x 2
    let values: Vec<f64> = vec![
        1.0, 2.0, 4.0, 8.0, 3.0, -1.0, //
        0.5, 0.0, 2.0, 6.0, -3.0, 5.0,
    ];
    NDArray::from_slice(&values, &[2, 3, 2]).unwrap()
}

fn naive_moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var)
}

#[test]
fn test_moments_over_middle_axis() {
    let ctx = create_cpu_context();
    let x = sample();
    let (mean, var) = ctx.moments(&x, &[1], false).unwrap();
    assert_eq!(mean.shape(), &[2, 2]);
    assert_eq!(var.shape(), &[2, 2]);

    let data = x.to_vec::<f64>().unwrap();
    let mut expected_mean = Vec::new();
    let mut expected_var = Vec::new();
    for b in 0..2 {
        for c in 0..2 {
            let column: Vec<f64> = (0..3).map(|r| data[b * 6 + r * 2 + c]).collect();
            let (m, v) = naive_moments(&column);
            expected_mean.push(m);
            expected_var.push(v);
        }
    }
    assert_allclose_f64(&mean.to_vec::<f64>().unwrap(), &expected_mean, 1e-12, 1e-12, "mean");
    assert_allclose_f64(&var.to_vec::<f64>().unwrap(), &expected_var, 1e-12, 1e-12, "var");
}

#[test]
fn test_moments_keep_dims_and_negative_axes() {
    let ctx = create_cpu_context();
    let x = sample();
    let (mean, var) = ctx.moments(&x, &[-1, 0], true).unwrap();
    assert_eq!(mean.shape(), &[1, 3, 1]);
    assert_eq!(var.shape(), &[1, 3, 1]);

    let data = x.to_vec::<f64>().unwrap();
    for r in 0..3 {
        let group = [data[r * 2], data[r * 2 + 1], data[6 + r * 2], data[6 + r * 2 + 1]];
        let (m, v) = naive_moments(&group);
        assert!((mean.get::<f64>(r).unwrap() - m).abs() < 1e-12);
        assert!((var.get::<f64>(r).unwrap() - v).abs() < 1e-12);
    }
}

#[test]
fn test_moments_dynamic_matches_static() {
    let ctx = create_cpu_context();
    let x = sample();
    let axes = NDArray::from_slice(&[0i64, 2], &[2]).unwrap();
    let (m1, v1) = ctx.moments_dynamic(&x, &axes, false).unwrap();
    let (m2, v2) = ctx.moments(&x, &[0, 2], false).unwrap();
    assert_eq!(m1.to_vec::<f64>().unwrap(), m2.to_vec::<f64>().unwrap());
    assert_eq!(v1.to_vec::<f64>().unwrap(), v2.to_vec::<f64>().unwrap());
}

#[test]
fn test_moments_of_everything() {
    let ctx = create_cpu_context();
    let x = sample();
    let (mean, var) = ctx.moments(&x, &[], false).unwrap();
    assert!(mean.is_scalar());
    let (m, v) = naive_moments(&x.to_vec::<f64>().unwrap());
    assert!((mean.item::<f64>().unwrap() - m).abs() < 1e-12);
    assert!((var.item::<f64>().unwrap() - v).abs() < 1e-12);
}

#[test]
fn test_var_and_std_corrections() {
    let ctx = create_cpu_context();
    let x = NDArray::from_slice(&[2.0f32, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], &[8]).unwrap();
    let biased = ctx.var(&x, &[0], false, 0).unwrap();
    assert!((biased.item::<f32>().unwrap() - 4.0).abs() < 1e-6);
    let std = ctx.std(&x, &[0], false, 0).unwrap();
    assert!((std.item::<f32>().unwrap() - 2.0).abs() < 1e-6);
    let sample_var = ctx.var(&x, &[0], true, 1).unwrap();
    assert_eq!(sample_var.shape(), &[1]);
    assert!((sample_var.item::<f32>().unwrap() - 32.0 / 7.0).abs() < 1e-5);
}

#[test]
fn test_integer_input_rejected() {
    let ctx = create_cpu_context();
    let x = NDArray::from_slice(&[1i32, 2, 3], &[3]).unwrap();
    assert_eq!(ctx.moments(&x, &[0], false).unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(ctx.var(&x, &[0], false, 0).unwrap_err().kind(), ErrorKind::Type);
}

#[test]
fn test_bad_axis_rejected() {
    let ctx = create_cpu_context();
    let x = sample();
    assert!(ctx.moments(&x, &[3], false).is_err());
    let axes = NDArray::from_slice(&[0.5f32], &[1]).unwrap();
    assert!(ctx.moments_dynamic(&x, &axes, false).is_err());
}
