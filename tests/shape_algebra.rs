//! Shape algebra: reductions, convolution extents, broadcasting, TADs

use ndexec::dtype::DType;
use ndexec::error::ErrorKind;
use ndexec::shape::{
    PaddingMode, TadPack, broadcast_shapes, calc_out_dim, compute_same_padding,
    eval_reduce_shape_info, sub_array_index,
};
use ndexec::tensor::{Ews, Order, ShapeDescriptor};
use proptest::prelude::*;

fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..7)
}

/// A shape together with a non-empty duplicate-free subset of its axes
fn shape_and_axes() -> impl Strategy<Value = (Vec<usize>, Vec<isize>)> {
    shape_strategy().prop_flat_map(|shape| {
        let rank = shape.len();
        let axes = prop::sample::subsequence((0..rank).collect::<Vec<_>>(), 1..=rank);
        (Just(shape), axes).prop_map(|(shape, axes)| {
            (shape, axes.into_iter().map(|a| a as isize).collect())
        })
    })
}

proptest! {
    #[test]
    fn prop_keep_dims_preserves_rank((shape, axes) in shape_and_axes(), order_f in any::<bool>()) {
        let order = if order_f { Order::F } else { Order::C };
        let input = ShapeDescriptor::contiguous(&shape, Order::C, DType::F32);
        let out = eval_reduce_shape_info(order, &axes, &input, true, false).unwrap();
        prop_assert_eq!(out.rank(), shape.len());
        for (d, &extent) in out.shape().iter().enumerate() {
            if axes.contains(&(d as isize)) {
                prop_assert_eq!(extent, 1);
            } else {
                prop_assert_eq!(extent, shape[d]);
            }
        }
        prop_assert_eq!(out.order(), order);
        prop_assert_eq!(out.ews(), Ews::Stride(1));
    }

    #[test]
    fn prop_dropped_axes_reduce_rank((shape, axes) in shape_and_axes()) {
        let input = ShapeDescriptor::contiguous(&shape, Order::F, DType::F64);
        let out = eval_reduce_shape_info(Order::C, &axes, &input, false, false).unwrap();
        let expected = shape.len() - axes.len();
        if expected == 0 && shape.len() == 1 {
            prop_assert_eq!(out.shape(), &[1]);
        } else {
            prop_assert_eq!(out.rank(), expected);
        }
        prop_assert_eq!(out.length(), shape.iter().enumerate()
            .filter(|(d, _)| !axes.contains(&(*d as isize)))
            .map(|(_, &e)| e)
            .product::<usize>());
    }

    #[test]
    fn prop_negative_axes_match_positive((shape, axes) in shape_and_axes()) {
        let rank = shape.len() as isize;
        let negative: Vec<isize> = axes.iter().map(|&a| a - rank).collect();
        let input = ShapeDescriptor::contiguous(&shape, Order::C, DType::I32);
        let a = eval_reduce_shape_info(Order::C, &axes, &input, false, true).unwrap();
        let b = eval_reduce_shape_info(Order::C, &negative, &input, false, true).unwrap();
        prop_assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn prop_tad_offsets_cover_array_once((shape, axes) in shape_and_axes()) {
        let desc = ShapeDescriptor::contiguous(&shape, Order::F, DType::F32);
        let tads = TadPack::new(&desc, &axes).unwrap();
        let mut seen = vec![0u8; desc.length()];
        for t in 0..tads.num_tads() {
            for offset in tads.tad_offsets(t) {
                seen[offset] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn prop_same_padding_yields_ceil(input in 1usize..64, kernel in 1usize..6, stride in 1usize..4, dilation in 1usize..3) {
        let (before, after) = compute_same_padding(input, kernel, stride, dilation);
        let out = calc_out_dim(input, kernel, stride, dilation, before, after);
        prop_assert_eq!(out, input.div_ceil(stride));
        prop_assert!(before <= after && after - before <= 1);
    }
}

#[test]
fn test_full_reduction_boundaries() {
    let vector = ShapeDescriptor::contiguous(&[7], Order::C, DType::F32);
    assert_eq!(eval_reduce_shape_info(Order::C, &[], &vector, false, false).unwrap().shape(), &[1]);

    let matrix = ShapeDescriptor::contiguous(&[2, 3], Order::C, DType::F32);
    let scalar = eval_reduce_shape_info(Order::C, &[], &matrix, false, false).unwrap();
    assert_eq!(scalar.rank(), 0);
    let legacy = eval_reduce_shape_info(Order::C, &[0, 1], &matrix, false, true).unwrap();
    assert_eq!(legacy.shape(), &[1, 1]);
}

#[test]
fn test_reduce_axis_errors_are_shape_errors() {
    let desc = ShapeDescriptor::contiguous(&[2, 3], Order::C, DType::F32);
    for axes in [&[2isize][..], &[-3], &[0, 0], &[1, -1]] {
        let err = eval_reduce_shape_info(Order::C, axes, &desc, false, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape, "{axes:?}");
    }
}

#[test]
fn test_conv_extent_examples() {
    let (pad_lo, pad_hi) = compute_same_padding(10, 3, 2, 1);
    assert_eq!(calc_out_dim(10, 3, 2, 1, 0, 0), 4);
    assert_eq!(calc_out_dim(10, 3, 2, 1, pad_lo, pad_hi), 5);
    assert_eq!((pad_lo, pad_hi), (0, 1));
    assert_eq!(PaddingMode::from_flag(false, 1, 2), PaddingMode::Custom(1, 1, 2, 2));
}

#[test]
fn test_broadcast_and_sub_array_index() {
    assert_eq!(broadcast_shapes(&[3, 1], &[4]).unwrap().as_slice(), &[3, 4]);
    assert!(broadcast_shapes(&[3, 2], &[4]).is_none());
    let desc = ShapeDescriptor::contiguous(&[1, 4], Order::C, DType::F32);
    assert!(desc.is_broadcastable_to(&[3, 4]));
    assert!(!desc.is_broadcastable_to(&[3, 5]));

    // [2, 2] tiled to [4, 6]: (3, 5) comes from (1, 1)
    assert_eq!(sub_array_index(3 * 6 + 5, &[4, 6], &[2, 2]), 3);
}

#[test]
fn test_ews_of_views() {
    let desc = ShapeDescriptor::contiguous(&[4, 6], Order::C, DType::F32);
    assert_eq!(desc.ews(), Ews::Stride(1));
    assert_eq!(desc.transpose(0, 1).unwrap().ews(), Ews::Irregular);
    let f = ShapeDescriptor::contiguous(&[4, 6], Order::F, DType::F32);
    assert_eq!(f.ews(), Ews::Stride(1));
}
