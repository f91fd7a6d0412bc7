//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::ops::{Add, Div, Mul, Sub};

/// Trait for types that can be numeric elements of an NDArray
///
/// This trait connects Rust's type system to the runtime dtype tags carried by
/// every [`ShapeDescriptor`](crate::tensor::ShapeDescriptor). String dtypes have
/// no `Element` implementation; they are handled by the string codec.
///
/// # Bounds
/// - `Pod + Zeroable` - Safe reinterpretation of the aligned byte storage (bytemuck)
/// - `Add + Sub + Mul + Div` - Arithmetic operations (Output = Self)
/// - `PartialOrd` - Comparison for min/max reductions
pub trait Element:
    Copy
    + Clone
    + Send
    + Sync
    + Pod
    + Zeroable
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
    + std::fmt::Debug
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64 for generic numeric operations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// Identity of a min-reduction: +inf for floats, the type maximum for integers
    fn max_bound() -> Self;

    /// Identity of a max-reduction: -inf for floats, the type minimum for integers
    fn min_bound() -> Self;

    /// Running sum/product type: f64 for floats, a 128-bit integer for integers
    type Accumulator: Copy + Send + Sync + std::fmt::Debug;

    /// Additive identity of the accumulator
    fn acc_zero() -> Self::Accumulator;

    /// Multiplicative identity of the accumulator
    fn acc_one() -> Self::Accumulator;

    /// `acc + v`; wraps for integers
    fn acc_add(acc: Self::Accumulator, v: Self) -> Self::Accumulator;

    /// `acc * v`; wraps for integers
    fn acc_mul(acc: Self::Accumulator, v: Self) -> Self::Accumulator;

    /// Narrow an accumulator back to the element type.
    ///
    /// Integers truncate to their width, which gives the same result as
    /// wrapping arithmetic in the element type.
    fn from_acc(acc: Self::Accumulator) -> Self;

    /// Mean of `n` accumulated values: NaN for floats and 0 for integers
    /// when `n == 0`; integer means truncate toward zero.
    fn acc_mean(acc: Self::Accumulator, n: usize) -> Self;

    /// Exact integer value (floats truncate toward zero and saturate)
    fn to_i128(self) -> i128;
}

macro_rules! impl_float_accumulator {
    () => {
        type Accumulator = f64;

        #[inline]
        fn acc_zero() -> f64 {
            0.0
        }

        #[inline]
        fn acc_one() -> f64 {
            1.0
        }

        #[inline]
        fn acc_add(acc: f64, v: Self) -> f64 {
            acc + Element::to_f64(v)
        }

        #[inline]
        fn acc_mul(acc: f64, v: Self) -> f64 {
            acc * Element::to_f64(v)
        }

        #[inline]
        fn from_acc(acc: f64) -> Self {
            <Self as Element>::from_f64(acc)
        }

        #[inline]
        fn acc_mean(acc: f64, n: usize) -> Self {
            <Self as Element>::from_f64(if n == 0 { f64::NAN } else { acc / n as f64 })
        }

        #[inline]
        fn to_i128(self) -> i128 {
            Element::to_f64(self) as i128
        }
    };
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn max_bound() -> Self {
        f64::INFINITY
    }

    #[inline]
    fn min_bound() -> Self {
        f64::NEG_INFINITY
    }

    impl_float_accumulator!();
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn max_bound() -> Self {
        f32::INFINITY
    }

    #[inline]
    fn min_bound() -> Self {
        f32::NEG_INFINITY
    }

    impl_float_accumulator!();
}

macro_rules! impl_int_element {
    ($($ty:ty => $dtype:ident, $acc:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }

                #[inline]
                fn zero() -> Self {
                    0
                }

                #[inline]
                fn one() -> Self {
                    1
                }

                #[inline]
                fn max_bound() -> Self {
                    <$ty>::MAX
                }

                #[inline]
                fn min_bound() -> Self {
                    <$ty>::MIN
                }

                type Accumulator = $acc;

                #[inline]
                fn acc_zero() -> $acc {
                    0
                }

                #[inline]
                fn acc_one() -> $acc {
                    1
                }

                #[inline]
                fn acc_add(acc: $acc, v: Self) -> $acc {
                    acc.wrapping_add(v as $acc)
                }

                #[inline]
                fn acc_mul(acc: $acc, v: Self) -> $acc {
                    acc.wrapping_mul(v as $acc)
                }

                #[inline]
                fn from_acc(acc: $acc) -> Self {
                    acc as $ty
                }

                #[inline]
                fn acc_mean(acc: $acc, n: usize) -> Self {
                    if n == 0 { 0 } else { (acc / n as $acc) as $ty }
                }

                #[inline]
                fn to_i128(self) -> i128 {
                    self as i128
                }
            }
        )*
    };
}

impl_int_element!(
    i64 => I64, i128,
    i32 => I32, i128,
    i16 => I16, i128,
    i8 => I8, i128,
    u64 => U64, u128,
    u32 => U32, u128,
    u16 => U16, u128,
    u8 => U8, u128,
);

// ============================================================================
// Half-precision types (feature-gated)
// ============================================================================

#[cfg(feature = "f16")]
impl Element for half::f16 {
    const DTYPE: DType = DType::F16;

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }

    #[inline]
    fn zero() -> Self {
        half::f16::ZERO
    }

    #[inline]
    fn one() -> Self {
        half::f16::ONE
    }

    #[inline]
    fn max_bound() -> Self {
        half::f16::INFINITY
    }

    #[inline]
    fn min_bound() -> Self {
        half::f16::NEG_INFINITY
    }

    impl_float_accumulator!();
}

#[cfg(feature = "f16")]
impl Element for half::bf16 {
    const DTYPE: DType = DType::BF16;

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }

    #[inline]
    fn zero() -> Self {
        half::bf16::ZERO
    }

    #[inline]
    fn one() -> Self {
        half::bf16::ONE
    }

    #[inline]
    fn max_bound() -> Self {
        half::bf16::INFINITY
    }

    #[inline]
    fn min_bound() -> Self {
        half::bf16::NEG_INFINITY
    }

    impl_float_accumulator!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtype() {
        assert_eq!(f64::DTYPE, DType::F64);
        assert_eq!(f32::DTYPE, DType::F32);
        assert_eq!(i32::DTYPE, DType::I32);
        assert_eq!(u8::DTYPE, DType::U8);
    }

    #[test]
    fn test_element_conversions() {
        assert_eq!(f32::from_f64(2.5).to_f64(), 2.5f32 as f64);
        assert_eq!(i32::from_f64(42.0), 42);
    }

    #[test]
    fn test_reduction_identities() {
        assert_eq!(f32::max_bound(), f32::INFINITY);
        assert_eq!(f64::min_bound(), f64::NEG_INFINITY);
        assert_eq!(i32::max_bound(), i32::MAX);
        assert_eq!(u8::min_bound(), 0);
    }

    #[test]
    fn test_integer_accumulation_is_exact() {
        let big = 9_007_199_254_740_993i64;
        assert_eq!(i64::from_acc(i64::acc_add(i64::acc_zero(), big)), big);

        let prod = (0..5).fold(i32::acc_one(), |acc, _| i32::acc_mul(acc, 100));
        assert_eq!(i32::from_acc(prod), 100i32.wrapping_pow(5));
        assert_eq!(u8::from_acc(u8::acc_add(u8::acc_add(0, 200), 100)), 44);

        assert_eq!(i32::acc_mean(-7, 2), -3);
        assert_eq!(i32::acc_mean(0, 0), 0);
        assert!(f32::acc_mean(0.0, 0).is_nan());
        assert_eq!(u64::MAX.to_i128(), u64::MAX as i128);
    }
}
