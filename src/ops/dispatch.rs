//! DType dispatch utilities
//!
//! Two mechanisms select a type-specialized kernel at runtime:
//!
//! - `dispatch_dtype!` and its narrower siblings convert a single `DType`
//!   into a concrete Rust type bound to an identifier inside a code block.
//! - [`DispatchTable`] maps a `(DType, DType)` pair to a monomorphized
//!   function pointer; each op builds its table once per process.
//!
//! # Usage
//!
//! ```ignore
//! fn my_operation(dtype: DType) -> Result<usize> {
//!     dispatch_dtype!(dtype, T => {
//!         // T is now a concrete type (f32, f64, i32, etc.)
//!         Ok(std::mem::size_of::<T>())
//!     }, "my_operation")
//! }
//! ```
//!
//! ## Supported Types
//!
//! - `F64` -> `f64`, `F32` -> `f32`
//! - `F16` -> `half::f16`, `BF16` -> `half::bf16` (requires "f16" feature)
//! - `I64`..`I8` -> `i64`..`i8`, `U64`..`U8` -> `u64`..`u8`
//! - `Bool` and string dtypes -> `UnsupportedDType` error

use crate::dtype::DType;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Internal helper macro to dispatch types requiring the "f16" feature.
/// Parameterized by type to avoid duplicating macro for F16 vs BF16.
#[macro_export]
#[doc(hidden)]
macro_rules! dispatch_f16_type {
    ($T:ident, $body:block, $dtype:expr, $error_op:expr, $type:ty) => {{
        #[cfg(feature = "f16")]
        {
            type $T = $type;
            $body
        }
        #[cfg(not(feature = "f16"))]
        {
            return Err($crate::error::Error::UnsupportedDType {
                dtype: $dtype,
                op: $error_op,
            });
        }
    }};
}

/// Macro for runtime dtype dispatch over every numeric element type.
///
/// Executes `$body` with `$T` bound to the Rust type of `$dtype`.
#[macro_export]
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::f16)
            }
            $crate::dtype::DType::BF16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::bf16)
            }
            $crate::dtype::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::dtype::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::dtype::DType::I16 => {
                type $T = i16;
                $body
            }
            $crate::dtype::DType::I8 => {
                type $T = i8;
                $body
            }
            $crate::dtype::DType::U64 => {
                type $T = u64;
                $body
            }
            $crate::dtype::DType::U32 => {
                type $T = u32;
                $body
            }
            $crate::dtype::DType::U16 => {
                type $T = u16;
                $body
            }
            $crate::dtype::DType::U8 => {
                type $T = u8;
                $body
            }
            _ => {
                return Err($crate::error::Error::UnsupportedDType {
                    dtype: $dtype,
                    op: $error_op,
                })
            }
        }
    };
}

/// Dispatch over floating point element types only
#[macro_export]
macro_rules! dispatch_float_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::f16)
            }
            $crate::dtype::DType::BF16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::bf16)
            }
            _ => {
                return Err($crate::error::Error::UnsupportedDType {
                    dtype: $dtype,
                    op: $error_op,
                })
            }
        }
    };
}

/// Register a kernel for every pair in the cartesian product of two type lists
///
/// ```ignore
/// register_dtype_pairs!(table, my_kernel, [f32, f64], [i32, i64]);
/// // registers my_kernel::<f32, i32>, my_kernel::<f32, i64>, ...
/// ```
#[macro_export]
macro_rules! register_dtype_pairs {
    ($table:expr, $kernel:ident, [$($X:ty),* $(,)?], $ys:tt) => {
        $( $crate::register_dtype_pairs!(@row $table, $kernel, $X, $ys); )*
    };
    (@row $table:expr, $kernel:ident, $X:ty, [$($Y:ty),* $(,)?]) => {
        $(
            $table.register(
                <$X as $crate::dtype::Element>::DTYPE,
                <$Y as $crate::dtype::Element>::DTYPE,
                $kernel::<$X, $Y>,
            );
        )*
    };
}

/// Kernel lookup keyed by a pair of dtypes
///
/// Tables are populated once (typically inside a `OnceLock` initializer)
/// and read concurrently afterwards.
pub struct DispatchTable<F: Copy> {
    op: &'static str,
    entries: HashMap<(DType, DType), F>,
}

impl<F: Copy> DispatchTable<F> {
    /// Create an empty table for the named operation
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            entries: HashMap::new(),
        }
    }

    /// Register (or replace) the kernel for a dtype pair
    pub fn register(&mut self, lhs: DType, rhs: DType, kernel: F) {
        self.entries.insert((lhs, rhs), kernel);
    }

    /// Look up the kernel for a dtype pair
    pub fn get(&self, lhs: DType, rhs: DType) -> Result<F> {
        match self.entries.get(&(lhs, rhs)) {
            Some(&kernel) => {
                tracing::trace!(op = self.op, %lhs, %rhs, "dispatch table hit");
                Ok(kernel)
            }
            None => Err(Error::UnsupportedDTypePair {
                op: self.op,
                lhs,
                rhs,
            }),
        }
    }

    /// Check whether a dtype pair has a kernel
    pub fn supports(&self, lhs: DType, rhs: DType) -> bool {
        self.entries.contains_key(&(lhs, rhs))
    }

    /// Number of registered pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no pairs are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the operation this table serves
    pub fn op(&self) -> &'static str {
        self.op
    }
}

impl<F: Copy> fmt::Debug for DispatchTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort();
        f.debug_struct("DispatchTable")
            .field("op", &self.op)
            .field("pairs", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Element;
    use crate::error::ErrorKind;

    fn width<X: Element, Y: Element>() -> usize {
        std::mem::size_of::<X>() + std::mem::size_of::<Y>()
    }

    fn size_of_dtype(dtype: DType) -> Result<usize> {
        dispatch_dtype!(dtype, T => {
            Ok(std::mem::size_of::<T>())
        }, "size_of_dtype")
    }

    #[test]
    fn test_dispatch_dtype_binds_type() {
        assert_eq!(size_of_dtype(DType::F64).unwrap(), 8);
        assert_eq!(size_of_dtype(DType::U16).unwrap(), 2);
        let err = size_of_dtype(DType::Utf8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_table_pairs() {
        let mut table: DispatchTable<fn() -> usize> = DispatchTable::new("width");
        register_dtype_pairs!(table, width, [f32, f64], [i32, i64]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(DType::F64, DType::I32).unwrap()(), 12);
        assert!(table.supports(DType::F32, DType::I64));

        let err = table.get(DType::F32, DType::U8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.to_string().contains("width"));
    }
}
