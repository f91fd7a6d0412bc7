//! Spatial extents and padding for convolution-style windows

/// Padding mode for convolution operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaddingMode {
    /// No padding - output is smaller than input.
    #[default]
    Valid,
    /// Output extent is ceil(input / stride); padding is derived.
    Same,
    /// Explicit padding as (top, bottom, left, right).
    Custom(usize, usize, usize, usize),
}

impl PaddingMode {
    /// Creates padding for a specific amount on all sides.
    pub fn uniform(padding: usize) -> Self {
        PaddingMode::Custom(padding, padding, padding, padding)
    }

    /// Decode the integer flag used by op attributes (0 = VALID, 1 = SAME)
    ///
    /// With VALID, symmetric `(pad_h, pad_w)` padding is applied.
    pub fn from_flag(same: bool, pad_h: usize, pad_w: usize) -> Self {
        if same {
            PaddingMode::Same
        } else if pad_h == 0 && pad_w == 0 {
            PaddingMode::Valid
        } else {
            PaddingMode::Custom(pad_h, pad_h, pad_w, pad_w)
        }
    }

    /// Returns the name of the padding mode for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PaddingMode::Valid => "valid",
            PaddingMode::Same => "same",
            PaddingMode::Custom(..) => "custom",
        }
    }
}

/// Output extent of one windowed dimension
///
/// output = floor((input + pad_before + pad_after - dilation * (kernel - 1) - 1) / stride) + 1
///
/// Returns 0 when the dilated kernel does not fit into the padded input.
#[inline]
pub fn calc_out_dim(
    input_size: usize,
    kernel_size: usize,
    stride: usize,
    dilation: usize,
    pad_before: usize,
    pad_after: usize,
) -> usize {
    let effective_kernel = dilation * (kernel_size.max(1) - 1) + 1;
    let padded_size = input_size + pad_before + pad_after;
    if padded_size < effective_kernel {
        0
    } else {
        (padded_size - effective_kernel) / stride + 1
    }
}

/// Padding values for "same" padding mode
///
/// The output extent is ceil(input / stride); the total padding needed to
/// reach it is split with the low edge getting total / 2 and the high edge
/// the remainder.
#[inline]
pub fn compute_same_padding(
    input_size: usize,
    kernel_size: usize,
    stride: usize,
    dilation: usize,
) -> (usize, usize) {
    let effective_kernel = dilation * (kernel_size.max(1) - 1) + 1;
    let output_size = input_size.div_ceil(stride);
    let total_pad = if output_size > 0 {
        let needed = (output_size - 1) * stride + effective_kernel;
        needed.saturating_sub(input_size)
    } else {
        0
    };
    let pad_before = total_pad / 2;
    let pad_after = total_pad - pad_before;
    (pad_before, pad_after)
}

/// Resolves padding mode to explicit (top, bottom, left, right) values.
#[inline]
pub fn resolve_padding_2d(
    padding: PaddingMode,
    input_h: usize,
    input_w: usize,
    kernel_h: usize,
    kernel_w: usize,
    stride: (usize, usize),
    dilation: (usize, usize),
) -> (usize, usize, usize, usize) {
    match padding {
        PaddingMode::Valid => (0, 0, 0, 0),
        PaddingMode::Same => {
            let (pad_top, pad_bottom) =
                compute_same_padding(input_h, kernel_h, stride.0, dilation.0);
            let (pad_left, pad_right) =
                compute_same_padding(input_w, kernel_w, stride.1, dilation.1);
            (pad_top, pad_bottom, pad_left, pad_right)
        }
        PaddingMode::Custom(top, bottom, left, right) => (top, bottom, left, right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_extent() {
        assert_eq!(calc_out_dim(10, 3, 2, 1, 0, 0), 4);
        assert_eq!(calc_out_dim(10, 3, 1, 2, 0, 0), 6);
        assert_eq!(calc_out_dim(2, 3, 1, 1, 0, 0), 0);
        assert_eq!(calc_out_dim(5, 3, 1, 1, 1, 1), 5);
    }

    #[test]
    fn test_same_extent() {
        let (lo, hi) = compute_same_padding(10, 3, 2, 1);
        assert_eq!(calc_out_dim(10, 3, 2, 1, lo, hi), 5);
        assert_eq!((lo, hi), (0, 1));
    }

    #[test]
    fn test_same_padding_splits_low_edge_first() {
        // total padding 3: low edge clipped
        assert_eq!(compute_same_padding(5, 4, 1, 1), (1, 2));
        assert_eq!(compute_same_padding(5, 3, 1, 1), (1, 1));
    }

    #[test]
    fn test_padding_flag() {
        assert_eq!(PaddingMode::from_flag(true, 4, 4), PaddingMode::Same);
        assert_eq!(PaddingMode::from_flag(false, 0, 0), PaddingMode::Valid);
        assert_eq!(
            PaddingMode::from_flag(false, 1, 2),
            PaddingMode::Custom(1, 1, 2, 2)
        );
    }
}
