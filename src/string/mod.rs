//! String tensors
//!
//! String arrays store `N` variable-length elements as an `(N + 1)` entry
//! i64 offset table followed by the concatenated payload. Elements are UTF-8,
//! UTF-16 or UTF-32 depending on the array dtype.

mod array;
mod assign;
mod codec;
pub mod unicode;

pub use assign::broadcast_string_assign;
pub use codec::{
    assign_string_data, byte_length, convert_data_for_different_data_type, convert_strings,
    count_subarrays, create_string_ndarray, determine_lengths, determine_offsets,
    determine_offsets_and_lengths, header_len, set_value_for_different_data_type, split,
};
pub use unicode::Encoding;
