// SPDX-License-Identifier: Apache-2.0

//! QPACK field compression (RFC 9204): static table, dynamic table, and the
//! encoder/decoder instruction streams. Huffman coding is not implemented;
//! every string this build produces or expects is raw (unencoded).

pub mod codec;
pub mod decoder;
pub mod dynamic_table;
pub mod encoder;
pub mod field;
pub mod prefix_int;
pub mod static_table;

pub use codec::{decode_field_section, encode_field_section, Error};
pub use decoder::Decoder;
pub use dynamic_table::DynamicTable;
pub use encoder::Encoder;
pub use field::HeaderField;
