mod bit_array;
mod dtype;
mod literal;
mod parse;
mod registry;

pub use bit_array::BitArray;
pub use dtype::{Dtype, Value};
pub use literal::parse_bit_literal;
pub use registry::{AllowedSizes, KindDefinition};

pub use bitfmt_bits::{Endianness, Kind, SingleSpec};
