mod codec;
mod mutseq;
mod raw;
mod seq;

pub use codec::{pack, unpack, Endianness, Kind, SingleSpec, Value};
pub use mutseq::MutBitSeq;
pub use seq::BitSeq;
