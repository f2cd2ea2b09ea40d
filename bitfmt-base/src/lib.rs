mod error;

pub use error::{
    byte_align_err, err, expression_err, index_err, read_err, value_err, Error, ErrorKind, Result,
};
