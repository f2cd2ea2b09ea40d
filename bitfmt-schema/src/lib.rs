mod env;
mod fieldtype;
mod options;
mod reader;
mod text;

pub use env::Env;
pub use fieldtype::{Field, FieldType, Format, If, Let, Repeat, TreeValue, While};
pub use options::Options;
pub use reader::Reader;
pub use text::parse as parse_schema;

/// The singleton Pass node; equal to every other Pass by construction.
#[allow(non_upper_case_globals)]
pub const Pass: FieldType = FieldType::Pass;
