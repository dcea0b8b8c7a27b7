//! Turn-level intake logic: message classification, field parsing and
//! resource validation. Everything here is pure and synchronous.

pub mod classifier;
pub mod parser;
pub mod validator;

pub use classifier::{classify, ClassifierInput, ConflictChoice, Intent};
pub use parser::{parse_fields, InputFormat, ParseError};
pub use validator::{validate, FieldViolation, ValidationError};
