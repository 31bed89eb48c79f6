pub mod builtin;
pub mod error;
pub mod eval;
pub mod expand;
pub mod global;
pub mod job;
pub mod parser;
pub mod pipe;
pub mod redirect;
pub mod types;

pub use crate::error::{Error, Result};
pub use crate::eval::{eval_line, EvalResult};
pub use crate::global::State;
