pub mod converter;
pub mod error;
pub mod models;
pub mod tpl;

pub use error::{ParseError, TranspileError};
pub use models::TranspileOptions;
pub use tpl::{Transpiled, transpile, transpile_template};
