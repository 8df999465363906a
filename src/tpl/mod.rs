pub mod ast;
mod cache;
pub mod context;
pub mod diagnostic;
pub mod engine;
pub mod parser;
pub mod transpile;

pub use ast::Program;
pub use context::{Context, IterationStyle, Scope};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use engine::{Transpiled, transpile, transpile_template};
pub use parser::parse_template;
pub use transpile::Transpiler;
