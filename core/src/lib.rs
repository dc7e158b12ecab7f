pub mod analysis;
pub mod ast;
pub mod token;
pub mod util;

pub use analysis::{analyze, Analysis, AnalysisCache};
