// Veritext Core Services

pub mod analyzer;
pub mod classifier;
pub mod extractor;
pub mod history;

pub use analyzer::*;
pub use classifier::*;
pub use extractor::*;
pub use history::*;
