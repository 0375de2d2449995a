//! Cross-database fusion
//!
//! One [`GeneRecord`] per CDS locus of the structural model, built from the
//! seven canonical tables by the precedence table in [`rules`].

pub mod engine;
pub mod escape;
pub mod rules;

pub use engine::{write_gff, Fusion, FusionEngine, FusionInputs, GeneRecord};
pub use escape::escape_value;
pub use rules::{Contributor, Field, Mode, Rule, DEFAULT_PRODUCT, RULES};
