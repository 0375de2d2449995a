//! genanno pipeline
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Functional annotation of a predicted proteome: proteins are partitioned,
//! searched against Refseq, KEGG, COG, SwissProt and InterProScan member
//! databases, reduced to one best hit per protein and source, and fused onto
//! the structural gene model.
//!
//! - **Partitioning**: [`partition`] splits the protein set into chunks
//! - **Search**: [`search::SearchAdapter`] renders one search per (chunk, target)
//! - **Canonicalization**: [`canonical::Canonicalizer`] picks and normalizes best hits
//! - **Fusion**: [`fusion::FusionEngine`] applies the field precedence table
//! - **Accounting**: [`coverage::CoverageStat`] summarizes how many loci each source annotated
//! - **Execution**: [`engine::TaskEngine`] runs the search graph, [`pipeline`] drives a run
//!
//! # Example
//!
//! ```no_run
//! use genanno_pipeline::config::PipelineConfig;
//! use genanno_pipeline::engine::LocalEngine;
//! use genanno_pipeline::pipeline::AnnotationPipeline;
//! use std::path::Path;
//!
//! # async fn example() -> genanno_pipeline::Result<()> {
//! let config = PipelineConfig::load(Some(Path::new("genanno.toml")))?;
//! let mut engine = LocalEngine::new(&config.run.work_dir, config.run.shell.clone());
//! let outcome = AnnotationPipeline::new(config)
//!     .run(&mut engine, Path::new("proteins.faa"), Path::new("genes.gff3"))
//!     .await?;
//! print!("{}", outcome.outputs.coverage.render());
//! # Ok(())
//! # }
//! ```

pub mod annotation_table;
pub mod canonical;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod fasta;
pub mod fusion;
pub mod gff;
pub mod go;
pub mod io;
pub mod manifest;
pub mod models;
pub mod partition;
pub mod phase;
pub mod pipeline;
pub mod search;
pub mod species;

// Re-export commonly used types
pub use cli::{Cli, Commands, RunOverrides};
pub use error::{PipelineError, Result};
pub use models::{AnnotationSource, CanonicalHit, DatabaseTarget, RawHit};
