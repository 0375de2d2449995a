//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod canonicalize;
pub mod fuse;
pub mod partition;
pub mod run;

use crate::config::PipelineConfig;
use crate::error::Result;
use std::path::Path;

/// Load the layered configuration, then let `apply` add CLI overrides
pub(crate) fn load_config(
    config_file: Option<&Path>,
    apply: impl FnOnce(&mut PipelineConfig),
) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(config_file)?;
    apply(&mut config);
    config.validate()?;
    Ok(config)
}
