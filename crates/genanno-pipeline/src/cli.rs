//! Command-line interface definition

use crate::config::PipelineConfig;
use crate::models::DatabaseTarget;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// genanno - genome functional annotation
#[derive(Parser, Debug)]
#[command(name = "genanno")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "GENANNO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the CLI reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search, canonicalize and fuse: the whole annotation run
    Run {
        /// Predicted proteins (FASTA, optionally gzipped)
        #[arg(short, long)]
        proteins: PathBuf,

        /// Structural gene model (GFF3, optionally gzipped)
        #[arg(short, long)]
        gff: PathBuf,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Split a protein FASTA into residue-bounded chunks
    Partition {
        /// Predicted proteins (FASTA, optionally gzipped)
        proteins: PathBuf,

        /// Directory for the chunk files
        #[arg(short, long, default_value = "chunks")]
        out_dir: PathBuf,

        /// Residue budget per chunk
        #[arg(long)]
        chunk_residues: Option<u64>,
    },

    /// Reduce raw search output already in the work directory to canonical tables
    Canonicalize {
        /// Targets to canonicalize (defaults to the configured targets)
        #[arg(short, long, value_delimiter = ',')]
        targets: Vec<DatabaseTarget>,

        /// Work directory holding `<target>/` raw output
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Output prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Fuse canonical tables onto a gene model
    Fuse {
        /// Structural gene model (GFF3, optionally gzipped)
        #[arg(short, long)]
        gff: PathBuf,

        /// Directory holding `<prefix>.<source>.tsv` tables
        #[arg(short, long)]
        tables_dir: PathBuf,

        /// Output prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Output directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

/// Command-line overrides for the `[run]` section
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// Output prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Work directory for chunks, scripts, logs and raw output
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,

    /// Targets to search
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<DatabaseTarget>,

    /// Threads per search task
    #[arg(long)]
    pub threads: Option<usize>,

    /// Tasks running at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Residue budget per chunk
    #[arg(long)]
    pub chunk_residues: Option<u64>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

impl RunOverrides {
    /// Apply the flags that were given on top of `config`
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(prefix) = &self.prefix {
            config.run.prefix = prefix.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.run.out_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.run.work_dir = dir.clone();
        }
        if !self.targets.is_empty() {
            config.run.targets = self.targets.clone();
        }
        if let Some(threads) = self.threads {
            config.run.threads = threads;
        }
        if let Some(concurrency) = self.concurrency {
            config.run.concurrency = concurrency;
        }
        if let Some(budget) = self.chunk_residues {
            config.run.chunk_residues = budget;
        }
        if self.progress {
            config.run.progress = true;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "genanno",
            "run",
            "-p",
            "p.faa",
            "-g",
            "g.gff3",
            "--prefix",
            "ecoli",
            "--targets",
            "refseq,motif",
            "--concurrency",
            "2",
        ])
        .unwrap();

        let Some(Commands::Run { overrides, proteins, .. }) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(proteins, PathBuf::from("p.faa"));

        let mut config = PipelineConfig::default();
        overrides.apply(&mut config);
        assert_eq!(config.run.prefix, "ecoli");
        assert_eq!(
            config.run.targets,
            vec![DatabaseTarget::Refseq, DatabaseTarget::FunctionalMotif]
        );
        assert_eq!(config.run.concurrency, 2);
        assert_eq!(config.run.threads, PipelineConfig::default().run.threads);
    }

    #[test]
    fn test_unknown_target_rejected() {
        let result = Cli::try_parse_from(["genanno", "canonicalize", "--targets", "pdb"]);
        assert!(result.is_err());
    }
}
