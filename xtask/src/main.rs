//! Build automation tasks for genanno
//!
//! - Generating the CLI reference from the clap definitions
//! - Writing an example configuration file with every default filled in

use clap::Parser;
use genanno_pipeline::config::PipelineConfig;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for genanno", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },

    /// Write genanno.example.toml with the default configuration
    ExampleConfig {
        /// Output file
        #[arg(short, long, default_value = "genanno.example.toml")]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
        Command::ExampleConfig { output } => example_config(&output)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<genanno_pipeline::Cli>();

    let content = format!(
        r#"# genanno CLI Reference

This documentation is generated from the CLI source code. Last updated: {}.

## Overview

genanno annotates the predicted proteins of a genome against Refseq, KEGG,
COG, SwissProt and the InterProScan member databases (Pfam, TIGRFAM, GO),
keeps the best hit per protein and source, and writes them onto the
structural gene model.

## Quick Start

```bash
# Full run: search, canonicalize, fuse
genanno --config genanno.toml run --proteins genome.faa --gff genome.gff3 --prefix genome

# Fuse tables from an earlier run onto a revised gene model
genanno fuse --gff genome.v2.gff3 --tables-dir work/tables --prefix genome
```

## Outputs

| File | Content |
|------|---------|
| `<prefix>.genomic.gff3` | Gene model with product, gene, EC_number, inference and note attributes |
| `<prefix>.function_summary.tsv` | Loci annotated per source, by all sources and by at least one |
| `<prefix>.merge.annotate.tsv` | One row per locus with every source's best hit |
| `<prefix>.species.tsv` | Most frequent organisms among Refseq best hits |
| `annotate.json` | Run manifest: inputs, databases, task outcomes, output checksums |

## Commands

{}

## Environment Variables

- `GENANNO_CONFIG` - Configuration file
- `GENANNO_<SECTION>__<KEY>` - Any configuration value, e.g. `GENANNO_DATABASES__KEGG=/db/kegg.dmnd`
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` - Logging

---

*This documentation is generated from the CLI source code. To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}

fn example_config(output: &str) -> anyhow::Result<()> {
    let defaults = toml::to_string_pretty(&PipelineConfig::default())?;
    let content = format!(
        "# genanno configuration\n#\n# Every value below is the built-in default. Database paths are unset\n# by default; a target without its database fails its check task and\n# contributes no annotations.\n\n{}",
        defaults
    );
    fs::write(output, content)?;
    println!("Wrote {}", output);
    Ok(())
}
