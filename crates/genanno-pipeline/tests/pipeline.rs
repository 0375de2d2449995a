//! Full runs on the local engine with a stand-in DIAMOND executable

#![cfg(unix)]

use genanno_pipeline::canonical::write_canonical_file;
use genanno_pipeline::config::PipelineConfig;
use genanno_pipeline::engine::{LocalEngine, TaskState};
use genanno_pipeline::pipeline::AnnotationPipeline;
use genanno_pipeline::{AnnotationSource, CanonicalHit, DatabaseTarget, PipelineError};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PROTEINS: &str = ">g1 putative helicase\nMKVLAAGIVGLLLAAPAQAADTTSQSVAERLLRE\n\
>g2\nMSTNPKPQRKTKRNTNRRPQDVKFPGG\n\
>g3\nMAAAKKLLTTEEPP\n";

const GFF: &str = "##gff-version 3\n\
ctg1\tProdigal:2.6\tCDS\t1\t105\t.\t+\t0\tID=g1\n\
ctg1\tProdigal:2.6\tCDS\t200\t283\t.\t-\t0\tID=g2\n\
ctg1\tProdigal:2.6\tCDS\t400\t444\t.\t+\t0\tID=g3\n";

/// Reports one Refseq hit for g1, whichever chunk it lands in
const FAKE_DIAMOND: &str = r#"#!/bin/sh
query=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --query) query="$2"; shift ;;
    --out) out="$2"; shift ;;
  esac
  shift
done
: > "$out"
if grep -q '^>g1' "$query"; then
  printf 'g1\tWP_000001.1\t92.1\t34\t2\t0\t1\t34\t1\t34\t1.5e-20\t95.3\t34\t40\tWP_000001.1 DNA repair protein RecN [Escherichia coli]\n' > "$out"
fi
"#;

struct Fixture {
    dir: TempDir,
    proteins: PathBuf,
    gff: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let proteins = dir.path().join("proteins.faa");
        let gff = dir.path().join("genes.gff3");
        std::fs::write(&proteins, PROTEINS).unwrap();
        std::fs::write(&gff, GFF).unwrap();

        let diamond = dir.path().join("fake-diamond");
        std::fs::write(&diamond, FAKE_DIAMOND).unwrap();
        std::fs::set_permissions(&diamond, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("refseq.dmnd"), b"").unwrap();

        Self { dir, proteins, gff }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.run.prefix = "test".to_string();
        config.run.work_dir = self.path("work");
        config.run.out_dir = self.path("results");
        config.run.targets = vec![DatabaseTarget::Refseq, DatabaseTarget::Kegg];
        config.run.chunk_residues = 40;
        config.run.concurrency = 2;
        config.run.poll_interval_secs = 1;
        config.tools.diamond = self.path("fake-diamond").display().to_string();
        config.databases.refseq = Some(self.path("refseq"));
        config
    }

    fn engine(&self, config: &PipelineConfig) -> LocalEngine {
        LocalEngine::new(&config.run.work_dir, config.run.shell.clone())
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_failed_branch_is_fused_as_empty() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let mut engine = fixture.engine(&config);

    let outcome = AnnotationPipeline::new(config)
        .run(&mut engine, &fixture.proteins, &fixture.gff)
        .await
        .unwrap();

    assert_eq!(outcome.completed, vec![DatabaseTarget::Refseq]);
    assert_eq!(outcome.failed, vec![DatabaseTarget::Kegg]);

    // 3 proteins at a 40-residue budget: one chunk each
    for name in ["refseq_001", "refseq_002", "refseq_003", "canonicalize_refseq"] {
        let task = outcome.report.by_name(name).unwrap();
        assert_eq!(task.state, TaskState::Succeeded, "{}", name);
    }
    assert!(matches!(
        outcome.report.by_name("check_kegg").map(|t| &t.state),
        Some(TaskState::Failed(_))
    ));
    assert_eq!(
        outcome.report.by_name("canonicalize_kegg").map(|t| &t.state),
        Some(&TaskState::Skipped)
    );

    let refseq = read(&fixture.path("work/tables").join(AnnotationSource::Refseq.table_name("test")));
    assert_eq!(refseq.lines().count(), 2);
    assert!(refseq.contains("Refseq:WP_000001.1"));

    let gff = read(&outcome.outputs.gff);
    let g1 = gff.lines().find(|l| l.contains("\tID=g1;")).unwrap();
    assert!(g1.contains("ID=g1;gene=RecN;"));
    assert!(g1.contains("similar to AA sequence:Refseq:WP_000001.1"));
    assert!(g1.contains("note=Refseq: WP_000001.1 DNA repair protein RecN;"));
    assert!(g1.ends_with("product=DNA repair protein RecN"));

    assert_eq!(outcome.outputs.coverage.get(AnnotationSource::Refseq).unwrap().count, 1);
    assert_eq!(outcome.outputs.coverage.get(AnnotationSource::Kegg).unwrap().count, 0);
    assert_eq!(outcome.outputs.coverage.overall, 3);

    let species = read(&outcome.outputs.species);
    assert!(species.contains("Escherichia coli\t1"));

    let manifest: serde_json::Value = serde_json::from_str(&read(&outcome.manifest)).unwrap();
    assert_eq!(manifest["prefix"], "test");
    assert_eq!(manifest["outputs"].as_array().unwrap().len(), 4);
    assert!(manifest["software"]["Refseq"].as_str().unwrap().contains("blastp"));
}

#[tokio::test]
async fn test_rerun_produces_identical_products() {
    let fixture = Fixture::new();
    let config = fixture.config();

    let mut engine = fixture.engine(&config);
    let first = AnnotationPipeline::new(config.clone())
        .run(&mut engine, &fixture.proteins, &fixture.gff)
        .await
        .unwrap();
    let before: Vec<Vec<u8>> = first.outputs.paths().iter().map(|p| std::fs::read(p).unwrap()).collect();

    let mut engine = fixture.engine(&config);
    let second = AnnotationPipeline::new(config)
        .run(&mut engine, &fixture.proteins, &fixture.gff)
        .await
        .unwrap();
    let after: Vec<Vec<u8>> = second.outputs.paths().iter().map(|p| std::fs::read(p).unwrap()).collect();

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_missing_proteins_fail_every_branch() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let mut engine = fixture.engine(&config);

    let outcome = AnnotationPipeline::new(config)
        .run(&mut engine, &fixture.path("absent.faa"), &fixture.gff)
        .await
        .unwrap();

    assert!(engine.is_empty());
    assert!(outcome.report.tasks.is_empty());
    assert!(outcome.completed.is_empty());
    assert_eq!(outcome.failed, vec![DatabaseTarget::Refseq, DatabaseTarget::Kegg]);

    let gff = read(&outcome.outputs.gff);
    let cds: Vec<&str> = gff.lines().filter(|l| l.contains("\tCDS\t")).collect();
    assert_eq!(cds.len(), 3);
    assert!(cds.iter().all(|l| l.ends_with(";inference=ab initio prediction:Prodigal:2.6;product=hypothetical protein")));

    let summary = read(&outcome.outputs.summary);
    for source in AnnotationSource::SUMMARY_ORDER {
        assert!(summary.contains(&format!("{}\t0\t0.00\n", source.label())), "{}", source);
    }
    assert!(summary.ends_with("Overall\t3\t100\n"));
    assert!(outcome.manifest.is_file());
}

#[tokio::test]
async fn test_missing_gene_model_aborts_before_searching() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let mut engine = fixture.engine(&config);

    let result = AnnotationPipeline::new(config)
        .run(&mut engine, &fixture.proteins, &fixture.path("absent.gff3"))
        .await;

    assert!(matches!(result, Err(PipelineError::InputMissing(_))));
    assert!(engine.is_empty());
    assert!(!fixture.path("results").exists());
}

#[tokio::test]
async fn test_empty_protein_set_fuses_every_locus() {
    let fixture = Fixture::new();
    let empty = fixture.path("empty.faa");
    std::fs::write(&empty, b"").unwrap();
    let mut config = fixture.config();
    config.run.targets = vec![DatabaseTarget::Refseq];
    let mut engine = fixture.engine(&config);

    let outcome = AnnotationPipeline::new(config)
        .run(&mut engine, &empty, &fixture.gff)
        .await
        .unwrap();

    assert_eq!(outcome.completed, vec![DatabaseTarget::Refseq]);
    assert!(outcome.failed.is_empty());
    assert!(outcome.report.by_name("refseq_001").is_none());

    let refseq = read(&fixture.path("work/tables").join(AnnotationSource::Refseq.table_name("test")));
    assert_eq!(refseq.lines().count(), 1);

    let gff = read(&outcome.outputs.gff);
    let cds: Vec<&str> = gff.lines().filter(|l| l.contains("\tCDS\t")).collect();
    assert_eq!(cds.len(), 3);
    assert!(cds.iter().all(|l| l.ends_with("product=hypothetical protein")));
    assert_eq!(outcome.outputs.coverage.overall, 3);
    assert_eq!(outcome.outputs.coverage.at_least_one.count, 0);
}

#[tokio::test]
async fn test_failed_branch_ignores_stale_tables() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let tables = fixture.path("work/tables");
    std::fs::create_dir_all(&tables).unwrap();
    write_canonical_file(
        &tables.join(AnnotationSource::Kegg.table_name("test")),
        &[CanonicalHit {
            query_id: "g2".to_string(),
            subject_id: "eco:b2".to_string(),
            dbxref: "KEGG:eco:b2".to_string(),
            class: Some("K00001".to_string()),
            symbol: Some("adhE".to_string()),
            description: Some("alcohol dehydrogenase".to_string()),
            qstart: 1,
            qend: 27,
            evalue: Some(1e-30),
            score: Some(120.0),
            note: None,
        }],
    )
    .unwrap();
    let mut engine = fixture.engine(&config);

    let outcome = AnnotationPipeline::new(config)
        .run(&mut engine, &fixture.proteins, &fixture.gff)
        .await
        .unwrap();

    assert_eq!(outcome.failed, vec![DatabaseTarget::Kegg]);
    let gff = read(&outcome.outputs.gff);
    assert!(!gff.contains("KEGG"));
    assert!(!gff.contains("alcohol dehydrogenase"));
    let g2 = gff.lines().find(|l| l.contains("\tID=g2;")).unwrap();
    assert!(g2.ends_with("product=hypothetical protein"));

    assert_eq!(outcome.outputs.coverage.get(AnnotationSource::Kegg).unwrap().count, 0);
    assert!(read(&outcome.outputs.summary).contains("KEGG\t0\t0.00\n"));
}
