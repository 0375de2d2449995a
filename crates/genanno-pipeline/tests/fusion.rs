//! Fusion of canonical tables onto a gene model, through the files on disk

use genanno_pipeline::canonical::write_canonical_file;
use genanno_pipeline::fusion::{FusionEngine, FusionInputs, DEFAULT_PRODUCT};
use genanno_pipeline::gff::GeneModel;
use genanno_pipeline::pipeline::fuse_tables;
use genanno_pipeline::{AnnotationSource, CanonicalHit};
use std::path::Path;
use tempfile::TempDir;

const GFF: &str = "##gff-version 3\n\
ctg1\tProdigal:2.6\tCDS\t1\t300\t.\t+\t0\tID=g1\n\
ctg1\tProdigal:2.6\tCDS\t400\t900\t.\t-\t0\tID=g2\n\
ctg2\tProdigal:2.6\tCDS\t10\t210\t.\t+\t0\tID=g3\n";

fn hit(query: &str, dbxref: &str, desc: &str, note: Option<&str>) -> CanonicalHit {
    let (_, subject) = dbxref.split_once(':').unwrap_or(("", dbxref));
    CanonicalHit {
        query_id: query.to_string(),
        subject_id: subject.to_string(),
        dbxref: dbxref.to_string(),
        class: None,
        symbol: None,
        description: Some(desc.to_string()),
        qstart: 1,
        qend: 90,
        evalue: Some(1e-40),
        score: Some(180.5),
        note: note.map(String::from),
    }
}

fn write_tables(dir: &Path, prefix: &str) {
    write_canonical_file(
        &dir.join(AnnotationSource::Tigrfams.table_name(prefix)),
        &[hit("g1", "TIGRFAMs:TIGR00580", "helicase", Some("EC:3.6.4.-"))],
    )
    .unwrap();
    write_canonical_file(
        &dir.join(AnnotationSource::Kegg.table_name(prefix)),
        &[
            hit("g1", "KEGG:eco:b1", "ATP-dependent DNA helicase", Some("EC:3.6.4.12")),
            hit("g2", "KEGG:eco:b2", "kinase", None),
        ],
    )
    .unwrap();
}

fn setup() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let gff = dir.path().join("genes.gff3");
    std::fs::write(&gff, GFF).unwrap();
    std::fs::create_dir_all(dir.path().join("tables")).unwrap();
    write_tables(&dir.path().join("tables"), "out");
    (dir, gff)
}

#[test]
fn test_end_to_end_scenario() {
    let (dir, gff) = setup();
    let out_dir = dir.path().join("results");

    let outputs = fuse_tables(&gff, &dir.path().join("tables"), "out", &out_dir).unwrap();

    let summary = std::fs::read_to_string(&outputs.summary).unwrap();
    assert_eq!(
        summary,
        "COG\t0\t0.00\n\
KEGG\t2\t66.67\n\
GO\t0\t0.00\n\
Refseq\t0\t0.00\n\
Pfam\t0\t0.00\n\
TIGRFAMs\t1\t33.33\n\
SwissProt\t0\t0.00\n\
all databases\t0\t0.00\n\
at least one databases\t2\t66.67\n\
Overall\t3\t100\n"
    );

    let text = std::fs::read_to_string(&outputs.gff).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "##gff-version 3");
    assert!(lines[1].contains("EC_number=3.6.4.-,3.6.4.12"));
    assert!(lines[1].ends_with(";product=helicase"));
    assert!(lines[2].ends_with(";product=kinase"));
    assert!(lines[3].ends_with(
        "ID=g3;inference=ab initio prediction:Prodigal:2.6;product=hypothetical protein"
    ));

    let merged = std::fs::read_to_string(&outputs.merged).unwrap();
    assert_eq!(merged.lines().count(), 4);
    assert!(merged.lines().next().unwrap().starts_with("#Gene_Id\tStrand"));

    let species = std::fs::read_to_string(&outputs.species).unwrap();
    assert_eq!(species.lines().count(), 1);
}

#[test]
fn test_records_from_scenario() {
    let model = GeneModel::parse(GFF.as_bytes()).unwrap();
    let inputs = FusionInputs::new()
        .with_table(
            AnnotationSource::Tigrfams,
            vec![hit("g1", "TIGRFAMs:TIGR00580", "helicase", Some("EC:3.6.4.-"))],
        )
        .with_table(
            AnnotationSource::Kegg,
            vec![
                hit("g1", "KEGG:eco:b1", "ATP-dependent DNA helicase", Some("EC:3.6.4.12")),
                hit("g2", "KEGG:eco:b2", "kinase", None),
            ],
        );
    let fusion = FusionEngine::new().fuse(&model, &inputs);

    let g1 = fusion.record("g1").unwrap();
    assert_eq!(g1.product, "helicase");
    assert_eq!(
        g1.ec_numbers.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["3.6.4.-", "3.6.4.12"]
    );
    assert_eq!(fusion.record("g2").unwrap().product, "kinase");
    assert_eq!(fusion.record("g3").unwrap().product, DEFAULT_PRODUCT);
}

#[test]
fn test_tigrfams_product_beats_refseq() {
    let model = GeneModel::parse(GFF.as_bytes()).unwrap();
    let inputs = FusionInputs::new()
        .with_table(
            AnnotationSource::Refseq,
            vec![hit("g2", "Refseq:WP_9.1", "hypothetical membrane protein", None)],
        )
        .with_table(
            AnnotationSource::Tigrfams,
            vec![hit("g2", "TIGRFAMs:TIGR01187", "ABC transporter", None)],
        );
    let fusion = FusionEngine::new().fuse(&model, &inputs);
    assert_eq!(fusion.record("g2").unwrap().product, "ABC transporter");
}

#[test]
fn test_no_hits_fuses_to_default_product() {
    let model = GeneModel::parse(GFF.as_bytes()).unwrap();
    let fusion = FusionEngine::new().fuse(&model, &FusionInputs::new());
    assert!(fusion.records().iter().all(|r| r.product == DEFAULT_PRODUCT));
    assert!(fusion.records().iter().all(|r| r.ec_numbers.is_empty()));
}

#[test]
fn test_rerun_is_byte_identical() {
    let (dir, gff) = setup();
    let tables = dir.path().join("tables");

    let first = fuse_tables(&gff, &tables, "out", &dir.path().join("a")).unwrap();
    let second = fuse_tables(&gff, &tables, "out", &dir.path().join("b")).unwrap();

    for (a, b) in first.paths().iter().zip(second.paths().iter()) {
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
    assert_eq!(first.coverage, second.coverage);
}

#[test]
fn test_missing_gene_model_is_fatal() {
    let (dir, _) = setup();
    let result = fuse_tables(
        &dir.path().join("absent.gff3"),
        &dir.path().join("tables"),
        "out",
        &dir.path().join("results"),
    );
    assert!(matches!(result, Err(genanno_pipeline::PipelineError::InputMissing(_))));
}
