//! Joins the canonical tables onto the structural gene model

use super::escape::join_escaped;
use super::rules::{combine, go_contribution, hit_contribution, Contributor, Field, Rule, RULES};
use crate::canonical::read_canonical_table;
use crate::error::Result;
use crate::gff::{GeneModel, Locus};
use crate::go::{read_go_table, GoAnnotation};
use crate::models::{AnnotationSource, CanonicalHit, DatabaseTarget};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// Inputs
// ============================================================================

/// The seven per-source tables; any may be empty
#[derive(Debug, Clone, Default)]
pub struct FusionInputs {
    tables: BTreeMap<AnnotationSource, Vec<CanonicalHit>>,
    go: Vec<GoAnnotation>,
}

impl FusionInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, source: AnnotationSource, hits: Vec<CanonicalHit>) -> Self {
        self.tables.insert(source, hits);
        self
    }

    pub fn with_go(mut self, go: Vec<GoAnnotation>) -> Self {
        self.go = go;
        self
    }

    /// Read `<prefix>.<source>.tsv` tables from `dir`
    ///
    /// A missing table is treated as empty: its target either failed or
    /// was not part of the run.
    pub fn load(dir: &Path, prefix: &str) -> Result<Self> {
        let mut inputs = Self::new();

        for source in AnnotationSource::HIT_SOURCES {
            let path = dir.join(source.table_name(prefix));
            if path.is_file() {
                inputs.tables.insert(source, read_canonical_table(&path)?);
            } else {
                warn!(source = %source, path = %path.display(), "Canonical table missing; treated as empty");
            }
        }

        let go = dir.join(AnnotationSource::Go.table_name(prefix));
        if go.is_file() {
            inputs.go = read_go_table(&go)?;
        } else {
            warn!(path = %go.display(), "GO table missing; treated as empty");
        }

        Ok(inputs)
    }

    /// Drop every table `target` owns, e.g. after its branch failed
    pub fn without_target(mut self, target: DatabaseTarget) -> Self {
        for source in target.sources() {
            match source {
                AnnotationSource::Go => self.go.clear(),
                _ => {
                    self.tables.remove(source);
                }
            }
        }
        self
    }

    pub fn table(&self, source: AnnotationSource) -> &[CanonicalHit] {
        self.tables.get(&source).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn go(&self) -> &[GoAnnotation] {
        &self.go
    }
}

// ============================================================================
// Gene records
// ============================================================================

/// Fused annotation of one CDS locus
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    pub locus_id: String,
    pub hits: BTreeMap<AnnotationSource, CanonicalHit>,
    pub go: Option<GoAnnotation>,
    pub product: String,
    pub gene: Option<String>,
    pub ec_numbers: BTreeSet<String>,
    pub inference: Vec<String>,
    pub note: Vec<String>,
}

impl GeneRecord {
    pub fn hit(&self, source: AnnotationSource) -> Option<&CanonicalHit> {
        self.hits.get(&source)
    }

    /// Whether `source` contributed anything to this locus
    pub fn annotated_by(&self, source: AnnotationSource) -> bool {
        match source {
            AnnotationSource::Go => self.go.is_some(),
            _ => self.hits.contains_key(&source),
        }
    }

    fn values(&self, field: Field) -> Vec<String> {
        match field {
            Field::Product => vec![self.product.clone()],
            Field::Gene => self.gene.iter().cloned().collect(),
            Field::EcNumber => self.ec_numbers.iter().cloned().collect(),
            Field::Inference => self.inference.clone(),
            Field::Note => self.note.clone(),
        }
    }

    /// Escaped `key=value` pairs to append, empty fields omitted
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        Field::ATTRIBUTE_ORDER
            .iter()
            .filter_map(|field| {
                let values = self.values(*field);
                (!values.is_empty()).then(|| (field.as_str(), join_escaped(&values)))
            })
            .collect()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Result of fusing one gene model
#[derive(Debug, Clone, Default)]
pub struct Fusion {
    records: Vec<GeneRecord>,
    index: HashMap<String, usize>,
}

impl Fusion {
    /// Records in locus order
    pub fn records(&self) -> &[GeneRecord] {
        &self.records
    }

    pub fn record(&self, locus_id: &str) -> Option<&GeneRecord> {
        self.index.get(locus_id).map(|&i| &self.records[i])
    }

    /// Loci each source annotated
    pub fn annotated_sets(&self) -> BTreeMap<AnnotationSource, BTreeSet<String>> {
        AnnotationSource::SUMMARY_ORDER
            .iter()
            .map(|source| {
                let loci = self
                    .records
                    .iter()
                    .filter(|r| r.annotated_by(*source))
                    .map(|r| r.locus_id.clone())
                    .collect();
                (*source, loci)
            })
            .collect()
    }
}

/// Applies the precedence table to every locus
#[derive(Debug, Clone, Copy)]
pub struct FusionEngine {
    rules: &'static [Rule],
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self { rules: &RULES }
    }
}

impl FusionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    pub fn fuse(&self, model: &GeneModel, inputs: &FusionInputs) -> Fusion {
        let mut by_source: BTreeMap<AnnotationSource, HashMap<&str, &CanonicalHit>> = BTreeMap::new();
        for source in AnnotationSource::HIT_SOURCES {
            let mut hits = HashMap::new();
            let mut unknown = 0usize;
            for hit in inputs.table(source) {
                if !model.contains(&hit.query_id) {
                    unknown += 1;
                    continue;
                }
                hits.entry(hit.query_id.as_str()).or_insert(hit);
            }
            if unknown > 0 {
                warn!(source = %source, rows = unknown, "Ignoring canonical rows for loci absent from the gene model");
            }
            by_source.insert(source, hits);
        }

        let mut go: HashMap<&str, &GoAnnotation> = HashMap::new();
        let mut unknown_go = 0usize;
        for annotation in inputs.go() {
            if model.contains(&annotation.query_id) {
                go.entry(annotation.query_id.as_str()).or_insert(annotation);
            } else {
                unknown_go += 1;
            }
        }
        if unknown_go > 0 {
            warn!(source = "GO", rows = unknown_go, "Ignoring canonical rows for loci absent from the gene model");
        }

        let mut fusion = Fusion::default();
        for locus in model.loci() {
            let hits: BTreeMap<AnnotationSource, CanonicalHit> = by_source
                .iter()
                .filter_map(|(source, table)| {
                    table.get(locus.id.as_str()).map(|hit| (*source, (*hit).clone()))
                })
                .collect();
            let go = go.get(locus.id.as_str()).map(|a| (*a).clone());

            let record = self.build(locus, hits, go);
            fusion.index.insert(record.locus_id.clone(), fusion.records.len());
            fusion.records.push(record);
        }

        info!(loci = fusion.records.len(), "Fused annotations onto gene model");
        fusion
    }

    fn build(
        &self,
        locus: &Locus,
        hits: BTreeMap<AnnotationSource, CanonicalHit>,
        go: Option<GoAnnotation>,
    ) -> GeneRecord {
        let mut record = GeneRecord {
            locus_id: locus.id.clone(),
            hits,
            go,
            product: String::new(),
            gene: None,
            ec_numbers: BTreeSet::new(),
            inference: Vec::new(),
            note: Vec::new(),
        };

        for rule in self.rules {
            let contributed: Vec<String> = rule
                .contributors
                .iter()
                .flat_map(|contributor| match contributor {
                    Contributor::Predictor => match rule.field {
                        Field::Inference => vec![locus.default_inference.clone()],
                        _ => Vec::new(),
                    },
                    Contributor::Source(AnnotationSource::Go) => record
                        .go
                        .as_ref()
                        .map(|a| go_contribution(rule.field, a))
                        .unwrap_or_default(),
                    Contributor::Source(source) => record
                        .hits
                        .get(source)
                        .map(|hit| hit_contribution(rule.field, *source, hit))
                        .unwrap_or_default(),
                })
                .collect();

            let values = combine(rule.mode, contributed);
            match rule.field {
                Field::Product => {
                    record.product = values.into_iter().next().unwrap_or_default();
                }
                Field::Gene => record.gene = values.into_iter().next(),
                Field::EcNumber => record.ec_numbers = values.into_iter().collect(),
                Field::Inference => record.inference = values,
                Field::Note => record.note = values,
            }
        }

        debug!(locus = %record.locus_id, product = %record.product, "Fused locus");
        record
    }
}

/// Write the annotated GFF3: every input row in order, CDS rows extended
pub fn write_gff<W: Write>(out: &mut W, model: &GeneModel, fusion: &Fusion) -> Result<()> {
    writeln!(out, "##gff-version 3")?;
    for row in model.rows() {
        let record = row
            .is_cds()
            .then(|| row.locus_key())
            .flatten()
            .and_then(|key| fusion.record(key));
        match record {
            Some(record) => writeln!(out, "{}", row.to_line_with(&record.attributes()))?,
            None => writeln!(out, "{}", row.to_line())?,
        }
    }
    Ok(())
}
