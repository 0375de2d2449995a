//! Gene Ontology classification
//!
//! InterProScan reports bare GO ids per query. They are resolved against an
//! OBO ontology to a name and namespace, grouped per query and written as the
//! GO table that fusion and the merged annotation table read.

use crate::error::{PipelineError, Result};
use crate::io::{create_output, open_input};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

pub const GO_HEADER: &str =
    "#qseqid\tbiological_process\tcellular_component\tmolecular_function";

// ============================================================================
// Namespaces
// ============================================================================

/// GO namespace; variant order is the column and note order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GoNamespace {
    BiologicalProcess,
    CellularComponent,
    MolecularFunction,
}

impl GoNamespace {
    pub const ALL: [GoNamespace; 3] = [
        GoNamespace::BiologicalProcess,
        GoNamespace::CellularComponent,
        GoNamespace::MolecularFunction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoNamespace::BiologicalProcess => "biological_process",
            GoNamespace::CellularComponent => "cellular_component",
            GoNamespace::MolecularFunction => "molecular_function",
        }
    }

    /// Suffix used in fused GFF3 notes
    pub fn note_label(&self) -> &'static str {
        match self {
            GoNamespace::BiologicalProcess => "GO_process",
            GoNamespace::CellularComponent => "GO_component",
            GoNamespace::MolecularFunction => "GO_function",
        }
    }
}

impl std::str::FromStr for GoNamespace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "biological_process" => Ok(GoNamespace::BiologicalProcess),
            "cellular_component" => Ok(GoNamespace::CellularComponent),
            "molecular_function" => Ok(GoNamespace::MolecularFunction),
            other => Err(format!("Unknown GO namespace: {}", other)),
        }
    }
}

// ============================================================================
// Ontology (OBO)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTerm {
    pub id: String,
    pub name: String,
    pub namespace: GoNamespace,
    pub is_obsolete: bool,
    pub alt_ids: Vec<String>,
}

/// Terms keyed by primary id, with `alt_id` aliases
#[derive(Debug, Clone, Default)]
pub struct GoOntology {
    terms: HashMap<String, GoTerm>,
    aliases: HashMap<String, String>,
}

#[derive(Default)]
struct Stanza {
    id: Option<String>,
    name: Option<String>,
    namespace: Option<String>,
    is_obsolete: bool,
    alt_ids: Vec<String>,
}

impl Stanza {
    fn finish(self, line_no: usize) -> Result<GoTerm> {
        let id = self
            .id
            .ok_or_else(|| PipelineError::parse(line_no, "term stanza without id"))?;
        let name = self
            .name
            .ok_or_else(|| PipelineError::parse(line_no, format!("term {} has no name", id)))?;
        let namespace = self
            .namespace
            .ok_or_else(|| PipelineError::parse(line_no, format!("term {} has no namespace", id)))?
            .parse::<GoNamespace>()
            .map_err(|e| PipelineError::parse(line_no, e))?;
        Ok(GoTerm {
            id,
            name,
            namespace,
            is_obsolete: self.is_obsolete,
            alt_ids: self.alt_ids,
        })
    }
}

impl GoOntology {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ontology = Self::parse(open_input(path)?)?;
        info!(path = %path.display(), terms = ontology.len(), "Loaded GO ontology");
        Ok(ontology)
    }

    /// Parse `[Term]` stanzas; other stanza types are ignored
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut ontology = Self::default();
        let mut current: Option<Stanza> = None;
        let mut last_line = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            last_line = idx + 1;

            if line.starts_with('[') {
                if let Some(stanza) = current.take() {
                    ontology.insert(stanza, idx);
                }
                if line == "[Term]" {
                    current = Some(Stanza::default());
                }
                continue;
            }

            let Some(stanza) = current.as_mut() else {
                continue;
            };
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "id" => stanza.id = Some(value.to_string()),
                "name" => stanza.name = Some(value.to_string()),
                "namespace" => stanza.namespace = Some(value.to_string()),
                "is_obsolete" => stanza.is_obsolete = value == "true",
                "alt_id" => stanza.alt_ids.push(value.to_string()),
                _ => {},
            }
        }

        if let Some(stanza) = current.take() {
            ontology.insert(stanza, last_line);
        }

        Ok(ontology)
    }

    fn insert(&mut self, stanza: Stanza, line_no: usize) {
        match stanza.finish(line_no) {
            Ok(term) => {
                for alt in &term.alt_ids {
                    self.aliases.insert(alt.clone(), term.id.clone());
                }
                self.terms.insert(term.id.clone(), term);
            }
            Err(e) => warn!("Failed to parse term stanza: {}", e),
        }
    }

    /// Look up a term by primary or alternate id
    pub fn get(&self, id: &str) -> Option<&GoTerm> {
        self.terms
            .get(id)
            .or_else(|| self.aliases.get(id).and_then(|primary| self.terms.get(primary)))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

// ============================================================================
// Per-query annotation
// ============================================================================

/// One resolved term as it appears in a GO table cell
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GoEntry {
    pub id: String,
    pub name: String,
}

impl GoEntry {
    /// `GO:0006270 - DNA replication initiation`
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }
}

/// GO terms of one query grouped by namespace
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoAnnotation {
    pub query_id: String,
    pub terms: BTreeMap<GoNamespace, Vec<GoEntry>>,
}

impl GoAnnotation {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            terms: BTreeMap::new(),
        }
    }

    pub fn entries(&self, namespace: GoNamespace) -> &[GoEntry] {
        self.terms.get(&namespace).map(Vec::as_slice).unwrap_or_default()
    }

    /// Entries across all namespaces, in namespace order
    pub fn iter(&self) -> impl Iterator<Item = (GoNamespace, &GoEntry)> {
        self.terms
            .iter()
            .flat_map(|(ns, entries)| entries.iter().map(move |e| (*ns, e)))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.values().all(Vec::is_empty)
    }

    /// Table cell for one namespace: labels joined with `;`, or `-`
    pub fn cell(&self, namespace: GoNamespace) -> String {
        let entries = self.entries(namespace);
        if entries.is_empty() {
            return "-".to_string();
        }
        entries.iter().map(GoEntry::label).collect::<Vec<_>>().join(";")
    }

    fn push(&mut self, namespace: GoNamespace, entry: GoEntry) {
        let entries = self.terms.entry(namespace).or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
            entries.sort();
        }
    }
}

/// Resolve collected GO ids; queries with no resolvable term are dropped
pub fn classify(
    go_ids: &BTreeMap<String, BTreeSet<String>>,
    ontology: &GoOntology,
) -> Vec<GoAnnotation> {
    let mut unresolved = BTreeSet::new();
    let mut annotations = Vec::new();

    for (query, ids) in go_ids {
        let mut annotation = GoAnnotation::new(query.clone());
        for id in ids {
            match ontology.get(id) {
                Some(term) if !term.is_obsolete => annotation.push(
                    term.namespace,
                    GoEntry {
                        id: term.id.clone(),
                        name: term.name.replace(';', ","),
                    },
                ),
                Some(_) => debug!(go_id = %id, "Dropping obsolete GO term"),
                None => {
                    unresolved.insert(id.as_str());
                }
            }
        }
        if !annotation.is_empty() {
            annotations.push(annotation);
        }
    }

    if !unresolved.is_empty() {
        warn!(
            count = unresolved.len(),
            "GO ids not found in the ontology were dropped"
        );
    }

    annotations
}

// ============================================================================
// GO table
// ============================================================================

pub fn write_go_table<W: Write>(out: &mut W, annotations: &[GoAnnotation]) -> Result<()> {
    writeln!(out, "{}", GO_HEADER)?;
    for annotation in annotations {
        let cells: Vec<String> = GoNamespace::ALL.iter().map(|ns| annotation.cell(*ns)).collect();
        writeln!(out, "{}\t{}", annotation.query_id, cells.join("\t"))?;
    }
    Ok(())
}

pub fn write_go_file(path: &Path, annotations: &[GoAnnotation]) -> Result<()> {
    let mut out = create_output(path)?;
    write_go_table(&mut out, annotations)?;
    out.flush()?;
    Ok(())
}

fn parse_cell(cell: &str) -> Vec<GoEntry> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "-" {
        return Vec::new();
    }
    cell.split(';')
        .filter_map(|entry| {
            let (id, name) = entry.split_once(" - ")?;
            Some(GoEntry {
                id: id.trim().to_string(),
                name: name.trim().to_string(),
            })
        })
        .collect()
}

pub fn parse_go_table<R: BufRead>(reader: R) -> Result<Vec<GoAnnotation>> {
    let mut annotations = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != 4 {
            warn!(
                "Skipping line {} due to parse error: expected 4 columns, got {}",
                idx + 1,
                cols.len()
            );
            continue;
        }

        let mut annotation = GoAnnotation::new(cols[0].trim());
        for (namespace, cell) in GoNamespace::ALL.iter().zip(&cols[1..]) {
            for entry in parse_cell(cell) {
                annotation.push(*namespace, entry);
            }
        }
        if !annotation.is_empty() {
            annotations.push(annotation);
        }
    }
    Ok(annotations)
}

pub fn read_go_table(path: &Path) -> Result<Vec<GoAnnotation>> {
    parse_go_table(open_input(path)?)
}
