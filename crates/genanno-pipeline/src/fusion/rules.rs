//! Field precedence table
//!
//! Each fused attribute is described by a [`Rule`]: the contributors that
//! may supply it, in precedence order, and how their values combine. The
//! engine walks [`RULES`] and never hard-codes an order of its own.

use self::Contributor::{Predictor, Source};
use crate::go::GoAnnotation;
use crate::models::{AnnotationSource, AnnotationSource as S, CanonicalHit};
use std::collections::BTreeSet;

/// Product used when no source supplies a non-blank one
pub const DEFAULT_PRODUCT: &str = "hypothetical protein";

/// A fused GFF3 attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Product,
    Gene,
    EcNumber,
    Inference,
    Note,
}

impl Field {
    /// Order in which attributes are appended to a CDS row
    pub const ATTRIBUTE_ORDER: [Field; 5] = [
        Field::Gene,
        Field::EcNumber,
        Field::Inference,
        Field::Note,
        Field::Product,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Product => "product",
            Field::Gene => "gene",
            Field::EcNumber => "EC_number",
            Field::Inference => "inference",
            Field::Note => "note",
        }
    }
}

/// How contributed values combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First non-blank value, falling back to `default`
    First { default: Option<&'static str> },
    /// Deduplicated, sorted
    Set,
    /// Every value in contributor order
    Append,
}

/// Something that can supply a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contributor {
    /// The structural predictor (`ab initio prediction:<tool>`)
    Predictor,
    Source(AnnotationSource),
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub field: Field,
    pub contributors: &'static [Contributor],
    pub mode: Mode,
}

pub const RULES: [Rule; 5] = [
    Rule {
        field: Field::Product,
        contributors: &[
            Source(S::Tigrfams),
            Source(S::Pfam),
            Source(S::Cog),
            Source(S::Refseq),
            Source(S::SwissProt),
            Source(S::Kegg),
        ],
        mode: Mode::First {
            default: Some(DEFAULT_PRODUCT),
        },
    },
    Rule {
        field: Field::Gene,
        contributors: &[
            Source(S::Tigrfams),
            Source(S::Cog),
            Source(S::Refseq),
            Source(S::SwissProt),
            Source(S::Kegg),
        ],
        mode: Mode::First { default: None },
    },
    Rule {
        field: Field::EcNumber,
        contributors: &[Source(S::Tigrfams), Source(S::Kegg)],
        mode: Mode::Set,
    },
    Rule {
        field: Field::Inference,
        contributors: &[
            Predictor,
            Source(S::Tigrfams),
            Source(S::Pfam),
            Source(S::Cog),
            Source(S::Refseq),
            Source(S::Kegg),
        ],
        mode: Mode::Append,
    },
    Rule {
        field: Field::Note,
        contributors: &[
            Source(S::Go),
            Source(S::Tigrfams),
            Source(S::Pfam),
            Source(S::Cog),
            Source(S::Refseq),
            Source(S::Kegg),
        ],
        mode: Mode::Append,
    },
];

/// Values one canonical hit contributes to a field
pub fn hit_contribution(field: Field, source: AnnotationSource, hit: &CanonicalHit) -> Vec<String> {
    let product = hit.product();
    match field {
        Field::Product => product.map(String::from).into_iter().collect(),
        Field::Gene => hit
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .into_iter()
            .collect(),
        Field::EcNumber => hit.ec_numbers().into_iter().map(String::from).collect(),
        Field::Inference => match source {
            S::Tigrfams | S::Pfam | S::Cog => vec![format!("protein motif:{}", hit.dbxref)],
            S::Refseq => vec![format!("similar to AA sequence:{}", hit.dbxref)],
            S::Kegg => vec![format!("similar to AA sequence:KEGG:{}", hit.subject_id)],
            S::SwissProt | S::Go => Vec::new(),
        },
        Field::Note => {
            let Some(product) = product else {
                return Vec::new();
            };
            match source {
                S::Tigrfams | S::Pfam | S::Cog => vec![format!("{}: {}", source.label(), product)],
                S::Refseq | S::Kegg => {
                    vec![format!("{}: {} {}", source.label(), hit.subject_id, product)]
                }
                S::SwissProt | S::Go => Vec::new(),
            }
        }
    }
}

/// GO notes: `GO:id - name: GO_process`, in namespace order
pub fn go_contribution(field: Field, annotation: &GoAnnotation) -> Vec<String> {
    match field {
        Field::Note => annotation
            .iter()
            .map(|(ns, entry)| format!("{}: {}", entry.label(), ns.note_label()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Combine contributed values according to `mode`
pub fn combine(mode: Mode, values: Vec<String>) -> Vec<String> {
    match mode {
        Mode::First { default } => values
            .into_iter()
            .find(|v| !v.trim().is_empty())
            .or_else(|| default.map(String::from))
            .into_iter()
            .collect(),
        Mode::Set => {
            let set: BTreeSet<String> =
                values.into_iter().filter(|v| !v.trim().is_empty()).collect();
            set.into_iter().collect()
        }
        Mode::Append => values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(source: &str, subject: &str, desc: Option<&str>, note: Option<&str>) -> CanonicalHit {
        CanonicalHit {
            query_id: "g1".into(),
            subject_id: subject.into(),
            dbxref: format!("{}:{}", source, subject),
            class: None,
            symbol: None,
            description: desc.map(String::from),
            qstart: 1,
            qend: 10,
            evalue: None,
            score: None,
            note: note.map(String::from),
        }
    }

    #[test]
    fn test_every_field_has_one_rule() {
        for field in Field::ATTRIBUTE_ORDER {
            assert_eq!(RULES.iter().filter(|r| r.field == field).count(), 1);
        }
    }

    #[test]
    fn test_tigrfams_precedes_refseq_for_product() {
        let product = RULES.iter().find(|r| r.field == Field::Product).map(|r| r.contributors);
        let product = product.unwrap_or_default();
        let pos = |s| product.iter().position(|c| *c == Source(s));
        assert!(pos(S::Tigrfams) < pos(S::Refseq));
        assert_eq!(product.first(), Some(&Source(S::Tigrfams)));
    }

    #[test]
    fn test_contribution_texts() {
        let refseq = hit("Refseq", "WP_1.1", Some("DNA gyrase; subunit"), None);
        assert_eq!(
            hit_contribution(Field::Inference, S::Refseq, &refseq),
            vec!["similar to AA sequence:Refseq:WP_1.1"]
        );
        assert_eq!(
            hit_contribution(Field::Note, S::Refseq, &refseq),
            vec!["Refseq: WP_1.1 DNA gyrase"]
        );

        let kegg = hit("KEGG", "eco:b1", Some("kinase"), Some("EC:2.7.1.1"));
        assert_eq!(
            hit_contribution(Field::Inference, S::Kegg, &kegg),
            vec!["similar to AA sequence:KEGG:eco:b1"]
        );
        assert_eq!(hit_contribution(Field::EcNumber, S::Kegg, &kegg), vec!["2.7.1.1"]);

        let pfam = hit("Pfam", "PF1", None, None);
        assert!(hit_contribution(Field::Note, S::Pfam, &pfam).is_empty());
        assert_eq!(
            hit_contribution(Field::Inference, S::Pfam, &pfam),
            vec!["protein motif:Pfam:PF1"]
        );
    }

    #[test]
    fn test_combine_modes() {
        let values = vec!["  ".to_string(), "b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(
            combine(Mode::First { default: Some(DEFAULT_PRODUCT) }, values.clone()),
            vec!["b"]
        );
        assert_eq!(
            combine(Mode::First { default: Some(DEFAULT_PRODUCT) }, Vec::new()),
            vec![DEFAULT_PRODUCT]
        );
        assert!(combine(Mode::First { default: None }, Vec::new()).is_empty());
        assert_eq!(combine(Mode::Set, values.clone()), vec!["a", "b"]);
        assert_eq!(combine(Mode::Append, values.clone()).len(), 4);
    }
}
