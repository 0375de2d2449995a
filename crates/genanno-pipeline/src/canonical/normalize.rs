//! Target-specific normalization of subject titles
//!
//! Every target describes its subjects differently. A [`Normalizer`] decides
//! which annotation source a raw hit belongs to (if any) and turns the chosen
//! best hit into a [`CanonicalHit`] with a trimmed description, gene symbol
//! and note.

use super::reference::{
    load_cog_definitions, load_kegg_ko_map, load_tigrfams_link, CogDefinition, TigrfamEntry,
};
use crate::config::DatabasesConfig;
use crate::error::Result;
use crate::models::{AnnotationSource, CanonicalHit, DatabaseTarget, RawHit};
use regex::Regex;
use std::collections::HashMap;

/// Per-target hit normalization
pub trait Normalizer: Send + Sync {
    /// Source table the hit competes in; `None` drops the hit
    fn source_for(&self, hit: &RawHit) -> Option<AnnotationSource>;

    /// Build the canonical record for a selected best hit
    fn normalize(&self, hit: &RawHit) -> CanonicalHit;
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty() && s != "-").then(|| s.to_string())
}

/// Drop a leading copy of the subject id from a DIAMOND `stitle`
fn strip_subject_id<'a>(title: &'a str, subject_id: &str) -> &'a str {
    let title = title.trim();
    match title.strip_prefix(subject_id) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => title,
    }
}

fn base(hit: &RawHit, dbxref: String) -> CanonicalHit {
    CanonicalHit {
        query_id: hit.query_id.clone(),
        subject_id: hit.subject_id.clone(),
        dbxref,
        class: None,
        symbol: None,
        description: None,
        qstart: hit.qstart,
        qend: hit.qend,
        evalue: hit.evalue,
        score: hit.bitscore,
        note: None,
    }
}

// ============================================================================
// Refseq
// ============================================================================

/// `WP_000001.1 chromosomal replication initiator protein DnaA [Escherichia coli]`
#[derive(Debug)]
pub struct RefseqNormalizer {
    accession: Regex,
}

impl RefseqNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            accession: Regex::new(r"^[A-Z]{2}_[0-9]+(\.[0-9]+)?\s+")?,
        })
    }

    /// Pick the first informative title out of `>`-joined merged titles
    fn informative_title<'a>(title: &'a str) -> &'a str {
        let parts: Vec<&str> = title.split('>').map(str::trim).collect();
        parts
            .iter()
            .copied()
            .find(|p| !p.contains("hypothetical protein"))
            .or_else(|| parts.last().copied())
            .unwrap_or(title)
    }

    /// Split `desc [taxon]` at the last bracket
    pub fn split_taxon(text: &str) -> (&str, Option<&str>) {
        match text.rfind('[') {
            Some(idx) => {
                let taxon = text[idx + 1..].trim().trim_end_matches(']').trim();
                (text[..idx].trim(), (!taxon.is_empty()).then_some(taxon))
            }
            None => (text.trim(), None),
        }
    }

    /// First word after the last "protein", when it looks like a gene name
    pub fn symbol(desc: &str) -> Option<String> {
        let (_, tail) = desc.rsplit_once("protein")?;
        let word = tail.split_whitespace().next()?;
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        (word.chars().count() > 2 && starts_upper).then(|| word.to_string())
    }
}

impl Normalizer for RefseqNormalizer {
    fn source_for(&self, _hit: &RawHit) -> Option<AnnotationSource> {
        Some(AnnotationSource::Refseq)
    }

    fn normalize(&self, hit: &RawHit) -> CanonicalHit {
        let title = strip_subject_id(&hit.title, &hit.subject_id);
        let chosen = Self::informative_title(title);
        let chosen = self.accession.replace(chosen, "");
        let (desc, taxon) = Self::split_taxon(&chosen);

        let mut canonical = base(hit, format!("Refseq:{}", hit.subject_id));
        canonical.symbol = Self::symbol(desc);
        canonical.description = non_empty(desc);
        canonical.note = taxon.map(|t| format!("Taxon:{}", t));
        canonical
    }
}

// ============================================================================
// SwissProt
// ============================================================================

/// `sp|P0A7B8|DNAA_ECOLI desc OS=... OX=... GN=... PE=... SV=...`
#[derive(Debug)]
pub struct SwissProtNormalizer {
    key: Regex,
}

impl SwissProtNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            key: Regex::new(r"(?:^|\s)([A-Z]{2})=")?,
        })
    }

    /// Description before the first `KEY=`, plus the key/value pairs
    pub fn split_fields(&self, text: &str) -> (String, HashMap<String, String>) {
        let matches: Vec<_> = self
            .key
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .collect();

        let desc_end = matches.first().map(|m| m.start()).unwrap_or(text.len());
        let desc = text[..desc_end].trim().to_string();

        let mut fields = HashMap::new();
        for (i, m) in matches.iter().enumerate() {
            let value_start = m.end() + 1;
            let value_end = matches.get(i + 1).map(|n| n.start()).unwrap_or(text.len());
            if value_start <= value_end {
                fields
                    .entry(m.as_str().to_string())
                    .or_insert_with(|| text[value_start..value_end].trim().to_string());
            }
        }
        (desc, fields)
    }
}

impl Normalizer for SwissProtNormalizer {
    fn source_for(&self, _hit: &RawHit) -> Option<AnnotationSource> {
        Some(AnnotationSource::SwissProt)
    }

    fn normalize(&self, hit: &RawHit) -> CanonicalHit {
        let title = strip_subject_id(&hit.title, &hit.subject_id);
        let (desc, fields) = self.split_fields(title);

        let mut canonical = base(hit, format!("SwissProt:{}", hit.subject_id));
        canonical.description = non_empty(&desc);
        canonical.symbol = fields
            .get("GN")
            .filter(|gn| gn.parse::<f64>().is_err())
            .and_then(|gn| non_empty(gn));
        canonical.note = fields
            .get("OS")
            .and_then(|os| non_empty(os))
            .map(|os| format!("Taxon:{}", os));
        canonical
    }
}

// ============================================================================
// KEGG
// ============================================================================

/// `eco:b3702 dnaA; chromosomal replication initiator protein [EC:3.6.4.12]`
#[derive(Debug)]
pub struct KeggNormalizer {
    ko_map: HashMap<String, String>,
    ko: Regex,
    ec: Regex,
}

impl KeggNormalizer {
    pub fn new(ko_map: HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            ko_map,
            ko: Regex::new(r"\bK\d{5}\b")?,
            ec: Regex::new(r"\[EC:([^\]]*)\]")?,
        })
    }
}

impl Normalizer for KeggNormalizer {
    fn source_for(&self, _hit: &RawHit) -> Option<AnnotationSource> {
        Some(AnnotationSource::Kegg)
    }

    fn normalize(&self, hit: &RawHit) -> CanonicalHit {
        let title = strip_subject_id(&hit.title, &hit.subject_id);

        let leading_ko = self.ko.find(title).filter(|m| m.start() == 0);
        let ko = self
            .ko_map
            .get(&hit.subject_id)
            .cloned()
            .or_else(|| self.ko.find(title).map(|m| m.as_str().to_string()));
        let rest = match leading_ko {
            Some(m) => title[m.end()..].trim_start(),
            None => title,
        };

        let ecs: Vec<String> = self
            .ec
            .captures_iter(rest)
            .filter_map(|c| c.get(1))
            .flat_map(|m| m.as_str().split_whitespace())
            .map(String::from)
            .collect();
        let text = self.ec.replace_all(rest, "");
        let text = text.trim();

        let (symbol, desc) = match text.split_once(';') {
            Some((sym, rest)) if !sym.trim().contains(char::is_whitespace) => {
                let sym = sym.split(',').next().unwrap_or(sym);
                (non_empty(sym), rest.trim())
            }
            _ => (None, text),
        };

        let mut canonical = base(hit, format!("KEGG:{}", hit.subject_id));
        canonical.class = ko;
        canonical.symbol = symbol;
        canonical.description = non_empty(desc);
        canonical.note = (!ecs.is_empty()).then(|| format!("EC:{}", ecs.join(" ")));
        canonical
    }
}

// ============================================================================
// COG
// ============================================================================

/// COG hits carry the family id in the subject id or title
#[derive(Debug)]
pub struct CogNormalizer {
    definitions: HashMap<String, CogDefinition>,
    cog_id: Regex,
}

impl CogNormalizer {
    pub fn new(definitions: HashMap<String, CogDefinition>) -> Result<Self> {
        Ok(Self {
            definitions,
            cog_id: Regex::new(r"COG\d{4}")?,
        })
    }

    fn cog_id(&self, hit: &RawHit) -> Option<String> {
        self.cog_id
            .find(&hit.subject_id)
            .or_else(|| self.cog_id.find(&hit.title))
            .map(|m| m.as_str().to_string())
    }
}

impl Normalizer for CogNormalizer {
    fn source_for(&self, hit: &RawHit) -> Option<AnnotationSource> {
        self.cog_id(hit).map(|_| AnnotationSource::Cog)
    }

    fn normalize(&self, hit: &RawHit) -> CanonicalHit {
        let id = self.cog_id(hit).unwrap_or_else(|| hit.subject_id.clone());
        let mut canonical = base(hit, format!("COG:{}", id));
        canonical.subject_id = id.clone();

        match self.definitions.get(&id) {
            Some(def) => {
                canonical.class = def.class.clone();
                canonical.description = def.description.clone();
                canonical.symbol = def.symbol.clone();
            }
            None => {
                let title = strip_subject_id(&hit.title, &hit.subject_id).replace(&id, "");
                let (desc, _) = RefseqNormalizer::split_taxon(&title);
                canonical.description = non_empty(desc);
            }
        }
        canonical
    }
}

// ============================================================================
// FunctionalMotif (InterProScan)
// ============================================================================

/// Pfam and TIGRFAM signature matches; other analyses only feed GO
#[derive(Debug, Default)]
pub struct MotifNormalizer {
    tigrfams: HashMap<String, TigrfamEntry>,
}

impl MotifNormalizer {
    pub fn new(tigrfams: HashMap<String, TigrfamEntry>) -> Self {
        Self { tigrfams }
    }
}

impl Normalizer for MotifNormalizer {
    fn source_for(&self, hit: &RawHit) -> Option<AnnotationSource> {
        match hit.analysis.as_deref()? {
            "TIGRFAM" | "TIGRFAMs" | "NCBIfam" => Some(AnnotationSource::Tigrfams),
            "Pfam" => Some(AnnotationSource::Pfam),
            _ => None,
        }
    }

    fn normalize(&self, hit: &RawHit) -> CanonicalHit {
        match self.source_for(hit) {
            Some(AnnotationSource::Tigrfams) => {
                let mut canonical = base(hit, format!("TIGRFAMs:{}", hit.subject_id));
                let entry = self.tigrfams.get(&hit.subject_id);
                canonical.description = entry
                    .and_then(|e| e.description.clone())
                    .or_else(|| non_empty(&hit.title));
                canonical.symbol = entry.and_then(|e| e.symbol.clone());
                canonical.note = entry
                    .and_then(|e| e.ec.as_deref())
                    .map(|ec| format!("EC:{}", ec));
                canonical
            }
            _ => {
                let mut canonical = base(hit, format!("Pfam:{}", hit.subject_id));
                canonical.description = hit.title.split(';').next().and_then(non_empty);
                canonical
            }
        }
    }
}

// ============================================================================
// Tagged dispatch
// ============================================================================

/// The normalizer for one target, selected by variant
#[derive(Debug)]
pub enum TargetNormalizer {
    Refseq(RefseqNormalizer),
    Kegg(KeggNormalizer),
    Cog(CogNormalizer),
    FunctionalMotif(MotifNormalizer),
    SwissProt(SwissProtNormalizer),
}

impl TargetNormalizer {
    /// Build the normalizer, loading whichever lookup tables are configured
    pub fn load(target: DatabaseTarget, databases: &DatabasesConfig) -> Result<Self> {
        Ok(match target {
            DatabaseTarget::Refseq => TargetNormalizer::Refseq(RefseqNormalizer::new()?),
            DatabaseTarget::SwissProt => TargetNormalizer::SwissProt(SwissProtNormalizer::new()?),
            DatabaseTarget::Kegg => TargetNormalizer::Kegg(KeggNormalizer::new(
                match &databases.kegg_ko_map {
                    Some(path) => load_kegg_ko_map(path)?,
                    None => HashMap::new(),
                },
            )?),
            DatabaseTarget::Cog => TargetNormalizer::Cog(CogNormalizer::new(
                match &databases.cog_definitions {
                    Some(path) => load_cog_definitions(path)?,
                    None => HashMap::new(),
                },
            )?),
            DatabaseTarget::FunctionalMotif => TargetNormalizer::FunctionalMotif(
                MotifNormalizer::new(match &databases.tigrfams_link {
                    Some(path) => load_tigrfams_link(path)?,
                    None => HashMap::new(),
                }),
            ),
        })
    }

    fn inner(&self) -> &dyn Normalizer {
        match self {
            TargetNormalizer::Refseq(n) => n,
            TargetNormalizer::Kegg(n) => n,
            TargetNormalizer::Cog(n) => n,
            TargetNormalizer::FunctionalMotif(n) => n,
            TargetNormalizer::SwissProt(n) => n,
        }
    }
}

impl Normalizer for TargetNormalizer {
    fn source_for(&self, hit: &RawHit) -> Option<AnnotationSource> {
        self.inner().source_for(hit)
    }

    fn normalize(&self, hit: &RawHit) -> CanonicalHit {
        self.inner().normalize(hit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn raw(subject: &str, title: &str) -> RawHit {
        RawHit {
            query_id: "g1".into(),
            subject_id: subject.into(),
            identity: Some(90.0),
            qstart: 1,
            qend: 100,
            evalue: Some(1e-40),
            bitscore: Some(200.0),
            qlen: Some(100),
            slen: Some(100),
            sstart: Some(1),
            send: Some(100),
            title: title.into(),
            analysis: None,
            go_terms: vec![],
        }
    }

    #[test]
    fn test_refseq_title() {
        let hit = raw(
            "WP_000001.1",
            "WP_000001.1 chromosomal replication initiator protein DnaA [Escherichia coli]",
        );
        let c = RefseqNormalizer::new().unwrap().normalize(&hit);
        assert_eq!(c.dbxref, "Refseq:WP_000001.1");
        assert_eq!(c.description.as_deref(), Some("chromosomal replication initiator protein DnaA"));
        assert_eq!(c.symbol.as_deref(), Some("DnaA"));
        assert_eq!(c.note.as_deref(), Some("Taxon:Escherichia coli"));
        assert_eq!(c.score, Some(200.0));
    }

    #[test]
    fn test_refseq_merged_titles_skip_hypothetical() {
        let hit = raw(
            "WP_1.1",
            "WP_1.1 hypothetical protein [Bacillus]>WP_2.1 DNA gyrase subunit B [Bacillus subtilis]",
        );
        let c = RefseqNormalizer::new().unwrap().normalize(&hit);
        assert_eq!(c.description.as_deref(), Some("DNA gyrase subunit B"));
        assert_eq!(c.symbol, None);
        assert_eq!(c.note.as_deref(), Some("Taxon:Bacillus subtilis"));
    }

    #[test]
    fn test_refseq_symbol_rules() {
        assert_eq!(RefseqNormalizer::symbol("membrane protein YidC"), Some("YidC".into()));
        assert_eq!(RefseqNormalizer::symbol("ribosomal protein L7"), None);
        assert_eq!(RefseqNormalizer::symbol("binding protein lower"), None);
        assert_eq!(RefseqNormalizer::symbol("hypothetical protein"), None);
    }

    #[test]
    fn test_swissprot_fields() {
        let hit = raw(
            "sp|P03004|DNAA_ECOLI",
            "sp|P03004|DNAA_ECOLI Chromosomal replication initiator protein DnaA OS=Escherichia coli (strain K12) OX=83333 GN=dnaA PE=1 SV=2",
        );
        let c = SwissProtNormalizer::new().unwrap().normalize(&hit);
        assert_eq!(c.description.as_deref(), Some("Chromosomal replication initiator protein DnaA"));
        assert_eq!(c.symbol.as_deref(), Some("dnaA"));
        assert_eq!(c.note.as_deref(), Some("Taxon:Escherichia coli (strain K12)"));
        assert_eq!(c.dbxref, "SwissProt:sp|P03004|DNAA_ECOLI");
    }

    #[test]
    fn test_swissprot_numeric_gene_discarded() {
        let hit = raw("sp|X|Y", "sp|X|Y Uncharacterized protein OS=Virus 12 OX=1 GN=12 PE=4 SV=1");
        let c = SwissProtNormalizer::new().unwrap().normalize(&hit);
        assert_eq!(c.symbol, None);
        assert_eq!(c.note.as_deref(), Some("Taxon:Virus 12"));
    }

    #[test]
    fn test_kegg_title() {
        let hit = raw(
            "eco:b3702",
            "eco:b3702 K02313 dnaA; chromosomal replication initiator protein [EC:3.6.4.12 3.6.4.-]",
        );
        let c = KeggNormalizer::new(HashMap::new()).unwrap().normalize(&hit);
        assert_eq!(c.class.as_deref(), Some("K02313"));
        assert_eq!(c.symbol.as_deref(), Some("dnaA"));
        assert_eq!(c.description.as_deref(), Some("chromosomal replication initiator protein"));
        assert_eq!(c.note.as_deref(), Some("EC:3.6.4.12 3.6.4.-"));
        assert_eq!(c.ec_numbers(), vec!["3.6.4.12", "3.6.4.-"]);
    }

    #[test]
    fn test_kegg_ko_from_map_and_plain_description() {
        let mut map = HashMap::new();
        map.insert("abc:1".to_string(), "K00001".to_string());
        let hit = raw("abc:1", "alcohol dehydrogenase");
        let c = KeggNormalizer::new(map).unwrap().normalize(&hit);
        assert_eq!(c.class.as_deref(), Some("K00001"));
        assert_eq!(c.symbol, None);
        assert_eq!(c.description.as_deref(), Some("alcohol dehydrogenase"));
        assert_eq!(c.note, None);
    }

    #[test]
    fn test_cog_with_and_without_definitions() {
        let hit = raw("WP_9.1|COG0593", "WP_9.1|COG0593 ATPase involved in DNA replication initiation");
        let plain = CogNormalizer::new(HashMap::new()).unwrap();
        assert_eq!(plain.source_for(&hit), Some(AnnotationSource::Cog));
        let c = plain.normalize(&hit);
        assert_eq!(c.dbxref, "COG:COG0593");
        assert_eq!(c.description.as_deref(), Some("ATPase involved in DNA replication initiation"));

        let mut defs = HashMap::new();
        defs.insert(
            "COG0593".to_string(),
            CogDefinition {
                class: Some("L".into()),
                description: Some("Chromosomal replication initiation ATPase DnaA".into()),
                symbol: Some("DnaA".into()),
            },
        );
        let c = CogNormalizer::new(defs).unwrap().normalize(&hit);
        assert_eq!(c.class.as_deref(), Some("L"));
        assert_eq!(c.symbol.as_deref(), Some("DnaA"));

        assert_eq!(plain.source_for(&raw("WP_9.1", "no family")), None);
    }

    #[test]
    fn test_motif_sources_and_descriptions() {
        let mut tigr = raw("TIGR00362", "DnaA: chromosomal replication initiator protein DnaA");
        tigr.analysis = Some("TIGRFAM".into());
        tigr.bitscore = None;
        let mut pfam = raw("PF00308", "Bacterial dnaA  protein; AAA domain");
        pfam.analysis = Some("Pfam".into());
        let mut other = raw("G3DSA:1", "x");
        other.analysis = Some("Gene3D".into());

        let mut link = HashMap::new();
        link.insert(
            "TIGR00362".to_string(),
            TigrfamEntry {
                description: Some("chromosomal replication initiator protein DnaA".into()),
                symbol: Some("dnaA".into()),
                ec: Some("3.6.4.12".into()),
                go: None,
            },
        );
        let n = MotifNormalizer::new(link);

        assert_eq!(n.source_for(&tigr), Some(AnnotationSource::Tigrfams));
        assert_eq!(n.source_for(&pfam), Some(AnnotationSource::Pfam));
        assert_eq!(n.source_for(&other), None);

        let t = n.normalize(&tigr);
        assert_eq!(t.dbxref, "TIGRFAMs:TIGR00362");
        assert_eq!(t.symbol.as_deref(), Some("dnaA"));
        assert_eq!(t.note.as_deref(), Some("EC:3.6.4.12"));
        assert_eq!(t.score, None);

        let p = n.normalize(&pfam);
        assert_eq!(p.dbxref, "Pfam:PF00308");
        assert_eq!(p.description.as_deref(), Some("Bacterial dnaA  protein"));
    }

    #[test]
    fn test_target_normalizer_dispatch() {
        let n = TargetNormalizer::load(DatabaseTarget::Refseq, &DatabasesConfig::default()).unwrap();
        assert_eq!(n.source_for(&raw("s", "t")), Some(AnnotationSource::Refseq));
    }
}
