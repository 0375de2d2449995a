//! Most frequent source organisms among the Refseq best hits

use crate::error::Result;
use crate::io::write_file;
use crate::models::CanonicalHit;
use std::collections::HashMap;
use std::path::Path;

/// Taxa reported in the summary
pub const TOP_SPECIES: usize = 10;

pub const SPECIES_HEADER: &str = "#Species name\tProtein number";

/// Taxon counts, most frequent first, ties by name
pub fn count_species(hits: &[CanonicalHit], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for taxon in hits.iter().filter_map(CanonicalHit::taxon) {
        *counts.entry(taxon).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> =
        counts.into_iter().map(|(t, n)| (t.to_string(), n)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

pub fn render(ranked: &[(String, usize)]) -> String {
    let mut out = format!("{}\n", SPECIES_HEADER);
    for (taxon, count) in ranked {
        out.push_str(&format!("{}\t{}\n", taxon, count));
    }
    out
}

pub fn write_species(path: &Path, hits: &[CanonicalHit]) -> Result<()> {
    write_file(path, &render(&count_species(hits, TOP_SPECIES)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(query: &str, taxon: Option<&str>) -> CanonicalHit {
        CanonicalHit {
            query_id: query.into(),
            subject_id: "WP_1.1".into(),
            dbxref: "Refseq:WP_1.1".into(),
            class: None,
            symbol: None,
            description: None,
            qstart: 1,
            qend: 2,
            evalue: None,
            score: None,
            note: taxon.map(|t| format!("Taxon:{}", t)),
        }
    }

    #[test]
    fn test_ranking_and_ties() {
        let hits = vec![
            hit("g1", Some("Escherichia coli")),
            hit("g2", Some("Shigella flexneri")),
            hit("g3", Some("Escherichia coli")),
            hit("g4", Some("Salmonella enterica")),
            hit("g5", None),
        ];
        let ranked = count_species(&hits, TOP_SPECIES);
        assert_eq!(
            render(&ranked),
            "#Species name\tProtein number\nEscherichia coli\t2\nSalmonella enterica\t1\nShigella flexneri\t1\n"
        );
    }

    #[test]
    fn test_limit() {
        let hits: Vec<CanonicalHit> = (0..15)
            .map(|i| hit(&format!("g{}", i), Some(&format!("taxon {:02}", i))))
            .collect();
        let ranked = count_species(&hits, TOP_SPECIES);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].0, "taxon 00");
    }
}
