//! Per-gene merged annotation table
//!
//! A wide, spreadsheet-friendly view of the fusion result: one row per CDS
//! locus with the best hit of every source side by side.

use crate::error::Result;
use crate::fusion::{Fusion, GeneRecord};
use crate::gff::GeneModel;
use crate::io::create_output;
use crate::models::AnnotationSource;
use std::io::Write;
use std::path::Path;

pub const MERGED_HEADER: [&str; 21] = [
    "#Gene_Id",
    "Strand",
    "Start",
    "End",
    "Gene_Length(bp)",
    "Location",
    "Gene_Name",
    "SwissProt_Description",
    "Refseq_Description",
    "Pfam_Id",
    "Pfam_Description",
    "TIGRFAMs_Id",
    "TIGRFAMs_Description",
    "COG_Id",
    "COG_Description",
    "COG_Type",
    "KEGG_Id",
    "KO_Id",
    "KO_Description",
    "GO_Id",
    "GO_Description",
];

fn cell(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") => "-".to_string(),
        Some(v) => v.replace(['\t', '\n', '\r'], " "),
    }
}

fn source_cells(record: &GeneRecord, out: &mut Vec<String>) {
    let hit = |s| record.hit(s);

    out.push(cell(hit(AnnotationSource::SwissProt).and_then(|h| h.description.as_deref())));
    out.push(cell(hit(AnnotationSource::Refseq).and_then(|h| h.product())));

    for source in [AnnotationSource::Pfam, AnnotationSource::Tigrfams] {
        let h = hit(source);
        out.push(cell(h.map(|h| h.subject_id.as_str())));
        out.push(cell(h.and_then(|h| h.product())));
    }

    let cog = hit(AnnotationSource::Cog);
    out.push(cell(cog.map(|h| h.subject_id.as_str())));
    out.push(cell(cog.and_then(|h| h.product())));
    out.push(cell(cog.and_then(|h| h.class.as_deref())));

    let kegg = hit(AnnotationSource::Kegg);
    out.push(cell(kegg.map(|h| h.subject_id.as_str())));
    out.push(cell(kegg.and_then(|h| h.class.as_deref())));
    out.push(cell(kegg.and_then(|h| h.product())));

    match &record.go {
        Some(go) => {
            let (ids, names): (Vec<&str>, Vec<&str>) =
                go.iter().map(|(_, e)| (e.id.as_str(), e.name.as_str())).unzip();
            out.push(cell(Some(ids.join(";").as_str())));
            out.push(cell(Some(names.join(";").as_str())));
        }
        None => out.extend(["-".to_string(), "-".to_string()]),
    }
}

/// Render every locus row (no header)
pub fn rows(model: &GeneModel, fusion: &Fusion) -> Vec<String> {
    model
        .loci()
        .iter()
        .filter_map(|locus| {
            let record = fusion.record(&locus.id)?;
            let mut cols = vec![
                locus.id.clone(),
                locus.strand.clone(),
                locus.start.to_string(),
                locus.end.to_string(),
                locus.span().to_string(),
                locus.seqid.clone(),
                cell(record.gene.as_deref()),
            ];
            source_cells(record, &mut cols);
            Some(cols.join("\t"))
        })
        .collect()
}

pub fn write_merged_table(path: &Path, model: &GeneModel, fusion: &Fusion) -> Result<()> {
    let mut out = create_output(path)?;
    writeln!(out, "{}", MERGED_HEADER.join("\t"))?;
    for row in rows(model, fusion) {
        writeln!(out, "{}", row)?;
    }
    out.flush()?;
    Ok(())
}
