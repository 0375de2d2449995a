//! Optional lookup tables that enrich normalized hits
//!
//! Each table is tab-separated. Lines are decoded lossily because the COG
//! definition file ships in a legacy single-byte encoding.

use crate::error::Result;
use crate::io::open_input;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, warn};

/// Visit the tab-split columns of every non-comment line
pub(crate) fn for_each_row<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&[&str], usize),
{
    let mut reader = open_input(path)?;
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        visit(&cols, line_no);
    }

    Ok(())
}

fn dash_to_none(value: Option<&&str>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "-")
        .map(String::from)
}

// ============================================================================
// TIGRFAMs link table
// ============================================================================

/// One `TIGRFAMS.link` row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TigrfamEntry {
    pub description: Option<String>,
    pub symbol: Option<String>,
    pub ec: Option<String>,
    pub go: Option<String>,
}

/// `id, description, symbol, EC, GO`
pub fn load_tigrfams_link(path: &Path) -> Result<HashMap<String, TigrfamEntry>> {
    let mut entries = HashMap::new();
    for_each_row(path, |cols, line_no| {
        if cols.len() < 2 {
            warn!("Skipping line {} due to parse error: expected at least 2 columns", line_no);
            return;
        }
        entries.insert(
            cols[0].trim().to_string(),
            TigrfamEntry {
                description: dash_to_none(cols.get(1)),
                symbol: dash_to_none(cols.get(2)),
                ec: dash_to_none(cols.get(3)),
                go: dash_to_none(cols.get(4)),
            },
        );
    })?;
    debug!(entries = entries.len(), "Loaded TIGRFAMs link table");
    Ok(entries)
}

// ============================================================================
// COG definitions
// ============================================================================

/// One COG definition row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CogDefinition {
    /// Functional category letters, e.g. `L` or `KT`
    pub class: Option<String>,
    pub description: Option<String>,
    pub symbol: Option<String>,
}

/// `id, functional class, description, symbol, ...`
pub fn load_cog_definitions(path: &Path) -> Result<HashMap<String, CogDefinition>> {
    let mut defs = HashMap::new();
    for_each_row(path, |cols, line_no| {
        if cols.len() < 3 {
            warn!("Skipping line {} due to parse error: expected at least 3 columns", line_no);
            return;
        }
        defs.insert(
            cols[0].trim().to_string(),
            CogDefinition {
                class: dash_to_none(cols.get(1)),
                description: dash_to_none(cols.get(2)),
                symbol: dash_to_none(cols.get(3)),
            },
        );
    })?;
    debug!(entries = defs.len(), "Loaded COG definitions");
    Ok(defs)
}

// ============================================================================
// KEGG subject -> KO
// ============================================================================

/// `subject<TAB>KO`, with an optional `ko:` prefix on the KO
pub fn load_kegg_ko_map(path: &Path) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for_each_row(path, |cols, line_no| {
        if cols.len() < 2 {
            warn!("Skipping line {} due to parse error: expected 2 columns", line_no);
            return;
        }
        let ko = cols[1].trim();
        let ko = ko.strip_prefix("ko:").unwrap_or(ko);
        if !ko.is_empty() {
            map.entry(cols[0].trim().to_string())
                .or_insert_with(|| ko.to_string());
        }
    })?;
    debug!(entries = map.len(), "Loaded KEGG KO map");
    Ok(map)
}
