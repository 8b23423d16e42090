//! Header normalization and alias resolution

use csv::StringRecord;

/// `"Coach's E-mail "` → `"coach_s_e_mail"`
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut pending_sep = false;
    for c in header.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Field name → accepted normalized header spellings.
pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

/// Resolved column positions for one sheet.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    headers: Vec<String>,
    positions: Vec<(&'static str, usize)>,
}

impl HeaderMap {
    pub fn new(headers: &StringRecord, aliases: AliasTable) -> Self {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut positions = Vec::new();

        for (field, spellings) in aliases {
            let found = spellings
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias));
            if let Some(index) = found {
                positions.push((*field, index));
            }
        }

        Self {
            headers: normalized,
            positions,
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.positions.iter().any(|(f, _)| *f == field)
    }

    /// Trimmed, non-empty cell for `field`.
    pub fn get<'r>(&self, record: &'r StringRecord, field: &str) -> Option<&'r str> {
        let index = self
            .positions
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, i)| *i)?;
        record
            .get(index)
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
    }

    /// Normalized headers as read (for error messages).
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}
