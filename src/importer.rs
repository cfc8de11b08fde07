use std::collections::BTreeSet;
use std::path::Path;

use crate::allocator::parse_rate;
use crate::error::{CashplanError, Result};
use crate::state::LocalStateStore;

/// One non-blank cell of an imported rate grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCell {
    pub category: String,
    pub account: String,
    pub value: String,
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportResult {
    pub imported: usize,
    /// Cells written that will not count as offers.
    pub unparseable: usize,
    pub unknown_categories: BTreeSet<String>,
    pub unknown_accounts: BTreeSet<String>,
}

fn is_header(record: &csv::StringRecord) -> bool {
    record.len() >= 2 && record[0].trim().eq_ignore_ascii_case("category")
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Read a `category,<account>,<account>...` grid. Rows before the header
/// and blank cells are ignored.
pub fn parse_grid(file_path: &Path) -> Result<Vec<ParsedCell>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));

    let mut accounts: Option<Vec<String>> = None;
    let mut cells = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if accounts.is_none() {
            if is_header(&record) {
                accounts = Some(record.iter().skip(1).map(str::to_string).collect());
            }
            continue;
        }
        let Some(columns) = &accounts else { continue };
        let category = record.get(0).unwrap_or_default();
        if category.is_empty() {
            continue;
        }
        for (account, value) in columns.iter().zip(record.iter().skip(1)) {
            if account.is_empty() || value.is_empty() {
                continue;
            }
            cells.push(ParsedCell {
                category: category.to_string(),
                account: account.clone(),
                value: value.to_string(),
            });
        }
    }

    if accounts.is_none() {
        return Err(CashplanError::Other(format!(
            "{}: no header row starting with \"category\"",
            file_path.display()
        )));
    }
    Ok(cells)
}

// ---------------------------------------------------------------------------
// Applying
// ---------------------------------------------------------------------------

/// Write parsed cells into the active period. Names missing from the
/// current lists are skipped and reported.
pub fn apply_grid(state: &mut LocalStateStore, cells: &[ParsedCell]) -> Result<ImportResult> {
    let mut result = ImportResult::default();
    for cell in cells {
        if !state.categories().iter().any(|c| *c == cell.category) {
            result.unknown_categories.insert(cell.category.clone());
            continue;
        }
        if !state.accounts().iter().any(|a| a.name == cell.account) {
            result.unknown_accounts.insert(cell.account.clone());
            continue;
        }
        state.set_cell(&cell.category, &cell.account, &cell.value)?;
        if parse_rate(&cell.value).is_none() {
            result.unparseable += 1;
        }
        result.imported += 1;
    }
    log::info!(
        "imported {} cells into {} ({} unknown categories, {} unknown accounts)",
        result.imported,
        state.active_period(),
        result.unknown_categories.len(),
        result.unknown_accounts.len()
    );
    Ok(result)
}
