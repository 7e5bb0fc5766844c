//! Rule rows and the rule-set document submitted with a transformation job.
//!
//! Six row variants, one array per variant in the JSON document. Insertion
//! order within each array is preserved and significant: later rules of the
//! same kind may build on earlier ones, so validation and application never
//! reorder rows.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Per-sheet setting: where the header row of a source sheet starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSetting {
    /// Sheet name in the source workbook.
    pub sheet_name: String,
    /// Cell reference of the first header cell, e.g. `A5`.
    pub start_cell: String,
}

impl SheetSetting {
    /// Row number extracted from the header start cell (`A5` -> 5).
    ///
    /// Returns `None` when the reference carries no digits or the digits
    /// do not parse.
    pub fn header_start_row(&self) -> Option<u32> {
        let digits: String = self
            .start_cell
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// One-to-one copy of a single source cell into a destination cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMapping {
    pub source_sheet: String,
    pub source_cell: String,
    pub dest_cell: String,
}

/// Row-by-row copy of a source column (anchored at a cell) into a
/// destination template column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub source_sheet: String,
    pub source_cell: String,
    pub template_col: String,
}

/// Fill a destination column with one literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticValueRule {
    pub target_sheet: String,
    pub target_col: String,
    pub value: String,
}

/// Fill a destination column from a single source cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCellFillRule {
    pub source_sheet: String,
    pub source_cell: String,
    pub target_sheet: String,
    pub target_col: String,
}

/// Row-by-row computed column; the expression references the current source
/// row through a `{row}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaRule {
    pub source_sheet: String,
    pub target_sheet: String,
    pub target_col: String,
    pub formula: String,
}

/// The full rule-set document of one submission.
///
/// Field names match the wire contract of the submit endpoint; the column
/// rules live under the historical key `rules`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub sheet_settings: Vec<SheetSetting>,
    #[serde(default)]
    pub cell_mappings: Vec<CellMapping>,
    #[serde(default, rename = "rules")]
    pub column_rules: Vec<ColumnRule>,
    #[serde(default)]
    pub static_value_rules: Vec<StaticValueRule>,
    #[serde(default)]
    pub source_cell_fill_rules: Vec<SourceCellFillRule>,
    #[serde(default)]
    pub formula_rules: Vec<FormulaRule>,
}

impl RuleSet {
    /// Validate the required-field invariant: every declared field of every
    /// row is non-empty.
    ///
    /// Fails on the first offending row; the message names the rule kind,
    /// the 1-based row position, and the empty field.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (i, row) in self.sheet_settings.iter().enumerate() {
            require("sheet setting", i, "sheet_name", &row.sheet_name)?;
            require("sheet setting", i, "start_cell", &row.start_cell)?;
        }
        for (i, row) in self.cell_mappings.iter().enumerate() {
            require("cell mapping", i, "source_sheet", &row.source_sheet)?;
            require("cell mapping", i, "source_cell", &row.source_cell)?;
            require("cell mapping", i, "dest_cell", &row.dest_cell)?;
        }
        for (i, row) in self.column_rules.iter().enumerate() {
            require("column rule", i, "source_sheet", &row.source_sheet)?;
            require("column rule", i, "source_cell", &row.source_cell)?;
            require("column rule", i, "template_col", &row.template_col)?;
        }
        for (i, row) in self.static_value_rules.iter().enumerate() {
            require("static value rule", i, "target_sheet", &row.target_sheet)?;
            require("static value rule", i, "target_col", &row.target_col)?;
            require("static value rule", i, "value", &row.value)?;
        }
        for (i, row) in self.source_cell_fill_rules.iter().enumerate() {
            require("source-cell fill rule", i, "source_sheet", &row.source_sheet)?;
            require("source-cell fill rule", i, "source_cell", &row.source_cell)?;
            require("source-cell fill rule", i, "target_sheet", &row.target_sheet)?;
            require("source-cell fill rule", i, "target_col", &row.target_col)?;
        }
        for (i, row) in self.formula_rules.iter().enumerate() {
            require("formula rule", i, "source_sheet", &row.source_sheet)?;
            require("formula rule", i, "target_sheet", &row.target_sheet)?;
            require("formula rule", i, "target_col", &row.target_col)?;
            require("formula rule", i, "formula", &row.formula)?;
        }
        Ok(())
    }

    /// Whether a sheet name appears in the sheet settings.
    pub fn has_sheet_setting(&self, sheet_name: &str) -> bool {
        self.sheet_settings.iter().any(|s| s.sheet_name == sheet_name)
    }

    /// Total number of rows across all rule kinds.
    pub fn row_count(&self) -> usize {
        self.sheet_settings.len()
            + self.cell_mappings.len()
            + self.column_rules.len()
            + self.static_value_rules.len()
            + self.source_cell_fill_rules.len()
            + self.formula_rules.len()
    }
}

fn require(kind: &str, index: usize, field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{kind} {}: field '{field}' must not be empty",
            index + 1
        )));
    }
    Ok(())
}
