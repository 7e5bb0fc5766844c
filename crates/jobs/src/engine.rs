//! The transformation-engine seam.
//!
//! Actual spreadsheet parsing and rule application live behind
//! [`TransformEngine`]; this crate ships only [`PassthroughEngine`], which
//! walks the staged progress envelope of the real pipeline and returns the
//! template unchanged, so the whole protocol is exercisable end to end
//! without a workbook library.

use std::collections::BTreeSet;

use async_trait::async_trait;

use tabula_core::rules::RuleSet;

use crate::error::JobError;
use crate::reporter::ProgressReporter;

/// An uploaded file: original name plus raw bytes.
#[derive(Debug, Clone)]
pub struct NamedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Per-submission engine options.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Process only rows visible in the source workbook.
    pub visible_rows_only: bool,
    /// Named post-processing step to run after all rules.
    pub post_function: Option<String>,
}

/// Everything an engine needs for one run.
#[derive(Debug, Clone)]
pub struct EngineInput {
    pub source: NamedFile,
    /// Destination template; when absent the source doubles as template.
    pub template: Option<NamedFile>,
    pub rules: RuleSet,
    pub options: TransformOptions,
}

/// One transformation run. Progress and warnings go exclusively through
/// the reporter; the returned bytes are the result workbook.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    async fn run(&self, input: EngineInput, reporter: &ProgressReporter)
        -> Result<Vec<u8>, JobError>;
}

// Stage labels and percents of the real pipeline, kept verbatim so the
// front end shows the same envelope against this engine.
const STAGE_PREPARE: (&str, u8) = ("Подготовка...", 5);
const STAGE_CELLS: (&str, u8) = ("Копирую отдельные ячейки...", 10);
const STAGE_FILLS: (&str, u8) = ("Заполняю столбцы из ячеек...", 15);
const COLUMNS_BASE: u8 = 20;
const COLUMNS_WEIGHT: u8 = 50;
const STAGE_STATIC: (&str, u8) = ("Заполняю статичные значения...", 70);
const STAGE_FORMULAS: (&str, u8) = ("Вычисляю формулы...", 80);
const STAGE_POST: (&str, u8) = ("Пост-обработка...", 90);
const STAGE_SAVE: (&str, u8) = ("Сохраняю результат...", 95);

/// Protocol-exercising engine: emits the staged progress envelope, checks
/// that every sheet a rule references has a sheet setting (warning per
/// missing sheet), interprets no rules, and returns the template bytes
/// unchanged.
pub struct PassthroughEngine;

#[async_trait]
impl TransformEngine for PassthroughEngine {
    async fn run(
        &self,
        input: EngineInput,
        reporter: &ProgressReporter,
    ) -> Result<Vec<u8>, JobError> {
        let (label, pct) = STAGE_PREPARE;
        reporter.progress(label, pct).await;

        for sheet in unknown_sheets(&input.rules) {
            reporter
                .warn(format!("Лист '{sheet}' не найден в настройках листов"))
                .await;
        }

        let (label, pct) = STAGE_CELLS;
        reporter.progress(label, pct).await;
        let (label, pct) = STAGE_FILLS;
        reporter.progress(label, pct).await;

        // Column phase: one step per distinct source sheet, spread across
        // the 20..70 band like the real column walker.
        let sheets: Vec<&str> = distinct_column_sheets(&input.rules);
        reporter
            .progress(
                &format!("Найдено {} листов для обработки колонок...", sheets.len()),
                COLUMNS_BASE,
            )
            .await;
        for (i, sheet) in sheets.iter().enumerate() {
            let pct = COLUMNS_BASE
                + ((i + 1) * COLUMNS_WEIGHT as usize / sheets.len().max(1)) as u8;
            reporter
                .progress(&format!("Лист '{sheet}' завершен."), pct)
                .await;
        }

        let (label, pct) = STAGE_STATIC;
        reporter.progress(label, pct).await;
        let (label, pct) = STAGE_FORMULAS;
        reporter.progress(label, pct).await;
        let (label, pct) = STAGE_POST;
        reporter.progress(label, pct).await;
        let (label, pct) = STAGE_SAVE;
        reporter.progress(label, pct).await;

        let EngineInput {
            source, template, ..
        } = input;
        Ok(template.map(|t| t.bytes).unwrap_or(source.bytes))
    }
}

/// Sheets referenced by rules but absent from the sheet settings, in
/// first-reference order with duplicates dropped.
fn unknown_sheets(rules: &RuleSet) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    let mut missing = Vec::new();
    let referenced = rules
        .cell_mappings
        .iter()
        .map(|r| r.source_sheet.as_str())
        .chain(rules.column_rules.iter().map(|r| r.source_sheet.as_str()))
        .chain(
            rules
                .source_cell_fill_rules
                .iter()
                .map(|r| r.source_sheet.as_str()),
        )
        .chain(rules.formula_rules.iter().map(|r| r.source_sheet.as_str()));

    for sheet in referenced {
        if !rules.has_sheet_setting(sheet) && seen.insert(sheet) {
            missing.push(sheet);
        }
    }
    missing
}

/// Distinct source sheets of the column rules, in rule order.
fn distinct_column_sheets(rules: &RuleSet) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    rules
        .column_rules
        .iter()
        .map(|r| r.source_sheet.as_str())
        .filter(|sheet| seen.insert(*sheet))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tabula_core::events::WireEvent;
    use tabula_core::rules::{ColumnRule, SheetSetting};
    use tabula_events::EventHub;

    use crate::registry::JobRegistry;

    fn input_with_rules(rules: RuleSet) -> EngineInput {
        EngineInput {
            source: NamedFile {
                filename: "source.xlsx".into(),
                bytes: b"source".to_vec(),
            },
            template: Some(NamedFile {
                filename: "template.xlsx".into(),
                bytes: b"template".to_vec(),
            }),
            rules,
            options: TransformOptions::default(),
        }
    }

    fn rules_fixture() -> RuleSet {
        RuleSet {
            sheet_settings: vec![SheetSetting {
                sheet_name: "Лист1".into(),
                start_cell: "A5".into(),
            }],
            column_rules: vec![
                ColumnRule {
                    source_sheet: "Лист1".into(),
                    source_cell: "A1".into(),
                    template_col: "B".into(),
                },
                ColumnRule {
                    source_sheet: "Лист2".into(),
                    source_cell: "A1".into(),
                    template_col: "C".into(),
                },
            ],
            ..RuleSet::default()
        }
    }

    #[tokio::test]
    async fn emits_monotonic_staged_progress_and_returns_template() {
        let registry = Arc::new(JobRegistry::new());
        let hub = Arc::new(EventHub::default());
        registry.create("j-1").await;
        let mut sub = hub.subscribe("j-1").await;

        let reporter =
            ProgressReporter::new("j-1".into(), Arc::clone(&registry), Arc::clone(&hub));
        let bytes = PassthroughEngine
            .run(input_with_rules(rules_fixture()), &reporter)
            .await
            .unwrap();
        assert_eq!(bytes, b"template");

        // The run is over, so the buffered events are all there is.
        // Percents never decrease and end in the save stage at 95.
        let mut percents = Vec::new();
        while let Ok(event) =
            tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await
        {
            match event {
                Some(WireEvent::StatusUpdate(p)) => percents.push(p.progress.unwrap()),
                Some(other) => panic!("unexpected event: {other:?}"),
                None => break,
            }
        }
        assert_eq!(percents.first(), Some(&5));
        assert_eq!(percents.last(), Some(&95));
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    }

    #[tokio::test]
    async fn warns_once_per_sheet_missing_from_settings() {
        let registry = Arc::new(JobRegistry::new());
        let hub = Arc::new(EventHub::default());
        registry.create("j-2").await;

        let reporter =
            ProgressReporter::new("j-2".into(), Arc::clone(&registry), Arc::clone(&hub));
        PassthroughEngine
            .run(input_with_rules(rules_fixture()), &reporter)
            .await
            .unwrap();

        let snap = registry.snapshot("j-2").await.unwrap();
        assert_eq!(snap.warnings.len(), 1);
        assert!(snap.warnings[0].contains("Лист2"), "{:?}", snap.warnings);
    }

    #[tokio::test]
    async fn missing_template_falls_back_to_source_bytes() {
        let registry = Arc::new(JobRegistry::new());
        let hub = Arc::new(EventHub::default());
        registry.create("j-3").await;

        let reporter =
            ProgressReporter::new("j-3".into(), Arc::clone(&registry), Arc::clone(&hub));
        let mut input = input_with_rules(RuleSet::default());
        input.template = None;

        let bytes = PassthroughEngine.run(input, &reporter).await.unwrap();
        assert_eq!(bytes, b"source");
    }
}
