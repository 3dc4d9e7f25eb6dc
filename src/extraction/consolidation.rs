//! Runs the five extractions of a workbook and assembles one operation.

use super::engine::extract;
use super::join::join;
use super::layouts::{SheetLayout, layouts};
use super::models::{OperationRecord, Record};
use crate::common::errors::{BusinessError, BusinessResult};
use crate::database::services::Database;
use crate::workbook::Workbook;
use std::sync::Arc;

/// Reads one table out of a workbook
pub(super) type Extractor = fn(&Workbook, &SheetLayout) -> Vec<Record>;

/// Run one extraction on the blocking pool; a panicking extraction yields an empty table
async fn run_extraction(
    workbook: Arc<Workbook>,
    layout: &'static SheetLayout,
    extractor: Extractor,
) -> Vec<Record> {
    let source = workbook.source().to_string();
    match tokio::task::spawn_blocking(move || extractor(&workbook, layout)).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(
                source = %source,
                table = %layout.table,
                error = %e,
                "extraction task failed, continuing with an empty table"
            );
            Vec::new()
        }
    }
}

/// Join a dependent table against the identification table when its layout names a key
fn join_with_identification(
    layout: &SheetLayout,
    records: &[Record],
    identification: &[Record],
) -> Vec<Record> {
    match layout.join_key.as_deref() {
        Some(key) => join(records, identification, key),
        None => records.to_vec(),
    }
}

/// Extract and join every table of one workbook
pub async fn consolidate(workbook: Arc<Workbook>) -> BusinessResult<OperationRecord> {
    consolidate_with(workbook, extract).await
}

pub(super) async fn consolidate_with(
    workbook: Arc<Workbook>,
    extractor: Extractor,
) -> BusinessResult<OperationRecord> {
    let layouts = layouts()?;
    tracing::info!(
        source = workbook.source(),
        sheets = ?workbook.sheet_names(),
        "consolidating workbook"
    );

    let (identif, synthese, prp, financements, loyer) = tokio::join!(
        run_extraction(workbook.clone(), &layouts.identification, extractor),
        run_extraction(workbook.clone(), &layouts.synthesis, extractor),
        run_extraction(workbook.clone(), &layouts.project_economics, extractor),
        run_extraction(workbook.clone(), &layouts.financing, extractor),
        run_extraction(workbook.clone(), &layouts.rent_and_charges, extractor),
    );

    let operation = OperationRecord {
        synthese: join_with_identification(&layouts.synthesis, &synthese, &identif),
        prp: join_with_identification(&layouts.project_economics, &prp, &identif),
        financements: join_with_identification(&layouts.financing, &financements, &identif),
        loyer: join_with_identification(&layouts.rent_and_charges, &loyer, &identif),
        identif,
    };

    tracing::info!(
        source = workbook.source(),
        identif = operation.identif.len(),
        synthese = operation.synthese.len(),
        prp = operation.prp.len(),
        financements = operation.financements.len(),
        loyer = operation.loyer.len(),
        "workbook consolidated"
    );
    Ok(operation)
}

/// Consolidate and serialize as indented JSON without touching the database
pub async fn consolidate_json(workbook: Arc<Workbook>) -> BusinessResult<String> {
    let operation = consolidate(workbook).await?;
    serde_json::to_string_pretty(&operation).map_err(|e| BusinessError::InternalError {
        message: format!("Failed to serialize operation: {e}"),
    })
}

/// Consolidate and append the operation to the database, returning its index
pub async fn export(workbook: Arc<Workbook>, database: &Database) -> BusinessResult<usize> {
    let operation = consolidate(workbook).await?;
    database
        .transaction(move |document| Ok(document.push(operation)))
        .await
}
