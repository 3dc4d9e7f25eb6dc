use super::consolidation::{consolidate, consolidate_json, consolidate_with, export};
use super::engine::{composite_key, extract};
use super::layouts::{SheetLayout, layouts};
use super::models::{OperationRecord, Record, Table};
use crate::common::errors::BusinessError;
use crate::database::services::Database;
use crate::database::store::MemoryStore;
use crate::workbook::Workbook;
use crate::workbook::address::parse_reference;
use calamine::{Data, Range};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::Ordering;

const SOURCE: &str = "operation.xlsb";

fn text(s: &str) -> Data {
    Data::String(s.to_string())
}

fn num(n: f64) -> Data {
    Data::Float(n)
}

/// Sheet from A1-addressed cells
fn sheet(name: &str, cells: &[(&str, Data)]) -> (String, Range<Data>) {
    let positions: Vec<_> = cells
        .iter()
        .map(|(reference, value)| (parse_reference(reference).unwrap(), value.clone()))
        .collect();

    let max_row = positions.iter().map(|(c, _)| c.row).max().unwrap_or(0);
    let max_col = positions.iter().map(|(c, _)| c.col).max().unwrap_or(0);
    let mut range = Range::new((0, 0), (max_row, max_col));
    for (cell, value) in positions {
        range.set_value((cell.row, cell.col), value);
    }
    (name.to_string(), range)
}

fn workbook(sheets: Vec<(String, Range<Data>)>) -> Workbook {
    Workbook::from_sheets(SOURCE, sheets)
}

fn keys(record: &Record) -> Vec<&str> {
    record.keys().map(String::as_str).collect()
}

fn identification_sheet() -> (String, Range<Data>) {
    sheet(
        "Identif",
        &[
            ("F57", text("T2")),
            ("C59", text("Nom de l'opération")),
            ("F59", text("Les Tilleuls")),
            ("C61", text("Numéro")),
            ("F61", num(42.0)),
            ("C7", text("Commune")),
            ("D7", text("Lyon")),
        ],
    )
}

#[test]
fn test_missing_identification_sheet_yields_nothing() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![sheet("Financement", &[("J8", text("Prog1"))])]);
    assert!(extract(&workbook, &layouts.identification).is_empty());
}

#[test]
fn test_single_lot_scenario() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![sheet("Identif", &[("F57", text("LotA"))])]);

    let records = extract(&workbook, &layouts.identification);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["id"], json!(SOURCE));
    assert_eq!(record["id2"], json!(1));
    assert_eq!(record["produit"], json!("LotA"));
    assert_eq!(record["clef"], json!("operation.xlsb&_1"));
    assert_eq!(&keys(record)[..4], ["id", "id2", "clef", "produit"]);
}

#[test]
fn test_identification_details() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![identification_sheet()]);

    let records = extract(&workbook, &layouts.identification);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["Nom de l'opération"], json!("Les Tilleuls"));
    assert_eq!(record["Numéro"], json!(42));
    assert_eq!(record["Commune"], json!("Lyon"));
    // Unlabelled fixed cells are kept as a null placeholder
    assert_eq!(record.get("null"), Some(&Value::Null));
}

#[test]
fn test_header_columns_number_units_left_to_right() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![sheet(
        "Identif",
        &[
            ("F57", text("T2")),
            ("G57", text("T3")),
            ("H57", text("T4")),
            ("C59", text("Nom de l'opération")),
            ("F59", text("first")),
            ("G59", text("second")),
            ("H59", text("third")),
        ],
    )]);

    let records = extract(&workbook, &layouts.identification);
    let id2: Vec<_> = records.iter().map(|r| r["id2"].clone()).collect();
    assert_eq!(id2, [json!(1), json!(2), json!(3)]);

    let names: Vec<_> = records
        .iter()
        .map(|r| r["Nom de l'opération"].clone())
        .collect();
    assert_eq!(names, [json!("first"), json!("second"), json!("third")]);

    let mut clefs: Vec<_> = records.iter().map(|r| r["clef"].to_string()).collect();
    clefs.sort();
    clefs.dedup();
    assert_eq!(clefs.len(), 3, "composite keys are unique");
}

#[test]
fn test_blank_header_column_keeps_column_position() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![sheet(
        "Identif",
        &[
            ("F57", text("T2")),
            ("G57", text("")),
            ("H57", text("T4")),
            ("C59", text("Nom de l'opération")),
            ("H59", text("third column")),
        ],
    )]);

    let records = extract(&workbook, &layouts.identification);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["id2"], json!(3));
    assert_eq!(records[1]["Nom de l'opération"], json!("third column"));
}

#[test]
fn test_financing_scenario() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![
        sheet("Identif", &[("F57", text("LotA"))]),
        sheet(
            "Financement",
            &[("J8", text("Prog1")), ("E14", text("Subv1")), ("J14", num(1000.0))],
        ),
    ]);

    let financing = extract(&workbook, &layouts.financing);
    assert_eq!(financing.len(), 1);
    assert_eq!(financing[0]["Subventions_Subv1"], json!(1000));
    assert_eq!(financing[0]["clef"], json!(composite_key(SOURCE, 1)));
    // Rows without a label are skipped entirely
    assert!(!financing[0].contains_key("Subventions_null"));
    assert!(!financing[0].contains_key("Prêts_null"));
}

#[test]
fn test_rent_rows_stop_at_zero_product() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![sheet(
        "LoyersEtCharges",
        &[
            ("E15", text("Loyer")),
            ("F15", text("Surface")),
            ("C16", text("T2")),
            ("D16", text("PLUS")),
            ("E16", num(450.0)),
            ("F16", num(50.5)),
            ("D17", text("PLAI")),
            ("E17", num(520.0)),
            ("C18", num(0.0)),
            ("C19", text("never read")),
        ],
    )]);

    let records = extract(&workbook, &layouts.rent_and_charges);
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(&keys(first)[..4], ["produit", "typologie", "Loyer", "Surface"]);
    assert_eq!(first["produit"], json!("T2"));
    assert_eq!(first["Loyer"], json!(450));
    assert_eq!(first["Surface"], json!(50.5));

    // A row without a product is still read, its missing seed named "null"
    let second = &records[1];
    assert!(!second.contains_key("produit"));
    assert_eq!(second["typologie"], json!("PLAI"));
    assert_eq!(second["Loyer"], json!(520));
}

#[test]
fn test_rent_rows_run_to_end_of_range_without_zero() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![sheet("LoyersEtCharges", &[("C16", text("T2"))])]);
    assert_eq!(extract(&workbook, &layouts.rent_and_charges).len(), 40);
}

#[test]
fn test_project_economics_sheets_are_isolated() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![
        sheet(
            "PRP CE SE_1",
            &[
                ("V7", text("T2")),
                ("D12", text("Foncier")),
                ("J12", num(1500.0)),
                ("D13", text("Notaire")),
            ],
        ),
        sheet(
            "PRP CE SE_2",
            &[
                ("V7", text("T3")),
                ("D59", text("Gros oeuvre")),
                ("J59", num(900.0)),
            ],
        ),
        // No product in V7: the sheet yields nothing
        sheet("PRP CE SE_3", &[("D12", text("Foncier")), ("J12", num(1.0))]),
    ]);

    let records = extract(&workbook, &layouts.project_economics);
    assert_eq!(records.len(), 2);

    assert_eq!(keys(&records[0]), ["produit", "Total Terrain_Foncier"]);
    assert_eq!(records[0]["Total Terrain_Foncier"], json!(1500));

    assert_eq!(keys(&records[1]), ["produit", "Total construction_Gros oeuvre"]);
    assert_eq!(records[1]["produit"], json!("T3"));
}

#[test]
fn test_synthesis_offsets() {
    let layouts = layouts().unwrap();
    let workbook = workbook(vec![sheet(
        "Fiche_Synthèse",
        &[
            ("G4", text("T2")),
            ("H4", text("T3")),
            ("F19", text("SHAB")),
            ("G19", num(120.0)),
            ("H19", num(80.0)),
            ("D136", text("Coût")),
            ("G136", num(10.0)),
            ("H136", num(20.0)),
        ],
    )]);

    let records = extract(&workbook, &layouts.synthesis);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["SHAB"], json!(120));
    assert_eq!(records[1]["SHAB"], json!(80));
    assert_eq!(records[0]["Coût"], json!(10));
    assert_eq!(records[1]["Coût"], json!(20));
}

fn full_workbook() -> Arc<Workbook> {
    Arc::new(workbook(vec![
        identification_sheet(),
        sheet(
            "Fiche_Synthèse",
            &[("G4", text("T2")), ("F19", text("SHAB")), ("G19", num(120.0))],
        ),
        sheet(
            "LoyersEtCharges",
            &[
                ("E15", text("Loyer")),
                ("C16", text("T2")),
                ("E16", num(450.0)),
                ("C17", text("T9")),
                ("C18", num(0.0)),
            ],
        ),
        sheet(
            "PRP CE SE_1",
            &[("V7", text("T2")), ("D12", text("Foncier")), ("J12", num(1500.0))],
        ),
        sheet(
            "Financement",
            &[("J8", text("Prog1")), ("E14", text("Subv1")), ("J14", num(1000.0))],
        ),
    ]))
}

#[tokio::test]
async fn test_consolidate_joins_against_identification() {
    let operation = consolidate(full_workbook()).await.unwrap();

    assert_eq!(operation.identif.len(), 1);
    assert_eq!(operation.source_id(), Some(&json!(SOURCE)));

    assert_eq!(operation.synthese.len(), 1);
    assert_eq!(operation.synthese[0]["SHAB"], json!(120));
    assert_eq!(operation.synthese[0]["Commune"], json!("Lyon"));

    // Only the rent row whose product exists in the identification survives
    assert_eq!(operation.loyer.len(), 1);
    assert_eq!(operation.loyer[0]["Loyer"], json!(450));
    assert_eq!(operation.loyer[0]["Nom de l'opération"], json!("Les Tilleuls"));

    assert_eq!(operation.prp.len(), 1);
    assert_eq!(operation.prp[0]["Total Terrain_Foncier"], json!(1500));

    // Identification wins on shared fields
    assert_eq!(operation.financements.len(), 1);
    assert_eq!(operation.financements[0]["Subventions_Subv1"], json!(1000));
    assert_eq!(operation.financements[0]["produit"], json!("T2"));
}

fn extract_failing_on_economics(workbook: &Workbook, layout: &SheetLayout) -> Vec<Record> {
    assert_ne!(layout.table, Table::ProjectEconomics, "corrupt economics sheet");
    extract(workbook, layout)
}

#[tokio::test]
async fn test_panicking_extraction_leaves_other_tables_intact() {
    let operation = consolidate_with(full_workbook(), extract_failing_on_economics)
        .await
        .unwrap();

    assert!(operation.prp.is_empty());
    assert_eq!(operation.identif.len(), 1);
    assert_eq!(operation.synthese[0]["SHAB"], json!(120));
    assert_eq!(operation.synthese[0]["Commune"], json!("Lyon"));
    assert_eq!(operation.loyer.len(), 1);
    assert_eq!(operation.loyer[0]["Nom de l'opération"], json!("Les Tilleuls"));
    assert_eq!(operation.financements[0]["Subventions_Subv1"], json!(1000));
}

#[tokio::test]
async fn test_consolidate_without_identification_is_empty() {
    let workbook = Arc::new(workbook(vec![sheet(
        "Financement",
        &[("J8", text("Prog1")), ("E14", text("Subv1")), ("J14", num(1000.0))],
    )]));

    let operation = consolidate(workbook).await.unwrap();
    assert_eq!(operation, OperationRecord::default());
}

#[tokio::test]
async fn test_consolidate_json_is_deterministic() {
    let workbook = full_workbook();
    let first = consolidate_json(workbook.clone()).await.unwrap();
    let second = consolidate_json(workbook).await.unwrap();
    assert_eq!(first, second);

    assert!(first.starts_with("{\n  \"identif\": ["));
    let parsed: OperationRecord = serde_json::from_str(&first).unwrap();
    assert_eq!(parsed.record_count(), 5);
}

#[tokio::test]
async fn test_export_appends_operations() {
    let store = Arc::new(MemoryStore::default());
    let database = Database::new(store.clone());

    assert_eq!(export(full_workbook(), &database).await.unwrap(), 0);
    assert_eq!(export(full_workbook(), &database).await.unwrap(), 1);

    let document = store.snapshot().await.unwrap();
    assert_eq!(document.operations.len(), 2);
}

#[tokio::test]
async fn test_export_reports_unavailable_store() {
    let store = Arc::new(MemoryStore::default());
    store.reject_writes.store(true, Ordering::SeqCst);
    let database = Database::new(store.clone());

    let err = export(full_workbook(), &database).await.unwrap_err();
    assert!(matches!(err, BusinessError::PersistenceUnavailable { .. }));
    assert!(store.snapshot().await.is_none());
}

#[tokio::test]
async fn test_consolidate_decoded_xlsx() {
    let mut source = rust_xlsxwriter::Workbook::new();
    let identif = source.add_worksheet().set_name("Identif").unwrap();
    identif.write_string(56, 5, "LotA").unwrap();
    identif.write_string(58, 2, "Nom de l'opération").unwrap();
    identif.write_string(58, 5, "Résidence du Parc").unwrap();

    let financing = source.add_worksheet().set_name("Financement").unwrap();
    financing.write_string(7, 9, "Prog1").unwrap();
    financing.write_string(13, 4, "Subv1").unwrap();
    financing.write_number(13, 9, 1000.0).unwrap();

    let bytes = source.save_to_buffer().unwrap();
    let workbook = Workbook::from_bytes("parc.xlsx", bytes).unwrap();
    assert_eq!(workbook.sheet_names(), ["Identif", "Financement"]);

    let operation = consolidate(Arc::new(workbook)).await.unwrap();
    assert_eq!(operation.identif[0]["clef"], json!("parc.xlsx&_1"));
    assert_eq!(
        operation.identif[0]["Nom de l'opération"],
        json!("Résidence du Parc")
    );
    assert_eq!(operation.financements[0]["Subventions_Subv1"], json!(1000));
}
