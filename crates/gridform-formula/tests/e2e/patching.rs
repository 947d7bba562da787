//! Structural edits applied through the text-level patcher.

use gridform_core::CellAddress;
use gridform_formula::{
    shift_references, walk, FormulaCell, FormulaStore, ReferencePatcher, StructuralEdit, UnitKind,
};
use pretty_assertions::assert_eq;

use crate::{r1c1_parser, tree};

fn shift(formula: &str, sheet: &str, edit: &StructuralEdit) -> Option<String> {
    ReferencePatcher::default().shift_formula(formula, sheet, edit)
}

#[test]
fn test_inserted_rows_push_references_down() {
    let edit = StructuralEdit::insert_rows("Sheet1", 5, 2);
    assert_eq!(shift("=A10", "Sheet1", &edit).as_deref(), Some("=A12"));
    // Row index 4 sits above the insertion point
    assert_eq!(shift("=A5", "Sheet1", &edit), None);
}

#[test]
fn test_deleted_rows_become_ref_errors() {
    let edit = StructuralEdit::delete_rows("Sheet1", 5, 3);
    assert_eq!(shift("=A7*2", "Sheet1", &edit).as_deref(), Some("=#REF! * 2"));
    assert_eq!(shift("=A9", "Sheet1", &edit).as_deref(), Some("=A6"));
    assert_eq!(shift("=A5", "Sheet1", &edit), None);
}

#[test]
fn test_edits_only_touch_their_sheet() {
    let edit = StructuralEdit::insert_rows("Sheet1", 0, 1);
    assert_eq!(shift("=A1", "Sheet2", &edit), None);
    assert_eq!(
        shift("=A1 + Sheet1!A1", "Sheet2", &edit).as_deref(),
        Some("=A1 + Sheet1!A2")
    );
    assert_eq!(
        shift("='sheet1'!B2:C3", "Other", &edit).as_deref(),
        Some("=sheet1!B3:C4")
    );
}

#[test]
fn test_inserting_past_the_sheet_end() {
    let edit = StructuralEdit::insert_rows("Sheet1", 1_048_570, 10);
    assert_eq!(
        shift("=A1048575", "Sheet1", &edit).as_deref(),
        Some("=#REF!")
    );
    assert_eq!(
        shift("=SUM(A1:A1048576)", "Sheet1", &edit),
        None,
        "the range already reaches the last row"
    );
}

#[test]
fn test_column_edits() {
    let edit = StructuralEdit::insert_columns("Sheet1", 2, 3);
    assert_eq!(
        shift("=SUM(A1:D1) + $C$5", "Sheet1", &edit).as_deref(),
        Some("=SUM(A1:G1) + $F$5")
    );

    let edit = StructuralEdit::delete_columns("Sheet1", 1, 2);
    assert_eq!(
        shift("=SUM(A1:D1) + B1", "Sheet1", &edit).as_deref(),
        Some("=SUM(A1:B1) + #REF!")
    );
}

#[test]
fn test_sheet_rename() {
    let patcher = ReferencePatcher::default();
    assert_eq!(
        patcher
            .rename_sheet_in_formula("=Sheet1!A1", "Sheet1", "Data")
            .as_deref(),
        Some("=Data!A1")
    );
    assert_eq!(patcher.rename_sheet_in_formula("=A1", "Sheet1", "Data"), None);
    assert_eq!(
        patcher
            .rename_sheet_in_formula("=SUM(Sheet1!A1:B2)", "Sheet1", "Year 2024")
            .as_deref(),
        Some("=SUM('Year 2024'!A1:B2)")
    );
}

#[test]
fn test_sheet_deletion() {
    let patcher = ReferencePatcher::default();
    assert_eq!(
        patcher
            .invalidate_sheet_in_formula("=Gone!A1 + Kept!A1 + A1", "gone")
            .as_deref(),
        Some("=#REF! + Kept!A1 + A1")
    );
}

#[test]
fn test_r1c1_anchor_resolution() {
    let patcher = ReferencePatcher::default();
    // Anchored at C5
    let anchor = CellAddress::new(4, 2);
    assert_eq!(
        patcher.resolve_r1c1_formula("=R[-1]C[-1] * R1C1", anchor).as_deref(),
        Some("=B4 * $A$1")
    );
    assert_eq!(
        patcher.resolve_r1c1_formula("=R[-5]C", anchor).as_deref(),
        Some("=#REF!")
    );
}

#[test]
fn test_unparsable_formulas_are_left_alone() {
    let edit = StructuralEdit::insert_rows("Sheet1", 0, 1);
    assert_eq!(shift("=SUM(A1", "Sheet1", &edit), None);
    assert_eq!(shift("=1 +", "Sheet1", &edit), None);
}

#[test]
fn test_document_rewrite() {
    let patcher = ReferencePatcher::default();
    let mut cells = vec![
        FormulaCell::new("Sheet1", "=SUM(A1:A3)"),
        FormulaCell::new("Sheet2", "=Sheet1!A2 * 2"),
        FormulaCell::new("Sheet2", "=A2"),
    ];

    let edit = StructuralEdit::delete_rows("Sheet1", 0, 1);
    assert_eq!(patcher.shift_document(&mut cells, &edit), 2);
    assert_eq!(
        cells,
        [
            FormulaCell::new("Sheet1", "=SUM(A1:A2)"),
            FormulaCell::new("Sheet2", "=Sheet1!A1 * 2"),
            FormulaCell::new("Sheet2", "=A2"),
        ]
    );
}

/// A store that keeps formulas keyed by sheet, as a workbook would
struct Workbook {
    sheets: Vec<(String, Vec<String>)>,
}

impl FormulaStore for Workbook {
    fn visit_formulas(&mut self, visitor: &mut dyn FnMut(&str, &mut String)) {
        for (name, formulas) in &mut self.sheets {
            for formula in formulas {
                visitor(name, formula);
            }
        }
    }
}

#[test]
fn test_custom_store() {
    let mut workbook = Workbook {
        sheets: vec![
            ("Inputs".to_string(), vec!["=B1".to_string()]),
            (
                "Report".to_string(),
                vec!["=Inputs!B1".to_string(), "=B1".to_string()],
            ),
        ],
    };
    let patcher = ReferencePatcher::default();

    assert_eq!(
        patcher.rename_sheet_in_document(&mut workbook, "Inputs", "Assumptions"),
        1
    );
    assert_eq!(workbook.sheets[1].1[0], "=Assumptions!B1");

    let edit = StructuralEdit::insert_columns("Assumptions", 0, 1);
    assert_eq!(patcher.shift_document(&mut workbook, &edit), 1);
    assert_eq!(workbook.sheets[1].1, ["=Assumptions!C1", "=B1"]);
    // The sheet's own formulas are stored under the old name
    assert_eq!(workbook.sheets[0].1, ["=B1"]);
}

#[test]
fn test_tree_level_shift_reports_changes() {
    let mut root = tree("SUM(A1:A2) + C3");
    let edit = StructuralEdit::insert_rows("Sheet1", 10, 1);
    assert!(!shift_references(&mut root, "Sheet1", &edit));

    let edit = StructuralEdit::insert_rows("Sheet1", 1, 1);
    assert!(shift_references(&mut root, "Sheet1", &edit));
    assert_eq!(root.to_string(), "SUM(A1:A3) + C4");
}

#[test]
fn test_offsets_are_not_shifted() {
    let mut root = r1c1_parser().parse("=R[1]C + R2C2").root.unwrap();
    let edit = StructuralEdit::insert_rows("Sheet1", 0, 1);
    assert!(shift_references(&mut root, "Sheet1", &edit));

    let mut rows = Vec::new();
    walk(&root, |unit| {
        if let UnitKind::Address(address) = &unit.kind {
            rows.push((address.row, address.offset_row));
        }
        true
    });
    assert_eq!(rows, [(1, true), (2, false)]);
}
