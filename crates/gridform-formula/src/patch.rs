//! Reference patching
//!
//! Rewrites the references inside parsed formulas when the document around
//! them changes: rows or columns inserted or deleted, sheets renamed or
//! removed, or R1C1 offsets resolved against an anchor cell.
//!
//! Tree-level functions mutate a [`Unit`] in place and report whether
//! anything changed. [`ReferencePatcher`] wraps them for formula text and
//! for whole documents through [`FormulaStore`].

use std::borrow::Cow;

use gridform_core::{sheet_names_eq, CellAddress, MAX_COLS, MAX_ROWS};

use crate::ast::{Address, Range, Unit, UnitKind, INVALID, UNBOUNDED};
use crate::options::{ParserOptions, RenderOptions};
use crate::parser::Parser;
use crate::render::render;
use crate::walk::{substitute, walk_mut};

/// Which axis a structural edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

/// Insertion or deletion of whole rows or columns on one sheet
///
/// `count` is positive for insertions and negative for deletions. A deletion
/// removes the `-count` rows (or columns) starting at `before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralEdit {
    pub sheet: String,
    pub axis: Axis,
    /// 0-based index of the first row/column affected
    pub before: i64,
    pub count: i64,
}

impl StructuralEdit {
    pub fn insert_rows(sheet: impl Into<String>, before: u32, count: u32) -> Self {
        Self::new(sheet, Axis::Rows, before.into(), i64::from(count))
    }

    pub fn delete_rows(sheet: impl Into<String>, before: u32, count: u32) -> Self {
        Self::new(sheet, Axis::Rows, before.into(), -i64::from(count))
    }

    pub fn insert_columns(sheet: impl Into<String>, before: u16, count: u16) -> Self {
        Self::new(sheet, Axis::Columns, before.into(), i64::from(count))
    }

    pub fn delete_columns(sheet: impl Into<String>, before: u16, count: u16) -> Self {
        Self::new(sheet, Axis::Columns, before.into(), -i64::from(count))
    }

    fn new(sheet: impl Into<String>, axis: Axis, before: i64, count: i64) -> Self {
        Self {
            sheet: sheet.into(),
            axis,
            before,
            count,
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.count < 0
    }

    /// Whether a reference on `sheet` (or unqualified, in a formula living on
    /// `current_sheet`) is affected
    fn applies_to(&self, sheet: Option<&str>, current_sheet: &str) -> bool {
        sheet_names_eq(sheet.unwrap_or(current_sheet), &self.sheet)
    }

    fn limit(&self) -> i64 {
        match self.axis {
            Axis::Rows => i64::from(MAX_ROWS),
            Axis::Columns => i64::from(MAX_COLS),
        }
    }

    fn shift(&self, value: i64) -> Shift {
        if value == UNBOUNDED || value == INVALID || value < self.before {
            return Shift::Unchanged;
        }
        if self.count < 0 && value + self.count < self.before {
            return Shift::Deleted;
        }
        let moved = value + self.count;
        if moved >= self.limit() {
            // Pushed off the end of the sheet
            return Shift::Deleted;
        }
        Shift::Moved(moved)
    }
}

enum Shift {
    Unchanged,
    Moved(i64),
    Deleted,
}

fn coordinate(address: &Address, axis: Axis) -> (i64, bool) {
    match axis {
        Axis::Rows => (address.row, address.offset_row),
        Axis::Columns => (address.column, address.offset_column),
    }
}

fn set_coordinate(address: &mut Address, axis: Axis, value: i64) {
    match axis {
        Axis::Rows => address.row = value,
        Axis::Columns => address.column = value,
    }
}

fn shift_address(address: &mut Address, current_sheet: &str, edit: &StructuralEdit) -> bool {
    if address.is_invalid() || !edit.applies_to(address.sheet.as_deref(), current_sheet) {
        return false;
    }
    let (value, offset) = coordinate(address, edit.axis);
    if offset {
        return false;
    }
    match edit.shift(value) {
        Shift::Unchanged => false,
        Shift::Moved(value) => {
            set_coordinate(address, edit.axis, value);
            true
        }
        Shift::Deleted => {
            address.invalidate();
            true
        }
    }
}

fn shift_range(range: &mut Range, current_sheet: &str, edit: &StructuralEdit) -> bool {
    if range.is_invalid() || !edit.applies_to(range.start.sheet.as_deref(), current_sheet) {
        return false;
    }
    let (start, start_offset) = coordinate(&range.start, edit.axis);
    let (end, end_offset) = coordinate(&range.end, edit.axis);
    if start_offset || end_offset {
        return false;
    }

    let (low, high) = (start.min(end), start.max(end));
    let new_low = match edit.shift(low) {
        Shift::Unchanged => low,
        Shift::Moved(value) => value,
        // First surviving row after the deleted block lands on `before`
        Shift::Deleted if edit.is_deletion() => edit.before,
        Shift::Deleted => INVALID,
    };
    let new_high = match edit.shift(high) {
        Shift::Unchanged => high,
        Shift::Moved(value) => value,
        Shift::Deleted if edit.is_deletion() => edit.before - 1,
        Shift::Deleted => edit.limit() - 1,
    };

    if new_low == INVALID || new_high < new_low {
        range.start.invalidate();
        range.end.invalidate();
        return true;
    }
    if new_low == low && new_high == high {
        return false;
    }

    if start <= end {
        set_coordinate(&mut range.start, edit.axis, new_low);
        set_coordinate(&mut range.end, edit.axis, new_high);
    } else {
        set_coordinate(&mut range.start, edit.axis, new_high);
        set_coordinate(&mut range.end, edit.axis, new_low);
    }
    true
}

/// Adjust every reference in `root` for a row/column insertion or deletion
///
/// Absolute references move too; only R1C1 offsets, which are relative to
/// the formula's own cell, are left alone. References into a deleted block
/// become `#REF!`; ranges that lose only part of their extent shrink.
pub fn shift_references(root: &mut Unit, current_sheet: &str, edit: &StructuralEdit) -> bool {
    let mut changed = false;
    walk_mut(root, |unit| {
        match &mut unit.kind {
            UnitKind::Address(address) => changed |= shift_address(address, current_sheet, edit),
            UnitKind::Range(range) => changed |= shift_range(range, current_sheet, edit),
            _ => {}
        }
        true
    });
    changed
}

/// Point references at `old` (compared case-insensitively) to `new`
///
/// Only explicitly qualified references change.
pub fn rename_sheet(root: &mut Unit, old: &str, new: &str) -> bool {
    let mut changed = false;
    let mut rename = |address: &mut Address| {
        if address
            .sheet
            .as_deref()
            .map_or(false, |sheet| sheet_names_eq(sheet, old))
        {
            address.sheet = Some(new.to_string());
            changed = true;
        }
    };
    walk_mut(root, |unit| {
        match &mut unit.kind {
            UnitKind::Address(address) => rename(address),
            UnitKind::Range(range) => {
                rename(&mut range.start);
                rename(&mut range.end);
            }
            _ => {}
        }
        true
    });
    changed
}

/// Turn every reference to sheet `name` into `#REF!`
pub fn invalidate_sheet(root: &mut Unit, name: &str) -> bool {
    let on_sheet = |address: &Address| {
        address
            .sheet
            .as_deref()
            .map_or(false, |sheet| sheet_names_eq(sheet, name))
    };
    let mut changed = false;
    walk_mut(root, |unit| {
        match &mut unit.kind {
            UnitKind::Address(address) if on_sheet(address) && !address.is_invalid() => {
                address.invalidate();
                changed = true;
            }
            UnitKind::Range(range)
                if (on_sheet(&range.start) || on_sheet(&range.end)) && !range.is_invalid() =>
            {
                range.start.invalidate();
                range.end.invalidate();
                changed = true;
            }
            _ => {}
        }
        true
    });
    changed
}

fn resolve_address(address: &mut Address, anchor: CellAddress) -> bool {
    if !(address.offset_row || address.offset_column) || address.is_invalid() {
        return false;
    }
    let row = if address.offset_row {
        address.row.checked_add(i64::from(anchor.row))
    } else {
        Some(address.row)
    };
    let column = if address.offset_column {
        address.column.checked_add(i64::from(anchor.col))
    } else {
        Some(address.column)
    };
    address.offset_row = false;
    address.offset_column = false;

    let in_sheet = |value: Option<i64>, limit: i64| {
        value.filter(|&v| v == UNBOUNDED || (0..limit).contains(&v))
    };
    match (
        in_sheet(row, MAX_ROWS.into()),
        in_sheet(column, MAX_COLS.into()),
    ) {
        (Some(row), Some(column)) => {
            address.row = row;
            address.column = column;
        }
        _ => address.invalidate(),
    }
    true
}

/// Replace R1C1 offsets with coordinates relative to `anchor`
///
/// Offsets that land outside the sheet become `#REF!`.
pub fn resolve_relative(root: &mut Unit, anchor: CellAddress) -> bool {
    let mut changed = false;
    walk_mut(root, |unit| {
        match &mut unit.kind {
            UnitKind::Address(address) => changed |= resolve_address(address, anchor),
            UnitKind::Range(range) => {
                changed |= resolve_address(&mut range.start, anchor);
                changed |= resolve_address(&mut range.end, anchor);
            }
            _ => {}
        }
        true
    });
    changed
}

/// Fill in `sheet_id` on every address, leaving the input untouched
///
/// `lookup` receives the address's sheet name, `None` for unqualified
/// references.
pub fn assign_sheet_ids<'a, F>(root: &'a Unit, mut lookup: F) -> Cow<'a, Unit>
where
    F: FnMut(Option<&str>) -> Option<usize>,
{
    substitute(root, |unit| {
        let mut updated = unit.clone();
        let changed = match &mut updated.kind {
            UnitKind::Address(address) => set_sheet_id(address, &mut lookup),
            UnitKind::Range(range) => {
                let start = set_sheet_id(&mut range.start, &mut lookup);
                let end = set_sheet_id(&mut range.end, &mut lookup);
                start || end
            }
            _ => false,
        };
        changed.then_some(updated)
    })
}

fn set_sheet_id<F>(address: &mut Address, lookup: &mut F) -> bool
where
    F: FnMut(Option<&str>) -> Option<usize>,
{
    let id = lookup(address.sheet.as_deref());
    if id == address.sheet_id {
        return false;
    }
    address.sheet_id = id;
    true
}

/// A document that holds formulas, visited one formula at a time
pub trait FormulaStore {
    /// Call `visitor` with the host sheet name and the formula text of every
    /// formula-bearing cell
    fn visit_formulas(&mut self, visitor: &mut dyn FnMut(&str, &mut String));
}

/// A formula and the sheet it lives on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaCell {
    pub sheet: String,
    pub formula: String,
}

impl FormulaCell {
    pub fn new(sheet: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            formula: formula.into(),
        }
    }
}

impl FormulaStore for [FormulaCell] {
    fn visit_formulas(&mut self, visitor: &mut dyn FnMut(&str, &mut String)) {
        for cell in self.iter_mut() {
            visitor(&cell.sheet, &mut cell.formula);
        }
    }
}

impl FormulaStore for Vec<FormulaCell> {
    fn visit_formulas(&mut self, visitor: &mut dyn FnMut(&str, &mut String)) {
        self.as_mut_slice().visit_formulas(visitor);
    }
}

/// Formula-text front end to the tree-level patching functions
///
/// Each `*_formula` method returns the rewritten text, or `None` when the
/// formula was unchanged or could not be parsed. A leading `=` is kept.
#[derive(Debug, Clone, Default)]
pub struct ReferencePatcher {
    parser: Parser,
}

impl ReferencePatcher {
    pub fn new(parser: Parser) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn shift_formula(
        &self,
        formula: &str,
        current_sheet: &str,
        edit: &StructuralEdit,
    ) -> Option<String> {
        self.rewrite(&self.parser, formula, |root| {
            shift_references(root, current_sheet, edit)
        })
    }

    pub fn rename_sheet_in_formula(&self, formula: &str, old: &str, new: &str) -> Option<String> {
        self.rewrite(&self.parser, formula, |root| rename_sheet(root, old, new))
    }

    pub fn invalidate_sheet_in_formula(&self, formula: &str, sheet: &str) -> Option<String> {
        self.rewrite(&self.parser, formula, |root| invalidate_sheet(root, sheet))
    }

    /// Parse `formula` as R1C1 and write it back in A1 form relative to `anchor`
    pub fn resolve_r1c1_formula(&self, formula: &str, anchor: CellAddress) -> Option<String> {
        let options: ParserOptions = self.parser.options().clone().with_r1c1(true);
        let parser = Parser::new(options);
        let mut resolved = false;
        let text = self.rewrite(&parser, formula, |root| {
            resolved = resolve_relative(root, anchor);
            true
        })?;
        // Absolute R1C1 references still change spelling in A1 form
        (resolved || text != formula.trim()).then_some(text)
    }

    /// Apply a structural edit to every formula in `store`; returns how many
    /// formulas changed
    pub fn shift_document<S>(&self, store: &mut S, edit: &StructuralEdit) -> usize
    where
        S: FormulaStore + ?Sized,
    {
        log::debug!(
            "shifting {:?} on '{}' by {} at {}",
            edit.axis,
            edit.sheet,
            edit.count,
            edit.before
        );
        rewrite_document(store, |sheet, formula| {
            self.shift_formula(formula, sheet, edit)
        })
    }

    pub fn rename_sheet_in_document<S>(&self, store: &mut S, old: &str, new: &str) -> usize
    where
        S: FormulaStore + ?Sized,
    {
        log::debug!("renaming sheet '{old}' to '{new}'");
        rewrite_document(store, |_, formula| {
            self.rename_sheet_in_formula(formula, old, new)
        })
    }

    pub fn invalidate_sheet_in_document<S>(&self, store: &mut S, sheet: &str) -> usize
    where
        S: FormulaStore + ?Sized,
    {
        log::debug!("invalidating references to sheet '{sheet}'");
        rewrite_document(store, |_, formula| {
            self.invalidate_sheet_in_formula(formula, sheet)
        })
    }

    fn rewrite<F>(&self, parser: &Parser, formula: &str, patch: F) -> Option<String>
    where
        F: FnOnce(&mut Unit) -> bool,
    {
        let result = parser.parse(formula);
        if let Some(error) = &result.error {
            log::warn!("skipping unparsable formula {formula:?}: {error}");
            return None;
        }
        let mut root = result.root?;
        if !patch(&mut root) {
            return None;
        }

        let options = RenderOptions::for_locale(self.parser.options().locale.clone());
        let prefix = if formula.trim_start().starts_with('=') { "=" } else { "" };
        let text = format!("{prefix}{}", render(&root, &options));
        log::debug!("rewrote {formula:?} as {text:?}");
        Some(text)
    }
}

fn rewrite_document<S, F>(store: &mut S, mut rewrite: F) -> usize
where
    S: FormulaStore + ?Sized,
    F: FnMut(&str, &str) -> Option<String>,
{
    let mut changed = 0;
    store.visit_formulas(&mut |sheet, formula| {
        if let Some(text) = rewrite(sheet, formula.as_str()) {
            *formula = text;
            changed += 1;
        }
    });
    changed
}
