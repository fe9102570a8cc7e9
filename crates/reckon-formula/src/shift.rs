//! Reference adjustment for row/column insertion, deletion, and copy
//!
//! Two modes with different contracts:
//!
//! * [`ShiftMode::Copy`] models copying a formula to another cell:
//!   only relative components move, and only when they fall inside the
//!   shifted window. A component pushed outside the document becomes a
//!   dead reference.
//! * [`ShiftMode::Move`] models structural edits (inserting or
//!   deleting rows/columns): every component at or past the window
//!   start moves, absolute ones included, because the cells themselves
//!   moved.
//!
//! Dead references are replaced by [`Token::RefErr`], which evaluates
//! to `#REF!` and renders as its literal.

use crate::token::{AreaRef, CellRef, FormulaKind, ParsedFormula, Token};
use reckon_core::{CellAddress, CellRange, MAX_COLS, MAX_ROWS};

/// Which coordinate the shift applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Col,
}

/// What kind of edit the shift models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftMode {
    /// Formula copied to a different cell; window is the source extent
    Copy,
    /// Rows/columns physically moved; window start is the edit point
    Move,
}

/// Everything one shift needs to know
#[derive(Debug, Clone, Copy)]
pub struct Shift {
    pub mode: ShiftMode,
    pub axis: Axis,
    /// Sheet on which rows/columns were edited (or the copy happened)
    pub edited_sheet: u32,
    /// First affected row/column index
    pub first: u32,
    /// Last affected row/column index; ignored in [`ShiftMode::Move`]
    pub last: u32,
    /// Signed displacement in rows or columns
    pub delta: i64,
}

/// Rewrite every reference in a formula for a shift
///
/// `formula_sheet` is the sheet the formula lives on; unqualified
/// references resolve there and only participate when it matches the
/// edited sheet. External and structured references never shift.
pub fn shift(formula: &ParsedFormula, formula_sheet: u32, shift: &Shift) -> ParsedFormula {
    let tokens = formula
        .tokens
        .iter()
        .map(|token| shift_token(token, formula_sheet, shift))
        .collect();
    match formula.kind {
        FormulaKind::Cell => ParsedFormula::new(tokens),
        FormulaKind::Array { rows, cols } => ParsedFormula::array(tokens, rows, cols),
    }
}

fn shift_token(token: &Token, formula_sheet: u32, shift: &Shift) -> Token {
    match token {
        Token::Ref(r) => {
            let sheet = r.sheet.unwrap_or(formula_sheet);
            if sheet != shift.edited_sheet {
                return token.clone();
            }
            match shift_address(r.addr, shift) {
                Outcome::Kept(addr) => Token::Ref(CellRef {
                    sheet: r.sheet,
                    addr,
                }),
                Outcome::Dead => Token::RefErr,
            }
        }
        Token::Area(a) => {
            let sheet = a.sheet.unwrap_or(formula_sheet);
            if sheet != shift.edited_sheet {
                return token.clone();
            }
            match shift_range(a.range, shift) {
                Outcome::Kept(range) => Token::Area(AreaRef {
                    sheet: a.sheet,
                    range,
                }),
                Outcome::Dead => Token::RefErr,
            }
        }
        // Multi-sheet references only shift when they span exactly the
        // edited sheet
        Token::Ref3d {
            first_sheet,
            last_sheet,
            addr,
        } => {
            if first_sheet != last_sheet || *first_sheet != shift.edited_sheet {
                return token.clone();
            }
            match shift_address(*addr, shift) {
                Outcome::Kept(addr) => Token::Ref3d {
                    first_sheet: *first_sheet,
                    last_sheet: *last_sheet,
                    addr,
                },
                Outcome::Dead => Token::RefErr,
            }
        }
        Token::Area3d {
            first_sheet,
            last_sheet,
            range,
        } => {
            if first_sheet != last_sheet || *first_sheet != shift.edited_sheet {
                return token.clone();
            }
            match shift_range(*range, shift) {
                Outcome::Kept(range) => Token::Area3d {
                    first_sheet: *first_sheet,
                    last_sheet: *last_sheet,
                    range,
                },
                Outcome::Dead => Token::RefErr,
            }
        }
        _ => token.clone(),
    }
}

enum Outcome<T> {
    Kept(T),
    Dead,
}

fn shift_range(range: CellRange, shift: &Shift) -> Outcome<CellRange> {
    // A whole-column span is unaffected by row edits, and vice versa
    if shift.axis == Axis::Row && range.is_whole_columns() {
        return Outcome::Kept(range);
    }
    if shift.axis == Axis::Col && range.is_whole_rows() {
        return Outcome::Kept(range);
    }

    let start = shift_address(range.start, shift);
    let end = shift_address(range.end, shift);
    match (start, end) {
        (Outcome::Kept(start), Outcome::Kept(end)) => {
            Outcome::Kept(CellRange::new(start, end))
        }
        _ => Outcome::Dead,
    }
}

fn shift_address(addr: CellAddress, shift: &Shift) -> Outcome<CellAddress> {
    match shift.axis {
        Axis::Row => {
            match shift_component(addr.row as i64, addr.row_absolute, MAX_ROWS as i64, shift) {
                Outcome::Kept(row) => Outcome::Kept(CellAddress::with_absolute(
                    row as u32,
                    addr.col,
                    addr.row_absolute,
                    addr.col_absolute,
                )),
                Outcome::Dead => Outcome::Dead,
            }
        }
        Axis::Col => {
            match shift_component(addr.col as i64, addr.col_absolute, MAX_COLS as i64, shift) {
                Outcome::Kept(col) => Outcome::Kept(CellAddress::with_absolute(
                    addr.row,
                    col as u16,
                    addr.row_absolute,
                    addr.col_absolute,
                )),
                Outcome::Dead => Outcome::Dead,
            }
        }
    }
}

fn shift_component(index: i64, absolute: bool, limit: i64, shift: &Shift) -> Outcome<i64> {
    let participates = match shift.mode {
        ShiftMode::Copy => {
            !absolute && index >= shift.first as i64 && index <= shift.last as i64
        }
        ShiftMode::Move => index >= shift.first as i64,
    };
    if !participates {
        return Outcome::Kept(index);
    }
    let moved = index + shift.delta;
    if moved < 0 || moved >= limit {
        return Outcome::Dead;
    }
    Outcome::Kept(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::render::render;
    use pretty_assertions::assert_eq;
    use reckon_core::{CellCoord, Workbook};

    fn env() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        wb
    }

    fn apply(text: &str, shift_spec: &Shift) -> String {
        let wb = env();
        let origin = CellCoord::new(0, 0, 0);
        let parsed = parse(text, &wb, origin).unwrap();
        let shifted = shift(&parsed, 0, shift_spec);
        render(&shifted, &wb).unwrap()
    }

    fn rows(mode: ShiftMode, first: u32, last: u32, delta: i64) -> Shift {
        Shift {
            mode,
            axis: Axis::Row,
            edited_sheet: 0,
            first,
            last,
            delta,
        }
    }

    #[test]
    fn test_copy_moves_only_relative_in_window() {
        // Copying a formula from rows 0..=2 down by 2
        let s = rows(ShiftMode::Copy, 0, 2, 2);
        assert_eq!(apply("=A1+A10", &s), "A3+A10");
        assert_eq!(apply("=$A$1+A2", &s), "$A$1+A4");
    }

    #[test]
    fn test_copy_out_of_bounds_is_dead() {
        // Copying up past the first row kills the reference
        let s = rows(ShiftMode::Copy, 0, 0, -1);
        assert_eq!(apply("=A1*2", &s), "#REF!*2");
    }

    #[test]
    fn test_move_shifts_absolute_too() {
        // Inserting two rows above row 1
        let s = rows(ShiftMode::Move, 1, 1, 2);
        assert_eq!(apply("=$A$2+A5", &s), "$A$4+A7");
        // Row 1 itself is before the edit point and stays put
        assert_eq!(apply("=A1", &s), "A1");
    }

    #[test]
    fn test_move_vs_copy_at_window_edge() {
        // Deleting row 1: Move pulls everything at or below it up
        let mv = rows(ShiftMode::Move, 1, 1, -1);
        assert_eq!(apply("=A3", &mv), "A2");
        // Copy with the same window only touches refs inside it
        let cp = rows(ShiftMode::Copy, 1, 1, -1);
        assert_eq!(apply("=A3", &cp), "A3");
        assert_eq!(apply("=A2", &cp), "A1");
    }

    #[test]
    fn test_area_corners_shift_independently() {
        let s = rows(ShiftMode::Copy, 0, 5, 3);
        assert_eq!(apply("=SUM(A1:A3)", &s), "SUM(A4:A6)");
        // Mixed corners re-normalize
        assert_eq!(apply("=SUM(A$1:A3)", &s), "SUM(A$1:A6)");
    }

    #[test]
    fn test_area_with_dead_corner_dies_whole() {
        let s = rows(ShiftMode::Copy, 0, 5, -2);
        assert_eq!(apply("=SUM(A1:A3)", &s), "SUM(#REF!)");
    }

    #[test]
    fn test_whole_columns_ignore_row_shifts() {
        let s = rows(ShiftMode::Move, 0, 0, 5);
        assert_eq!(apply("=SUM(A:A)", &s), "SUM(A:A)");

        let cols = Shift {
            mode: ShiftMode::Move,
            axis: Axis::Col,
            edited_sheet: 0,
            first: 0,
            last: 0,
            delta: 1,
        };
        assert_eq!(apply("=SUM(2:3)", &cols), "SUM(2:3)");
        assert_eq!(apply("=SUM(A:A)", &cols), "SUM(B:B)");
    }

    #[test]
    fn test_other_sheet_untouched() {
        // Formula lives on sheet 0; the edit is on sheet 1
        let s = Shift {
            mode: ShiftMode::Move,
            axis: Axis::Row,
            edited_sheet: 1,
            first: 0,
            last: 0,
            delta: 1,
        };
        assert_eq!(apply("=A1+Data!A1", &s), "A1+Data!A2");
    }

    #[test]
    fn test_external_references_never_shift() {
        let s = rows(ShiftMode::Move, 0, 0, 5);
        assert_eq!(apply("=[2]Prices!A1", &s), "[2]Prices!A1");
    }

    #[test]
    fn test_column_shift() {
        let s = Shift {
            mode: ShiftMode::Copy,
            axis: Axis::Col,
            edited_sheet: 0,
            first: 0,
            last: 10,
            delta: 2,
        };
        assert_eq!(apply("=A1+$B1", &s), "C1+$B1");
    }
}
