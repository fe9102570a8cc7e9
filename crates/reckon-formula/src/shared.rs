//! Shared formula materialization
//!
//! File formats often store one formula for a rectangular group of
//! cells, anchored at the group's top-left cell. Every other cell in
//! the group reuses the same token program with its relative reference
//! components displaced by the cell's offset from the anchor. This
//! module expands that storage form into the per-cell program.

use crate::token::{AreaRef, CellRef, ParsedFormula, Token};
use reckon_core::{CellAddress, CellRange, MAX_COLS, MAX_ROWS};

/// One stored formula standing in for a whole group of cells
#[derive(Debug, Clone)]
pub struct SharedFormulaTemplate {
    /// The program as stored at the anchor cell
    pub template: ParsedFormula,
    /// Top-left cell of the shared group
    pub anchor: CellAddress,
    /// Extent of the group; `materialize` targets must fall inside
    pub extent: CellRange,
}

impl SharedFormulaTemplate {
    pub fn new(template: ParsedFormula, anchor: CellAddress, extent: CellRange) -> Self {
        Self {
            template,
            anchor,
            extent,
        }
    }

    /// Whether a cell belongs to this group
    pub fn covers(&self, row: u32, col: u16) -> bool {
        self.extent.contains(row, col)
    }

    /// The concrete program for one member cell of the group
    ///
    /// Relative reference components are displaced by the target's
    /// offset from the anchor; absolute components are untouched. A
    /// component displaced outside the document becomes a dead
    /// reference, same as copying the formula there would.
    pub fn materialize(&self, target: CellAddress) -> ParsedFormula {
        let row_delta = target.row as i64 - self.anchor.row as i64;
        let col_delta = target.col as i64 - self.anchor.col as i64;
        if row_delta == 0 && col_delta == 0 {
            return self.template.clone();
        }

        let tokens = self
            .template
            .tokens
            .iter()
            .map(|token| displace_token(token, row_delta, col_delta))
            .collect();
        ParsedFormula::new(tokens)
    }
}

fn displace_token(token: &Token, row_delta: i64, col_delta: i64) -> Token {
    match token {
        Token::Ref(r) => match displace_address(r.addr, row_delta, col_delta) {
            Some(addr) => Token::Ref(CellRef {
                sheet: r.sheet,
                addr,
            }),
            None => Token::RefErr,
        },
        Token::Area(a) => match displace_range(a.range, row_delta, col_delta) {
            Some(range) => Token::Area(AreaRef {
                sheet: a.sheet,
                range,
            }),
            None => Token::RefErr,
        },
        Token::Ref3d {
            first_sheet,
            last_sheet,
            addr,
        } => match displace_address(*addr, row_delta, col_delta) {
            Some(addr) => Token::Ref3d {
                first_sheet: *first_sheet,
                last_sheet: *last_sheet,
                addr,
            },
            None => Token::RefErr,
        },
        Token::Area3d {
            first_sheet,
            last_sheet,
            range,
        } => match displace_range(*range, row_delta, col_delta) {
            Some(range) => Token::Area3d {
                first_sheet: *first_sheet,
                last_sheet: *last_sheet,
                range,
            },
            None => Token::RefErr,
        },
        _ => token.clone(),
    }
}

fn displace_range(range: CellRange, row_delta: i64, col_delta: i64) -> Option<CellRange> {
    // Whole-column spans keep their full height, whole-row spans their
    // full width; only the bounded coordinate moves
    let (row_delta, col_delta) = if range.is_whole_columns() {
        (0, col_delta)
    } else if range.is_whole_rows() {
        (row_delta, 0)
    } else {
        (row_delta, col_delta)
    };

    let start = displace_address(range.start, row_delta, col_delta)?;
    let end = displace_address(range.end, row_delta, col_delta)?;
    Some(CellRange::new(start, end))
}

fn displace_address(addr: CellAddress, row_delta: i64, col_delta: i64) -> Option<CellAddress> {
    let row = if addr.row_absolute {
        addr.row as i64
    } else {
        addr.row as i64 + row_delta
    };
    let col = if addr.col_absolute {
        addr.col as i64
    } else {
        addr.col as i64 + col_delta
    };

    if row < 0 || row >= MAX_ROWS as i64 || col < 0 || col >= MAX_COLS as i64 {
        return None;
    }
    Some(CellAddress::with_absolute(
        row as u32,
        col as u16,
        addr.row_absolute,
        addr.col_absolute,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::render::render;
    use pretty_assertions::assert_eq;
    use reckon_core::{CellCoord, Workbook};

    fn template(text: &str) -> SharedFormulaTemplate {
        let wb = Workbook::new();
        let parsed = parse(text, &wb, CellCoord::new(0, 1, 1)).unwrap();
        SharedFormulaTemplate::new(
            parsed,
            CellAddress::new(1, 1),
            CellRange::parse("B2:B10").unwrap(),
        )
    }

    fn materialized(text: &str, row: u32, col: u16) -> String {
        let wb = Workbook::new();
        let program = template(text).materialize(CellAddress::new(row, col));
        render(&program, &wb).unwrap()
    }

    #[test]
    fn test_anchor_is_identity() {
        assert_eq!(materialized("=A2*$D$1", 1, 1), "A2*$D$1");
    }

    #[test]
    fn test_relative_components_follow_target() {
        assert_eq!(materialized("=A2*$D$1", 3, 1), "A4*$D$1");
        assert_eq!(materialized("=A2*$D$1", 9, 1), "A10*$D$1");
    }

    #[test]
    fn test_mixed_absolute_components() {
        // $A2: column pinned, row follows
        assert_eq!(materialized("=$A2+B$1", 4, 1), "$A5+B$1");
    }

    #[test]
    fn test_areas_displace_as_a_block() {
        assert_eq!(materialized("=SUM(A1:A3)", 3, 1), "SUM(A3:A5)");
    }

    #[test]
    fn test_out_of_bounds_is_dead() {
        let wb = Workbook::new();
        let parsed = parse("=A1", &wb, CellCoord::new(0, 5, 0)).unwrap();
        let shared = SharedFormulaTemplate::new(
            parsed,
            CellAddress::new(5, 0),
            CellRange::parse("A6:A7").unwrap(),
        );
        // Materializing above the anchor is not possible for a real
        // group, but a template whose reference walks off the sheet
        // still degrades reference-by-reference
        let program = shared.materialize(CellAddress::new(4, 0));
        assert_eq!(render(&program, &wb).unwrap(), "#REF!");
    }

    #[test]
    fn test_covers() {
        let shared = template("=A2");
        assert!(shared.covers(1, 1));
        assert!(shared.covers(9, 1));
        assert!(!shared.covers(10, 1));
        assert!(!shared.covers(1, 2));
    }

    #[test]
    fn test_matches_copy_semantics() {
        // A materialized member equals the anchor formula copy-shifted
        // to the member cell
        use crate::shift::{Axis, Shift, ShiftMode};
        use reckon_core::MAX_ROWS;

        let wb = Workbook::new();
        let anchor_program = parse("=A2*$D$1+SUM(B1:B2)", &wb, CellCoord::new(0, 1, 1)).unwrap();
        let shared = SharedFormulaTemplate::new(
            anchor_program.clone(),
            CellAddress::new(1, 1),
            CellRange::parse("B2:B10").unwrap(),
        );

        let via_shared = shared.materialize(CellAddress::new(4, 1));
        let via_copy = crate::shift::shift(
            &anchor_program,
            0,
            &Shift {
                mode: ShiftMode::Copy,
                axis: Axis::Row,
                edited_sheet: 0,
                first: 0,
                last: MAX_ROWS - 1,
                delta: 3,
            },
        );
        assert_eq!(via_shared.tokens, via_copy.tokens);
    }
}
