//! End-to-end evaluation against a workbook

use std::cell::RefCell;
use std::collections::HashMap;

use pretty_assertions::assert_eq;
use reckon_core::{
    CellAddress, CellContent, CellCoord, CellError, CellRange, DocumentView, NamedRange, Table,
    Workbook,
};
use reckon_formula::{parse_array, Engine, Value};

fn origin() -> CellCoord {
    CellCoord::new(0, 0, 0)
}

/// Wraps a workbook and counts every cell read the engine makes.
struct CountingView<'a> {
    inner: &'a Workbook,
    reads: RefCell<HashMap<(u32, u32, u16), u32>>,
}

impl<'a> CountingView<'a> {
    fn new(inner: &'a Workbook) -> Self {
        Self {
            inner,
            reads: RefCell::new(HashMap::new()),
        }
    }

    fn reads_of(&self, address: &str) -> u32 {
        let addr = CellAddress::parse(address).unwrap();
        self.reads
            .borrow()
            .get(&(0, addr.row, addr.col))
            .copied()
            .unwrap_or(0)
    }

    fn total_reads(&self) -> u32 {
        self.reads.borrow().values().sum()
    }
}

impl DocumentView for CountingView<'_> {
    fn sheet_count(&self) -> u32 {
        self.inner.sheet_count()
    }

    fn cell_content(&self, sheet: u32, row: u32, col: u16) -> CellContent {
        *self
            .reads
            .borrow_mut()
            .entry((sheet, row, col))
            .or_insert(0) += 1;
        self.inner.cell_content(sheet, row, col)
    }

    fn used_extent(&self, sheet: u32) -> (u32, u16) {
        self.inner.used_extent(sheet)
    }
}

#[test]
fn test_evaluate_simple_formulas() {
    let wb = Workbook::new();
    let engine = Engine::new(&wb, &wb);

    // Arithmetic
    let result = engine.evaluate("=1+2*3", origin()).unwrap();
    assert_eq!(result, Value::Number(7.0));

    // String concatenation
    let result = engine.evaluate("=\"Hello \"&\"World\"", origin()).unwrap();
    assert_eq!(result, Value::Text("Hello World".into()));

    // Comparison
    let result = engine.evaluate("=5>3", origin()).unwrap();
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn test_sum_over_range() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("A1", 10.0).unwrap();
    sheet.set_content("A2", 20.0).unwrap();
    sheet.set_content("A3", 30.0).unwrap();

    let engine = Engine::new(&wb, &wb);
    let result = engine.evaluate("=SUM(A1:A3)", CellCoord::new(0, 0, 2)).unwrap();
    assert_eq!(result, Value::Number(60.0));
}

#[test]
fn test_if_short_circuit_skips_untaken_branch() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("B1", true).unwrap();
    sheet.set_content("C1", 10.0).unwrap();
    // The untaken branch holds an error that must never surface
    sheet.set_content_at(0, 3, CellContent::Error(CellError::Div0));
    sheet.set_formula("A1", "=IF(B1,C1,D1)").unwrap();

    let view = CountingView::new(&wb);
    let engine = Engine::new(&view, &wb);

    let result = engine.evaluate_cell(origin()).unwrap();
    assert_eq!(result, Value::Number(10.0));
    assert_eq!(view.reads_of("D1"), 0);
    assert!(view.reads_of("C1") > 0);
}

#[test]
fn test_iferror_fallback_left_untouched() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("B1", 42.0).unwrap();
    sheet.set_content("C1", -1.0).unwrap();
    sheet.set_formula("A1", "=IFERROR(B1,C1)").unwrap();

    let view = CountingView::new(&wb);
    let engine = Engine::new(&view, &wb);

    let result = engine.evaluate_cell(origin()).unwrap();
    assert_eq!(result, Value::Number(42.0));
    assert_eq!(view.reads_of("C1"), 0);
}

#[test]
fn test_self_reference_is_circular() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_formula("A1", "=A1+1").unwrap();

    let engine = Engine::new(&wb, &wb);
    let result = engine.evaluate_cell(origin()).unwrap();
    assert_eq!(result, Value::Error(CellError::Circular));
}

#[test]
fn test_three_d_sum() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_name("Jan").unwrap();
    let feb = wb.add_worksheet_with_name("Feb").unwrap();
    let mar = wb.add_worksheet_with_name("Mar").unwrap();
    wb.worksheet_mut(0).unwrap().set_content("B2", 1.0).unwrap();
    wb.worksheet_mut(feb).unwrap().set_content("B2", 2.0).unwrap();
    wb.worksheet_mut(mar).unwrap().set_content("B2", 4.0).unwrap();

    let engine = Engine::new(&wb, &wb);
    let result = engine.evaluate("=SUM(Jan:Mar!B2)", origin()).unwrap();
    assert_eq!(result, Value::Number(7.0));
}

#[test]
fn test_defined_name_in_aggregate() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("A1", 3.0).unwrap();
    sheet.set_content("A2", 4.0).unwrap();
    wb.define_name(NamedRange::workbook_scope("Data", "Sheet1!A1:A2"))
        .unwrap();

    let engine = Engine::new(&wb, &wb);
    let result = engine.evaluate("=SUM(Data)", CellCoord::new(0, 5, 5)).unwrap();
    assert_eq!(result, Value::Number(7.0));
}

#[test]
fn test_structured_references() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("A1", "Qty").unwrap();
    sheet.set_content("B1", "Price").unwrap();
    sheet.set_content("A2", 2.0).unwrap();
    sheet.set_content("B2", 5.0).unwrap();
    sheet.set_content("A3", 3.0).unwrap();
    sheet.set_content("B3", 7.0).unwrap();
    wb.add_table(Table::new(
        "Tbl",
        0,
        CellRange::parse("A1:B3").unwrap(),
        vec!["Qty".into(), "Price".into()],
    ))
    .unwrap();

    let engine = Engine::new(&wb, &wb);

    let result = engine.evaluate("=SUM(Tbl[Qty])", CellCoord::new(0, 5, 0)).unwrap();
    assert_eq!(result, Value::Number(5.0));

    // No totals rows configured, so the totals region has no cells
    let result = engine.evaluate("=Tbl[#Totals]", CellCoord::new(0, 5, 0)).unwrap();
    assert_eq!(result, Value::Error(CellError::Ref));
}

#[test]
fn test_cache_serves_clean_recomputes_dirty() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("A1", 5.0).unwrap();
    sheet.set_formula("B1", "=A1*2").unwrap();
    sheet.set_formula("C1", "=B1+1").unwrap();

    let view = CountingView::new(&wb);
    let engine = Engine::new(&view, &wb);

    let c1 = CellCoord::new(0, 0, 2);
    assert_eq!(engine.evaluate_cell(c1).unwrap(), Value::Number(11.0));
    let a1_after_first = view.reads_of("A1");
    let after_first = view.total_reads();

    // A second evaluation is answered entirely from the cache
    assert_eq!(engine.evaluate_cell(c1).unwrap(), Value::Number(11.0));
    assert_eq!(view.total_reads(), after_first);

    // Invalidation reaches transitive dependents, and recomputation
    // re-reads the edited cell exactly once
    engine.notify_updated(origin());
    assert_eq!(engine.evaluate_cell(c1).unwrap(), Value::Number(11.0));
    assert_eq!(view.reads_of("A1"), a1_after_first + 1);
}

#[test]
fn test_array_formula_broadcast() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("A1", 1.0).unwrap();
    sheet.set_content("B1", 2.0).unwrap();

    let program = parse_array("=A1:B1*10", &wb, CellCoord::new(0, 2, 0), 1, 2).unwrap();
    let engine = Engine::new(&wb, &wb);
    let result = engine.evaluate_program(&program, CellCoord::new(0, 2, 0)).unwrap();
    assert_eq!(
        result,
        Value::Array(vec![vec![Value::Number(10.0), Value::Number(20.0)]])
    );
}

#[test]
fn test_rand_is_in_unit_interval() {
    let wb = Workbook::new();
    let engine = Engine::new(&wb, &wb);

    for _ in 0..3 {
        let result = engine.evaluate("=RAND()", origin()).unwrap();
        match result {
            Value::Number(n) => assert!((0.0..1.0).contains(&n)),
            other => panic!("expected a number, got {other:?}"),
        }
    }
}

#[test]
fn test_implicit_intersection() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_content("A1", 10.0).unwrap();
    sheet.set_content("A2", 20.0).unwrap();
    sheet.set_content("A3", 30.0).unwrap();

    let engine = Engine::new(&wb, &wb);

    // Row 2 intersects the column at A2
    let result = engine.evaluate("=A1:A3+1", CellCoord::new(0, 1, 3)).unwrap();
    assert_eq!(result, Value::Number(21.0));

    // No row in common with the area
    let result = engine.evaluate("=A1:A3+1", CellCoord::new(0, 9, 3)).unwrap();
    assert_eq!(result, Value::Error(CellError::Value));
}
