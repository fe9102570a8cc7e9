//! Evaluation engine
//!
//! An [`Engine`] binds one document (via the read-only traits) to a
//! function registry and a [`DependencyCache`]. Every cell read during
//! evaluation funnels through [`Engine::resolve`], which is where
//! caching, cycle detection, and dependency recording happen.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use log::trace;
use reckon_core::{CellContent, CellCoord, CellError, DocumentView, NamingEnvironment};

use crate::cache::DependencyCache;
use crate::error::{EvalError, EvalResult, ParseError};
use crate::evaluator::Operand;
use crate::functions::{builtin, FunctionRegistry};
use crate::linker::WorkbookLinker;
use crate::parser;
use crate::token::ParsedFormula;
use crate::value::Value;

/// Name definitions may refer to other names; cap the chain
const MAX_NAME_DEPTH: u32 = 32;

/// Formula evaluator for one document
///
/// Mutable state lives behind interior mutability so evaluation can
/// re-enter the engine through a [`WorkbookLinker`] when a linked
/// workbook references back into this one.
pub struct Engine<'a> {
    pub(crate) doc: &'a dyn DocumentView,
    pub(crate) env: &'a dyn NamingEnvironment,
    pub(crate) functions: &'a FunctionRegistry,
    pub(crate) cache: RefCell<DependencyCache>,
    pub(crate) links: Option<Rc<WorkbookLinker<'a>>>,
    pub(crate) self_index: Option<u32>,
    name_depth: Cell<u32>,
}

impl<'a> Engine<'a> {
    /// Create an engine over a document using the builtin functions
    pub fn new(doc: &'a dyn DocumentView, env: &'a dyn NamingEnvironment) -> Self {
        Self::with_registry(doc, env, builtin())
    }

    /// Create an engine with a custom function registry
    pub fn with_registry(
        doc: &'a dyn DocumentView,
        env: &'a dyn NamingEnvironment,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            doc,
            env,
            functions,
            cache: RefCell::new(DependencyCache::new()),
            links: None,
            self_index: None,
            name_depth: Cell::new(0),
        }
    }

    /// Evaluate the cell at `coord`, serving a cached result when one
    /// is clean
    pub fn evaluate_cell(&self, coord: CellCoord) -> EvalResult<Value> {
        self.resolve(coord)
    }

    /// Evaluate formula text as if it were in the cell at `origin`,
    /// without caching the result
    pub fn evaluate(&self, text: &str, origin: CellCoord) -> EvalResult<Value> {
        let program = parser::parse(text, self.env, origin)?;
        self.run_program(&program, origin)
    }

    /// Evaluate an already-parsed program at `origin` without caching
    pub fn evaluate_program(
        &self,
        program: &ParsedFormula,
        origin: CellCoord,
    ) -> EvalResult<Value> {
        self.run_program(program, origin)
    }

    /// Tell the engine a cell's content changed. Its cached result and
    /// every transitive dependent become dirty; unrelated cells keep
    /// their cached values.
    pub fn notify_updated(&self, coord: CellCoord) {
        trace!("invalidating {coord} and dependents");
        self.cache.borrow_mut().notify_updated(coord);
    }

    /// Drop all cached results and dependency information. The blunt
    /// instrument for edits whose reach is unknown, such as changes in
    /// a linked workbook.
    pub fn clear_all(&self) {
        self.cache.borrow_mut().clear_all();
    }

    /// The dependency cache, for inspection
    pub fn cache(&self) -> Ref<'_, DependencyCache> {
        self.cache.borrow()
    }

    /// Evaluate one cell, recording the read in the enclosing
    /// evaluation's dependency set
    pub(crate) fn resolve(&self, coord: CellCoord) -> EvalResult<Value> {
        if coord.sheet >= self.doc.sheet_count() {
            return Ok(Value::Error(CellError::Ref));
        }

        {
            let mut cache = self.cache.borrow_mut();
            cache.record_use(coord);

            if cache.in_progress(coord) {
                trace!("cycle detected at {coord}");
                return Ok(Value::Error(CellError::Circular));
            }
            if let Some(value) = cache.cached(coord) {
                return Ok(value.clone());
            }
        }

        match self.doc.cell_content(coord.sheet, coord.row, coord.col) {
            CellContent::Blank => Ok(Value::Blank),
            CellContent::Number(n) => {
                let value = Value::Number(n);
                self.cache.borrow_mut().store_plain(coord, value.clone());
                Ok(value)
            }
            CellContent::Text(s) => {
                let value = Value::Text(s);
                self.cache.borrow_mut().store_plain(coord, value.clone());
                Ok(value)
            }
            CellContent::Bool(b) => {
                let value = Value::Bool(b);
                self.cache.borrow_mut().store_plain(coord, value.clone());
                Ok(value)
            }
            CellContent::Error(e) => {
                let value = Value::Error(e);
                self.cache.borrow_mut().store_plain(coord, value.clone());
                Ok(value)
            }
            CellContent::Formula(text) => {
                let program = match parser::parse(&text, self.env, coord) {
                    Ok(program) => program,
                    Err(ParseError::UnknownName(_)) => {
                        return Ok(Value::Error(CellError::Name));
                    }
                    Err(ParseError::UnknownSheet(_)) => {
                        return Ok(Value::Error(CellError::Ref));
                    }
                    Err(e) => return Err(EvalError::Parse(e)),
                };

                trace!("evaluating {coord}: {text}");
                self.cache.borrow_mut().begin(coord);
                match self.run_program(&program, coord) {
                    Ok(value) => {
                        self.cache.borrow_mut().complete(coord, value.clone());
                        Ok(value)
                    }
                    Err(e) => {
                        self.cache.borrow_mut().abort(coord);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Resolve a defined name to an operand: a range when the name is
    /// a plain range, otherwise the result of evaluating its text
    pub(crate) fn resolve_name(&self, name: &str, origin: CellCoord) -> EvalResult<Operand> {
        if let Some((sheet, range)) = self.env.name_range(name, origin.sheet) {
            return Ok(Operand::Area {
                first_sheet: sheet,
                last_sheet: sheet,
                range,
            });
        }

        let Some(text) = self.env.name_refers_to(name, origin.sheet) else {
            return Ok(Operand::Value(Value::Error(CellError::Name)));
        };
        if self.name_depth.get() >= MAX_NAME_DEPTH {
            return Ok(Operand::Value(Value::Error(CellError::Circular)));
        }
        let text = text.trim_start_matches('=').to_string();

        let program = match parser::parse(&text, self.env, origin) {
            Ok(program) => program,
            Err(ParseError::UnknownName(_)) => {
                return Ok(Operand::Value(Value::Error(CellError::Name)));
            }
            Err(ParseError::UnknownSheet(_)) => {
                return Ok(Operand::Value(Value::Error(CellError::Ref)));
            }
            Err(e) => return Err(EvalError::Parse(e)),
        };

        self.name_depth.set(self.name_depth.get() + 1);
        let result = self.run_tokens(&program, origin);
        self.name_depth.set(self.name_depth.get() - 1);
        result
    }

    /// Read a cell in another workbook through the linker
    ///
    /// The sheet stays textual until here because the other workbook
    /// owns the name-to-index mapping.
    pub(crate) fn resolve_external(
        &self,
        workbook: u32,
        sheet: &str,
        row: u32,
        col: u16,
    ) -> EvalResult<Value> {
        // Our own index may legitimately appear in stored formulas
        if self.self_index == Some(workbook) {
            let Some(idx) = self.env.sheet_index_of(sheet) else {
                return Ok(Value::Error(CellError::Ref));
            };
            return self.resolve(CellCoord::new(idx, row, col));
        }

        // The target may already be evaluating further up this call
        // chain; re-entering it is fine. Only a coordinate that is
        // itself in progress closes a cycle, and the target's own
        // resolve detects that.
        let target = self.linked_engine(workbook)?;
        let Some(idx) = target.env.sheet_index_of(sheet) else {
            return Ok(Value::Error(CellError::Ref));
        };
        target.resolve(CellCoord::new(idx, row, col))
    }

    /// Evaluate a defined name in another workbook
    pub(crate) fn resolve_external_name(
        &self,
        workbook: u32,
        name: &str,
    ) -> EvalResult<Value> {
        let origin = CellCoord::new(0, 0, 0);
        if self.self_index == Some(workbook) {
            let operand = self.resolve_name(name, origin)?;
            return self.deref_scalar(operand, origin);
        }

        let target = self.linked_engine(workbook)?;
        let operand = target.resolve_name(name, origin)?;
        target.deref_scalar(operand, origin)
    }

    fn linked_engine(&self, workbook: u32) -> EvalResult<Rc<Engine<'a>>> {
        self.links
            .as_ref()
            .and_then(|links| links.engine(workbook))
            .ok_or(EvalError::Unlinked(workbook))
    }
}
