//! Multi-workbook linking
//!
//! Formulas may reference other workbooks by index (`[2]Prices!B3`).
//! A [`WorkbookLinker`] maps those indices to engines so evaluation
//! can cross workbook boundaries. Engines are registered under the
//! index their stored formulas use; an index nothing is registered
//! under fails evaluation with [`EvalError::Unlinked`], while a sheet
//! or name missing inside a linked workbook degrades to an error
//! value, since the link itself worked.
//!
//! Linked engines are freely re-entrant: a chain that hops back into
//! a workbook already on the call stack evaluates normally, and only
//! a coordinate already being evaluated in its own engine reports
//! [`CellError::Circular`].
//!
//! [`EvalError::Unlinked`]: crate::EvalError::Unlinked
//! [`CellError::Circular`]: reckon_core::CellError::Circular

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use log::debug;

use crate::engine::Engine;

/// Registry of engines reachable from each other by workbook index
#[derive(Default)]
pub struct WorkbookLinker<'a> {
    engines: RefCell<AHashMap<u32, Rc<Engine<'a>>>>,
}

impl<'a> WorkbookLinker<'a> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register an engine under a workbook index and wire it to this
    /// linker. Returns the shared handle further evaluation goes
    /// through.
    pub fn register(self: &Rc<Self>, index: u32, mut engine: Engine<'a>) -> Rc<Engine<'a>> {
        debug!("linking workbook index {index}");
        engine.links = Some(Rc::clone(self));
        engine.self_index = Some(index);
        let handle = Rc::new(engine);
        self.engines
            .borrow_mut()
            .insert(index, Rc::clone(&handle));
        handle
    }

    /// The engine registered under `index`, if any
    pub fn engine(&self, index: u32) -> Option<Rc<Engine<'a>>> {
        self.engines.borrow().get(&index).cloned()
    }
}
