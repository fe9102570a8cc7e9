//! Evaluation cache and dependency index
//!
//! Tracks, per evaluated cell, the value it produced and the exact set
//! of cells its evaluation read. The reverse index answers "who read
//! me", so an edit can invalidate precisely its transitive dependents
//! and nothing else.
//!
//! Dependencies are observed, not derived from the formula text: a
//! branch that was skipped contributes nothing, so editing a cell only
//! the untaken branch mentions does not invalidate the result.

use ahash::{AHashMap, AHashSet};
use reckon_core::CellCoord;

use crate::value::Value;

#[derive(Debug)]
struct Entry {
    value: Value,
    volatile: bool,
    dirty: bool,
}

/// An evaluation in progress: the cell being computed and the cells
/// it has read so far
#[derive(Debug)]
struct Frame {
    coord: CellCoord,
    used: AHashSet<CellCoord>,
    volatile: bool,
}

/// Per-engine cache of evaluated results plus the dependency graph
/// between cells
#[derive(Debug, Default)]
pub struct DependencyCache {
    entries: AHashMap<CellCoord, Entry>,
    /// coord -> cells whose evaluation read coord
    dependents: AHashMap<CellCoord, AHashSet<CellCoord>>,
    /// coord -> cells coord's evaluation read
    precedents: AHashMap<CellCoord, AHashSet<CellCoord>>,
    in_progress: AHashSet<CellCoord>,
    frames: Vec<Frame>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the evaluation currently on top of the stack read
    /// `coord`. No-op outside any evaluation.
    pub fn record_use(&mut self, coord: CellCoord) {
        if let Some(frame) = self.frames.last_mut() {
            frame.used.insert(coord);
        }
    }

    /// Whether `coord` is somewhere on the active evaluation stack
    pub fn in_progress(&self, coord: CellCoord) -> bool {
        self.in_progress.contains(&coord)
    }

    /// Push an evaluation frame for `coord`
    pub fn begin(&mut self, coord: CellCoord) {
        self.in_progress.insert(coord);
        self.frames.push(Frame {
            coord,
            used: AHashSet::new(),
            volatile: false,
        });
    }

    /// Mark the evaluation on top of the stack as volatile; its result
    /// is stored but never served from cache
    pub fn mark_volatile(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.volatile = true;
        }
    }

    /// Pop the frame for `coord` and store its result, rewiring the
    /// dependency graph to the set of cells this evaluation observed
    pub fn complete(&mut self, coord: CellCoord, value: Value) {
        let Some(frame) = self.pop_frame(coord) else {
            return;
        };

        self.unlink_precedents(coord);
        for &precedent in &frame.used {
            self.dependents.entry(precedent).or_default().insert(coord);
        }
        if frame.used.is_empty() {
            self.precedents.remove(&coord);
        } else {
            self.precedents.insert(coord, frame.used);
        }

        self.entries.insert(
            coord,
            Entry {
                value,
                volatile: frame.volatile,
                dirty: false,
            },
        );
    }

    /// Pop the frame for `coord` without storing anything (the
    /// evaluation failed)
    pub fn abort(&mut self, coord: CellCoord) {
        self.pop_frame(coord);
    }

    fn pop_frame(&mut self, coord: CellCoord) -> Option<Frame> {
        self.in_progress.remove(&coord);
        match self.frames.last() {
            Some(frame) if frame.coord == coord => self.frames.pop(),
            _ => None,
        }
    }

    fn unlink_precedents(&mut self, coord: CellCoord) {
        if let Some(old) = self.precedents.remove(&coord) {
            for precedent in old {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&coord);
                    if deps.is_empty() {
                        self.dependents.remove(&precedent);
                    }
                }
            }
        }
    }

    /// Store a plain (non-formula) cell value as a clean entry
    pub fn store_plain(&mut self, coord: CellCoord, value: Value) {
        self.unlink_precedents(coord);
        self.entries.insert(
            coord,
            Entry {
                value,
                volatile: false,
                dirty: false,
            },
        );
    }

    /// Cached value for `coord`, if it is clean. Volatile results are
    /// never clean.
    pub fn cached(&self, coord: CellCoord) -> Option<&Value> {
        match self.entries.get(&coord) {
            Some(entry) if !entry.dirty && !entry.volatile => Some(&entry.value),
            _ => None,
        }
    }

    /// Invalidate `coord` and everything transitively depending on it
    pub fn notify_updated(&mut self, coord: CellCoord) {
        let mut worklist = vec![coord];
        let mut seen = AHashSet::new();
        while let Some(current) = worklist.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(entry) = self.entries.get_mut(&current) {
                entry.dirty = true;
            }
            if let Some(deps) = self.dependents.get(&current) {
                worklist.extend(deps.iter().copied());
            }
        }
    }

    /// Drop everything: values, dependency graph, evaluation state
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.dependents.clear();
        self.precedents.clear();
        self.in_progress.clear();
        self.frames.clear();
    }

    /// Number of stored results (clean or dirty)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cells recorded as read by the last evaluation of `coord`
    pub fn precedents_of(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        self.precedents
            .get(&coord)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Cells whose last evaluation read `coord`
    pub fn dependents_of(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        self.dependents
            .get(&coord)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }
}
