//! Ping-pong generation storage.
//!
//! Two slots indexed by step parity. Slots are reference counted so a
//! reader holding a [`Generation`] keeps a frozen copy: when the engine
//! later writes into a slot that is still shared, `Arc::make_mut` detaches
//! it first instead of mutating what the reader sees.

use std::sync::Arc;

use crate::error::{KleinError, Result};
use crate::topology::Topology;
use crate::{Cell, ALIVE, DEAD};

#[derive(Debug, Clone)]
pub struct GenerationBuffers {
    slots: [Arc<Vec<Cell>>; 2],
    step: u64,
}

impl GenerationBuffers {
    /// Both slots start dead.
    pub fn new(cell_count: usize) -> Self {
        Self {
            slots: [Arc::new(vec![DEAD; cell_count]), Arc::new(vec![DEAD; cell_count])],
            step: 0,
        }
    }

    /// Generations completed since construction.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn cell_count(&self) -> usize {
        self.slots[0].len()
    }

    fn current_slot(&self) -> usize {
        (self.step % 2) as usize
    }

    pub fn current(&self) -> &[Cell] {
        &self.slots[self.current_slot()]
    }

    /// Shared handle on the current generation.
    pub fn shared_current(&self) -> Arc<Vec<Cell>> {
        Arc::clone(&self.slots[self.current_slot()])
    }

    /// Current generation for reading, inactive one for writing.
    pub fn split(&mut self) -> (&[Cell], &mut [Cell]) {
        let [a, b] = &mut self.slots;
        let (current, next) = if self.step % 2 == 0 { (a, b) } else { (b, a) };
        (current.as_slice(), Arc::make_mut(next).as_mut_slice())
    }

    /// Hand the freshly written buffer over to readers.
    pub fn advance(&mut self) {
        self.step += 1;
    }

    /// Replace the current generation wholesale. The step counter and the
    /// inactive slot are left alone.
    pub fn overwrite(&mut self, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.cell_count() {
            return Err(KleinError::parameter(
                "pattern",
                format!("expected {} cells, got {}", self.cell_count(), cells.len()),
            ));
        }
        if let Some(position) = cells.iter().position(|&cell| cell > ALIVE) {
            return Err(KleinError::parameter(
                "pattern",
                format!("cell {position} holds {}, expected 0 or 1", cells[position]),
            ));
        }
        let slot = self.current_slot();
        self.slots[slot] = Arc::new(cells);
        Ok(())
    }
}

/// A frozen generation handed to renderers and other readers.
#[derive(Debug, Clone)]
pub struct Generation {
    topology: Topology,
    step: u64,
    cells: Arc<Vec<Cell>>,
}

impl Generation {
    pub(crate) fn new(topology: Topology, step: u64, cells: Arc<Vec<Cell>>) -> Self {
        Self {
            topology,
            step,
            cells,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Row-major cells, index `y * width + x`.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, x: i64, y: i64) -> Cell {
        self.cells[self.topology.resolve(x, y)]
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == ALIVE).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_selects_current_slot() {
        let mut buffers = GenerationBuffers::new(4);
        buffers.overwrite(vec![1, 0, 0, 1]).unwrap();

        {
            let (current, next) = buffers.split();
            assert_eq!(current, &[1, 0, 0, 1]);
            next.copy_from_slice(&[0, 1, 1, 0]);
        }
        assert_eq!(buffers.current(), &[1, 0, 0, 1]);

        buffers.advance();
        assert_eq!(buffers.step(), 1);
        assert_eq!(buffers.current(), &[0, 1, 1, 0]);

        let (current, next) = buffers.split();
        assert_eq!(current, &[0, 1, 1, 0]);
        assert_eq!(next, &[1, 0, 0, 1]);
    }

    #[test]
    fn overwrite_keeps_step_and_inactive_slot() {
        let mut buffers = GenerationBuffers::new(3);
        buffers.split().1.copy_from_slice(&[1, 1, 1]);
        buffers.advance();
        buffers.overwrite(vec![0, 1, 0]).unwrap();

        assert_eq!(buffers.step(), 1);
        assert_eq!(buffers.current(), &[0, 1, 0]);
        assert_eq!(buffers.split().1, &[0, 0, 0]);
    }

    #[test]
    fn overwrite_rejects_bad_patterns() {
        let mut buffers = GenerationBuffers::new(3);
        assert!(matches!(
            buffers.overwrite(vec![0, 1]),
            Err(KleinError::InvalidParameter { name: "pattern", .. })
        ));
        assert!(matches!(
            buffers.overwrite(vec![0, 2, 0]),
            Err(KleinError::InvalidParameter { name: "pattern", .. })
        ));
        assert_eq!(buffers.current(), &[0, 0, 0]);
    }

    #[test]
    fn shared_current_survives_later_writes() {
        let mut buffers = GenerationBuffers::new(2);
        buffers.overwrite(vec![1, 0]).unwrap();
        let held = buffers.shared_current();

        for _ in 0..4 {
            let (current, next) = buffers.split();
            next[0] = 1 - current[0];
            next[1] = 1 - current[1];
            buffers.advance();
        }

        assert_eq!(held.as_slice(), &[1, 0]);
        assert_eq!(buffers.current(), &[1, 0]);
        assert!(!Arc::ptr_eq(&held, &buffers.shared_current()));
    }
}
