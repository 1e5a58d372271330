//! The generation transition.
//!
//! Each next-generation cell depends only on the frozen current buffer, so
//! rows are filled independently: serially or on the rayon pool.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::buffers::{Generation, GenerationBuffers};
use crate::config::{Execution, SimulationConfig};
use crate::error::Result;
use crate::seed::Pattern;
use crate::topology::Topology;
use crate::{Cell, ALIVE, DEAD};

/// Life rule: two neighbors keep the cell as it is, three bring it to life,
/// anything else kills it.
#[inline]
pub fn next_state(current: Cell, alive_neighbors: u8) -> Cell {
    match alive_neighbors {
        2 => current, // Survives, or stays dead
        3 => ALIVE,   // Survives or becomes alive
        _ => DEAD,    // Dies or remains dead
    }
}

/// Count the alive neighbors of `(x, y)` in `cells`.
#[inline]
pub fn alive_neighbors(topology: &Topology, cells: &[Cell], x: i64, y: i64) -> u8 {
    topology
        .neighbors(x, y)
        .iter()
        .map(|&index| cells[index])
        .sum()
}

/// Write the next generation of `current` into `next`.
pub fn compute_generation(topology: &Topology, current: &[Cell], next: &mut [Cell], execution: Execution) {
    let width = topology.width() as usize;
    let fill_row = |(y, row): (usize, &mut [Cell])| {
        let offset = y * width;
        for (x, cell) in row.iter_mut().enumerate() {
            let neighbors = alive_neighbors(topology, current, x as i64, y as i64);
            *cell = next_state(current[offset + x], neighbors);
        }
    };

    match execution {
        Execution::Serial => next.chunks_mut(width).enumerate().for_each(fill_row),
        Execution::Parallel => next.par_chunks_mut(width).enumerate().for_each(fill_row),
    }
}

/// A Life automaton on a Klein-bottle grid.
#[derive(Debug)]
pub struct Automaton {
    topology: Topology,
    buffers: GenerationBuffers,
    execution: Execution,
    rng: StdRng,
}

impl Automaton {
    /// An all-dead grid with the default execution mode.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_config(&SimulationConfig::new(width, height))
    }

    pub fn with_config(config: &SimulationConfig) -> Result<Self> {
        let topology = config.topology()?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        debug!(
            "created {}x{} automaton ({:?})",
            topology.width(),
            topology.height(),
            config.execution
        );
        Ok(Self {
            topology,
            buffers: GenerationBuffers::new(topology.cell_count()),
            execution: config.execution,
            rng,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn width(&self) -> u32 {
        self.topology.width()
    }

    pub fn height(&self) -> u32 {
        self.topology.height()
    }

    pub fn execution(&self) -> Execution {
        self.execution
    }

    pub fn set_execution(&mut self, execution: Execution) {
        self.execution = execution;
    }

    /// Generations computed so far. Seeding does not reset it.
    pub fn step_count(&self) -> u64 {
        self.buffers.step()
    }

    /// Current generation, row-major with index `y * width + x`.
    pub fn current(&self) -> &[Cell] {
        self.buffers.current()
    }

    /// A handle on the current generation that stays unchanged while held.
    pub fn snapshot(&self) -> Generation {
        Generation::new(self.topology, self.buffers.step(), self.buffers.shared_current())
    }

    /// State of the cell any coordinate resolves to.
    pub fn cell(&self, x: i64, y: i64) -> Cell {
        self.current()[self.topology.resolve(x, y)]
    }

    pub fn population(&self) -> usize {
        self.current().iter().filter(|&&cell| cell == ALIVE).count()
    }

    /// Replace the current generation with `pattern`, drawing randomness
    /// from the automaton's own generator.
    pub fn seed(&mut self, pattern: &Pattern) -> Result<()> {
        let cells = pattern.render(&self.topology, &mut self.rng)?;
        self.load(pattern, cells)
    }

    /// Like [`Automaton::seed`] with a caller supplied generator.
    pub fn seed_with<R: Rng + ?Sized>(&mut self, pattern: &Pattern, rng: &mut R) -> Result<()> {
        let cells = pattern.render(&self.topology, rng)?;
        self.load(pattern, cells)
    }

    fn load(&mut self, pattern: &Pattern, cells: Vec<Cell>) -> Result<()> {
        self.buffers.overwrite(cells)?;
        debug!("seeded {pattern}: {} alive", self.population());
        Ok(())
    }

    /// Advance one generation.
    pub fn step(&mut self) {
        let (current, next) = self.buffers.split();
        compute_generation(&self.topology, current, next, self.execution);
        self.buffers.advance();
        trace!("generation {}", self.buffers.step());
    }

    pub fn step_n(&mut self, generations: u64) {
        for _ in 0..generations {
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn automaton(width: u32, height: u32, cells: &[(i64, i64)]) -> Automaton {
        let mut automaton = Automaton::new(width, height).unwrap();
        automaton.seed(&Pattern::Custom(cells.to_vec())).unwrap();
        automaton
    }

    fn alive_cells(automaton: &Automaton) -> Vec<(u32, u32)> {
        let topology = automaton.topology();
        (0..topology.cell_count())
            .filter(|&index| automaton.current()[index] == ALIVE)
            .map(|index| topology.coords(index))
            .collect()
    }

    #[test]
    fn rule_table() {
        for current in [DEAD, ALIVE] {
            assert_eq!(next_state(current, 2), current);
            assert_eq!(next_state(current, 3), ALIVE);
            for neighbors in [0, 1, 4, 5, 6, 7, 8] {
                assert_eq!(next_state(current, neighbors), DEAD);
            }
        }
    }

    #[test]
    fn counts_neighbors_across_the_seam() {
        let topology = Topology::new(8, 8).unwrap();
        let mut cells = vec![DEAD; topology.cell_count()];
        // (8, 1) and (8, 2) resolve to (0, 2) and (0, 1)
        cells[topology.resolve(0, 2)] = ALIVE;
        cells[topology.resolve(0, 1)] = ALIVE;
        assert_eq!(alive_neighbors(&topology, &cells, 7, 1), 2);
        assert_eq!(alive_neighbors(&topology, &cells, 7, 0), 1);
        assert_eq!(alive_neighbors(&topology, &cells, 7, 4), 0);
    }

    #[test]
    fn invalid_dimensions_produce_no_automaton() {
        assert!(Automaton::new(12, 8).is_err());
        assert!(Automaton::new(8, 1).is_err());
    }

    #[test]
    fn ring_of_eight_becomes_a_diamond() {
        let ring: Vec<(i64, i64)> = (2..5)
            .flat_map(|y| (2..5).map(move |x| (x, y)))
            .filter(|&cell| cell != (3, 3))
            .collect();
        let mut automaton = automaton(8, 8, &ring);
        assert_eq!(automaton.population(), 8);

        automaton.step();

        let mut expected = vec![(3, 1), (2, 2), (4, 2), (1, 3), (5, 3), (2, 4), (4, 4), (3, 5)];
        expected.sort_by_key(|&(x, y)| (y, x));
        assert_eq!(alive_cells(&automaton), expected);
        assert_eq!(automaton.step_count(), 1);
    }

    #[test]
    fn block_is_still_life() {
        let mut automaton = automaton(8, 8, &[(3, 3), (4, 3), (3, 4), (4, 4)]);
        let before = automaton.current().to_vec();
        automaton.step_n(5);
        assert_eq!(automaton.current(), before.as_slice());
    }

    #[test]
    fn blinker_oscillates_across_the_seam() {
        // horizontal blinker centred on the seam at x = 0
        let mut automaton = automaton(8, 8, &[(-1, 2), (0, 2), (1, 2)]);
        assert_eq!(automaton.cell(-1, 2), ALIVE);
        assert_eq!(alive_cells(&automaton), vec![(7, 1), (0, 2), (1, 2)]);

        automaton.step();
        assert_eq!(automaton.population(), 3);
        automaton.step();
        assert_eq!(alive_cells(&automaton), vec![(7, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn serial_and_parallel_agree() {
        let mut serial = Automaton::with_config(
            &SimulationConfig::new(64, 32)
                .with_execution(Execution::Serial)
                .with_rng_seed(3),
        )
        .unwrap();
        let mut parallel = Automaton::with_config(
            &SimulationConfig::new(64, 32)
                .with_execution(Execution::Parallel)
                .with_rng_seed(3),
        )
        .unwrap();
        let pattern = Pattern::Random { probability: 0.4 };
        serial.seed(&pattern).unwrap();
        parallel.seed(&pattern).unwrap();
        assert_eq!(serial.current(), parallel.current());

        for _ in 0..20 {
            serial.step();
            parallel.step();
            assert_eq!(serial.current(), parallel.current());
        }
    }

    #[test]
    fn execution_mode_can_switch_mid_run() {
        let config = SimulationConfig::new(32, 16).with_rng_seed(8);
        let mut switching = Automaton::with_config(&config).unwrap();
        let mut reference = Automaton::with_config(&config.with_execution(Execution::Serial)).unwrap();
        let pattern = Pattern::RandomGliders { probability: 0.7 };
        switching.seed(&pattern).unwrap();
        reference.seed(&pattern).unwrap();
        assert_eq!(switching.execution(), Execution::Parallel);

        switching.step_n(5);
        switching.set_execution(Execution::Serial);
        assert_eq!(switching.execution(), Execution::Serial);
        switching.step_n(5);

        reference.step_n(10);
        assert_eq!(switching.step_count(), 10);
        assert_eq!(switching.current(), reference.current());
    }

    #[test]
    fn snapshot_is_stable_across_steps() {
        let mut automaton = automaton(8, 8, &[(1, 1), (2, 1), (3, 1)]);
        let before = automaton.snapshot();
        automaton.step_n(3);
        assert_eq!(before.step(), 0);
        assert_eq!(before.population(), 3);
        assert_eq!(before.cell(2, 1), ALIVE);
        assert_eq!(before.cell(2, 0), DEAD);
        assert_eq!(automaton.snapshot().step(), 3);
        assert_eq!(automaton.cell(2, 0), ALIVE);
    }

    #[test]
    fn seeding_keeps_the_step_count() {
        let mut automaton = automaton(8, 8, &[(1, 1), (2, 1), (3, 1)]);
        automaton.step_n(2);
        automaton.seed(&Pattern::Full).unwrap();
        assert_eq!(automaton.step_count(), 2);
        assert_eq!(automaton.population(), 64);
        automaton.step();
        assert_eq!(automaton.population(), 0);
    }

    #[test]
    fn rejected_seed_leaves_state_alone() {
        let mut automaton = automaton(8, 8, &[(1, 1)]);
        assert!(automaton.seed(&Pattern::Random { probability: 1.2 }).is_err());
        assert_eq!(alive_cells(&automaton), vec![(1, 1)]);
    }
}
