/*!
Conway's Life on a Klein bottle.

* A live cell dies if it has fewer than two live neighbors.
* A live cell with two or three live neighbors lives on to the next generation.
* A live cell with more than three live neighbors dies.
* A dead cell will be brought back to live if it has exactly three live neighbors.

The grid wraps vertically like a torus; wrapping horizontally reflects the
row, so the surface has a single side.
*/

pub mod buffers;
pub mod config;
pub mod engine;
pub mod error;
pub mod seed;
pub mod topology;

pub use buffers::{Generation, GenerationBuffers};
pub use config::{Execution, SimulationConfig};
pub use engine::Automaton;
pub use error::{KleinError, Result};
pub use seed::{GliderPhase, Heading, Pattern, PatternKind};
pub use topology::Topology;

/// One cell: [`DEAD`] or [`ALIVE`].
pub type Cell = u8;

pub const DEAD: Cell = 0;
pub const ALIVE: Cell = 1;
