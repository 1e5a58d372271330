//! Initial patterns.
//!
//! Every pattern is drawn on a [`Canvas`] that resolves absolute
//! coordinates through the topology, so shapes that straddle the seam land
//! on the right (reflected) cells.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::{KleinError, Result};
use crate::topology::Topology;
use crate::{Cell, ALIVE, DEAD};

/// Spacing between candidate lines for rings, stripes and squares.
pub const LINE_PERIOD: u32 = 4;
/// Side of the blocks used by [`Pattern::RandomGliders`].
pub const GLIDER_BLOCK: u32 = 8;
/// Offset of a glider's bounding box inside its block.
const GLIDER_BLOCK_MARGIN: i64 = 2;

/// Diagonal a glider travels along. `y` grows southwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Heading {
    pub const ALL: [Heading; 4] = [
        Heading::NorthEast,
        Heading::NorthWest,
        Heading::SouthEast,
        Heading::SouthWest,
    ];

    /// Unit step of the glider every four generations.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Heading::NorthEast => (1, -1),
            Heading::NorthWest => (-1, -1),
            Heading::SouthEast => (1, 1),
            Heading::SouthWest => (-1, 1),
        }
    }
}

/// The two glider phases that can be seeded. The other two phases of the
/// four-generation cycle are not available as seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GliderPhase {
    /// ```text
    /// .#.
    /// ..#
    /// ###
    /// ```
    Tail,
    /// ```text
    /// #.#
    /// .##
    /// .#.
    /// ```
    Hook,
}

impl GliderPhase {
    pub const ALL: [GliderPhase; 2] = [GliderPhase::Tail, GliderPhase::Hook];

    // Cells inside a 3x3 box for a south-east heading.
    fn cells(self) -> [(i64, i64); 5] {
        match self {
            GliderPhase::Tail => [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)],
            GliderPhase::Hook => [(0, 0), (2, 0), (1, 1), (2, 1), (1, 2)],
        }
    }
}

/// Glider cells relative to the top-left of its 3x3 box.
pub fn glider_cells(heading: Heading, phase: GliderPhase) -> [(i64, i64); 5] {
    let (dx, dy) = heading.delta();
    phase.cells().map(|(x, y)| {
        let x = if dx < 0 { 2 - x } else { x };
        let y = if dy < 0 { 2 - y } else { y };
        (x, y)
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Empty,
    Full,
    Random { probability: f64 },
    Glider { heading: Heading, phase: GliderPhase },
    RandomGliders { probability: f64 },
    /// Full columns every [`LINE_PERIOD`] cells.
    Rings,
    /// Full rows every [`LINE_PERIOD`] cells, drawn twice around x.
    Stripes,
    RandomRings { probability: f64 },
    RandomStripes { probability: f64 },
    /// 2x2 blocks tiled every [`LINE_PERIOD`] cells.
    Squares,
    /// Explicit live cells on an otherwise empty grid.
    Custom(Vec<(i64, i64)>),
}

impl Pattern {
    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::Empty => PatternKind::Empty,
            Pattern::Full => PatternKind::Full,
            Pattern::Random { .. } => PatternKind::Random,
            Pattern::Glider { .. } => PatternKind::Glider,
            Pattern::RandomGliders { .. } => PatternKind::RandomGliders,
            Pattern::Rings => PatternKind::Rings,
            Pattern::Stripes => PatternKind::Stripes,
            Pattern::RandomRings { .. } => PatternKind::RandomRings,
            Pattern::RandomStripes { .. } => PatternKind::RandomStripes,
            Pattern::Squares => PatternKind::Squares,
            Pattern::Custom(_) => PatternKind::Custom,
        }
    }

    fn probability(&self) -> Option<f64> {
        match *self {
            Pattern::Random { probability }
            | Pattern::RandomGliders { probability }
            | Pattern::RandomRings { probability }
            | Pattern::RandomStripes { probability } => Some(probability),
            _ => None,
        }
    }

    /// Draw the pattern into a fresh cell vector for `topology`.
    pub fn render<R: Rng + ?Sized>(&self, topology: &Topology, rng: &mut R) -> Result<Vec<Cell>> {
        if let Some(probability) = self.probability() {
            check_probability(probability)?;
        }

        let mut canvas = Canvas::new(*topology);
        let w = i64::from(topology.width());
        let h = i64::from(topology.height());
        let period = LINE_PERIOD as usize;

        match self {
            Pattern::Empty => {}
            Pattern::Full => canvas.fill(ALIVE),
            Pattern::Random { probability } => {
                for cell in canvas.cells.iter_mut() {
                    *cell = Cell::from(rng.random_bool(*probability));
                }
            }
            Pattern::Glider { heading, phase } => {
                canvas.stamp(w / 2 - 1, h / 2 - 1, &glider_cells(*heading, *phase));
            }
            Pattern::RandomGliders { probability } => {
                let block = GLIDER_BLOCK as usize;
                for top in (0..h).step_by(block) {
                    for left in (0..w).step_by(block) {
                        if !rng.random_bool(*probability) {
                            continue;
                        }
                        let heading = Heading::ALL[rng.random_range(0..Heading::ALL.len())];
                        let phase = GliderPhase::ALL[rng.random_range(0..GliderPhase::ALL.len())];
                        canvas.stamp(
                            left + GLIDER_BLOCK_MARGIN,
                            top + GLIDER_BLOCK_MARGIN,
                            &glider_cells(heading, phase),
                        );
                    }
                }
            }
            Pattern::Rings => {
                for x in (0..w).step_by(period) {
                    canvas.ring(x);
                }
            }
            Pattern::Stripes => {
                for y in (0..h).step_by(period) {
                    canvas.stripe(y);
                }
            }
            Pattern::RandomRings { probability } => {
                for x in (0..w).step_by(period) {
                    if rng.random_bool(*probability) {
                        canvas.ring(x);
                    }
                }
            }
            Pattern::RandomStripes { probability } => {
                for y in (0..h).step_by(period) {
                    if rng.random_bool(*probability) {
                        canvas.stripe(y);
                    }
                }
            }
            Pattern::Squares => {
                let period = i64::from(LINE_PERIOD);
                for y in 0..h {
                    for x in 0..w {
                        if x % period < 2 && y % period < 2 {
                            canvas.set(x, y);
                        }
                    }
                }
            }
            Pattern::Custom(cells) => canvas.stamp(0, 0, cells),
        }

        Ok(canvas.into_cells())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Glider { heading, phase } => write!(f, "glider ({heading:?}, {phase:?})"),
            Pattern::Custom(cells) => write!(f, "custom ({} cells)", cells.len()),
            other => match other.probability() {
                Some(probability) => write!(f, "{} (p = {probability})", other.kind()),
                None => write!(f, "{}", other.kind()),
            },
        }
    }
}

fn check_probability(probability: f64) -> Result<()> {
    if (0.0..=1.0).contains(&probability) {
        Ok(())
    } else {
        Err(KleinError::parameter(
            "probability",
            format!("{probability} is outside [0, 1]"),
        ))
    }
}

/// Pattern names as they appear on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Empty,
    Full,
    Random,
    Glider,
    RandomGliders,
    Rings,
    Stripes,
    RandomRings,
    RandomStripes,
    Squares,
    Custom,
}

impl PatternKind {
    pub const NAMED: [PatternKind; 10] = [
        PatternKind::Empty,
        PatternKind::Full,
        PatternKind::Random,
        PatternKind::Glider,
        PatternKind::RandomGliders,
        PatternKind::Rings,
        PatternKind::Stripes,
        PatternKind::RandomRings,
        PatternKind::RandomStripes,
        PatternKind::Squares,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Empty => "empty",
            PatternKind::Full => "full",
            PatternKind::Random => "random",
            PatternKind::Glider => "glider",
            PatternKind::RandomGliders => "gliders",
            PatternKind::Rings => "rings",
            PatternKind::Stripes => "stripes",
            PatternKind::RandomRings => "random-rings",
            PatternKind::RandomStripes => "random-stripes",
            PatternKind::Squares => "squares",
            PatternKind::Custom => "custom",
        }
    }

    /// Build a pattern of this kind. `probability` is used by the random
    /// kinds; the single glider uses the first heading and phase.
    pub fn with_probability(self, probability: f64) -> Result<Pattern> {
        let pattern = match self {
            PatternKind::Empty => Pattern::Empty,
            PatternKind::Full => Pattern::Full,
            PatternKind::Random => Pattern::Random { probability },
            PatternKind::Glider => Pattern::Glider {
                heading: Heading::SouthEast,
                phase: GliderPhase::Tail,
            },
            PatternKind::RandomGliders => Pattern::RandomGliders { probability },
            PatternKind::Rings => Pattern::Rings,
            PatternKind::Stripes => Pattern::Stripes,
            PatternKind::RandomRings => Pattern::RandomRings { probability },
            PatternKind::RandomStripes => Pattern::RandomStripes { probability },
            PatternKind::Squares => Pattern::Squares,
            PatternKind::Custom => {
                return Err(KleinError::parameter(
                    "pattern",
                    "custom patterns need an explicit cell list",
                ))
            }
        };
        if let Some(probability) = pattern.probability() {
            check_probability(probability)?;
        }
        Ok(pattern)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternKind {
    type Err = KleinError;

    fn from_str(name: &str) -> Result<Self> {
        let name = name.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        let name = match name.as_str() {
            "random-gliders" => "gliders",
            other => other,
        };
        PatternKind::NAMED
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| KleinError::parameter("pattern", format!("unknown pattern `{name}`")))
    }
}

/// Scratch grid that routes every write through the topology.
#[derive(Debug, Clone)]
pub struct Canvas {
    topology: Topology,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            cells: vec![DEAD; topology.cell_count()],
        }
    }

    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    pub fn set(&mut self, x: i64, y: i64) {
        let index = self.topology.resolve(x, y);
        self.cells[index] = ALIVE;
    }

    /// Set `cells` alive, offset by `(left, top)`.
    pub fn stamp(&mut self, left: i64, top: i64, cells: &[(i64, i64)]) {
        for &(x, y) in cells {
            self.set(left + x, top + y);
        }
    }

    /// A full column; y wraps plainly so one lap closes it.
    pub fn ring(&mut self, x: i64) {
        for y in 0..i64::from(self.topology.height()) {
            self.set(x, y);
        }
    }

    /// A full row. One lap of x lands on the reflected row, so the stripe
    /// only closes after two widths.
    pub fn stripe(&mut self, y: i64) {
        for x in 0..2 * i64::from(self.topology.width()) {
            self.set(x, y);
        }
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }
}
