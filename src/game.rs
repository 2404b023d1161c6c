//! Game logic: grid, shapes, placement, cluster detection, session state.

use std::fmt;

/// Board is GRID_SIZE x GRID_SIZE cells.
pub const GRID_SIZE: usize = 8;
/// Total cell count; the grid is indexed by `row * GRID_SIZE + col`.
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;
/// A connected same-colour component of at least this many cells blasts.
pub const BLAST_THRESHOLD: usize = 8;
/// Flat score for every successful placement.
pub const PLACEMENT_SCORE: u32 = 10;
/// Score per cell of a blasted cluster.
pub const BLAST_SCORE_PER_CELL: u32 = 20;
/// Score needed to advance one level.
pub const SCORE_PER_LEVEL: u32 = 500;
/// Number of pieces offered at a time.
pub const TRAY_SIZE: usize = 3;

/// Piece colours (index 0..3 for theme.piece_color()).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceColor {
    Red,
    Yellow,
    Purple,
}

impl PieceColor {
    pub const ALL: [Self; 3] = [Self::Red, Self::Yellow, Self::Purple];

    /// Colour index 0..3 for theme.piece_color().
    pub fn palette_index(&self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Yellow => 1,
            Self::Purple => 2,
        }
    }
}

impl fmt::Display for PieceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
        };
        f.write_str(s)
    }
}

/// Shape catalog, ordered by unlock level: `min(level + 2, ALL.len())`
/// shapes are available, so level 1 starts with the first three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Dot,
    Domino,
    Bar3,
    Square,
    Tee,
    Bar4,
}

impl ShapeKind {
    pub const ALL: [Self; 6] = [
        Self::Dot,
        Self::Domino,
        Self::Bar3,
        Self::Square,
        Self::Tee,
        Self::Bar4,
    ];

    /// Occupied cells relative to the anchor (top-left); each (dx, dy).
    pub fn cells(&self) -> &'static [(u8, u8)] {
        match self {
            Self::Dot => &[(0, 0)],
            Self::Domino => &[(0, 0), (1, 0)],
            Self::Bar3 => &[(0, 0), (1, 0), (2, 0)],
            Self::Square => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::Tee => &[(0, 0), (1, 0), (2, 0), (1, 1)],
            Self::Bar4 => &[(0, 0), (1, 0), (2, 0), (3, 0)],
        }
    }

    /// Bounding-box width in cells.
    pub fn width(&self) -> usize {
        self.cells().iter().map(|&(dx, _)| dx as usize + 1).max().unwrap_or(1)
    }

    /// Bounding-box height in cells.
    pub fn height(&self) -> usize {
        self.cells().iter().map(|&(_, dy)| dy as usize + 1).max().unwrap_or(1)
    }

    /// Shapes unlocked at the given level (prefix of the catalog).
    pub fn available(level: u32) -> &'static [Self] {
        let n = (level as usize + 2).min(Self::ALL.len());
        &Self::ALL[..n]
    }
}

/// Single cell: empty or filled with a piece colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Filled(PieceColor),
}

/// One cell changed by a placement; the UI repaints exactly these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate {
    pub index: usize,
    pub color: PieceColor,
}

/// A blasted cluster: member indices and size, for score/shake/bell reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blast {
    pub indices: Vec<usize>,
    pub size: usize,
}

/// The 8x8 board. Owned by a Session; only placement and cluster
/// clearing mutate it.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: [Cell; GRID_CELLS],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [Cell::Empty; GRID_CELLS],
        }
    }

    #[inline]
    pub fn index(col: usize, row: usize) -> usize {
        row * GRID_SIZE + col
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Cell {
        self.cells[index]
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Cell {
        self.cells[Self::index(col, row)]
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| *c == Cell::Empty)
    }

    pub fn clear(&mut self) {
        self.cells = [Cell::Empty; GRID_CELLS];
    }

    /// True iff every occupied cell of the shape anchored at (x, y) maps to
    /// an in-bounds, currently-empty cell. No side effects; must hold before
    /// `place` is called (placement is all-or-nothing).
    pub fn validate(&self, x: i32, y: i32, shape: ShapeKind) -> bool {
        for &(dx, dy) in shape.cells() {
            let nx = x + i32::from(dx);
            let ny = y + i32::from(dy);
            if nx < 0 || ny < 0 || nx >= GRID_SIZE as i32 || ny >= GRID_SIZE as i32 {
                return false;
            }
            if self.get(nx as usize, ny as usize) != Cell::Empty {
                return false;
            }
        }
        true
    }

    /// Write `color` into every cell covered by the shape and return the
    /// cell updates for the UI. Precondition: `validate(x, y, shape)` just
    /// returned true; no re-validation here.
    pub fn place(&mut self, x: i32, y: i32, shape: ShapeKind, color: PieceColor) -> Vec<CellUpdate> {
        let mut updates = Vec::with_capacity(shape.cells().len());
        for &(dx, dy) in shape.cells() {
            let col = (x + i32::from(dx)) as usize;
            let row = (y + i32::from(dy)) as usize;
            let index = Self::index(col, row);
            self.cells[index] = Cell::Filled(color);
            updates.push(CellUpdate { index, color });
        }
        updates
    }

    /// Scan all cells in index order; flood-fill each unvisited non-empty
    /// cell over 4-adjacent same-colour neighbours. Components of size >=
    /// BLAST_THRESHOLD are cleared and returned. One pass only: clusters
    /// formed by clearing are not re-scanned (no cascade).
    pub fn detect_and_clear_clusters(&mut self) -> Vec<Blast> {
        let mut visited = [false; GRID_CELLS];
        let mut blasts = Vec::new();

        for start in 0..GRID_CELLS {
            let color = match self.cells[start] {
                Cell::Filled(c) if !visited[start] => c,
                _ => continue,
            };
            let cluster = self.flood_fill(start, color, &mut visited);
            if cluster.len() >= BLAST_THRESHOLD {
                for &i in &cluster {
                    self.cells[i] = Cell::Empty;
                }
                blasts.push(Blast {
                    size: cluster.len(),
                    indices: cluster,
                });
            }
        }
        blasts
    }

    /// Iterative stack-based flood fill from `start` over cells of `color`.
    /// Marks cells visited as they are pushed, so each cell is handled at
    /// most once per detection pass.
    fn flood_fill(
        &self,
        start: usize,
        color: PieceColor,
        visited: &mut [bool; GRID_CELLS],
    ) -> Vec<usize> {
        const DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        let mut stack = vec![start];
        let mut cluster = Vec::new();
        visited[start] = true;

        while let Some(i) = stack.pop() {
            cluster.push(i);
            let x = (i % GRID_SIZE) as i32;
            let y = (i / GRID_SIZE) as i32;
            for (dx, dy) in DIRS {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= GRID_SIZE as i32 || ny >= GRID_SIZE as i32 {
                    continue;
                }
                let ni = Self::index(nx as usize, ny as usize);
                if !visited[ni] && self.cells[ni] == Cell::Filled(color) {
                    visited[ni] = true;
                    stack.push(ni);
                }
            }
        }
        cluster
    }
}

/// Seedable LCG for piece generation; deterministic given a seed.
#[derive(Debug, Clone)]
pub struct PieceRng {
    state: u32,
}

impl PieceRng {
    pub fn new(seed: u32) -> Self {
        Self {
            // State 0 makes the first few LCG draws degenerate.
            state: if seed == 0 { 0x1234_5678 } else { seed },
        }
    }

    fn next_rand(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        self.state >> 16
    }

    pub fn gen_index(&mut self, n: usize) -> usize {
        (self.next_rand() as usize) % n.max(1)
    }
}

/// An offered piece: shape + colour. Consumed once placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub shape: ShapeKind,
    pub color: PieceColor,
}

/// Everything a successful placement changed, for the UI to apply.
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub updates: Vec<CellUpdate>,
    pub blasts: Vec<Blast>,
}

/// Game session: grid, score, level, paused flag, piece tray. Owned by the
/// caller; multiple sessions can coexist (tests construct their own).
#[derive(Debug, Clone)]
pub struct Session {
    grid: Grid,
    pub score: u32,
    pub level: u32,
    paused: bool,
    seed: u32,
    rng: PieceRng,
    /// Offered pieces; None = consumed. Refilled when all three are gone.
    pub tray: [Option<Piece>; TRAY_SIZE],
}

impl Session {
    pub fn new(seed: u32) -> Self {
        let mut session = Self {
            grid: Grid::new(),
            score: 0,
            level: 1,
            paused: false,
            seed,
            rng: PieceRng::new(seed),
            tray: [None; TRAY_SIZE],
        };
        session.refill_tray();
        session
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Reinitialise grid, score, level, paused flag and tray. The RNG is
    /// reseeded so a reset session replays the same piece sequence.
    pub fn reset(&mut self) {
        *self = Self::new(self.seed);
    }

    pub fn validate(&self, x: i32, y: i32, shape: ShapeKind) -> bool {
        self.grid.validate(x, y, shape)
    }

    /// Run validate; on success place the shape, run the cluster detector,
    /// and update score and level. Returns None when invalid or paused.
    /// Scoring: flat PLACEMENT_SCORE, plus BLAST_SCORE_PER_CELL per blasted
    /// cell; level is always recomputed from score.
    pub fn attempt_placement(
        &mut self,
        x: i32,
        y: i32,
        shape: ShapeKind,
        color: PieceColor,
    ) -> Option<PlacementOutcome> {
        if self.paused || !self.grid.validate(x, y, shape) {
            return None;
        }
        let updates = self.grid.place(x, y, shape, color);
        self.score += PLACEMENT_SCORE;
        let blasts = self.grid.detect_and_clear_clusters();
        for blast in &blasts {
            self.score += blast.size as u32 * BLAST_SCORE_PER_CELL;
        }
        self.recompute_level();
        Some(PlacementOutcome { updates, blasts })
    }

    /// Drop the piece in tray slot `slot` at anchor (x, y). On success the
    /// piece is consumed and the tray refilled once empty.
    pub fn drop_piece(&mut self, slot: usize, x: i32, y: i32) -> Option<PlacementOutcome> {
        let piece = self.tray.get(slot).copied().flatten()?;
        let outcome = self.attempt_placement(x, y, piece.shape, piece.color)?;
        self.tray[slot] = None;
        if self.tray.iter().all(Option::is_none) {
            self.refill_tray();
        }
        Some(outcome)
    }

    /// True when no remaining tray piece fits anywhere on the grid.
    pub fn is_stuck(&self) -> bool {
        for piece in self.tray.iter().flatten() {
            for y in 0..GRID_SIZE as i32 {
                for x in 0..GRID_SIZE as i32 {
                    if self.grid.validate(x, y, piece.shape) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn recompute_level(&mut self) {
        self.level = self.score / SCORE_PER_LEVEL + 1;
    }

    /// Fill every tray slot with a random piece; shape pool grows with level.
    fn refill_tray(&mut self) {
        let shapes = ShapeKind::available(self.level);
        for slot in &mut self.tray {
            let shape = shapes[self.rng.gen_index(shapes.len())];
            let color = PieceColor::ALL[self.rng.gen_index(PieceColor::ALL.len())];
            *slot = Some(Piece { shape, color });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(grid: &mut Grid, cells: &[(usize, usize)], color: PieceColor) {
        for &(x, y) in cells {
            grid.cells[Grid::index(x, y)] = Cell::Filled(color);
        }
    }

    #[test]
    fn test_validate_bounds() {
        let grid = Grid::new();
        assert!(grid.validate(0, 0, ShapeKind::Bar4));
        assert!(grid.validate(4, 7, ShapeKind::Bar4));
        assert!(!grid.validate(5, 0, ShapeKind::Bar4));
        assert!(!grid.validate(-1, 0, ShapeKind::Dot));
        assert!(!grid.validate(0, -1, ShapeKind::Dot));
        assert!(!grid.validate(8, 0, ShapeKind::Dot));
        assert!(!grid.validate(7, 7, ShapeKind::Square));
        assert!(grid.validate(6, 6, ShapeKind::Square));
    }

    #[test]
    fn test_validate_occupancy() {
        let mut grid = Grid::new();
        fill(&mut grid, &[(1, 0)], PieceColor::Red);
        assert!(!grid.validate(0, 0, ShapeKind::Domino));
        assert!(grid.validate(2, 0, ShapeKind::Domino));
        assert!(grid.validate(0, 1, ShapeKind::Domino));
    }

    #[test]
    fn test_place_touches_only_covered_cells() {
        let mut grid = Grid::new();
        let updates = grid.place(2, 3, ShapeKind::Tee, PieceColor::Yellow);
        let expected: Vec<usize> = [(2, 3), (3, 3), (4, 3), (3, 4)]
            .iter()
            .map(|&(x, y)| Grid::index(x, y))
            .collect();
        let touched: Vec<usize> = updates.iter().map(|u| u.index).collect();
        assert_eq!(touched, expected);
        for i in 0..GRID_CELLS {
            if expected.contains(&i) {
                assert_eq!(grid.cell(i), Cell::Filled(PieceColor::Yellow));
            } else {
                assert_eq!(grid.cell(i), Cell::Empty);
            }
        }
    }

    #[test]
    fn test_detect_idempotent_below_threshold() {
        let mut grid = Grid::new();
        fill(
            &mut grid,
            &[(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1), (0, 2)],
            PieceColor::Purple,
        );
        // 7 connected cells: no blast, no change, on repeated calls too.
        let before = grid.clone();
        assert!(grid.detect_and_clear_clusters().is_empty());
        assert_eq!(grid.cells, before.cells);
        assert!(grid.detect_and_clear_clusters().is_empty());
        assert_eq!(grid.cells, before.cells);
    }

    #[test]
    fn test_cluster_of_eight_blasts() {
        let mut grid = Grid::new();
        let cells: Vec<(usize, usize)> = (0..8).map(|x| (x, 0)).collect();
        fill(&mut grid, &cells, PieceColor::Red);
        let blasts = grid.detect_and_clear_clusters();
        assert_eq!(blasts.len(), 1);
        assert_eq!(blasts[0].size, 8);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_small_cluster_untouched_next_to_blasted_one() {
        let mut grid = Grid::new();
        // Row 0: eight red cells (blasts). Row 1: three yellow cells,
        // 4-adjacent to the red row, below threshold (stays).
        fill(&mut grid, &(0..8).map(|x| (x, 0)).collect::<Vec<_>>(), PieceColor::Red);
        fill(&mut grid, &[(0, 1), (1, 1), (2, 1)], PieceColor::Yellow);
        let blasts = grid.detect_and_clear_clusters();
        assert_eq!(blasts.len(), 1);
        assert_eq!(grid.get(0, 1), Cell::Filled(PieceColor::Yellow));
        assert_eq!(grid.get(1, 1), Cell::Filled(PieceColor::Yellow));
        assert_eq!(grid.get(2, 1), Cell::Filled(PieceColor::Yellow));
        assert_eq!(grid.get(0, 0), Cell::Empty);
    }

    #[test]
    fn test_same_color_diagonal_not_connected() {
        let mut grid = Grid::new();
        // Two runs of 4 in adjacent rows, touching only corner-to-corner.
        fill(&mut grid, &[(0, 0), (1, 0), (2, 0), (3, 0)], PieceColor::Red);
        fill(&mut grid, &[(4, 1), (5, 1), (6, 1), (7, 1)], PieceColor::Red);
        assert!(grid.detect_and_clear_clusters().is_empty());
    }

    #[test]
    fn test_two_disjoint_clusters_blast_in_one_pass() {
        let mut grid = Grid::new();
        fill(&mut grid, &(0..8).map(|x| (x, 0)).collect::<Vec<_>>(), PieceColor::Red);
        fill(&mut grid, &(0..8).map(|x| (x, 7)).collect::<Vec<_>>(), PieceColor::Yellow);
        let blasts = grid.detect_and_clear_clusters();
        assert_eq!(blasts.len(), 2);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_placement_and_blast_scoring() {
        let mut session = Session::new(1);
        // Six red cells on row 0; a red 1x4 at (0,1) joins them into a
        // 10-cell cluster that blasts.
        fill(
            &mut session.grid,
            &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)],
            PieceColor::Red,
        );
        let outcome = session
            .attempt_placement(0, 1, ShapeKind::Bar4, PieceColor::Red)
            .expect("valid placement");
        assert_eq!(outcome.blasts.len(), 1);
        assert_eq!(outcome.blasts[0].size, 10);
        // 10 for the placement + 10 cells * 20 for the blast.
        assert_eq!(session.score, 210);
        assert!(session.grid.is_empty());
    }

    #[test]
    fn test_level_recomputation() {
        let mut session = Session::new(1);
        for (score, level) in [(0, 1), (500, 2), (999, 2), (1000, 3)] {
            session.score = score;
            session.recompute_level();
            assert_eq!(session.level, level, "score {}", score);
        }
    }

    #[test]
    fn test_reset() {
        let mut session = Session::new(7);
        let _ = session.attempt_placement(0, 0, ShapeKind::Square, PieceColor::Purple);
        session.set_paused(true);
        session.score = 1234;
        session.reset();
        assert!(session.grid.is_empty());
        assert_eq!(session.score, 0);
        assert_eq!(session.level, 1);
        assert!(!session.is_paused());
    }

    #[test]
    fn test_reset_replays_piece_sequence() {
        let mut session = Session::new(42);
        let first_tray = session.tray;
        session.drop_piece(0, 0, 0);
        session.reset();
        assert_eq!(session.tray, first_tray);
    }

    #[test]
    fn test_bar4_scenario() {
        let mut session = Session::new(1);
        let outcome = session
            .attempt_placement(0, 0, ShapeKind::Bar4, PieceColor::Red)
            .expect("valid placement");
        let touched: Vec<usize> = outcome.updates.iter().map(|u| u.index).collect();
        assert_eq!(touched, vec![0, 1, 2, 3]);
        for i in 0..4 {
            assert_eq!(session.grid.cell(i), Cell::Filled(PieceColor::Red));
        }
        // Any shape overlapping the filled run now fails validation.
        assert!(!session.validate(0, 0, ShapeKind::Bar4));
        assert!(!session.validate(3, 0, ShapeKind::Dot));
        assert!(!session.validate(2, 0, ShapeKind::Square));
        assert!(session.validate(0, 1, ShapeKind::Bar4));
    }

    #[test]
    fn test_paused_blocks_placement() {
        let mut session = Session::new(1);
        session.set_paused(true);
        assert!(
            session
                .attempt_placement(0, 0, ShapeKind::Dot, PieceColor::Red)
                .is_none()
        );
        session.set_paused(false);
        assert!(
            session
                .attempt_placement(0, 0, ShapeKind::Dot, PieceColor::Red)
                .is_some()
        );
    }

    #[test]
    fn test_invalid_placement_changes_nothing() {
        let mut session = Session::new(1);
        fill(&mut session.grid, &[(0, 0)], PieceColor::Red);
        assert!(
            session
                .attempt_placement(0, 0, ShapeKind::Domino, PieceColor::Yellow)
                .is_none()
        );
        assert_eq!(session.score, 0);
        assert_eq!(session.grid.get(1, 0), Cell::Empty);
    }

    #[test]
    fn test_shape_pool_grows_with_level() {
        assert_eq!(ShapeKind::available(1), &ShapeKind::ALL[..3]);
        assert_eq!(ShapeKind::available(2), &ShapeKind::ALL[..4]);
        assert_eq!(ShapeKind::available(4), &ShapeKind::ALL[..6]);
        assert_eq!(ShapeKind::available(99), &ShapeKind::ALL[..]);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let a = Session::new(99);
        let b = Session::new(99);
        assert_eq!(a.tray, b.tray);
    }

    #[test]
    fn test_tray_consumed_and_refilled() {
        let mut session = Session::new(5);
        // Drop the three tray pieces in separate board regions so every
        // placement is valid regardless of which shapes were drawn.
        let anchors = [(0, 0), (0, 3), (0, 6)];
        for (slot, (x, y)) in anchors.iter().enumerate() {
            assert!(session.drop_piece(slot, *x, *y).is_some());
            if slot < TRAY_SIZE - 1 {
                assert!(session.tray[slot].is_none());
            }
        }
        // Last drop emptied the tray; it refills immediately.
        assert!(session.tray.iter().all(Option::is_some));
    }

    #[test]
    fn test_is_stuck() {
        let mut session = Session::new(1);
        assert!(!session.is_stuck());
        // Checkerboard leaves no two adjacent empty cells; only a Dot fits.
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                if (x + y) % 2 == 0 {
                    session.grid.cells[Grid::index(x, y)] = Cell::Filled(PieceColor::Red);
                }
            }
        }
        session.tray = [
            Some(Piece { shape: ShapeKind::Domino, color: PieceColor::Red }),
            Some(Piece { shape: ShapeKind::Square, color: PieceColor::Yellow }),
            None,
        ];
        assert!(session.is_stuck());
        session.tray[2] = Some(Piece { shape: ShapeKind::Dot, color: PieceColor::Purple });
        assert!(!session.is_stuck());
    }
}
