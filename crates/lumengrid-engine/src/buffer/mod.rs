//! The 3D light buffer: cells, addressing views, and plane shifts.
//!
//! All light cells live in one arena owned by [`LightBuffer`]. Every view
//! (full grid, left/right half grids, wiring strings) is a table of indices
//! into that arena, never a copy, so a mutation made through any view is
//! visible through all of them.

mod plane;

use crate::color::{self, Rgb};
use crate::error::GeometryError;
use plane::TempPool;

pub use plane::PlaneHandle;

/// Grid axis selector for plane-addressed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn extent_of(self, dims: [usize; 3]) -> usize {
        match self {
            Self::X => dims[0],
            Self::Y => dims[1],
            Self::Z => dims[2],
        }
    }

    /// Dimensions of a plane perpendicular to this axis.
    fn plane_dims(self, dims: [usize; 3]) -> (usize, usize) {
        match self {
            Self::X => (dims[1], dims[2]),
            Self::Y => (dims[0], dims[2]),
            Self::Z => (dims[0], dims[1]),
        }
    }

    fn plane_cell(self, index: usize, a: usize, b: usize) -> (usize, usize, usize) {
        match self {
            Self::X => (index, a, b),
            Self::Y => (a, index, b),
            Self::Z => (a, b, index),
        }
    }
}

/// Selector for the 3D views over the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridId {
    /// Both halves as one grid.
    All,
    /// The left half.
    Left,
    /// The right half.
    Right,
}

/// One addressable light.
#[derive(Debug, Clone)]
pub struct Light {
    /// Grid identity, fixed at construction.
    pub ix: i32,
    pub iy: i32,
    pub iz: i32,
    /// Spatial position for external viewers; the engine never reads it.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Whether the light is lit.
    pub on: bool,
    /// Stored color; a light that is off is emitted as black.
    pub color: Rgb,
}

impl Light {
    fn new(ix: i32, iy: i32, iz: i32, color: Rgb) -> Self {
        Self {
            ix,
            iy,
            iz,
            x: f64::from(ix),
            y: f64::from(iy),
            z: f64::from(iz),
            on: false,
            color,
        }
    }

    pub fn set_state(&mut self, color: Rgb, on: bool) {
        self.color = color;
        self.on = on;
    }

    pub fn state(&self) -> (Rgb, bool) {
        (self.color, self.on)
    }
}

/// Construction parameters for a buffer.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// Dimensions `[nx, ny, nz]` of each half grid.
    pub half_dims: [usize; 3],
    /// Grid and spatial x offset of the right half relative to the left.
    pub right_x_offset: i32,
}

impl Layout {
    /// The physical installation: two 5x10x5 towers separated by eight units
    /// of space, wired as 50 strings of 10 lights.
    pub fn double_tower() -> Self {
        Self {
            half_dims: [5, 10, 5],
            right_x_offset: 12,
        }
    }

    /// Number of wiring strings: one per (x, z) column of each half.
    pub fn string_count(&self) -> usize {
        2 * self.half_dims[0] * self.half_dims[2]
    }

    /// Lights per string: one per y level, wired top-down.
    pub fn string_len(&self) -> usize {
        self.half_dims[1]
    }
}

// Initial per-layer white shades, dimmest at the front layer.
const WHITES: [Rgb; 5] = [
    Rgb::new(155, 155, 155),
    Rgb::new(180, 180, 180),
    Rgb::new(205, 205, 205),
    Rgb::new(230, 230, 230),
    color::WHITE,
];

/// A 3D index table over the cell arena.
#[derive(Debug, Clone)]
struct Grid {
    dims: [usize; 3],
    index: Vec<u32>,
}

impl Grid {
    fn new(dims: [usize; 3]) -> Self {
        Self {
            dims,
            index: vec![0; dims[0] * dims[1] * dims[2]],
        }
    }

    fn slot(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (ix * self.dims[1] + iy) * self.dims[2] + iz
    }

    fn at(&self, ix: usize, iy: usize, iz: usize) -> usize {
        self.index[self.slot(ix, iy, iz)] as usize
    }

    fn set(&mut self, ix: usize, iy: usize, iz: usize, id: u32) {
        let slot = self.slot(ix, iy, iz);
        self.index[slot] = id;
    }
}

/// The strings view: `[string][position]`, in physical wiring order.
#[derive(Debug, Clone)]
struct Strings {
    count: usize,
    length: usize,
    index: Vec<u32>,
}

impl Strings {
    fn new(count: usize, length: usize) -> Self {
        Self {
            count,
            length,
            index: vec![0; count * length],
        }
    }

    fn at(&self, string: usize, position: usize) -> usize {
        self.index[string * self.length + position] as usize
    }

    fn set(&mut self, string: usize, position: usize, id: u32) {
        self.index[string * self.length + position] = id;
    }
}

/// The buffer: cell arena plus the addressing views over it.
#[derive(Debug)]
pub struct LightBuffer {
    layout: Layout,
    cells: Vec<Light>,
    all: Grid,
    left: Grid,
    right: Grid,
    strings: Strings,
    temps: TempPool,
}

impl LightBuffer {
    /// Build the buffer for the given layout.
    ///
    /// Cells start off, shaded white by z layer so an idle viewer still shows
    /// the structure.
    pub fn new(layout: Layout) -> Self {
        let [nx, ny, nz] = layout.half_dims;
        let mut cells = Vec::with_capacity(2 * nx * ny * nz);
        let mut all = Grid::new([2 * nx, ny, nz]);
        let mut left = Grid::new([nx, ny, nz]);
        let mut right = Grid::new([nx, ny, nz]);
        let mut strings = Strings::new(layout.string_count(), layout.string_len());
        let half_strings = nx * nz;

        for ix in 0..nx {
            for iy in 0..ny {
                for iz in 0..nz {
                    let shade = WHITES[iz.min(WHITES.len() - 1)];

                    let id = cells.len() as u32;
                    cells.push(Light::new(ix as i32, iy as i32, iz as i32, shade));
                    all.set(ix, iy, iz, id);
                    left.set(ix, iy, iz, id);
                    strings.set(ix + nx * iz, (ny - 1) - iy, id);

                    let id = cells.len() as u32;
                    cells.push(Light::new(
                        ix as i32 + layout.right_x_offset,
                        iy as i32,
                        iz as i32,
                        shade,
                    ));
                    all.set(ix + nx, iy, iz, id);
                    right.set(ix, iy, iz, id);
                    strings.set(half_strings + ix + nx * iz, (ny - 1) - iy, id);
                }
            }
        }

        Self {
            layout,
            cells,
            all,
            left,
            right,
            strings,
            temps: TempPool::default(),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    // ----- cell access ------------------------------------------------

    /// All cells in construction order.
    pub fn lights(&self) -> &[Light] {
        &self.cells
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.cells
    }

    /// Dimensions of a 3D view.
    pub fn dims(&self, grid: GridId) -> [usize; 3] {
        self.grid(grid).dims
    }

    /// Cell at a grid position. Panics if the position is out of range.
    pub fn light(&self, grid: GridId, ix: usize, iy: usize, iz: usize) -> &Light {
        &self.cells[self.grid(grid).at(ix, iy, iz)]
    }

    pub fn light_mut(&mut self, grid: GridId, ix: usize, iy: usize, iz: usize) -> &mut Light {
        let id = self.grid(grid).at(ix, iy, iz);
        &mut self.cells[id]
    }

    pub fn string_count(&self) -> usize {
        self.strings.count
    }

    pub fn string_len(&self) -> usize {
        self.strings.length
    }

    /// Cell at a position of a wiring string. Panics if out of range.
    pub fn string_light(&self, string: usize, position: usize) -> &Light {
        &self.cells[self.strings.at(string, position)]
    }

    pub fn string_light_mut(&mut self, string: usize, position: usize) -> &mut Light {
        let id = self.strings.at(string, position);
        &mut self.cells[id]
    }

    // ----- bulk fills -------------------------------------------------

    /// Set every cell in the buffer to the given color and on state.
    pub fn fill(&mut self, color: Rgb, on: bool) {
        for cell in &mut self.cells {
            cell.set_state(color, on);
        }
    }

    /// Set every cell of one 3D view.
    pub fn fill_grid(&mut self, grid: GridId, color: Rgb, on: bool) {
        let (g, cells, _) = self.view_parts(grid);
        let [nx, ny, nz] = g.dims;
        for ix in 0..nx {
            for iy in 0..ny {
                for iz in 0..nz {
                    cells[g.at(ix, iy, iz)].set_state(color, on);
                }
            }
        }
    }

    /// Return every cell to the idle state: light gray, off.
    pub fn reset(&mut self) {
        self.fill(color::LIGHT_GRAY, false);
    }

    // ----- plane operations -------------------------------------------

    /// Fill the plane perpendicular to `axis` at `index` within a view.
    ///
    /// Silently does nothing when the index is out of range or the view has a
    /// zero dimension; use [`try_fill_plane`](Self::try_fill_plane) to observe
    /// the failure.
    pub fn fill_plane(&mut self, axis: Axis, index: i32, grid: GridId, color: Rgb, on: bool) {
        if let Err(err) = self.try_fill_plane(axis, index, grid, color, on) {
            log::debug!("fill_plane ignored: {err}");
        }
    }

    pub fn try_fill_plane(
        &mut self,
        axis: Axis,
        index: i32,
        grid: GridId,
        color: Rgb,
        on: bool,
    ) -> Result<(), GeometryError> {
        let (g, cells, _) = self.view_parts(grid);
        let dims = g.dims;
        if dims.contains(&0) {
            return Err(GeometryError::EmptyView);
        }
        let idx = plane_index(axis, index, axis.extent_of(dims))?;
        let (pn, pm) = axis.plane_dims(dims);
        for a in 0..pn {
            for b in 0..pm {
                let (ix, iy, iz) = axis.plane_cell(idx, a, b);
                cells[g.at(ix, iy, iz)].set_state(color, on);
            }
        }
        Ok(())
    }

    /// Copy a plane's state into a pooled temporary plane.
    ///
    /// Returns `None` on the same out-of-range conditions `fill_plane`
    /// swallows. The handle stays valid until [`release_temps`](Self::release_temps).
    pub fn save_plane(&mut self, axis: Axis, index: i32, grid: GridId) -> Option<PlaneHandle> {
        match self.try_save_plane(axis, index, grid) {
            Ok(plane) => Some(plane),
            Err(err) => {
                log::debug!("save_plane ignored: {err}");
                None
            }
        }
    }

    pub fn try_save_plane(
        &mut self,
        axis: Axis,
        index: i32,
        grid: GridId,
    ) -> Result<PlaneHandle, GeometryError> {
        let (g, cells, temps) = self.view_parts(grid);
        let dims = g.dims;
        if dims.contains(&0) {
            return Err(GeometryError::EmptyView);
        }
        let idx = plane_index(axis, index, axis.extent_of(dims))?;
        let (pn, pm) = axis.plane_dims(dims);
        let handle = temps.acquire(pn, pm);
        for a in 0..pn {
            for b in 0..pm {
                let (ix, iy, iz) = axis.plane_cell(idx, a, b);
                let (color, on) = cells[g.at(ix, iy, iz)].state();
                temps.set(&handle, a, b, color, on);
            }
        }
        Ok(handle)
    }

    /// Copy a saved plane's state into the buffer at the given position.
    ///
    /// The plane's dimensions must exactly match the destination plane;
    /// silently does nothing on a mismatch or an out-of-range index.
    pub fn set_plane(&mut self, plane: &PlaneHandle, axis: Axis, index: i32, grid: GridId) {
        if let Err(err) = self.try_set_plane(plane, axis, index, grid) {
            log::debug!("set_plane ignored: {err}");
        }
    }

    pub fn try_set_plane(
        &mut self,
        plane: &PlaneHandle,
        axis: Axis,
        index: i32,
        grid: GridId,
    ) -> Result<(), GeometryError> {
        let (g, cells, temps) = self.view_parts(grid);
        let dims = g.dims;
        if dims.contains(&0) {
            return Err(GeometryError::EmptyView);
        }
        let idx = plane_index(axis, index, axis.extent_of(dims))?;
        let (want_nx, want_ny) = axis.plane_dims(dims);
        let (got_nx, got_ny) = plane.dims();
        if (got_nx, got_ny) != (want_nx, want_ny) {
            return Err(GeometryError::PlaneDimensionMismatch {
                got_nx,
                got_ny,
                want_nx,
                want_ny,
            });
        }
        for a in 0..want_nx {
            for b in 0..want_ny {
                let (ix, iy, iz) = axis.plane_cell(idx, a, b);
                let (color, on) = temps.get(plane, a, b);
                cells[g.at(ix, iy, iz)].set_state(color, on);
            }
        }
        Ok(())
    }

    // ----- shifts -----------------------------------------------------

    /// Shift every plane along `axis` by one position, with wraparound: the
    /// plane pushed off one end reappears at the other.
    ///
    /// `shift` must be `-1` or `+1`; anything else, a zero-dimension view, or
    /// an axis extent below 2 makes this a no-op. Cell positions never move;
    /// only `(color, on)` state relocates between them.
    pub fn shift_axis(&mut self, axis: Axis, shift: i32, grid: GridId) {
        if shift != -1 && shift != 1 {
            return;
        }
        let dims = self.dims(grid);
        if dims.contains(&0) {
            return;
        }
        let extent = axis.extent_of(dims) as i32;
        if extent < 2 {
            return;
        }
        let last = extent - 1;
        let (mut src, mut dst, save_at, restore_at) = if shift == -1 {
            (1, 0, 0, last)
        } else {
            (last - 1, last, last, 0)
        };

        // Save the boundary plane that wraps around.
        let Some(saved) = self.save_plane(axis, save_at, grid) else {
            return;
        };

        // Relocate interior planes, scanning away from the saved boundary so
        // no plane is read after it has been overwritten.
        for _ in 0..last {
            self.copy_plane_state(axis, src as usize, dst as usize, grid);
            src -= shift;
            dst -= shift;
        }

        self.set_plane(&saved, axis, restore_at, grid);
        self.release_temps();
    }

    /// Shift like [`shift_axis`](Self::shift_axis), but blank the vacated
    /// boundary plane instead of wrapping: content exits permanently.
    pub fn shift_out_axis(&mut self, axis: Axis, shift: i32, grid: GridId) {
        if shift != -1 && shift != 1 {
            return;
        }
        let dims = self.dims(grid);
        if dims.contains(&0) {
            return;
        }
        let extent = axis.extent_of(dims) as i32;
        if extent < 2 {
            return;
        }
        let last = extent - 1;
        let (mut src, mut dst, vacated) = if shift == -1 {
            (1, 0, last)
        } else {
            (last - 1, last, 0)
        };

        for _ in 0..last {
            self.copy_plane_state(axis, src as usize, dst as usize, grid);
            src -= shift;
            dst -= shift;
        }

        self.fill_plane(axis, vacated, grid, color::BLACK, false);
    }

    // ----- temp pool --------------------------------------------------

    /// Acquire a scratch plane from the temp pool, for callers that build a
    /// plane by hand before [`set_plane`](Self::set_plane). Returns `None`
    /// for a zero dimension.
    pub fn acquire_temp_plane(&mut self, nx: usize, ny: usize) -> Option<PlaneHandle> {
        if nx == 0 || ny == 0 {
            return None;
        }
        Some(self.temps.acquire(nx, ny))
    }

    /// Release every outstanding temporary plane in one call.
    pub fn release_temps(&mut self) {
        self.temps.release_all();
    }

    /// Write one slot of a temporary plane.
    pub fn temp_plane_set(&mut self, plane: &PlaneHandle, a: usize, b: usize, color: Rgb, on: bool) {
        self.temps.set(plane, a, b, color, on);
    }

    /// Read one slot of a temporary plane.
    pub fn temp_plane_get(&self, plane: &PlaneHandle, a: usize, b: usize) -> (Rgb, bool) {
        self.temps.get(plane, a, b)
    }

    // ----- internals --------------------------------------------------

    fn grid(&self, grid: GridId) -> &Grid {
        match grid {
            GridId::All => &self.all,
            GridId::Left => &self.left,
            GridId::Right => &self.right,
        }
    }

    fn view_parts(&mut self, grid: GridId) -> (&Grid, &mut [Light], &mut TempPool) {
        match grid {
            GridId::All => (&self.all, self.cells.as_mut_slice(), &mut self.temps),
            GridId::Left => (&self.left, self.cells.as_mut_slice(), &mut self.temps),
            GridId::Right => (&self.right, self.cells.as_mut_slice(), &mut self.temps),
        }
    }

    fn copy_plane_state(&mut self, axis: Axis, src: usize, dst: usize, grid: GridId) {
        let (g, cells, _) = self.view_parts(grid);
        let (pn, pm) = axis.plane_dims(g.dims);
        for a in 0..pn {
            for b in 0..pm {
                let (sx, sy, sz) = axis.plane_cell(src, a, b);
                let (dx, dy, dz) = axis.plane_cell(dst, a, b);
                let (color, on) = cells[g.at(sx, sy, sz)].state();
                cells[g.at(dx, dy, dz)].set_state(color, on);
            }
        }
    }
}

fn plane_index(axis: Axis, index: i32, extent: usize) -> Result<usize, GeometryError> {
    match usize::try_from(index) {
        Ok(idx) if idx < extent => Ok(idx),
        _ => Err(GeometryError::PlaneIndexOutOfRange {
            axis,
            index,
            extent,
        }),
    }
}
