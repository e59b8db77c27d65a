// Archivo: grid.rs
// Propósito: modelo de la grilla de colocación de un sac. Cada pieza ocupa
// la celda `position_index` (fila mayor); la vista sólo necesita saber qué
// celdas están instaladas, en espera o vacías.
use serde::{Deserialize, Serialize};
use std::fmt;
use wagon_domain::{InventoryError, Piece, PieceId, PieceState, Result};

pub const DEFAULT_ROWS: usize = 4;
pub const DEFAULT_COLUMNS: usize = 4;

/// Dimensiones de la grilla. Ambas deben ser al menos 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    rows: usize,
    columns: usize,
}

impl GridLayout {
    pub fn new(rows: usize, columns: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(InventoryError::validation(format!("grilla inválida: {}x{}", rows, columns)));
        }
        Ok(Self { rows, columns })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.columns
    }

    pub fn contains(&self, index: i32) -> bool {
        usize::try_from(index).map(|i| i < self.cell_count()).unwrap_or(false)
    }

    /// `(fila, columna)` de una celda, `None` fuera de la grilla.
    pub fn coordinates(&self, index: i32) -> Option<(usize, usize)> {
        if !self.contains(index) {
            return None;
        }
        let i = usize::try_from(index).ok()?;
        Some((i / self.columns, i % self.columns))
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { rows: DEFAULT_ROWS, columns: DEFAULT_COLUMNS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStatus {
    Empty,
    Waiting,
    Installed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub index: usize,
    pub row: usize,
    pub column: usize,
    pub status: CellStatus,
    /// La celda contiene la pieza resaltada (la recién escaneada).
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGrid {
    layout: GridLayout,
    cells: Vec<GridCell>,
}

impl PlacementGrid {
    /// Coloca las piezas por `position_index`. Si dos piezas comparten celda,
    /// una instalada gana sobre una en espera. Las posiciones fuera de la
    /// grilla se ignoran.
    pub fn build(layout: GridLayout, pieces: &[Piece], highlighted: Option<PieceId>) -> Self {
        let mut cells: Vec<GridCell> = (0..layout.cell_count()).map(|index| GridCell { index,
                                                                                      row: index / layout.columns,
                                                                                      column: index % layout.columns,
                                                                                      status: CellStatus::Empty,
                                                                                      highlighted: false })
                                                               .collect();
        for piece in pieces {
            let Some(index) = usize::try_from(piece.position_index).ok().filter(|i| *i < cells.len()) else {
                log::debug!("pieza {} en posición {} fuera de la grilla {}x{}",
                            piece.code,
                            piece.position_index,
                            layout.rows,
                            layout.columns);
                continue;
            };
            let cell = &mut cells[index];
            match piece.state {
                PieceState::Installed => cell.status = CellStatus::Installed,
                PieceState::OnWait if cell.status != CellStatus::Installed => cell.status = CellStatus::Waiting,
                _ => {}
            }
            if highlighted == Some(piece.id) {
                cell.highlighted = true;
            }
        }
        Self { layout, cells }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn status_at(&self, index: usize) -> Option<CellStatus> {
        self.cells.get(index).map(|c| c.status)
    }

    pub fn installed_indices(&self) -> Vec<usize> {
        self.indices_with(CellStatus::Installed)
    }

    pub fn waiting_indices(&self) -> Vec<usize> {
        self.indices_with(CellStatus::Waiting)
    }

    fn indices_with(&self, status: CellStatus) -> Vec<usize> {
        self.cells.iter().filter(|c| c.status == status).map(|c| c.index).collect()
    }
}

// Render de texto para la consola: `#` instalada, `o` en espera, `.` vacía;
// la celda resaltada va entre corchetes.
impl fmt::Display for PlacementGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.layout.columns) {
            let line: Vec<String> = row.iter()
                                       .map(|c| {
                                           let symbol = match c.status {
                                               CellStatus::Empty => '.',
                                               CellStatus::Waiting => 'o',
                                               CellStatus::Installed => '#',
                                           };
                                           if c.highlighted {
                                               format!("[{}]", symbol)
                                           } else {
                                               format!(" {} ", symbol)
                                           }
                                       })
                                       .collect();
            writeln!(f, "{}", line.join(""))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn piece(id: i32, position_index: i32, state: PieceState) -> Piece {
        Piece { id,
                code: format!("P{}", id),
                state,
                prioritaire: false,
                position_index,
                sac_id: 1,
                created_at: Utc::now() }
    }

    #[test]
    fn layout_rejects_empty_dimensions() {
        assert!(matches!(GridLayout::new(0, 4), Err(InventoryError::Validation(_))));
        assert!(matches!(GridLayout::new(4, 0), Err(InventoryError::Validation(_))));
        let layout = GridLayout::new(3, 5).unwrap();
        assert_eq!(layout.cell_count(), 15);
        assert_eq!(layout.coordinates(7), Some((1, 2)));
        assert_eq!(layout.coordinates(15), None);
        assert!(!layout.contains(-1));
        assert_eq!(GridLayout::default().cell_count(), 16);
    }

    #[test]
    fn installed_wins_over_waiting_and_out_of_range_is_ignored() {
        let pieces = vec![piece(1, 0, PieceState::OnWait),
                          piece(2, 0, PieceState::Installed),
                          piece(3, 5, PieceState::OnWait),
                          piece(4, 6, PieceState::Uninstalled),
                          piece(5, 99, PieceState::Installed)];
        let grid = PlacementGrid::build(GridLayout::default(), &pieces, Some(3));
        assert_eq!(grid.installed_indices(), vec![0]);
        assert_eq!(grid.waiting_indices(), vec![5]);
        assert_eq!(grid.status_at(6), Some(CellStatus::Empty));
        assert!(grid.cells()[5].highlighted);
        assert_eq!(grid.cells().len(), 16);
        let rendered = grid.to_string();
        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.starts_with(" # "));
        assert!(rendered.contains("[o]"));
    }
}
