pub mod key;

use tracing::debug;

use crate::config::TextDirection;
use crate::index::{CellId, CellIndex, RowPos};
use crate::row::RowKey;

pub use key::NavKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardMode {
    /// Arrow keys move between cells
    #[default]
    Navigation,
    /// Focus is inside the active cell's buttons or links
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDirection {
    Forward,
    Backward,
}

/// What a key press did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Moved { from: Option<CellId>, to: CellId },
    EnterAction { cell: CellId, element: usize },
    /// Focus moved to another actionable element of the same cell
    ActionElement { cell: CellId, element: usize },
    ExitAction { cell: CellId },
    /// Tab past the last cell or Shift-Tab before the first
    ExitGrid(ExitDirection),
    RowFocused(RowKey),
    Expand(RowKey),
    Collapse(RowKey),
    /// Enter or Space on an actionable element
    Activate { cell: CellId, element: usize },
    Edit(CellId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Down,
    Left,
    Right,
}

/// Keyboard focus state of the grid.
///
/// The header row is row -1 and is skipped entirely while hidden. Row mode
/// only applies to hierarchical data: the whole row holds focus and Left and
/// Right collapse, expand or move to the parent.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    mode: KeyboardMode,
    active: Option<CellId>,
    action_element: usize,
    row_mode: Option<RowKey>,
    /// Grid position of the last active cell, to recover after a rebuild
    last_position: Option<(RowPos, usize)>,
    direction: TextDirection,
    header_hidden: bool,
}

impl KeyboardState {
    pub fn new(direction: TextDirection, header_hidden: bool) -> Self {
        Self { direction, header_hidden, ..Default::default() }
    }

    pub fn mode(&self) -> KeyboardMode {
        self.mode
    }

    pub fn active(&self) -> Option<&CellId> {
        self.active.as_ref()
    }

    pub fn action_element(&self) -> Option<usize> {
        match self.mode {
            KeyboardMode::Action => Some(self.action_element),
            KeyboardMode::Navigation => None,
        }
    }

    pub fn row_mode(&self) -> Option<&RowKey> {
        self.row_mode.as_ref()
    }

    pub fn set_direction(&mut self, direction: TextDirection) {
        self.direction = direction;
    }

    pub fn set_header_hidden(&mut self, hidden: bool) {
        self.header_hidden = hidden;
    }

    fn set_active(&mut self, cell: CellId, index: &CellIndex) {
        self.last_position = index.position_of(&cell);
        self.active = Some(cell);
    }

    /// Focus a cell directly, e.g. on click. Stale cells are ignored.
    pub fn focus_cell(&mut self, cell: &CellId, index: &CellIndex) -> Option<KeyOutcome> {
        if !index.contains(cell) || (cell.is_header() && self.header_hidden) {
            return None;
        }
        let from = self.active.clone();
        self.mode = KeyboardMode::Navigation;
        self.row_mode = None;
        self.set_active(cell.clone(), index);
        Some(KeyOutcome::Moved { from, to: cell.clone() })
    }

    /// Re-resolve the active cell after a rebuild. Returns the previous
    /// active cell when the active cell changed.
    pub fn reconcile(&mut self, index: &CellIndex) -> Option<Option<CellId>> {
        if self.row_mode.as_ref().is_some_and(|r| !index.contains_row(r)) {
            self.row_mode = None;
        }
        if let Some(active) = &self.active {
            if index.contains(active) && !(active.is_header() && self.header_hidden) {
                self.last_position = index.position_of(active);
                return None;
            }
        }

        let previous = self.active.take();
        self.mode = KeyboardMode::Navigation;
        self.action_element = 0;
        let next = self
            .last_position
            .and_then(|pos| self.clamp_position(pos, index))
            .or_else(|| self.default_cell(index));

        debug!(?previous, ?next, "active cell re-resolved");
        if let Some(cell) = next {
            self.set_active(cell, index);
        }
        if previous == self.active {
            None
        } else {
            Some(previous)
        }
    }

    fn clamp_position(&self, (row, col): (RowPos, usize), index: &CellIndex) -> Option<CellId> {
        if index.column_count() == 0 {
            return None;
        }
        let col = col.min(index.column_count() - 1);
        let row = match row {
            RowPos::Header if !self.header_hidden => RowPos::Header,
            RowPos::Header => RowPos::Data(0),
            RowPos::Data(r) if index.row_count() > 0 => RowPos::Data(r.min(index.row_count() - 1)),
            RowPos::Data(_) if !self.header_hidden => RowPos::Header,
            RowPos::Data(_) => return None,
        };
        index.cell_id_at(row, col)
    }

    /// First data cell, else the first header cell
    fn default_cell(&self, index: &CellIndex) -> Option<CellId> {
        index.cell_id_at(RowPos::Data(0), 0).or_else(|| {
            if self.header_hidden {
                None
            } else {
                index.cell_id_at(RowPos::Header, 0)
            }
        })
    }

    fn mirrored(&self, step: Step) -> Step {
        match (self.direction, step) {
            (TextDirection::Rtl, Step::Left) => Step::Right,
            (TextDirection::Rtl, Step::Right) => Step::Left,
            (_, step) => step,
        }
    }

    /// Cell one step away from `pos`, if any
    fn neighbor(&self, (row, col): (RowPos, usize), step: Step, index: &CellIndex) -> Option<CellId> {
        let (row, col) = match (step, row) {
            (Step::Up, RowPos::Header) => return None,
            (Step::Up, RowPos::Data(0)) if self.header_hidden => return None,
            (Step::Up, RowPos::Data(0)) => (RowPos::Header, col),
            (Step::Up, RowPos::Data(r)) => (RowPos::Data(r - 1), col),
            (Step::Down, RowPos::Header) => (RowPos::Data(0), col),
            (Step::Down, RowPos::Data(r)) => (RowPos::Data(r + 1), col),
            (Step::Left, row) => (row, col.checked_sub(1)?),
            (Step::Right, row) => (row, col + 1),
        };
        index.cell_id_at(row, col)
    }

    /// Next cell in reading order, None past either end of the grid
    fn tab_target(&self, (row, col): (RowPos, usize), forward: bool, index: &CellIndex) -> Option<CellId> {
        let last_col = index.column_count().checked_sub(1)?;
        let (row, col) = if forward {
            if col < last_col {
                (row, col + 1)
            } else {
                match row {
                    RowPos::Header => (RowPos::Data(0), 0),
                    RowPos::Data(r) => (RowPos::Data(r + 1), 0),
                }
            }
        } else if col > 0 {
            (row, col - 1)
        } else {
            match row {
                RowPos::Header => return None,
                RowPos::Data(0) if self.header_hidden => return None,
                RowPos::Data(0) => (RowPos::Header, last_col),
                RowPos::Data(r) => (RowPos::Data(r - 1), last_col),
            }
        };
        index.cell_id_at(row, col)
    }

    fn move_to(&mut self, to: CellId, index: &CellIndex) -> KeyOutcome {
        let from = self.active.clone();
        self.set_active(to.clone(), index);
        KeyOutcome::Moved { from, to }
    }

    pub fn handle_key(&mut self, key: NavKey, index: &CellIndex) -> KeyOutcome {
        if let Some(row) = self.row_mode.clone() {
            return self.handle_row_mode(key, row, index);
        }
        let Some(active) = self.active.clone() else {
            return match self.default_cell(index) {
                Some(cell) if key != NavKey::Other => self.move_to(cell, index),
                _ => KeyOutcome::Ignored,
            };
        };
        let Some(pos) = index.position_of(&active) else {
            return KeyOutcome::Ignored;
        };
        match self.mode {
            KeyboardMode::Navigation => self.handle_navigation(key, active, pos, index),
            KeyboardMode::Action => self.handle_action(key, active, pos, index),
        }
    }

    fn handle_navigation(&mut self, key: NavKey, active: CellId, pos: (RowPos, usize), index: &CellIndex) -> KeyOutcome {
        let step = match key {
            NavKey::Up => Step::Up,
            NavKey::Down => Step::Down,
            NavKey::Left => self.mirrored(Step::Left),
            NavKey::Right => self.mirrored(Step::Right),
            NavKey::Tab | NavKey::BackTab => {
                let forward = key == NavKey::Tab;
                return match self.tab_target(pos, forward, index) {
                    Some(to) => self.move_to(to, index),
                    None if forward => KeyOutcome::ExitGrid(ExitDirection::Forward),
                    None => KeyOutcome::ExitGrid(ExitDirection::Backward),
                };
            }
            NavKey::Home | NavKey::End => {
                let col = if key == NavKey::Home { 0 } else { index.column_count().saturating_sub(1) };
                return match index.cell_id_at(pos.0, col) {
                    Some(to) if to != active => self.move_to(to, index),
                    _ => KeyOutcome::Ignored,
                };
            }
            NavKey::Enter | NavKey::Space => {
                let editable = active
                    .row_key()
                    .and_then(|r| index.cell(r, &active.column))
                    .is_some_and(|c| c.editable);
                if editable && key == NavKey::Enter {
                    return KeyOutcome::Edit(active);
                }
                if index.actionable_elements(&active) == 0 {
                    return if editable { KeyOutcome::Edit(active) } else { KeyOutcome::Ignored };
                }
                self.mode = KeyboardMode::Action;
                self.action_element = 0;
                return KeyOutcome::EnterAction { cell: active, element: 0 };
            }
            NavKey::Escape | NavKey::Other => return KeyOutcome::Ignored,
        };

        // Left from the first column of a tree row focuses the row
        if step == Step::Left && pos.1 == 0 {
            if let Some(row) = active.row_key().and_then(|k| index.row(k)) {
                if row.tree.is_some() {
                    self.row_mode = Some(row.key.clone());
                    return KeyOutcome::RowFocused(row.key.clone());
                }
            }
        }

        match self.neighbor(pos, step, index) {
            Some(to) => self.move_to(to, index),
            None => KeyOutcome::Ignored,
        }
    }

    fn handle_action(&mut self, key: NavKey, active: CellId, pos: (RowPos, usize), index: &CellIndex) -> KeyOutcome {
        let elements = index.actionable_elements(&active).max(1);
        match key {
            NavKey::Escape => {
                self.mode = KeyboardMode::Navigation;
                KeyOutcome::ExitAction { cell: active }
            }
            NavKey::Left | NavKey::Right => {
                let forward = self.mirrored(if key == NavKey::Right { Step::Right } else { Step::Left }) == Step::Right;
                self.action_element = if forward {
                    (self.action_element + 1) % elements
                } else {
                    (self.action_element + elements - 1) % elements
                };
                KeyOutcome::ActionElement { cell: active, element: self.action_element }
            }
            NavKey::Enter | NavKey::Space => KeyOutcome::Activate { cell: active, element: self.action_element },
            NavKey::Up | NavKey::Down => {
                let step = if key == NavKey::Up { Step::Up } else { Step::Down };
                let Some(to) = self.neighbor(pos, step, index) else {
                    return KeyOutcome::Ignored;
                };
                // stay in action mode only where there is something to act on
                self.action_element = 0;
                if index.actionable_elements(&to) == 0 {
                    self.mode = KeyboardMode::Navigation;
                }
                self.move_to(to, index)
            }
            NavKey::Tab | NavKey::BackTab => {
                self.mode = KeyboardMode::Navigation;
                self.handle_navigation(key, active, pos, index)
            }
            NavKey::Home | NavKey::End | NavKey::Other => KeyOutcome::Ignored,
        }
    }

    fn handle_row_mode(&mut self, key: NavKey, row: RowKey, index: &CellIndex) -> KeyOutcome {
        let Some(record) = index.row(&row) else {
            self.row_mode = None;
            return KeyOutcome::Ignored;
        };
        let step = match key {
            NavKey::Left => self.mirrored(Step::Left),
            NavKey::Right => self.mirrored(Step::Right),
            NavKey::Up => Step::Up,
            NavKey::Down => Step::Down,
            NavKey::Tab | NavKey::BackTab | NavKey::Escape => {
                // leave row mode onto the row's first cell
                self.row_mode = None;
                return match index.cell_id_at(RowPos::Data(record.ordinal), 0) {
                    Some(to) => self.move_to(to, index),
                    None => KeyOutcome::Ignored,
                };
            }
            NavKey::Enter | NavKey::Space | NavKey::Home | NavKey::End | NavKey::Other => {
                return KeyOutcome::Ignored;
            }
        };

        match step {
            Step::Right if record.has_children() && !record.is_expanded() => KeyOutcome::Expand(row),
            Step::Right => {
                self.row_mode = None;
                match index.cell_id_at(RowPos::Data(record.ordinal), 0) {
                    Some(to) => self.move_to(to, index),
                    None => KeyOutcome::Ignored,
                }
            }
            Step::Left if record.is_expanded() => KeyOutcome::Collapse(row),
            Step::Left => match record.tree.as_ref().and_then(|t| t.parent.clone()) {
                Some(parent) => self.focus_row(parent, index),
                None => KeyOutcome::Ignored,
            },
            Step::Up | Step::Down => {
                let target = if step == Step::Up {
                    record.ordinal.checked_sub(1)
                } else {
                    Some(record.ordinal + 1)
                };
                match target.and_then(|i| index.row_at(i)) {
                    Some(next) => self.focus_row(next.key.clone(), index),
                    None => KeyOutcome::Ignored,
                }
            }
        }
    }

    fn focus_row(&mut self, row: RowKey, index: &CellIndex) -> KeyOutcome {
        let Some(record) = index.row(&row) else {
            return KeyOutcome::Ignored;
        };
        if let Some(cell) = index.cell_id_at(RowPos::Data(record.ordinal), 0) {
            self.set_active(cell, index);
        }
        self.row_mode = Some(row.clone());
        KeyOutcome::RowFocused(row)
    }
}
