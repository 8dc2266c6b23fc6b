// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Keyboard navigation over a [`Grid`].
//!
//! The controller owns a `{row, col}` pointer and a mode. In `Nav` the arrow
//! keys move the pointer between navigable cells; in `Edit` focus sits in one
//! of the cell's inputs and arrows belong to that input. Missing neighbours
//! are never an error: the pointer just stays put.

use tracing::{debug, warn};

use crate::AppMode;
use crate::grid::{CellAction, CellContent, CellPos, Grid, GridCell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Arrow(Direction),
    Tab,
    BackTab,
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved(CellPos),
    EditStarted { pos: CellPos, input: usize },
    EditEnded(CellPos),
    Action(CellAction),
    /// The key belongs to the focused input.
    PassThrough,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationController {
    focused: Option<CellPos>,
    mode: AppMode,
    editing_input: Option<usize>,
    tab_ease_up: bool,
    ease_up_enabled: bool,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NavigationController {
    pub const fn new(ease_up_enabled: bool) -> Self {
        Self {
            focused: None,
            mode: AppMode::Nav,
            editing_input: None,
            tab_ease_up: false,
            ease_up_enabled,
        }
    }

    pub const fn mode(&self) -> AppMode {
        self.mode
    }

    pub const fn focused(&self) -> Option<CellPos> {
        self.focused
    }

    pub const fn editing_input(&self) -> Option<usize> {
        self.editing_input
    }

    /// Places the pointer on the first navigable cell unless it already
    /// points at a live one.
    pub fn seed(&mut self, grid: &Grid) {
        if self.focused.is_some_and(|pos| grid.is_navigable(pos)) {
            return;
        }
        if let Some(pos) = grid.first_navigable() {
            debug!(row = pos.row, col = pos.col, "seeding focus");
            self.focused = Some(pos);
        }
    }

    pub fn reset(&mut self, grid: &Grid) {
        self.focused = None;
        self.mode = AppMode::Nav;
        self.editing_input = None;
        self.tab_ease_up = false;
        self.seed(grid);
    }

    /// Click on a cell. Non-navigable targets leave the pointer alone.
    pub fn focus_cell(&mut self, pos: CellPos, grid: &Grid) -> NavOutcome {
        if !grid.is_navigable(pos) {
            return NavOutcome::Unchanged;
        }
        self.leave_edit();
        self.assign_focus(pos, grid)
    }

    /// Click inside one of a cell's inputs.
    pub fn focus_input(&mut self, pos: CellPos, input: usize, grid: &Grid) -> NavOutcome {
        let focusable = grid
            .cell(pos)
            .and_then(|cell| cell.inputs().get(input))
            .is_some_and(|control| control.focusable());
        if !focusable {
            return self.focus_cell(pos, grid);
        }
        self.focused = Some(pos);
        self.enter_edit(pos, input)
    }

    /// Leaves `Edit` without moving the pointer.
    pub fn leave_edit(&mut self) {
        self.mode = AppMode::Nav;
        self.editing_input = None;
    }

    pub fn handle_key(&mut self, key: NavKey, grid: &Grid) -> NavOutcome {
        match (self.mode, key) {
            (AppMode::Edit, NavKey::Arrow(_) | NavKey::Enter) => NavOutcome::PassThrough,
            (AppMode::Edit, NavKey::Escape) => {
                self.leave_edit();
                match self.focused {
                    Some(pos) => NavOutcome::EditEnded(pos),
                    None => NavOutcome::Unchanged,
                }
            }
            (AppMode::Nav, NavKey::Escape) => NavOutcome::Unchanged,
            (_, NavKey::Tab) => self.tab(grid, true),
            (_, NavKey::BackTab) => self.tab(grid, false),
            (AppMode::Nav, NavKey::Enter) => self.enter(grid),
            (AppMode::Nav, NavKey::Arrow(direction)) => self.arrow(direction, grid),
        }
    }

    fn arrow(&mut self, direction: Direction, grid: &Grid) -> NavOutcome {
        let Some(current) = self.focused else {
            return self.reacquire(None, grid);
        };
        if !grid.is_navigable(current) {
            return self.reacquire(Some(current), grid);
        }
        match navigate(grid, current, direction) {
            Some(target) => self.assign_focus(target, grid),
            None => NavOutcome::Unchanged,
        }
    }

    fn tab(&mut self, grid: &Grid, forward: bool) -> NavOutcome {
        self.leave_edit();
        let next = match self.focused.filter(|pos| grid.is_navigable(*pos)) {
            Some(current) => tab_target(grid, current, forward),
            None => grid.first_navigable(),
        };
        let Some(next) = next else {
            return NavOutcome::Unchanged;
        };
        self.tab_ease_up = true;
        self.assign_focus(next, grid)
    }

    fn enter(&mut self, grid: &Grid) -> NavOutcome {
        let Some(pos) = self.focused else {
            return NavOutcome::Unchanged;
        };
        let Some(cell) = grid.cell(pos).filter(|_| grid.is_navigable(pos)) else {
            warn!(row = pos.row, col = pos.col, "focused cell is gone");
            return NavOutcome::Unchanged;
        };
        match &cell.content {
            CellContent::Inputs(inputs) => match inputs.iter().position(|input| input.focusable()) {
                Some(input) => self.enter_edit(pos, input),
                None => NavOutcome::Unchanged,
            },
            CellContent::Action(action) => NavOutcome::Action(*action),
            CellContent::Plain => NavOutcome::Unchanged,
        }
    }

    fn assign_focus(&mut self, pos: CellPos, grid: &Grid) -> NavOutcome {
        let ease_up = std::mem::take(&mut self.tab_ease_up) && self.ease_up_enabled;
        self.focused = Some(pos);

        // callers leave `Edit` first, so no input of `pos` holds focus here
        if ease_up && let Some(input) = grid.cell(pos).and_then(single_eligible_input) {
            return self.enter_edit(pos, input);
        }
        NavOutcome::Moved(pos)
    }

    fn enter_edit(&mut self, pos: CellPos, input: usize) -> NavOutcome {
        self.mode = AppMode::Edit;
        self.editing_input = Some(input);
        NavOutcome::EditStarted { pos, input }
    }

    fn reacquire(&mut self, stale: Option<CellPos>, grid: &Grid) -> NavOutcome {
        let target = stale
            .and_then(|pos| nearest_navigable_row(grid, pos.row))
            .or_else(|| grid.first_navigable());
        match target {
            Some(pos) => {
                warn!(
                    stale = ?stale,
                    row = pos.row,
                    col = pos.col,
                    "focus pointer was stale; reacquired"
                );
                self.assign_focus(pos, grid)
            }
            None => NavOutcome::Unchanged,
        }
    }
}

/// Target of an arrow key from `current`, or `None` when there is nowhere to go.
pub fn navigate(grid: &Grid, current: CellPos, direction: Direction) -> Option<CellPos> {
    match direction {
        Direction::Left => horizontal_target(grid, current, false),
        Direction::Right => horizontal_target(grid, current, true),
        Direction::Up => vertical_target(grid, current, false),
        Direction::Down => vertical_target(grid, current, true),
    }
}

fn horizontal_target(grid: &Grid, current: CellPos, forward: bool) -> Option<CellPos> {
    let row = grid.row(current.row)?;
    let col = if forward {
        (current.col + 1..row.cells.len()).find(|col| row.cells[*col].navigable)
    } else {
        (0..current.col.min(row.cells.len()))
            .rev()
            .find(|col| row.cells[*col].navigable)
    }?;
    Some(CellPos::new(current.row, col))
}

fn vertical_target(grid: &Grid, current: CellPos, forward: bool) -> Option<CellPos> {
    let kind = grid.row(current.row)?.kind;
    let mut index = current.row;
    loop {
        index = if forward {
            index + 1
        } else {
            index.checked_sub(1)?
        };
        let row = grid.row(index)?;
        // Header rows and rows without focusable cells (including the header
        // of an empty group) are stepped over.
        if !row.is_navigable() {
            continue;
        }
        let same_column = row.kind == kind
            && row
                .cell(current.col)
                .is_some_and(|cell| cell.navigable);
        let col = if same_column {
            current.col
        } else {
            row.first_navigable()?
        };
        if row.group != grid.row(current.row)?.group {
            debug!(from = current.row, to = index, "crossing row group");
        }
        return Some(CellPos::new(index, col));
    }
}

fn tab_target(grid: &Grid, current: CellPos, forward: bool) -> Option<CellPos> {
    if let Some(pos) = horizontal_target(grid, current, forward) {
        return Some(pos);
    }
    if forward {
        (current.row + 1..grid.rows().len()).find_map(|index| {
            let row = grid.row(index)?;
            row.is_navigable()
                .then(|| row.first_navigable().map(|col| CellPos::new(index, col)))
                .flatten()
        })
    } else {
        (0..current.row).rev().find_map(|index| {
            let row = grid.row(index)?;
            row.is_navigable()
                .then(|| row.last_navigable().map(|col| CellPos::new(index, col)))
                .flatten()
        })
    }
}

fn nearest_navigable_row(grid: &Grid, row: usize) -> Option<CellPos> {
    let last = grid.rows().len().checked_sub(1)?;
    let start = row.min(last);
    let backward = (0..=start).rev();
    let forward = start + 1..=last;
    backward.chain(forward).find_map(|index| {
        let row = grid.row(index)?;
        row.is_navigable()
            .then(|| row.first_navigable().map(|col| CellPos::new(index, col)))
            .flatten()
    })
}

fn single_eligible_input(cell: &GridCell) -> Option<usize> {
    let mut eligible = cell
        .inputs()
        .iter()
        .enumerate()
        .filter(|(_, input)| input.focusable())
        .map(|(index, _)| index);
    let first = eligible.next()?;
    eligible.next().is_none().then_some(first)
}
