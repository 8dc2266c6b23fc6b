// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use pdedit_app::money::{MoneyError, parse_required_amount};
use pdedit_app::{
    AppCommand, AppMode, AppState, CellPos, Direction as NavDirection, Grid, Intervention,
    KeyResponse, NavKey, NavOutcome, Panel, RowKind, Workbench, WorkbenchEvent,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const CURSOR_MARK: char = '▏';
const FIRST_COLUMN_MAX: usize = 40;
const COLUMN_MAX: usize = 16;
const COLUMN_MIN: usize = 4;

/// Storage seam between the editor and wherever the intervention lives.
pub trait AppRuntime {
    fn load_intervention(&mut self) -> Result<Intervention>;
    fn save_intervention(&mut self, intervention: &Intervention) -> Result<()>;
    fn source_label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

/// Text being typed into the focused cell. `cursor` counts chars.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditBuffer {
    pos: CellPos,
    text: String,
    cursor: usize,
}

impl EditBuffer {
    fn new(pos: CellPos, text: &str) -> Self {
        Self {
            pos,
            text: text.to_owned(),
            cursor: text.chars().count(),
        }
    }

    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map_or(self.text.len(), |(index, _)| index)
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn insert(&mut self, ch: char) {
        let index = self.byte_index();
        self.text.insert(index, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let index = self.byte_index();
        self.text.remove(index);
    }

    fn delete(&mut self) {
        if self.cursor >= self.len() {
            return;
        }
        let index = self.byte_index();
        self.text.remove(index);
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    fn display(&self) -> String {
        let mut shown = self.text.clone();
        shown.insert(self.byte_index(), CURSOR_MARK);
        shown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    edit: Option<EditBuffer>,
    status_token: u64,
    dirty: bool,
    quit_armed: bool,
    source: String,
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    workbench: &mut Workbench,
    runtime: &mut R,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        source: runtime.source_label(),
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    if workbench.panel() != state.panel {
        workbench.switch_panel(state.panel);
    }
    info!(source = %view_data.source, panel = state.panel.label(), "editor started");

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, workbench, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(POLL_INTERVAL).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(
                        state,
                        workbench,
                        runtime,
                        &mut view_data,
                        &internal_tx,
                        key,
                    ) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    info!("editor stopped");
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

/// Returns true when the editor should exit.
fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    workbench: &mut Workbench,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if state.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            state.dispatch(AppCommand::ToggleHelp);
        }
        return false;
    }

    if workbench.mode() == AppMode::Edit {
        handle_edit_key(state, workbench, view_data, internal_tx, key);
        return false;
    }

    if key.code != KeyCode::Char('q') {
        view_data.quit_armed = false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => {
            if view_data.dirty && !view_data.quit_armed {
                view_data.quit_armed = true;
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "unsaved changes; press s to save or q again to quit",
                );
                return false;
            }
            return true;
        }
        (KeyCode::Char('?'), _) => {
            state.dispatch(AppCommand::ToggleHelp);
            return false;
        }
        (KeyCode::Char('p'), KeyModifiers::NONE) => {
            switch_panel(state, workbench, view_data, internal_tx, AppCommand::NextPanel);
            return false;
        }
        (KeyCode::Char('P'), _) => {
            switch_panel(state, workbench, view_data, internal_tx, AppCommand::PrevPanel);
            return false;
        }
        (KeyCode::Char('s'), KeyModifiers::NONE) => {
            save(state, workbench, runtime, view_data, internal_tx);
            return false;
        }
        (KeyCode::Char('v'), KeyModifiers::NONE) => {
            let report = workbench.validate();
            let message = if report.is_valid() {
                "all rows valid".to_owned()
            } else {
                invalid_message(report.invalid_owners, report.invalid_items)
            };
            emit_status(state, view_data, internal_tx, message);
            return false;
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            reload(state, workbench, runtime, view_data, internal_tx);
            return false;
        }
        (KeyCode::Char('m'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::ToggleSummary);
            return false;
        }
        _ => {}
    }

    if let Some(nav_key) = nav_key_for(key) {
        let response = workbench.handle_key(nav_key);
        apply_response(state, workbench, view_data, internal_tx, response);
    }
    false
}

fn handle_edit_key(
    state: &mut AppState,
    workbench: &mut Workbench,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(mut buffer) = view_data.edit.take() else {
        warn!("edit mode without an edit buffer; leaving edit");
        workbench.handle_key(NavKey::Escape);
        return;
    };

    match key.code {
        KeyCode::Esc => {
            let response = workbench.handle_key(NavKey::Escape);
            if response.events.contains(&WorkbenchEvent::DialogClosed) {
                emit_status(state, view_data, internal_tx, "edit cancelled");
            }
            return;
        }
        KeyCode::Enter => {
            commit_buffer(state, workbench, view_data, internal_tx, &buffer);
            return;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            commit_buffer(state, workbench, view_data, internal_tx, &buffer);
            let nav_key = if key.code == KeyCode::Tab {
                NavKey::Tab
            } else {
                NavKey::BackTab
            };
            let response = workbench.handle_key(nav_key);
            apply_response(state, workbench, view_data, internal_tx, response);
            return;
        }
        KeyCode::Left => {
            workbench.handle_key(NavKey::Arrow(NavDirection::Left));
            buffer.move_left();
        }
        KeyCode::Right => {
            workbench.handle_key(NavKey::Arrow(NavDirection::Right));
            buffer.move_right();
        }
        KeyCode::Up | KeyCode::Down => {}
        KeyCode::Home => buffer.cursor = 0,
        KeyCode::End => buffer.cursor = buffer.len(),
        KeyCode::Backspace => buffer.backspace(),
        KeyCode::Delete => buffer.delete(),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.insert(ch);
        }
        _ => {}
    }
    view_data.edit = Some(buffer);
}

fn commit_buffer(
    state: &mut AppState,
    workbench: &mut Workbench,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    buffer: &EditBuffer,
) {
    let warning = amount_warning(workbench, buffer);
    let events = workbench.commit_edit(buffer.pos, &buffer.text);
    debug!(
        row = buffer.pos.row,
        col = buffer.pos.col,
        events = events.len(),
        "edit committed"
    );
    if let Some(message) = describe_events(&events) {
        view_data.dirty = true;
        let message = match warning {
            Some(warning) => format!("{message}; {warning}"),
            None => message,
        };
        emit_status(state, view_data, internal_tx, message);
    }
}

/// Empty amounts are allowed while typing; validation flags them later.
fn amount_warning(workbench: &Workbench, buffer: &EditBuffer) -> Option<String> {
    let field = workbench.grid().cell(buffer.pos)?.field?;
    if !field.is_amount() {
        return None;
    }
    match parse_required_amount(&buffer.text) {
        Err(error @ (MoneyError::InvalidNumber | MoneyError::Negative)) => {
            Some(format!("{error} {:?}", buffer.text))
        }
        Err(MoneyError::Empty) | Ok(_) => None,
    }
}

fn apply_response(
    state: &mut AppState,
    workbench: &Workbench,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    response: KeyResponse,
) {
    match response.outcome {
        NavOutcome::EditStarted { pos, .. } => {
            let text = workbench.cell_text(pos).unwrap_or_default();
            view_data.edit = Some(EditBuffer::new(pos, text));
        }
        NavOutcome::Action(_) => {
            if let Some(message) = describe_events(&response.events) {
                view_data.dirty = true;
                emit_status(state, view_data, internal_tx, message);
            }
        }
        NavOutcome::Moved(_)
        | NavOutcome::EditEnded(_)
        | NavOutcome::PassThrough
        | NavOutcome::Unchanged => {}
    }
}

fn switch_panel(
    state: &mut AppState,
    workbench: &mut Workbench,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    state.dispatch(command);
    workbench.switch_panel(state.panel);
    emit_status(state, view_data, internal_tx, state.panel.label());
}

fn save<R: AppRuntime>(
    state: &mut AppState,
    workbench: &mut Workbench,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let report = workbench.validate();
    if !report.is_valid() {
        warn!(
            invalid_owners = report.invalid_owners,
            invalid_items = report.invalid_items,
            "save refused"
        );
        let message = format!(
            "not saved: {}",
            invalid_message(report.invalid_owners, report.invalid_items)
        );
        emit_status(state, view_data, internal_tx, message);
        return;
    }

    match runtime.save_intervention(workbench.intervention()) {
        Ok(()) => {
            view_data.dirty = false;
            info!(source = %view_data.source, "intervention saved");
            let message = format!("saved to {}", view_data.source);
            emit_status(state, view_data, internal_tx, message);
        }
        Err(error) => {
            warn!(error = %format!("{error:#}"), "save failed");
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("save failed: {error:#}"),
            );
        }
    }
}

fn reload<R: AppRuntime>(
    state: &mut AppState,
    workbench: &mut Workbench,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match runtime.load_intervention() {
        Ok(intervention) => {
            workbench.replace_intervention(intervention);
            view_data.edit = None;
            view_data.dirty = false;
            info!(source = %view_data.source, "intervention reloaded");
            emit_status(state, view_data, internal_tx, "reloaded");
        }
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("reload failed: {error:#}"),
        ),
    }
}

fn invalid_message(owners: usize, items: usize) -> String {
    format!("{owners} invalid rows, {items} invalid items")
}

fn describe_events(events: &[WorkbenchEvent]) -> Option<String> {
    let message = match events.last()? {
        WorkbenchEvent::ItemChanged { .. } => "item updated".to_owned(),
        WorkbenchEvent::ActivityItemsChanged(_) => "items updated".to_owned(),
        WorkbenchEvent::OwnerChanged(_) => "activity updated".to_owned(),
        WorkbenchEvent::ActivityRemoved(_) => "activity removed".to_owned(),
        WorkbenchEvent::TimeFramesChanged { time_frames, .. } => {
            format!("{} quarters selected", time_frames.len())
        }
        WorkbenchEvent::DialogClosed => return None,
    };
    Some(message)
}

fn nav_key_for(key: KeyEvent) -> Option<NavKey> {
    let plain = key.modifiers == KeyModifiers::NONE;
    let nav_key = match key.code {
        KeyCode::Left => NavKey::Arrow(NavDirection::Left),
        KeyCode::Right => NavKey::Arrow(NavDirection::Right),
        KeyCode::Up => NavKey::Arrow(NavDirection::Up),
        KeyCode::Down => NavKey::Arrow(NavDirection::Down),
        KeyCode::Char('h') if plain => NavKey::Arrow(NavDirection::Left),
        KeyCode::Char('l') if plain => NavKey::Arrow(NavDirection::Right),
        KeyCode::Char('k') if plain => NavKey::Arrow(NavDirection::Up),
        KeyCode::Char('j') if plain => NavKey::Arrow(NavDirection::Down),
        KeyCode::Tab => NavKey::Tab,
        KeyCode::BackTab => NavKey::BackTab,
        KeyCode::Enter => NavKey::Enter,
        KeyCode::Esc => NavKey::Escape,
        _ => return None,
    };
    Some(nav_key)
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    workbench: &Workbench,
    view_data: &ViewData,
) {
    let summary_height = if state.summary_visible { 4 } else { 0 };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(summary_height),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = Panel::ALL
        .iter()
        .position(|panel| *panel == workbench.panel())
        .unwrap_or(0);
    let tabs = Tabs::new(Panel::ALL.iter().map(|panel| panel.label()).collect::<Vec<_>>())
        .block(
            Block::default()
                .title(title_text(workbench, view_data))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_grid(frame, layout[1], workbench, view_data);

    if state.summary_visible {
        let summary = Paragraph::new(summary_text(workbench))
            .block(Block::default().title("budget").borders(Borders::ALL));
        frame.render_widget(summary, layout[2]);
    }

    let status = Paragraph::new(status_text(state, workbench, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if state.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_grid(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    workbench: &Workbench,
    view_data: &ViewData,
) {
    let grid = workbench.grid();
    let focused = workbench.focused();

    let rows = grid
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let cells = row
                .cells
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    let pos = CellPos::new(row_index, col);
                    let editing = view_data.edit.as_ref().filter(|buffer| buffer.pos == pos);
                    let text = display_text(row.kind, col, &cell.text, editing);

                    let mut style = Style::default();
                    if row.kind == RowKind::Header {
                        style = style.fg(Color::White).add_modifier(Modifier::BOLD);
                    } else if !cell.navigable {
                        style = style.fg(Color::DarkGray);
                    }
                    if cell.invalid {
                        style = style.fg(Color::Red).add_modifier(Modifier::UNDERLINED);
                    }
                    if focused == Some(pos) {
                        style = if editing.is_some() {
                            Style::default().fg(Color::Black).bg(Color::Yellow)
                        } else {
                            Style::default()
                                .fg(Color::Black)
                                .bg(Color::Cyan)
                                .add_modifier(Modifier::BOLD)
                        };
                    }
                    Cell::from(text).style(style)
                })
                .collect::<Vec<_>>();
            Row::new(cells)
        })
        .collect::<Vec<_>>();

    let widths = column_widths(grid, view_data)
        .into_iter()
        .map(|width| Constraint::Length(width as u16))
        .collect::<Vec<_>>();
    let table = Table::new(rows, widths).column_spacing(1).block(
        Block::default()
            .title(workbench.panel().label())
            .borders(Borders::ALL),
    );
    let mut table_state = TableState::default().with_selected(focused.map(|pos| pos.row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn display_text(kind: RowKind, col: usize, text: &str, editing: Option<&EditBuffer>) -> String {
    let body = match editing {
        Some(buffer) => buffer.display(),
        None => text.to_owned(),
    };
    if col == 0 {
        format!("{}{body}", indent_for(kind))
    } else {
        body
    }
}

fn indent_for(kind: RowKind) -> &'static str {
    match kind {
        RowKind::Header | RowKind::CpOutput | RowKind::ManagementActivity => "",
        RowKind::PdOutput => "  ",
        RowKind::Activity => "    ",
        RowKind::Item | RowKind::AddItem => "      ",
    }
}

fn column_widths(grid: &Grid, view_data: &ViewData) -> Vec<usize> {
    let mut widths = vec![COLUMN_MIN; grid.column_count().max(1)];
    for (row_index, row) in grid.rows().iter().enumerate() {
        for (col, cell) in row.cells.iter().enumerate() {
            let editing = view_data
                .edit
                .as_ref()
                .filter(|buffer| buffer.pos == CellPos::new(row_index, col));
            let width = display_text(row.kind, col, &cell.text, editing)
                .chars()
                .count();
            let cap = if col == 0 { FIRST_COLUMN_MAX } else { COLUMN_MAX };
            widths[col] = widths[col].max(width.min(cap));
        }
    }
    widths
}

fn title_text(workbench: &Workbench, view_data: &ViewData) -> String {
    let intervention = workbench.intervention();
    let dirty = if view_data.dirty { " *" } else { "" };
    format!(
        "pdedit {} {} ({}){dirty}",
        intervention.number, intervention.title, view_data.source
    )
}

fn summary_text(workbench: &Workbench) -> String {
    workbench
        .summary()
        .display_lines(&workbench.intervention().currency)
        .join("\n")
}

fn status_text(state: &AppState, workbench: &Workbench, view_data: &ViewData) -> String {
    let (mode, hints) = match workbench.mode() {
        AppMode::Nav => (
            "NAV",
            "h/j/k/l move | tab next | enter edit/press | s save | v check | p panel | ? help | q quit",
        ),
        AppMode::Edit => (
            "EDIT",
            "type | enter commit | tab commit+next | esc cancel",
        ),
    };
    let dirty = if view_data.dirty { " [modified]" } else { "" };
    match &state.status_line {
        Some(status) => format!("{mode}{dirty} | {status} | {hints}"),
        None => format!("{mode}{dirty} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit\n\
nav: h/j/k/l or arrows move | tab/shift+tab next/prev cell (eases into single inputs)\n\
nav: enter edit input or press button | p/P panel | m summary | ? help | q quit\n\
file: s validate+save | v validate | r reload from source\n\
edit: type | left/right cursor | home/end | backspace/del | enter commit | tab commit+next | esc cancel\n\
buttons: + item adds a line item | remove deletes the row | quarter cells toggle"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
