// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::Panel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub panel: Panel,
    pub help_visible: bool,
    pub summary_visible: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            panel: Panel::Results,
            help_visible: false,
            summary_visible: true,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextPanel,
    PrevPanel,
    ToggleHelp,
    ToggleSummary,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    PanelChanged(Panel),
    HelpVisibilityChanged(bool),
    SummaryVisibilityChanged(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextPanel => self.rotate_panel(1),
            AppCommand::PrevPanel => self.rotate_panel(-1),
            AppCommand::ToggleHelp => {
                self.help_visible = !self.help_visible;
                vec![AppEvent::HelpVisibilityChanged(self.help_visible)]
            }
            AppCommand::ToggleSummary => {
                self.summary_visible = !self.summary_visible;
                let label = if self.summary_visible {
                    "summary shown"
                } else {
                    "summary hidden"
                };
                vec![
                    AppEvent::SummaryVisibilityChanged(self.summary_visible),
                    self.set_status(label),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_panel(&mut self, delta: isize) -> Vec<AppEvent> {
        let panels = Panel::ALL;
        let current = panels
            .iter()
            .position(|panel| *panel == self.panel)
            .unwrap_or(0) as isize;
        let len = panels.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.panel = panels[next];
        vec![AppEvent::PanelChanged(self.panel)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
