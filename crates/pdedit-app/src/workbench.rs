// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Editing session over one intervention.
//!
//! The workbench routes keys to the [`NavigationController`], writes committed
//! cell values back into the model through the [`CashReconciler`], and
//! rebuilds the grid after every change. Callers observe changes through the
//! returned [`WorkbenchEvent`]s.

use tracing::{debug, info};

use crate::cash::{
    CashField, CashReconciler, ItemOwner, calculate_activity_totals, clear_flags, validate_owner,
};
use crate::grid::{ActivityRef, CellAction, CellField, CellPos, Grid, OwnerRef, RowTarget};
use crate::navigation::{NavKey, NavOutcome, NavigationController};
use crate::summary::BudgetSummary;
use crate::{
    Activity, AppMode, Intervention, ItemInvalid, LineItem, OwnerInvalid, Panel, TimeFrameId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbenchEvent {
    ItemChanged { owner: OwnerRef, item: usize },
    ActivityItemsChanged(OwnerRef),
    OwnerChanged(OwnerRef),
    ActivityRemoved(ActivityRef),
    TimeFramesChanged {
        activity: ActivityRef,
        time_frames: Vec<TimeFrameId>,
    },
    /// The inline editor was closed without committing.
    DialogClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResponse {
    pub outcome: NavOutcome,
    pub events: Vec<WorkbenchEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub invalid_owners: usize,
    pub invalid_items: usize,
}

impl ValidationReport {
    pub const fn is_valid(self) -> bool {
        self.invalid_owners == 0 && self.invalid_items == 0
    }
}

#[derive(Debug, Clone)]
pub struct Workbench {
    intervention: Intervention,
    panel: Panel,
    grid: Grid,
    nav: NavigationController,
    reconciler: CashReconciler,
}

impl Workbench {
    pub fn new(
        intervention: Intervention,
        panel: Panel,
        nav: NavigationController,
        reconciler: CashReconciler,
    ) -> Self {
        let mut workbench = Self {
            intervention,
            panel,
            grid: Grid::default(),
            nav,
            reconciler,
        };
        workbench.normalize();
        workbench.rebuild();
        workbench.nav.seed(&workbench.grid);
        workbench
    }

    pub fn intervention(&self) -> &Intervention {
        &self.intervention
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn mode(&self) -> AppMode {
        self.nav.mode()
    }

    pub fn focused(&self) -> Option<CellPos> {
        self.nav.focused()
    }

    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary::for_intervention(&self.intervention)
    }

    pub fn switch_panel(&mut self, panel: Panel) {
        if self.panel == panel {
            return;
        }
        self.panel = panel;
        self.rebuild();
        self.nav.reset(&self.grid);
    }

    /// Swaps in a freshly loaded intervention, recomputing derived totals.
    pub fn replace_intervention(&mut self, intervention: Intervention) {
        self.intervention = intervention;
        self.normalize();
        self.rebuild();
        self.nav.leave_edit();
        self.nav.seed(&self.grid);
    }

    pub fn cell_text(&self, pos: CellPos) -> Option<&str> {
        self.grid.cell(pos).map(|cell| cell.text.as_str())
    }

    pub fn handle_key(&mut self, key: NavKey) -> KeyResponse {
        let outcome = self.nav.handle_key(key, &self.grid);
        let events = match outcome {
            NavOutcome::Action(action) => self.trigger(action),
            NavOutcome::EditEnded(_) => vec![WorkbenchEvent::DialogClosed],
            NavOutcome::Moved(_)
            | NavOutcome::EditStarted { .. }
            | NavOutcome::PassThrough
            | NavOutcome::Unchanged => Vec::new(),
        };
        KeyResponse { outcome, events }
    }

    pub fn click(&mut self, pos: CellPos) -> NavOutcome {
        self.nav.focus_cell(pos, &self.grid)
    }

    /// Writes `value` into the field behind `pos` and returns to `Nav`.
    /// Read-only and unknown cells are ignored.
    pub fn commit_edit(&mut self, pos: CellPos, value: &str) -> Vec<WorkbenchEvent> {
        self.nav.leave_edit();
        let Some(row) = self.grid.row(pos.row) else {
            return Vec::new();
        };
        let Some(cell) = row.cell(pos.col).filter(|cell| cell.is_editable()) else {
            return Vec::new();
        };
        let Some(field) = cell.field else {
            return Vec::new();
        };
        let target = row.target;

        let events = match target {
            RowTarget::Item { owner, item } => self.commit_item(owner, item, field, value),
            RowTarget::Owner(owner) => self.commit_owner(owner, field, value),
            RowTarget::Caption
            | RowTarget::ResultLink { .. }
            | RowTarget::LowerResult { .. }
            | RowTarget::AddItem { .. } => Vec::new(),
        };
        if !events.is_empty() {
            self.rebuild();
        }
        events
    }

    pub fn trigger(&mut self, action: CellAction) -> Vec<WorkbenchEvent> {
        let events = match action {
            CellAction::AddItem(owner) => self.add_item(owner),
            CellAction::RemoveItem { owner, item } => self.remove_item(owner, item),
            CellAction::RemoveActivity(activity) => self.remove_activity(activity),
            CellAction::ToggleTimeFrame {
                activity,
                time_frame,
            } => self.toggle_time_frame(activity, time_frame),
        };
        if events.is_empty() {
            return events;
        }
        self.rebuild();
        if let CellAction::AddItem(owner) = action
            && let Some(index) = self
                .owner(owner)
                .and_then(|owner| owner.items().len().checked_sub(1))
            && let Some(pos) = self.grid.find_target(RowTarget::Item {
                owner,
                item: index,
            })
        {
            self.nav.focus_cell(pos, &self.grid);
        }
        events
    }

    /// Flags every activity, item and management row; the grid picks the
    /// flags up for rendering.
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let owners = self
            .intervention
            .result_links
            .iter_mut()
            .flat_map(|link| link.ll_results.iter_mut())
            .flat_map(|lower| lower.activities.iter_mut())
            .map(|activity| activity as &mut dyn ItemOwner)
            .chain(
                self.intervention
                    .management_budgets
                    .items
                    .iter_mut()
                    .map(|row| row as &mut dyn ItemOwner),
            );
        for owner in owners {
            validate_owner(&mut *owner);
            let invalid_items = owner
                .items()
                .iter()
                .filter(|item| item.invalid.any())
                .count();
            let own_invalid = owner.invalid_mut().any();
            if own_invalid || invalid_items > 0 {
                report.invalid_owners += 1;
            }
            report.invalid_items += invalid_items;
        }
        info!(
            invalid_owners = report.invalid_owners,
            invalid_items = report.invalid_items,
            "validated intervention"
        );
        self.rebuild();
        report
    }

    fn commit_item(
        &mut self,
        owner_ref: OwnerRef,
        index: usize,
        field: CellField,
        value: &str,
    ) -> Vec<WorkbenchEvent> {
        let reconciler = self.reconciler;
        let Some(owner) = self.owner_mut(owner_ref) else {
            return Vec::new();
        };
        let Some(item) = owner.items_mut().get_mut(index) else {
            return Vec::new();
        };
        match field {
            CellField::Name => item.name = value.to_owned(),
            CellField::Unit => item.unit = value.to_owned(),
            CellField::NoUnits => item.no_units = value.to_owned(),
            CellField::UnitPrice => item.unit_price = value.to_owned(),
            CellField::CsoCash => reconciler.cash_field_changed(CashField::CsoCash, value, item),
            CellField::UnicefCash => {
                reconciler.cash_field_changed(CashField::UnicefCash, value, item)
            }
            CellField::ContextDetails | CellField::Total | CellField::TimeFrame(_) => {
                return Vec::new();
            }
        }
        item.invalid = ItemInvalid::default();
        calculate_activity_totals(owner);
        debug!(?owner_ref, index, ?field, "item field committed");
        vec![
            WorkbenchEvent::ItemChanged {
                owner: owner_ref,
                item: index,
            },
            WorkbenchEvent::ActivityItemsChanged(owner_ref),
        ]
    }

    fn commit_owner(
        &mut self,
        owner_ref: OwnerRef,
        field: CellField,
        value: &str,
    ) -> Vec<WorkbenchEvent> {
        if let OwnerRef::Activity(activity_ref) = owner_ref {
            let Some(activity) = self.activity_mut(activity_ref) else {
                return Vec::new();
            };
            match field {
                CellField::Name => activity.name = value.to_owned(),
                CellField::ContextDetails => activity.context_details = value.to_owned(),
                _ => {}
            }
        }
        let Some(owner) = self.owner_mut(owner_ref) else {
            return Vec::new();
        };
        match field {
            CellField::CsoCash if owner.items().is_empty() => {
                let unicef = owner.cash().1.to_owned();
                owner.set_cash(value.to_owned(), unicef);
            }
            CellField::UnicefCash if owner.items().is_empty() => {
                let cso = owner.cash().0.to_owned();
                owner.set_cash(cso, value.to_owned());
            }
            CellField::Name | CellField::ContextDetails => {}
            _ => return Vec::new(),
        }
        *owner.invalid_mut() = OwnerInvalid::default();
        vec![WorkbenchEvent::OwnerChanged(owner_ref)]
    }

    fn add_item(&mut self, owner_ref: OwnerRef) -> Vec<WorkbenchEvent> {
        let Some(owner) = self.owner_mut(owner_ref) else {
            return Vec::new();
        };
        owner.items_mut().push(LineItem::default());
        calculate_activity_totals(owner);
        vec![WorkbenchEvent::ActivityItemsChanged(owner_ref)]
    }

    fn remove_item(&mut self, owner_ref: OwnerRef, index: usize) -> Vec<WorkbenchEvent> {
        let Some(owner) = self.owner_mut(owner_ref) else {
            return Vec::new();
        };
        if index >= owner.items().len() {
            return Vec::new();
        }
        owner.items_mut().remove(index);
        calculate_activity_totals(owner);
        vec![WorkbenchEvent::ActivityItemsChanged(owner_ref)]
    }

    fn remove_activity(&mut self, activity_ref: ActivityRef) -> Vec<WorkbenchEvent> {
        let Some(activities) = self
            .intervention
            .result_links
            .get_mut(activity_ref.link)
            .and_then(|link| link.ll_results.get_mut(activity_ref.lower))
            .map(|lower| &mut lower.activities)
        else {
            return Vec::new();
        };
        if activity_ref.activity >= activities.len() {
            return Vec::new();
        }
        activities.remove(activity_ref.activity);
        vec![WorkbenchEvent::ActivityRemoved(activity_ref)]
    }

    fn toggle_time_frame(
        &mut self,
        activity_ref: ActivityRef,
        time_frame: TimeFrameId,
    ) -> Vec<WorkbenchEvent> {
        if self.intervention.time_frame(time_frame).is_none() {
            return Vec::new();
        }
        let Some(activity) = self.activity_mut(activity_ref) else {
            return Vec::new();
        };
        if let Some(position) = activity.time_frames.iter().position(|id| *id == time_frame) {
            activity.time_frames.remove(position);
        } else {
            activity.time_frames.push(time_frame);
            activity.time_frames.sort();
        }
        vec![WorkbenchEvent::TimeFramesChanged {
            activity: activity_ref,
            time_frames: activity.time_frames.clone(),
        }]
    }

    fn activity_mut(&mut self, activity_ref: ActivityRef) -> Option<&mut Activity> {
        self.intervention
            .result_links
            .get_mut(activity_ref.link)?
            .ll_results
            .get_mut(activity_ref.lower)?
            .activities
            .get_mut(activity_ref.activity)
    }

    fn owner(&self, owner_ref: OwnerRef) -> Option<&dyn ItemOwner> {
        match owner_ref {
            OwnerRef::Activity(activity_ref) => self
                .intervention
                .result_links
                .get(activity_ref.link)?
                .ll_results
                .get(activity_ref.lower)?
                .activities
                .get(activity_ref.activity)
                .map(|activity| activity as &dyn ItemOwner),
            OwnerRef::Management(index) => self
                .intervention
                .management_budgets
                .items
                .get(index)
                .map(|row| row as &dyn ItemOwner),
        }
    }

    fn owner_mut(&mut self, owner_ref: OwnerRef) -> Option<&mut dyn ItemOwner> {
        match owner_ref {
            OwnerRef::Activity(activity_ref) => self
                .activity_mut(activity_ref)
                .map(|activity| activity as &mut dyn ItemOwner),
            OwnerRef::Management(index) => self
                .intervention
                .management_budgets
                .items
                .get_mut(index)
                .map(|row| row as &mut dyn ItemOwner),
        }
    }

    fn normalize(&mut self) {
        for link in &mut self.intervention.result_links {
            for lower in &mut link.ll_results {
                for activity in &mut lower.activities {
                    clear_flags(activity);
                    calculate_activity_totals(activity);
                }
            }
        }
        for row in &mut self.intervention.management_budgets.items {
            clear_flags(row);
            calculate_activity_totals(row);
        }
    }

    fn rebuild(&mut self) {
        self.grid = match self.panel {
            Panel::Results => Grid::for_results(&self.intervention),
            Panel::Management => Grid::for_management(&self.intervention),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{ValidationReport, Workbench, WorkbenchEvent};
    use crate::grid::{CellAction, CellField, CellPos, OwnerRef, RowKind, RowTarget};
    use crate::navigation::{Direction, NavKey, NavOutcome, NavigationController};
    use crate::{
        Activity, AppMode, CashReconciler, Intervention, InterventionId, LineItem, LowerResult,
        LowerResultId, ManagementBudget, Panel, ResultLink, ResultLinkId, TimeFrame, TimeFrameId,
    };
    use rust_decimal::Decimal;
    use time::{Date, Month};

    fn quarter(id: i64, month: Month) -> TimeFrame {
        TimeFrame {
            id: TimeFrameId::new(id),
            name: format!("Q{id}"),
            start: Date::from_calendar_date(2026, month, 1).expect("valid quarter start"),
            end: Date::from_calendar_date(2026, month, 28).expect("valid quarter end"),
        }
    }

    fn sample() -> Intervention {
        Intervention {
            id: InterventionId::new(1),
            number: "PD/1".to_owned(),
            title: "Nutrition".to_owned(),
            currency: "USD".to_owned(),
            result_links: vec![ResultLink {
                id: ResultLinkId::new(1),
                cp_output_name: "CP".to_owned(),
                ll_results: vec![LowerResult {
                    id: LowerResultId::new(1),
                    name: "PD".to_owned(),
                    activities: vec![Activity {
                        name: "Screening".to_owned(),
                        cso_cash: "0".to_owned(),
                        unicef_cash: "0".to_owned(),
                        items: vec![LineItem {
                            name: "Kits".to_owned(),
                            unit: "pcs".to_owned(),
                            no_units: "10".to_owned(),
                            unit_price: "5".to_owned(),
                            cso_cash: "10".to_owned(),
                            unicef_cash: "40".to_owned(),
                            ..LineItem::default()
                        }],
                        ..Activity::default()
                    }],
                }],
            }],
            management_budgets: ManagementBudget::default(),
            quarters: vec![quarter(1, Month::January), quarter(2, Month::April)],
        }
    }

    fn workbench() -> Workbench {
        Workbench::new(
            sample(),
            Panel::Results,
            NavigationController::default(),
            CashReconciler::default(),
        )
    }

    fn item_cell(workbench: &Workbench, field: CellField) -> CellPos {
        let row = workbench
            .grid()
            .rows()
            .iter()
            .position(|row| row.kind == RowKind::Item)
            .expect("item row");
        let col = workbench.grid().rows()[row]
            .cells
            .iter()
            .position(|cell| cell.field == Some(field))
            .expect("item field column");
        CellPos::new(row, col)
    }

    #[test]
    fn construction_derives_activity_totals() {
        let workbench = workbench();
        let activity = workbench.intervention().activities().next().expect("activity");
        assert_eq!(activity.cso_cash, "10");
        assert_eq!(activity.unicef_cash, "40");
        assert_eq!(workbench.focused(), Some(CellPos::new(1, 0)));
    }

    #[test]
    fn committing_partner_cash_rebalances_and_updates_totals() {
        let mut workbench = workbench();
        let pos = item_cell(&workbench, CellField::CsoCash);
        let events = workbench.commit_edit(pos, "30");

        let activity = workbench.intervention().activities().next().expect("activity");
        assert_eq!(activity.items[0].unicef_cash, "20");
        assert_eq!(activity.cso_cash, "30");
        assert_eq!(activity.unicef_cash, "20");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], WorkbenchEvent::ItemChanged { item: 0, .. }));
        assert!(matches!(events[1], WorkbenchEvent::ActivityItemsChanged(_)));
        assert_eq!(workbench.cell_text(pos), Some("30"));
    }

    #[test]
    fn keyboard_edit_flow_enters_and_leaves_edit_mode() {
        let mut workbench = workbench();
        let pos = item_cell(&workbench, CellField::UnicefCash);
        workbench.click(pos);
        let response = workbench.handle_key(NavKey::Enter);
        assert_eq!(response.outcome, NavOutcome::EditStarted { pos, input: 0 });
        assert_eq!(workbench.mode(), AppMode::Edit);

        let response = workbench.handle_key(NavKey::Escape);
        assert_eq!(response.outcome, NavOutcome::EditEnded(pos));
        assert_eq!(response.events, vec![WorkbenchEvent::DialogClosed]);
        assert_eq!(workbench.mode(), AppMode::Nav);
    }

    #[test]
    fn readonly_derived_cash_cannot_be_committed() {
        let mut workbench = workbench();
        let activity_row = workbench
            .grid()
            .rows()
            .iter()
            .position(|row| row.kind == RowKind::Activity)
            .expect("activity row");
        let col = workbench.grid().rows()[activity_row]
            .cells
            .iter()
            .position(|cell| cell.field == Some(CellField::CsoCash))
            .expect("cso column");
        assert!(
            workbench
                .commit_edit(CellPos::new(activity_row, col), "999")
                .is_empty()
        );
        let activity = workbench.intervention().activities().next().expect("activity");
        assert_eq!(activity.cso_cash, "10");
    }

    #[test]
    fn add_item_via_button_focuses_the_new_row() {
        let mut workbench = workbench();
        let add_row = workbench
            .grid()
            .rows()
            .iter()
            .position(|row| row.kind == RowKind::AddItem)
            .expect("add-item row");
        workbench.click(CellPos::new(add_row, 0));
        let response = workbench.handle_key(NavKey::Enter);
        assert!(matches!(response.outcome, NavOutcome::Action(CellAction::AddItem(_))));
        assert_eq!(response.events.len(), 1);

        let activity = workbench.intervention().activities().next().expect("activity");
        assert_eq!(activity.items.len(), 2);
        let focused = workbench.focused().expect("focus");
        assert!(matches!(
            workbench.grid().rows()[focused.row].target,
            RowTarget::Item { item: 1, .. }
        ));
    }

    #[test]
    fn removing_the_focused_row_leaves_a_stale_pointer_that_recovers() {
        let mut workbench = workbench();
        let pos = item_cell(&workbench, CellField::Name);
        let remove_col = workbench.grid().rows()[pos.row]
            .cells
            .len()
            .saturating_sub(1);
        workbench.click(CellPos::new(pos.row, remove_col));
        let response = workbench.handle_key(NavKey::Enter);
        assert_eq!(response.events.len(), 1);
        let activity = workbench.intervention().activities().next().expect("activity");
        assert!(activity.items.is_empty());

        // the add-item row moved up into the removed row's slot
        let response = workbench.handle_key(NavKey::Arrow(Direction::Up));
        assert!(matches!(response.outcome, NavOutcome::Moved(_)));
    }

    #[test]
    fn toggling_time_frames_emits_sorted_ids() {
        let mut workbench = workbench();
        let row = workbench
            .grid()
            .rows()
            .iter()
            .position(|row| row.kind == RowKind::Activity)
            .expect("activity row");
        let activity = match workbench.grid().rows()[row].target {
            RowTarget::Owner(OwnerRef::Activity(activity)) => activity,
            other => panic!("unexpected target {other:?}"),
        };

        for id in [2, 1] {
            workbench.trigger(CellAction::ToggleTimeFrame {
                activity,
                time_frame: TimeFrameId::new(id),
            });
        }
        let events = workbench.trigger(CellAction::ToggleTimeFrame {
            activity,
            time_frame: TimeFrameId::new(2),
        });
        assert_eq!(
            events,
            vec![WorkbenchEvent::TimeFramesChanged {
                activity,
                time_frames: vec![TimeFrameId::new(1)],
            }]
        );

        let unknown = workbench.trigger(CellAction::ToggleTimeFrame {
            activity,
            time_frame: TimeFrameId::new(99),
        });
        assert!(unknown.is_empty());
    }

    #[test]
    fn validation_counts_invalid_rows_and_flags_cells() {
        let mut workbench = workbench();
        let pos = item_cell(&workbench, CellField::Name);
        workbench.commit_edit(pos, "");
        let report = workbench.validate();
        assert_eq!(
            report,
            ValidationReport {
                invalid_owners: 1,
                invalid_items: 1,
            }
        );
        assert!(!report.is_valid());
        assert!(workbench.grid().cell(pos).expect("name cell").invalid);

        workbench.commit_edit(pos, "Kits");
        assert!(!workbench.grid().cell(pos).expect("name cell").invalid);
        assert!(workbench.validate().is_valid());
    }

    #[test]
    fn editing_an_owner_clears_its_flags_until_the_next_validation() {
        let mut workbench = workbench();
        let row = workbench
            .grid()
            .rows()
            .iter()
            .position(|row| row.kind == RowKind::Activity)
            .expect("activity row");
        let pos = CellPos::new(row, 0);
        workbench.commit_edit(pos, "");
        workbench.validate();
        assert!(workbench.grid().cell(pos).expect("activity name").invalid);

        workbench.commit_edit(pos, " ");
        assert!(!workbench.grid().cell(pos).expect("activity name").invalid);
        assert!(!workbench.validate().is_valid());
        assert!(workbench.grid().cell(pos).expect("activity name").invalid);
    }

    #[test]
    fn management_panel_edits_direct_cash() {
        let mut workbench = workbench();
        workbench.switch_panel(Panel::Management);
        let row = workbench
            .grid()
            .rows()
            .iter()
            .position(|row| row.kind == RowKind::ManagementActivity)
            .expect("management row");
        let col = workbench.grid().rows()[row]
            .cells
            .iter()
            .position(|cell| cell.field == Some(CellField::UnicefCash))
            .expect("unicef column");
        let events = workbench.commit_edit(CellPos::new(row, col), "250");
        assert_eq!(
            events,
            vec![WorkbenchEvent::OwnerChanged(OwnerRef::Management(0))]
        );
        assert_eq!(
            workbench.intervention().management_budgets.items[0].unicef_cash,
            "250"
        );
        assert_eq!(
            workbench.summary().management_unicef_cash,
            Decimal::from(250)
        );
    }

    #[test]
    fn replacing_the_intervention_recomputes_totals() {
        let mut workbench = workbench();
        let mut fresh = sample();
        fresh.result_links[0].ll_results[0].activities[0].cso_cash = "stale".to_owned();
        workbench.replace_intervention(fresh);
        let activity = workbench.intervention().activities().next().expect("activity");
        assert_eq!(activity.cso_cash, "10");
    }
}
