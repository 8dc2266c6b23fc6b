// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Explicit table model for the activity and programme-management editors.
//!
//! Rows are typed, belong to a row group, and carry a variable number of
//! cells. Each row knows which model object it renders and each cell which
//! field, so edits can be routed back without walking a widget tree.

use rust_decimal::Decimal;

use crate::cash::{item_total, owner_cash, owner_total};
use crate::money::{format_amount, format_decimal};
use crate::{Activity, Intervention, LineItem, ManagementActivity, OwnerInvalid, TimeFrameId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Header,
    CpOutput,
    PdOutput,
    Activity,
    Item,
    AddItem,
    ManagementActivity,
}

impl RowKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::CpOutput => "cp-output",
            Self::PdOutput => "pd-output",
            Self::Activity => "activity",
            Self::Item => "a-item",
            Self::AddItem => "add-item",
            Self::ManagementActivity => "eepm-activity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityRef {
    pub link: usize,
    pub lower: usize,
    pub activity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerRef {
    Activity(ActivityRef),
    Management(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget {
    Caption,
    ResultLink { link: usize },
    LowerResult { link: usize, lower: usize },
    Owner(OwnerRef),
    Item { owner: OwnerRef, item: usize },
    AddItem { owner: OwnerRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellField {
    Name,
    ContextDetails,
    Unit,
    NoUnits,
    UnitPrice,
    CsoCash,
    UnicefCash,
    Total,
    TimeFrame(TimeFrameId),
}

impl CellField {
    pub const fn is_amount(self) -> bool {
        matches!(
            self,
            Self::NoUnits | Self::UnitPrice | Self::CsoCash | Self::UnicefCash
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAction {
    AddItem(OwnerRef),
    RemoveItem { owner: OwnerRef, item: usize },
    RemoveActivity(ActivityRef),
    ToggleTimeFrame {
        activity: ActivityRef,
        time_frame: TimeFrameId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputControl {
    pub readonly: bool,
    pub hidden: bool,
}

impl InputControl {
    pub const EDITABLE: Self = Self {
        readonly: false,
        hidden: false,
    };
    pub const READONLY: Self = Self {
        readonly: true,
        hidden: false,
    };

    pub const fn focusable(self) -> bool {
        !self.readonly && !self.hidden
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    Plain,
    Inputs(Vec<InputControl>),
    Action(CellAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub text: String,
    pub field: Option<CellField>,
    pub content: CellContent,
    pub navigable: bool,
    pub invalid: bool,
}

impl GridCell {
    pub fn caption(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            field: None,
            content: CellContent::Plain,
            navigable: false,
            invalid: false,
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self {
            navigable: true,
            ..Self::caption(text)
        }
    }

    pub fn input(field: CellField, text: impl Into<String>, invalid: bool) -> Self {
        Self {
            text: text.into(),
            field: Some(field),
            content: CellContent::Inputs(vec![InputControl::EDITABLE]),
            navigable: true,
            invalid,
        }
    }

    pub fn readonly(field: CellField, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            field: Some(field),
            content: CellContent::Inputs(vec![InputControl::READONLY]),
            navigable: true,
            invalid: false,
        }
    }

    pub fn total(text: impl Into<String>) -> Self {
        Self {
            field: Some(CellField::Total),
            ..Self::caption(text)
        }
    }

    pub fn action(text: impl Into<String>, action: CellAction) -> Self {
        Self {
            text: text.into(),
            field: None,
            content: CellContent::Action(action),
            navigable: true,
            invalid: false,
        }
    }

    pub fn inputs(&self) -> &[InputControl] {
        match &self.content {
            CellContent::Inputs(inputs) => inputs,
            CellContent::Plain | CellContent::Action(_) => &[],
        }
    }

    pub fn is_editable(&self) -> bool {
        self.inputs().iter().any(|input| input.focusable())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub kind: RowKind,
    pub group: usize,
    pub target: RowTarget,
    pub cells: Vec<GridCell>,
}

impl GridRow {
    pub fn cell(&self, col: usize) -> Option<&GridCell> {
        self.cells.get(col)
    }

    pub fn first_navigable(&self) -> Option<usize> {
        self.cells.iter().position(|cell| cell.navigable)
    }

    pub fn last_navigable(&self) -> Option<usize> {
        self.cells.iter().rposition(|cell| cell.navigable)
    }

    pub fn is_navigable(&self) -> bool {
        self.kind != RowKind::Header && self.first_navigable().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    rows: Vec<GridRow>,
    groups: usize,
}

impl Grid {
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&GridRow> {
        self.rows.get(index)
    }

    pub fn cell(&self, pos: CellPos) -> Option<&GridCell> {
        self.row(pos.row)?.cell(pos.col)
    }

    pub fn group_count(&self) -> usize {
        self.groups
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }

    pub fn is_navigable(&self, pos: CellPos) -> bool {
        self.row(pos.row).is_some_and(|row| row.kind != RowKind::Header)
            && self.cell(pos).is_some_and(|cell| cell.navigable)
    }

    pub fn first_navigable(&self) -> Option<CellPos> {
        self.rows.iter().enumerate().find_map(|(index, row)| {
            row.is_navigable()
                .then(|| row.first_navigable().map(|col| CellPos::new(index, col)))
                .flatten()
        })
    }

    /// First navigable cell of the first row matching `target`.
    pub fn find_target(&self, target: RowTarget) -> Option<CellPos> {
        self.rows.iter().enumerate().find_map(|(index, row)| {
            (row.target == target)
                .then(|| row.first_navigable().map(|col| CellPos::new(index, col)))
                .flatten()
        })
    }

    /// Results hierarchy: one row group per result link.
    pub fn for_results(intervention: &Intervention) -> Self {
        let mut builder = GridBuilder::default();
        for (link_index, link) in intervention.result_links.iter().enumerate() {
            builder.begin_group();
            builder.push(RowKind::Header, RowTarget::Caption, results_header(intervention));
            builder.push(
                RowKind::CpOutput,
                RowTarget::ResultLink { link: link_index },
                vec![GridCell::label(link.cp_output_name.clone())],
            );
            for (lower_index, lower) in link.ll_results.iter().enumerate() {
                builder.push(
                    RowKind::PdOutput,
                    RowTarget::LowerResult {
                        link: link_index,
                        lower: lower_index,
                    },
                    vec![GridCell::label(lower.name.clone())],
                );
                for (activity_index, activity) in lower.activities.iter().enumerate() {
                    let activity_ref = ActivityRef {
                        link: link_index,
                        lower: lower_index,
                        activity: activity_index,
                    };
                    let owner = OwnerRef::Activity(activity_ref);
                    builder.push(
                        RowKind::Activity,
                        RowTarget::Owner(owner),
                        activity_cells(intervention, activity_ref, activity),
                    );
                    push_items(&mut builder, owner, &activity.items);
                }
            }
        }
        builder.finish()
    }

    /// Programme-management rows: one row group per row.
    pub fn for_management(intervention: &Intervention) -> Self {
        let mut builder = GridBuilder::default();
        builder.begin_group();
        builder.push(
            RowKind::Header,
            RowTarget::Caption,
            ["Item", "Partner", "UNICEF", "Total"]
                .into_iter()
                .map(GridCell::caption)
                .collect(),
        );
        for (index, row) in intervention.management_budgets.items.iter().enumerate() {
            let owner = OwnerRef::Management(index);
            builder.begin_group();
            builder.push(
                RowKind::ManagementActivity,
                RowTarget::Owner(owner),
                management_cells(owner, row),
            );
            push_items(&mut builder, owner, &row.items);
        }
        builder.finish()
    }
}

#[derive(Debug, Default)]
struct GridBuilder {
    rows: Vec<GridRow>,
    group: Option<usize>,
}

impl GridBuilder {
    fn begin_group(&mut self) {
        self.group = Some(self.group.map_or(0, |group| group + 1));
    }

    fn push(&mut self, kind: RowKind, target: RowTarget, cells: Vec<GridCell>) {
        self.rows.push(GridRow {
            kind,
            group: self.group.unwrap_or(0),
            target,
            cells,
        });
    }

    fn finish(self) -> Grid {
        Grid {
            rows: self.rows,
            groups: self.group.map_or(0, |group| group + 1),
        }
    }
}

fn results_header(intervention: &Intervention) -> Vec<GridCell> {
    let mut cells = vec![GridCell::caption("Activity"), GridCell::caption("Context")];
    cells.extend(
        intervention
            .quarters
            .iter()
            .map(|frame| GridCell::caption(frame.name.clone())),
    );
    cells.extend(
        ["Partner", "UNICEF", "Total", "", ""]
            .into_iter()
            .map(GridCell::caption),
    );
    cells
}

fn activity_cells(
    intervention: &Intervention,
    activity_ref: ActivityRef,
    activity: &Activity,
) -> Vec<GridCell> {
    let owner = OwnerRef::Activity(activity_ref);
    let mut cells = vec![
        GridCell::input(CellField::Name, activity.name.clone(), activity.invalid.name),
        GridCell::input(
            CellField::ContextDetails,
            activity.context_details.clone(),
            false,
        ),
    ];
    cells.extend(intervention.quarters.iter().map(|frame| {
        let marker = if activity.time_frames.contains(&frame.id) {
            "■"
        } else {
            "·"
        };
        GridCell {
            field: Some(CellField::TimeFrame(frame.id)),
            ..GridCell::action(
                marker,
                CellAction::ToggleTimeFrame {
                    activity: activity_ref,
                    time_frame: frame.id,
                },
            )
        }
    }));
    cells.extend(owner_cash_cells(
        activity.items.is_empty(),
        (&activity.cso_cash, &activity.unicef_cash),
        activity.invalid,
        owner_cash(activity),
        owner_total(activity),
    ));
    cells.push(GridCell::action("+ item", CellAction::AddItem(owner)));
    cells.push(GridCell::action(
        "remove",
        CellAction::RemoveActivity(activity_ref),
    ));
    cells
}

fn management_cells(owner: OwnerRef, row: &ManagementActivity) -> Vec<GridCell> {
    let mut cells = vec![GridCell::label(row.display_name().to_owned())];
    cells.extend(owner_cash_cells(
        row.items.is_empty(),
        (&row.cso_cash, &row.unicef_cash),
        row.invalid,
        owner_cash(row),
        owner_total(row),
    ));
    cells.push(GridCell::action("+ item", CellAction::AddItem(owner)));
    cells
}

fn owner_cash_cells(
    editable: bool,
    (cso_text, unicef_text): (&str, &str),
    invalid: OwnerInvalid,
    (cso, unicef): (Decimal, Decimal),
    total: Decimal,
) -> Vec<GridCell> {
    let (cso_cell, unicef_cell) = if editable {
        (
            GridCell::input(CellField::CsoCash, cso_text, invalid.cso_cash),
            GridCell::input(CellField::UnicefCash, unicef_text, invalid.unicef_cash),
        )
    } else {
        (
            GridCell::readonly(CellField::CsoCash, format_decimal(cso)),
            GridCell::readonly(CellField::UnicefCash, format_decimal(unicef)),
        )
    };
    vec![cso_cell, unicef_cell, GridCell::total(format_amount(total))]
}

fn push_items(builder: &mut GridBuilder, owner: OwnerRef, items: &[LineItem]) {
    for (index, item) in items.iter().enumerate() {
        builder.push(
            RowKind::Item,
            RowTarget::Item { owner, item: index },
            item_cells(owner, index, item),
        );
    }
    builder.push(
        RowKind::AddItem,
        RowTarget::AddItem { owner },
        vec![GridCell::action("+ add item", CellAction::AddItem(owner))],
    );
}

fn item_cells(owner: OwnerRef, index: usize, item: &LineItem) -> Vec<GridCell> {
    let invalid = item.invalid;
    vec![
        GridCell::input(CellField::Name, item.name.clone(), invalid.name),
        GridCell::input(CellField::Unit, item.unit.clone(), invalid.unit),
        GridCell::input(CellField::NoUnits, item.no_units.clone(), invalid.no_units),
        GridCell::input(CellField::UnitPrice, item.unit_price.clone(), false),
        GridCell::input(CellField::CsoCash, item.cso_cash.clone(), invalid.cso_cash),
        GridCell::input(
            CellField::UnicefCash,
            item.unicef_cash.clone(),
            invalid.unicef_cash,
        ),
        GridCell::total(format_amount(item_total(item))),
        GridCell::action("remove", CellAction::RemoveItem { owner, item: index }),
    ]
}
