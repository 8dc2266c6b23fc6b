// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use pdedit_app::{
    AppMode, CashReconciler, CellAction, CellPos, Direction, Intervention, NavKey, NavOutcome,
    NavigationController, OverTotalPolicy, Panel, RowKind, TimeFrameId, Workbench,
    WorkbenchEvent, owner_total,
};
use pdedit_testkit::{InterventionFaker, activity, intervention_with, item};
use rust_decimal::Decimal;

fn open(intervention: Intervention) -> Workbench {
    Workbench::new(
        intervention,
        Panel::Results,
        NavigationController::default(),
        CashReconciler::default(),
    )
}

// header(0) cp(1) pd(2) activity(3) item(4) add-item(5); four quarter columns
fn fuel_workbench() -> Workbench {
    open(intervention_with(vec![activity(
        "Outreach",
        vec![item("Fuel", "litre", "10", "5", "10", "40")],
    )]))
}

#[test]
fn numeric_json_fields_load_as_text() -> Result<()> {
    let raw = r#"{
        "id": 9,
        "number": "PD/2026/0009",
        "title": "Shelter",
        "result_links": [{
            "id": 1,
            "cp_output_name": "Families live in safe shelter",
            "ll_results": [{
                "id": 2,
                "name": "Tents distributed",
                "activities": [{
                    "name": "Distribute tents",
                    "items": [{
                        "name": "Tent",
                        "unit": "piece",
                        "no_units": 4,
                        "unit_price": 12.5,
                        "cso_cash": 20,
                        "unicef_cash": "30"
                    }]
                }]
            }]
        }],
        "quarters": [
            {"id": 1, "name": "Q1", "start": "2026-01-01", "end": "2026-03-31"}
        ]
    }"#;
    let intervention: Intervention = serde_json::from_str(raw)?;
    assert_eq!(intervention.currency, "USD");
    assert_eq!(intervention.management_budgets.items.len(), 3);

    let mut workbench = open(intervention);
    let loaded = workbench.intervention().activities().next().expect("activity");
    assert_eq!(loaded.items[0].unit_price, "12.5");
    assert_eq!(loaded.cso_cash, "20");
    assert_eq!(loaded.unicef_cash, "30");
    assert!(loaded.is_active);
    assert!(workbench.validate().is_valid());
    Ok(())
}

#[test]
fn keyboard_walkthrough_edits_and_rebalances_an_item() {
    let mut workbench = fuel_workbench();
    assert_eq!(workbench.focused(), Some(CellPos::new(1, 0)));

    for _ in 0..3 {
        workbench.handle_key(NavKey::Arrow(Direction::Down));
    }
    assert_eq!(workbench.focused(), Some(CellPos::new(4, 0)));

    for _ in 0..4 {
        workbench.handle_key(NavKey::Arrow(Direction::Right));
    }
    let cso = CellPos::new(4, 4);
    assert_eq!(workbench.focused(), Some(cso));
    assert_eq!(
        workbench.handle_key(NavKey::Enter).outcome,
        NavOutcome::EditStarted { pos: cso, input: 0 }
    );
    assert_eq!(workbench.mode(), AppMode::Edit);

    let events = workbench.commit_edit(cso, "35");
    assert_eq!(events.len(), 2);
    assert_eq!(workbench.mode(), AppMode::Nav);
    assert_eq!(workbench.cell_text(CellPos::new(4, 5)), Some("15"));
    assert_eq!(workbench.cell_text(CellPos::new(4, 6)), Some("50.00"));

    let outreach = workbench.intervention().activities().next().expect("activity");
    assert_eq!(outreach.cso_cash, "35");
    assert_eq!(outreach.unicef_cash, "15");
}

#[test]
fn tab_eases_through_item_inputs() {
    let mut workbench = fuel_workbench();
    workbench.click(CellPos::new(4, 0));
    assert_eq!(
        workbench.handle_key(NavKey::Tab).outcome,
        NavOutcome::EditStarted {
            pos: CellPos::new(4, 1),
            input: 0
        }
    );
    assert_eq!(workbench.mode(), AppMode::Edit);
    // arrows belong to the input while editing
    assert_eq!(
        workbench.handle_key(NavKey::Arrow(Direction::Right)).outcome,
        NavOutcome::PassThrough
    );
    assert_eq!(workbench.focused(), Some(CellPos::new(4, 1)));
}

#[test]
fn quarter_cells_toggle_on_enter() {
    let mut workbench = fuel_workbench();
    workbench.click(CellPos::new(3, 0));
    workbench.handle_key(NavKey::Arrow(Direction::Right));
    workbench.handle_key(NavKey::Arrow(Direction::Right));
    let q1 = CellPos::new(3, 2);
    assert_eq!(workbench.focused(), Some(q1));
    assert_eq!(workbench.cell_text(q1), Some("·"));

    let response = workbench.handle_key(NavKey::Enter);
    assert!(matches!(
        response.outcome,
        NavOutcome::Action(CellAction::ToggleTimeFrame { .. })
    ));
    assert!(matches!(
        response.events.as_slice(),
        [WorkbenchEvent::TimeFramesChanged { time_frames, .. }] if time_frames == &[TimeFrameId::new(1)]
    ));
    assert_eq!(workbench.cell_text(q1), Some("■"));
}

#[test]
fn keep_policy_surfaces_over_total_edits_in_validation() {
    let mut workbench = Workbench::new(
        intervention_with(vec![activity(
            "Outreach",
            vec![item("Fuel", "litre", "10", "5", "10", "40")],
        )]),
        Panel::Results,
        NavigationController::default(),
        CashReconciler::new(OverTotalPolicy::Keep),
    );
    workbench.commit_edit(CellPos::new(4, 4), "60");
    assert_eq!(workbench.cell_text(CellPos::new(4, 5)), Some("40"));

    let report = workbench.validate();
    assert_eq!(report.invalid_items, 1);
    assert!(workbench.grid().cell(CellPos::new(4, 4)).expect("cso cell").invalid);
}

#[test]
fn clamp_policy_zeroes_the_other_side() {
    let mut workbench = fuel_workbench();
    workbench.commit_edit(CellPos::new(4, 5), "75");
    assert_eq!(workbench.cell_text(CellPos::new(4, 4)), Some("0"));
}

#[test]
fn generated_interventions_validate_cleanly() {
    for seed in 1..=12 {
        let mut workbench = open(InterventionFaker::new(seed).intervention());
        let report = workbench.validate();
        assert!(report.is_valid(), "seed {seed}: {report:?}");
    }
}

#[test]
fn summary_matches_owner_totals() {
    let workbench = open(InterventionFaker::new(5).intervention());
    let intervention = workbench.intervention();
    let expected = intervention
        .activities()
        .filter(|activity| activity.is_active)
        .map(owner_total)
        .chain(intervention.management_budgets.items.iter().map(owner_total))
        .sum::<Decimal>();
    assert_eq!(workbench.summary().total(), expected);
}

#[test]
fn switching_panels_reseeds_focus() {
    let mut workbench = fuel_workbench();
    workbench.click(CellPos::new(4, 2));
    workbench.switch_panel(Panel::Management);
    assert_eq!(workbench.panel(), Panel::Management);
    assert_eq!(workbench.focused(), Some(CellPos::new(1, 0)));
    assert_eq!(
        workbench.grid().rows()[1].kind,
        RowKind::ManagementActivity
    );
}

#[test]
fn adding_an_item_to_a_cash_only_activity_makes_cash_derived() {
    let mut workbench = open(intervention_with(vec![pdedit_app::Activity {
        cso_cash: "100".to_owned(),
        unicef_cash: "200".to_owned(),
        ..activity("Campaign", Vec::new())
    }]));
    // header cp pd activity add-item
    workbench.click(CellPos::new(4, 0));
    let response = workbench.handle_key(NavKey::Enter);
    assert_eq!(response.events.len(), 1);
    assert_eq!(workbench.focused(), Some(CellPos::new(4, 0)));
    assert_eq!(workbench.grid().rows()[4].kind, RowKind::Item);

    let campaign = workbench.intervention().activities().next().expect("activity");
    assert_eq!(campaign.cso_cash, "0");
    assert_eq!(campaign.unicef_cash, "0");
}
