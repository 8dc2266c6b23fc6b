// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pdedit_app::{
    Activity, ActivityId, Intervention, InterventionId, ItemId, LineItem, LowerResult,
    LowerResultId, ManagementActivity, ManagementBudget, ManagementKind, ResultLink, ResultLinkId,
    TimeFrame, TimeFrameId,
};
use std::fs;
use std::path::{Path, PathBuf};
use time::{Date, Month};

const REFERENCE_YEAR: i32 = 2026;

const CP_OUTPUTS: [&str; 6] = [
    "Children access quality primary health care",
    "Households use safe drinking water",
    "Adolescents complete lower secondary school",
    "Caregivers practise positive parenting",
    "Communities adopt improved sanitation",
    "Infants receive complete immunisation",
];

const PD_OUTPUTS: [&str; 8] = [
    "Health workers trained on IMCI",
    "Water points rehabilitated",
    "Learning materials distributed",
    "Parenting sessions delivered",
    "Latrines constructed in schools",
    "Cold chain equipment maintained",
    "Referral pathways established",
    "Community volunteers mobilised",
];

const ACTIVITY_VERBS: [&str; 10] = [
    "Conduct",
    "Procure",
    "Distribute",
    "Organise",
    "Rehabilitate",
    "Train",
    "Monitor",
    "Print",
    "Support",
    "Facilitate",
];

const ACTIVITY_OBJECTS: [&str; 12] = [
    "outreach sessions",
    "hygiene kits",
    "school supplies",
    "district workshops",
    "borehole repairs",
    "peer educators",
    "field visits",
    "awareness posters",
    "mobile clinics",
    "community dialogues",
    "nutrition screenings",
    "radio spots",
];

const ITEM_NAMES: [&str; 14] = [
    "Facilitator fees",
    "Venue hire",
    "Transport",
    "Per diem",
    "Printing",
    "Stationery",
    "Fuel",
    "Hygiene kit",
    "Water tank",
    "Vaccine carrier",
    "Megaphone",
    "Banner",
    "Refreshments",
    "Vehicle rental",
];

const UNITS: [&str; 8] = [
    "day", "person", "trip", "piece", "box", "litre", "session", "month",
];

const CURRENCIES: [&str; 4] = ["USD", "EUR", "KES", "XOF"];

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible programme documents.
///
/// Every generated line item is balanced: its partner and UNICEF shares add
/// up to `no_units * unit_price` exactly.
pub struct InterventionFaker {
    rng: DeterministicRng,
    seed: u64,
    next_id: i64,
}

impl InterventionFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            next_id: 1,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn intervention(&mut self) -> Intervention {
        let id = self.next_id();
        let quarters = quarters(REFERENCE_YEAR);
        let link_count = 1 + self.int_n(3);
        let result_links = (0..link_count)
            .map(|_| self.result_link(&quarters))
            .collect();

        Intervention {
            id: InterventionId::new(id),
            number: format!("PD/{REFERENCE_YEAR}/{id:04}"),
            title: format!("{} programme", self.pick(&CP_OUTPUTS)),
            currency: self.pick(&CURRENCIES).to_owned(),
            result_links,
            management_budgets: self.management_budget(),
            quarters,
        }
    }

    pub fn result_link(&mut self, quarters: &[TimeFrame]) -> ResultLink {
        let lower_count = 1 + self.int_n(2);
        ResultLink {
            id: ResultLinkId::new(self.next_id()),
            cp_output_name: self.pick(&CP_OUTPUTS).to_owned(),
            ll_results: (0..lower_count)
                .map(|_| LowerResult {
                    id: LowerResultId::new(self.next_id()),
                    name: self.pick(&PD_OUTPUTS).to_owned(),
                    activities: (0..1 + self.int_n(3))
                        .map(|_| self.activity(quarters))
                        .collect(),
                })
                .collect(),
        }
    }

    /// An activity with 0-3 balanced items. Without items its cash is
    /// entered directly.
    pub fn activity(&mut self, quarters: &[TimeFrame]) -> Activity {
        let items: Vec<LineItem> = (0..self.int_n(4)).map(|_| self.line_item()).collect();
        let (cso_cash, unicef_cash) = if items.is_empty() {
            (self.amount(0, 500_000), self.amount(0, 500_000))
        } else {
            (String::new(), String::new())
        };
        let time_frames = quarters
            .iter()
            .filter(|_| self.rng.bool())
            .map(|frame| frame.id)
            .collect();

        Activity {
            id: Some(ActivityId::new(self.next_id())),
            name: format!(
                "{} {}",
                self.pick(&ACTIVITY_VERBS),
                self.pick(&ACTIVITY_OBJECTS)
            ),
            context_details: String::new(),
            cso_cash,
            unicef_cash,
            items,
            time_frames,
            ..Activity::default()
        }
    }

    pub fn line_item(&mut self) -> LineItem {
        let units = 1 + self.rng.int_n(50) as u64;
        let price_cents = 100 + self.rng.int_n(50_000) as u64;
        let total_cents = units * price_cents;
        let cso_cents = self.rng.next_u64() % (total_cents + 1);

        LineItem {
            id: Some(ItemId::new(self.next_id())),
            name: self.pick(&ITEM_NAMES).to_owned(),
            unit: self.pick(&UNITS).to_owned(),
            no_units: units.to_string(),
            unit_price: cents(price_cents),
            cso_cash: cents(cso_cents),
            unicef_cash: cents(total_cents - cso_cents),
            ..LineItem::default()
        }
    }

    pub fn management_budget(&mut self) -> ManagementBudget {
        ManagementBudget {
            items: ManagementKind::ALL
                .into_iter()
                .map(|kind| {
                    let mut row = ManagementActivity::blank(kind);
                    if self.rng.bool() {
                        row.items.push(self.line_item());
                    } else {
                        row.cso_cash = self.amount(0, 100_000);
                        row.unicef_cash = self.amount(0, 100_000);
                    }
                    row
                })
                .collect(),
        }
    }

    fn amount(&mut self, min_cents: u64, max_cents: u64) -> String {
        let span = max_cents.saturating_sub(min_cents) + 1;
        cents(min_cents + self.rng.next_u64() % span)
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn cents(value: u64) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}

/// The four calendar quarters of `year`, ids 1 through 4.
pub fn quarters(year: i32) -> Vec<TimeFrame> {
    [
        (Month::January, Month::March, 31),
        (Month::April, Month::June, 30),
        (Month::July, Month::September, 30),
        (Month::October, Month::December, 31),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (start, end, last_day))| TimeFrame {
        id: TimeFrameId::new(index as i64 + 1),
        name: format!("Q{}", index + 1),
        start: Date::from_calendar_date(year, start, 1).expect("valid quarter start"),
        end: Date::from_calendar_date(year, end, last_day).expect("valid quarter end"),
    })
    .collect()
}

pub fn item(
    name: &str,
    unit: &str,
    no_units: &str,
    unit_price: &str,
    cso_cash: &str,
    unicef_cash: &str,
) -> LineItem {
    LineItem {
        name: name.to_owned(),
        unit: unit.to_owned(),
        no_units: no_units.to_owned(),
        unit_price: unit_price.to_owned(),
        cso_cash: cso_cash.to_owned(),
        unicef_cash: unicef_cash.to_owned(),
        ..LineItem::default()
    }
}

pub fn activity(name: &str, items: Vec<LineItem>) -> Activity {
    Activity {
        name: name.to_owned(),
        items,
        ..Activity::default()
    }
}

/// One result link with one lower result holding `activities`.
pub fn intervention_with(activities: Vec<Activity>) -> Intervention {
    Intervention {
        id: InterventionId::new(1),
        number: format!("PD/{REFERENCE_YEAR}/0001"),
        title: "Fixture programme".to_owned(),
        currency: "USD".to_owned(),
        result_links: vec![ResultLink {
            id: ResultLinkId::new(1),
            cp_output_name: CP_OUTPUTS[0].to_owned(),
            ll_results: vec![LowerResult {
                id: LowerResultId::new(1),
                name: PD_OUTPUTS[0].to_owned(),
                activities,
            }],
        }],
        management_budgets: ManagementBudget::default(),
        quarters: quarters(REFERENCE_YEAR),
    }
}

pub fn temp_json_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("intervention.json");
    Ok((dir, path))
}

pub fn write_intervention(path: &Path, intervention: &Intervention) -> Result<()> {
    let json = serde_json::to_string_pretty(intervention).context("serialize intervention")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}

pub fn reference_year() -> i32 {
    REFERENCE_YEAR
}
