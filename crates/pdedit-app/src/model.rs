// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use time::Date;

use crate::ids::*;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Results,
    Management,
}

impl Panel {
    pub const ALL: [Self; 2] = [Self::Results, Self::Management];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Results => "results",
            Self::Management => "management",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "results" => Some(Self::Results),
            "management" => Some(Self::Management),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemInvalid {
    pub name: bool,
    pub unit: bool,
    pub no_units: bool,
    pub cso_cash: bool,
    pub unicef_cash: bool,
}

impl ItemInvalid {
    pub const fn any(self) -> bool {
        self.name || self.unit || self.no_units || self.cso_cash || self.unicef_cash
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OwnerInvalid {
    pub name: bool,
    pub cso_cash: bool,
    pub unicef_cash: bool,
}

impl OwnerInvalid {
    pub const fn any(self) -> bool {
        self.name || self.cso_cash || self.unicef_cash
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default, deserialize_with = "number_string")]
    pub no_units: String,
    #[serde(default, deserialize_with = "number_string")]
    pub unit_price: String,
    #[serde(default, deserialize_with = "number_string")]
    pub cso_cash: String,
    #[serde(default, deserialize_with = "number_string")]
    pub unicef_cash: String,
    #[serde(skip)]
    pub invalid: ItemInvalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub context_details: String,
    #[serde(default, deserialize_with = "number_string")]
    pub cso_cash: String,
    #[serde(default, deserialize_with = "number_string")]
    pub unicef_cash: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub time_frames: Vec<TimeFrameId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(skip)]
    pub invalid: OwnerInvalid,
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            context_details: String::new(),
            cso_cash: String::new(),
            unicef_cash: String::new(),
            items: Vec::new(),
            time_frames: Vec::new(),
            is_active: true,
            invalid: OwnerInvalid::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementKind {
    InCountry,
    Operational,
    Planning,
}

impl ManagementKind {
    pub const ALL: [Self; 3] = [Self::InCountry, Self::Operational, Self::Planning];

    pub const fn label(self) -> &'static str {
        match self {
            Self::InCountry => "In-country management and support",
            Self::Operational => "Operational costs",
            Self::Planning => "Planning, monitoring, evaluation and communication",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementActivity {
    pub kind: ManagementKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "number_string")]
    pub cso_cash: String,
    #[serde(default, deserialize_with = "number_string")]
    pub unicef_cash: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(skip)]
    pub invalid: OwnerInvalid,
}

impl ManagementActivity {
    pub fn blank(kind: ManagementKind) -> Self {
        Self {
            kind,
            name: kind.label().to_owned(),
            cso_cash: "0".to_owned(),
            unicef_cash: "0".to_owned(),
            items: Vec::new(),
            invalid: OwnerInvalid::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.kind.label()
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementBudget {
    #[serde(default)]
    pub items: Vec<ManagementActivity>,
}

impl Default for ManagementBudget {
    fn default() -> Self {
        Self {
            items: ManagementKind::ALL
                .into_iter()
                .map(ManagementActivity::blank)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowerResult {
    pub id: LowerResultId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLink {
    pub id: ResultLinkId,
    #[serde(default)]
    pub cp_output_name: String,
    #[serde(default)]
    pub ll_results: Vec<LowerResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub id: TimeFrameId,
    pub name: String,
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub id: InterventionId,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub result_links: Vec<ResultLink>,
    #[serde(default)]
    pub management_budgets: ManagementBudget,
    #[serde(default)]
    pub quarters: Vec<TimeFrame>,
}

impl Intervention {
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.result_links
            .iter()
            .flat_map(|link| link.ll_results.iter())
            .flat_map(|lower| lower.activities.iter())
    }

    pub fn time_frame(&self, id: TimeFrameId) -> Option<&TimeFrame> {
        self.quarters.iter().find(|frame| frame.id == id)
    }
}

fn default_active() -> bool {
    true
}

fn default_currency() -> String {
    "USD".to_owned()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Accepts `"12.5"`, `12.5`, `12` or `null` and keeps the value as text.
fn number_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawNumber::Text(value)) => value,
        Some(RawNumber::Integer(value)) => value.to_string(),
        Some(RawNumber::Float(value)) => value.to_string(),
        None => String::new(),
    })
}
