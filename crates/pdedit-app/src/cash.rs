// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Cash reconciliation between partner (CSO) and UNICEF contributions.
//!
//! A line item's two cash fields must add up to `round2(no_units * unit_price)`.
//! Editing one side recomputes the other; owners with items derive their own
//! cash fields from the item sums. None of these operations fail: bad numbers
//! are read as zero and problems surface only as `invalid` flags.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::money::{
    decimal_or_zero, format_decimal, is_nonzero, parse_decimal, round2, round2_difference,
    round2_product, sum_or_zero,
};
use crate::{Activity, LineItem, ManagementActivity, OwnerInvalid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashField {
    CsoCash,
    UnicefCash,
}

impl CashField {
    pub const fn other(self) -> Self {
        match self {
            Self::CsoCash => Self::UnicefCash,
            Self::UnicefCash => Self::CsoCash,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CsoCash => "cso_cash",
            Self::UnicefCash => "unicef_cash",
        }
    }

    fn slot(self, item: &mut LineItem) -> &mut String {
        match self {
            Self::CsoCash => &mut item.cso_cash,
            Self::UnicefCash => &mut item.unicef_cash,
        }
    }
}

/// What to do with the complementary field when an edit exceeds the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverTotalPolicy {
    /// Force the complementary field to exactly zero.
    #[default]
    ClampToZero,
    /// Leave the complementary field alone; validation reports the mismatch.
    Keep,
}

impl OverTotalPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClampToZero => "clamp",
            Self::Keep => "keep",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clamp" => Some(Self::ClampToZero),
            "keep" => Some(Self::Keep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CashReconciler {
    over_total: OverTotalPolicy,
}

impl CashReconciler {
    pub const fn new(over_total: OverTotalPolicy) -> Self {
        Self { over_total }
    }

    pub const fn over_total(self) -> OverTotalPolicy {
        self.over_total
    }

    /// Writes `value` into `field` and balances the other cash field against
    /// the item total when quantity and price are both known.
    pub fn cash_field_changed(self, field: CashField, value: &str, item: &mut LineItem) {
        *field.slot(item) = value.to_owned();

        if !is_nonzero(&item.unit_price) || !is_nonzero(&item.no_units) {
            debug!(field = field.as_str(), "item total not determinable yet");
            return;
        }

        let total = item_total(item);
        let complementary = round2_difference(total, decimal_or_zero(value));
        let complementary = if complementary.is_sign_negative() && !complementary.is_zero() {
            match self.over_total {
                OverTotalPolicy::ClampToZero => {
                    warn!(
                        field = field.as_str(),
                        %total,
                        value,
                        "cash edit exceeds item total; clamping complementary field to 0"
                    );
                    Decimal::ZERO
                }
                OverTotalPolicy::Keep => return,
            }
        } else {
            complementary
        };

        *field.other().slot(item) = format_decimal(complementary);
    }
}

/// Shared shape of activities and programme-management rows.
pub trait ItemOwner {
    fn items(&self) -> &[LineItem];
    fn items_mut(&mut self) -> &mut Vec<LineItem>;
    fn cash(&self) -> (&str, &str);
    fn set_cash(&mut self, cso_cash: String, unicef_cash: String);
    fn invalid_mut(&mut self) -> &mut OwnerInvalid;
    fn requires_name(&self) -> bool;
    fn name(&self) -> &str;
}

impl ItemOwner for Activity {
    fn items(&self) -> &[LineItem] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut Vec<LineItem> {
        &mut self.items
    }

    fn cash(&self) -> (&str, &str) {
        (&self.cso_cash, &self.unicef_cash)
    }

    fn set_cash(&mut self, cso_cash: String, unicef_cash: String) {
        self.cso_cash = cso_cash;
        self.unicef_cash = unicef_cash;
    }

    fn invalid_mut(&mut self) -> &mut OwnerInvalid {
        &mut self.invalid
    }

    fn requires_name(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl ItemOwner for ManagementActivity {
    fn items(&self) -> &[LineItem] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut Vec<LineItem> {
        &mut self.items
    }

    fn cash(&self) -> (&str, &str) {
        (&self.cso_cash, &self.unicef_cash)
    }

    fn set_cash(&mut self, cso_cash: String, unicef_cash: String) {
        self.cso_cash = cso_cash;
        self.unicef_cash = unicef_cash;
    }

    fn invalid_mut(&mut self) -> &mut OwnerInvalid {
        &mut self.invalid
    }

    // The kind label stands in for an empty name.
    fn requires_name(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        self.display_name()
    }
}

pub fn item_total(item: &LineItem) -> Decimal {
    round2_product(
        decimal_or_zero(&item.no_units),
        decimal_or_zero(&item.unit_price),
    )
}

/// Total of an owner: its own cash fields when it has no items, else the
/// sum of its items' cash fields.
pub fn owner_total<O: ItemOwner + ?Sized>(owner: &O) -> Decimal {
    let (cso, unicef) = owner_cash(owner);
    round2(sum_or_zero(cso, unicef))
}

pub fn owner_cash<O: ItemOwner + ?Sized>(owner: &O) -> (Decimal, Decimal) {
    if owner.items().is_empty() {
        let (cso, unicef) = owner.cash();
        return (decimal_or_zero(cso), decimal_or_zero(unicef));
    }
    owner
        .items()
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(cso, unicef), item| {
            (
                sum_or_zero(cso, decimal_or_zero(&item.cso_cash)),
                sum_or_zero(unicef, decimal_or_zero(&item.unicef_cash)),
            )
        })
}

/// Flags every item of `owner` and reports whether all of them are valid.
pub fn validate_activity_items<O: ItemOwner + ?Sized>(owner: &mut O) -> bool {
    let mut valid = true;
    for item in owner.items_mut() {
        validate_item(item);
        valid &= !item.invalid.any();
    }
    valid
}

fn validate_item(item: &mut LineItem) {
    item.invalid.name = item.name.trim().is_empty();
    item.invalid.unit = item.unit.trim().is_empty();
    item.invalid.no_units = !is_nonzero(&item.no_units);

    if is_nonzero(&item.no_units) && is_nonzero(&item.unit_price) {
        // a split too large to add up cannot balance
        let unbalanced = decimal_or_zero(&item.cso_cash)
            .checked_add(decimal_or_zero(&item.unicef_cash))
            .is_none_or(|split| round2(split) != item_total(item));
        item.invalid.cso_cash = unbalanced;
        item.invalid.unicef_cash = unbalanced;
    } else {
        item.invalid.cso_cash = parse_decimal(&item.cso_cash).is_none();
        item.invalid.unicef_cash = parse_decimal(&item.unicef_cash).is_none();
    }
}

/// Replaces the owner's cash fields with its item sums. No-op without items.
pub fn calculate_activity_totals<O: ItemOwner + ?Sized>(owner: &mut O) {
    if owner.items().is_empty() {
        return;
    }
    let (cso, unicef) = owner_cash(owner);
    owner.set_cash(format_decimal(cso), format_decimal(unicef));
}

/// Validates the owner's own fields and, when present, its items.
pub fn validate_owner<O: ItemOwner + ?Sized>(owner: &mut O) -> bool {
    let name_missing = owner.requires_name() && owner.name().trim().is_empty();
    let has_items = !owner.items().is_empty();
    let (cso_invalid, unicef_invalid) = if has_items {
        (false, false)
    } else {
        let (cso, unicef) = owner.cash();
        (parse_decimal(cso).is_none(), parse_decimal(unicef).is_none())
    };

    let invalid = owner.invalid_mut();
    invalid.name = name_missing;
    invalid.cso_cash = cso_invalid;
    invalid.unicef_cash = unicef_invalid;
    let own_valid = !invalid.any();

    let items_valid = validate_activity_items(owner);
    own_valid && items_valid
}

pub fn clear_flags<O: ItemOwner + ?Sized>(owner: &mut O) {
    *owner.invalid_mut() = OwnerInvalid::default();
    for item in owner.items_mut() {
        item.invalid = Default::default();
    }
}
