// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use rust_decimal::Decimal;

use crate::cash::owner_cash;
use crate::money::{format_amount, round2, sum_or_zero};
use crate::Intervention;

/// Budget figures shown in the summary panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BudgetSummary {
    pub partner_cash: Decimal,
    pub unicef_cash: Decimal,
    pub management_partner_cash: Decimal,
    pub management_unicef_cash: Decimal,
}

impl BudgetSummary {
    /// Inactive activities are left out of every figure.
    pub fn for_intervention(intervention: &Intervention) -> Self {
        let (partner_cash, unicef_cash) = intervention
            .activities()
            .filter(|activity| activity.is_active)
            .map(owner_cash)
            .fold((Decimal::ZERO, Decimal::ZERO), sum_pair);
        let (management_partner_cash, management_unicef_cash) = intervention
            .management_budgets
            .items
            .iter()
            .map(owner_cash)
            .fold((Decimal::ZERO, Decimal::ZERO), sum_pair);

        Self {
            partner_cash: round2(partner_cash),
            unicef_cash: round2(unicef_cash),
            management_partner_cash: round2(management_partner_cash),
            management_unicef_cash: round2(management_unicef_cash),
        }
    }

    pub fn total_partner(&self) -> Decimal {
        sum_or_zero(self.partner_cash, self.management_partner_cash)
    }

    pub fn total_unicef(&self) -> Decimal {
        sum_or_zero(self.unicef_cash, self.management_unicef_cash)
    }

    pub fn total(&self) -> Decimal {
        sum_or_zero(self.total_partner(), self.total_unicef())
    }

    /// Partner contribution as a percentage of the total, 0 for an empty budget.
    pub fn partner_share(&self) -> Decimal {
        let total = self.total();
        if total.is_zero() {
            return Decimal::ZERO;
        }
        self.total_partner()
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.checked_div(total))
            .map(round2)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn display_lines(&self, currency: &str) -> Vec<String> {
        vec![
            format!(
                "partner {currency} {}  unicef {currency} {}  total {currency} {}",
                format_amount(self.total_partner()),
                format_amount(self.total_unicef()),
                format_amount(self.total()),
            ),
            format!(
                "programme management {currency} {}  partner share {:.2}%",
                format_amount(sum_or_zero(
                    self.management_partner_cash,
                    self.management_unicef_cash
                )),
                self.partner_share(),
            ),
        ]
    }
}

fn sum_pair(acc: (Decimal, Decimal), next: (Decimal, Decimal)) -> (Decimal, Decimal) {
    (sum_or_zero(acc.0, next.0), sum_or_zero(acc.1, next.1))
}
