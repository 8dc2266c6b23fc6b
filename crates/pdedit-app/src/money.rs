// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Number-string helpers for cash fields.
//!
//! Cash and quantity fields travel as strings. Everything here works in
//! exact decimal arithmetic and rounds to two places, midpoint away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

pub const MONEY_DECIMALS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    Empty,
    InvalidNumber,
    Negative,
}

impl std::fmt::Display for MoneyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("amount is required"),
            Self::InvalidNumber => f.write_str("invalid amount"),
            Self::Negative => f.write_str("negative amount"),
        }
    }
}

impl std::error::Error for MoneyError {}

pub type MoneyResult<T> = std::result::Result<T, MoneyError>;

/// Parses a number-string, returning `None` for empty or malformed input.
pub fn parse_decimal(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Parse-or-zero coercion used by every reconciliation path.
pub fn decimal_or_zero(input: &str) -> Decimal {
    parse_decimal(input).unwrap_or(Decimal::ZERO)
}

pub fn is_nonzero(input: &str) -> bool {
    !decimal_or_zero(input).is_zero()
}

pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// `round2(a * b)`, treating overflow as zero.
pub fn round2_product(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).map(round2).unwrap_or(Decimal::ZERO)
}

/// `a + b`, treating overflow as zero.
pub fn sum_or_zero(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(Decimal::ZERO)
}

/// `round2(a - b)`, treating overflow as zero.
pub fn round2_difference(a: Decimal, b: Decimal) -> Decimal {
    a.checked_sub(b).map(round2).unwrap_or(Decimal::ZERO)
}

/// Renders a value the way a number prints: no trailing zeros, no exponent.
pub fn format_decimal(value: Decimal) -> String {
    let normalized = round2(value).normalize();
    if normalized.is_zero() {
        return "0".to_owned();
    }
    normalized.to_string()
}

/// Fixed two-place rendering for read-only totals.
pub fn format_amount(value: Decimal) -> String {
    let rounded = round2(value);
    let (sign, absolute) = if rounded.is_sign_negative() && !rounded.is_zero() {
        ("-", rounded.abs())
    } else {
        ("", rounded.abs())
    };
    let text = format!("{absolute:.2}");
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}{}.{fraction}", group_thousands(whole))
}

pub fn parse_required_amount(input: &str) -> MoneyResult<Decimal> {
    if input.trim().is_empty() {
        return Err(MoneyError::Empty);
    }
    let value = parse_decimal(input).ok_or(MoneyError::InvalidNumber)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MoneyError::Negative);
    }
    Ok(round2(value))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
