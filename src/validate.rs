//! Schema validation for invoice form submissions.
//!
//! Takes the raw field map exactly as posted (no key is assumed present),
//! coerces types, and collects every violated field in one pass so the form
//! can show all problems at once instead of failing on the first.

use crate::models::InvoiceStatus;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub const MSG_CUSTOMER: &str = "Please select a customer.";
pub const MSG_AMOUNT_INVALID: &str = "Please enter a valid amount.";
pub const MSG_AMOUNT_GT_ZERO: &str = "Please enter an amount greater than $0.";
pub const MSG_STATUS: &str = "Please select an invoice status.";

/// Typed result of a successful parse. Amount is already converted to
/// integer minor units (cents).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePayload {
    pub customer_id: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
}

/// All violated fields from one submission, each with its ordered messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid form submission")]
pub struct ValidationErrors {
    pub field_errors: BTreeMap<String, Vec<String>>,
}

/// Validate a create-invoice submission (`customerId`, `amount`, `status`;
/// id and date are derived server-side, never accepted from the form).
pub fn parse_create_form(form: &HashMap<String, String>) -> Result<InvoicePayload, ValidationErrors> {
    parse_invoice_form(form)
}

/// Validate an update-invoice submission. Structurally identical to the
/// create shape today, but kept as its own entry point so the two can
/// diverge without coupling.
pub fn parse_update_form(form: &HashMap<String, String>) -> Result<InvoicePayload, ValidationErrors> {
    parse_invoice_form(form)
}

fn parse_invoice_form(form: &HashMap<String, String>) -> Result<InvoicePayload, ValidationErrors> {
    let mut field_errors: BTreeMap<String, Vec<String>> = BTreeMap::new();

    // An absent field is a type-mismatch violation, same as an empty one.
    let customer_id = match form.get("customerId").map(|s| s.trim()) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => {
            field_errors
                .entry("customerId".to_string())
                .or_default()
                .push(MSG_CUSTOMER.to_string());
            None
        }
    };

    let amount_cents = match form.get("amount").and_then(|s| s.trim().parse::<f64>().ok()) {
        Some(value) if value.is_finite() && value > 0.0 => Some(to_cents(value)),
        Some(_) => {
            field_errors
                .entry("amount".to_string())
                .or_default()
                .push(MSG_AMOUNT_GT_ZERO.to_string());
            None
        }
        None => {
            field_errors
                .entry("amount".to_string())
                .or_default()
                .push(MSG_AMOUNT_INVALID.to_string());
            None
        }
    };

    let status = match form.get("status").and_then(|s| InvoiceStatus::from_form_value(s.trim())) {
        Some(status) => Some(status),
        None => {
            field_errors
                .entry("status".to_string())
                .or_default()
                .push(MSG_STATUS.to_string());
            None
        }
    };

    match (customer_id, amount_cents, status) {
        (Some(customer_id), Some(amount_cents), Some(status)) => Ok(InvoicePayload {
            customer_id,
            amount_cents,
            status,
        }),
        _ => Err(ValidationErrors { field_errors }),
    }
}

/// Dollars-and-cents string arrives as a decimal; round once at the
/// boundary and carry integers from here on.
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
