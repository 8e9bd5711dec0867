use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Invoice status as stored in the `status` column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    /// Parse the raw form value; anything outside the enum is a violation.
    pub fn from_form_value(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

/// Invoice row. `amount` is integer minor units (cents) to avoid
/// floating-point money past the form boundary.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow, ToSchema)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    pub amount: i64,
    pub status: InvoiceStatus,
    pub date: NaiveDate,
}

/// Customer row, read-only from the mutation pipeline (populates the
/// invoice form's customer selector).
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow, ToSchema)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// User row. `password` holds a bcrypt hash, never plaintext, and is
/// never serialized out.
#[derive(Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Per-submission form feedback: ordered per-field error messages plus an
/// optional overall message. Returned to the caller so the form can
/// re-render without discarding what the user typed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
pub struct State {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl State {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            errors: None,
            message: Some(message.into()),
        }
    }

    pub fn with_errors(errors: BTreeMap<String, Vec<String>>, message: impl Into<String>) -> Self {
        Self {
            errors: Some(errors),
            message: Some(message.into()),
        }
    }
}

/// JWT claims for a dashboard session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionClaims {
    pub sub: String, // user email
    pub exp: usize,
}
