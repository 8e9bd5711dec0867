//! The mutation pipeline: validate → persist → invalidate → navigate.
//!
//! Every mutating action follows the same branch structure. Validation
//! failure returns field errors with no side effects; persistence failure
//! returns a generic message with no invalidation and no redirect; success
//! invalidates the affected route strictly before navigating so the
//! destination's first read already sees fresh data. Navigation is a value
//! ([`Outcome::Redirect`]) the caller interprets, never non-local control
//! flow.

use crate::auth::{self, AuthFailure};
use crate::cache::RouteCache;
use crate::models::State;
use crate::storage::InvoiceStore;
use crate::validate;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

pub const INVOICES_ROUTE: &str = "/dashboard/invoices";
pub const DASHBOARD_ROUTE: &str = "/dashboard";

pub const MSG_CREATE_MISSING: &str = "Missing Fields. Failed to Create Invoice.";
pub const MSG_UPDATE_MISSING: &str = "Missing Fields. Failed to Update Invoice.";
pub const MSG_CREATE_DB: &str = "Database Error: Failed to Create Invoice.";
pub const MSG_UPDATE_DB: &str = "Database Error: Failed to Update Invoice.";
pub const MSG_DELETE_DB: &str = "Database Error: Failed to Delete Invoice.";
pub const MSG_DELETE_OK: &str = "Deleted Invoice.";

/// How a create/update run ended: transfer control to a route, or hand the
/// form `State` back for re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Redirect(String),
    Render(State),
}

/// How an authentication run ended. The failure kind is preserved so the
/// caller can pick a generic vs. specific user-facing response.
#[derive(Debug)]
pub enum AuthOutcome {
    Redirect { route: String, token: String },
    Failed(AuthFailure),
}

/// Orchestrates one form submission per invocation. No state is shared
/// between invocations beyond the store and the injected stale-set.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn InvoiceStore>,
    cache: Arc<RouteCache>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn InvoiceStore>, cache: Arc<RouteCache>) -> Self {
        Self { store, cache }
    }

    /// Create an invoice from raw form fields. Stamps the current UTC date.
    pub async fn create_invoice(&self, form: &HashMap<String, String>) -> Outcome {
        let payload = match validate::parse_create_form(form) {
            Ok(payload) => payload,
            Err(errors) => {
                return Outcome::Render(State::with_errors(errors.field_errors, MSG_CREATE_MISSING))
            }
        };

        let date = Utc::now().date_naive();
        if let Err(err) = self
            .store
            .insert_invoice(&payload.customer_id, payload.amount_cents, payload.status, date)
            .await
        {
            warn!(error = %err, "invoice insert failed");
            return Outcome::Render(State::message(MSG_CREATE_DB));
        }

        self.cache.invalidate(INVOICES_ROUTE);
        Outcome::Redirect(INVOICES_ROUTE.to_string())
    }

    /// Update an invoice in place. Same shape as create; the stored date is
    /// left untouched.
    pub async fn update_invoice(&self, id: &str, form: &HashMap<String, String>) -> Outcome {
        let payload = match validate::parse_update_form(form) {
            Ok(payload) => payload,
            Err(errors) => {
                return Outcome::Render(State::with_errors(errors.field_errors, MSG_UPDATE_MISSING))
            }
        };

        if let Err(err) = self
            .store
            .update_invoice(id, &payload.customer_id, payload.amount_cents, payload.status)
            .await
        {
            warn!(error = %err, invoice_id = id, "invoice update failed");
            return Outcome::Render(State::message(MSG_UPDATE_DB));
        }

        self.cache.invalidate(INVOICES_ROUTE);
        Outcome::Redirect(INVOICES_ROUTE.to_string())
    }

    /// Delete an invoice. Invoked from within the listing view, so it
    /// invalidates and returns a message instead of redirecting.
    pub async fn delete_invoice(&self, id: &str) -> State {
        match self.store.delete_invoice(id).await {
            Ok(()) => {
                self.cache.invalidate(INVOICES_ROUTE);
                State::message(MSG_DELETE_OK)
            }
            Err(err) => {
                warn!(error = %err, invoice_id = id, "invoice delete failed");
                State::message(MSG_DELETE_DB)
            }
        }
    }

    /// Authenticate a login submission. Success issues a session token and
    /// navigates to the dashboard.
    pub async fn authenticate(&self, form: &HashMap<String, String>) -> AuthOutcome {
        let email = form.get("email").map(String::as_str).unwrap_or("");
        let password = form.get("password").map(String::as_str).unwrap_or("");

        let user = match auth::verify_credentials(self.store.as_ref(), email, password).await {
            Ok(user) => user,
            Err(failure) => {
                if let AuthFailure::Unknown(detail) = &failure {
                    error!(detail = %detail, "authentication hit a systemic failure");
                }
                return AuthOutcome::Failed(failure);
            }
        };

        match auth::create_session_token(&user.email) {
            Ok(token) => AuthOutcome::Redirect {
                route: DASHBOARD_ROUTE.to_string(),
                token,
            },
            Err(err) => {
                error!(error = %err, "session token creation failed");
                AuthOutcome::Failed(AuthFailure::Unknown(err.to_string()))
            }
        }
    }
}
