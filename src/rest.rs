//! REST surface for the invoice dashboard (Axum).
//!
//! Form posts land here as raw `HashMap<String, String>` bodies — no field is
//! assumed present — and flow through the mutation pipeline. A `Redirect`
//! outcome becomes `303 See Other`; a `Render` outcome re-surfaces the form
//! `State` as JSON so the client can re-render with the per-field errors.
//! All `/dashboard/*` routes sit behind the bearer-token middleware.

use axum::{
    extract::{Path, State},
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{validate_session_token, AuthFailure};
use crate::cache::RouteCache;
use crate::models::{Customer, Invoice, InvoiceStatus, State as FormState};
use crate::pipeline::{AuthOutcome, Outcome, Pipeline, INVOICES_ROUTE};
use crate::storage::{InvoiceStore, Storage};

/// Shared app state for REST handlers (Arc-wrapped for concurrency).
pub struct AppState {
    store: Arc<Storage>,
    cache: Arc<RouteCache>,
    pipeline: Pipeline,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

/// Invoice listing plus whether it was served from the route cache.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub cache_hit: bool,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        login_handler,
        create_invoice_handler,
        update_invoice_handler,
        delete_invoice_handler,
        list_invoices_handler,
        list_customers_handler,
        health_handler,
    ),
    components(schemas(
        Invoice,
        InvoiceStatus,
        Customer,
        FormState,
        LoginResponse,
        InvoiceListResponse,
        HealthResponse,
    ))
)]
struct ApiDoc;

async fn auth_middleware(
    State(_state): State<Arc<AppState>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let claims = validate_session_token(token).map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Create the Axum router over a freshly opened storage.
pub fn create_router(storage: Storage) -> Router {
    let store = Arc::new(storage);
    let cache = Arc::new(RouteCache::new());
    let pipeline = Pipeline::new(store.clone() as Arc<dyn InvoiceStore>, cache.clone());
    let state = Arc::new(AppState {
        store,
        cache,
        pipeline,
    });

    let dashboard_routes = Router::new()
        .route(
            "/dashboard/invoices",
            post(create_invoice_handler).get(list_invoices_handler),
        )
        .route(
            "/dashboard/invoices/:id",
            put(update_invoice_handler).delete(delete_invoice_handler),
        )
        .route("/dashboard/customers", get(list_customers_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/login", post(login_handler))
        .route("/health", get(health_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(dashboard_routes)
        .with_state(state)
}

fn outcome_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Redirect(route) => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, route)]).into_response()
        }
        Outcome::Render(form_state) => {
            // Field errors mean the submission was malformed; a bare message
            // means the store refused the statement.
            let status = if form_state.errors.is_some() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(form_state)).into_response()
        }
    }
}

/// Handler: authenticate a login form; success issues a session token and
/// redirects to the dashboard.
#[utoipa::path(
    post,
    path = "/login",
    responses(
        (status = 303, description = "Authenticated; redirect to /dashboard", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = FormState),
        (status = 500, description = "Systemic authentication failure", body = FormState),
    )
)]
async fn login_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match state.pipeline.authenticate(&form).await {
        AuthOutcome::Redirect { route, token } => (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, route)],
            Json(LoginResponse { token }),
        )
            .into_response(),
        AuthOutcome::Failed(failure) => {
            let status = match failure {
                AuthFailure::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthFailure::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(FormState::message(failure.to_string()))).into_response()
        }
    }
}

/// Handler: create an invoice from form fields.
#[utoipa::path(
    post,
    path = "/dashboard/invoices",
    responses(
        (status = 303, description = "Created; redirect to the invoices listing"),
        (status = 422, description = "Validation failed", body = FormState),
        (status = 500, description = "Database error", body = FormState),
    ),
    security(("bearer" = []))
)]
async fn create_invoice_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    outcome_response(state.pipeline.create_invoice(&form).await)
}

/// Handler: update an invoice in place.
#[utoipa::path(
    put,
    path = "/dashboard/invoices/{id}",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 303, description = "Updated; redirect to the invoices listing"),
        (status = 422, description = "Validation failed", body = FormState),
        (status = 500, description = "Database error", body = FormState),
    ),
    security(("bearer" = []))
)]
async fn update_invoice_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    outcome_response(state.pipeline.update_invoice(&id, &form).await)
}

/// Handler: delete an invoice. Invoked from the listing view, so it always
/// answers in place with a message instead of redirecting.
#[utoipa::path(
    delete,
    path = "/dashboard/invoices/{id}",
    params(("id" = String, Path, description = "Invoice id")),
    responses((status = 200, description = "Outcome message", body = FormState)),
    security(("bearer" = []))
)]
async fn delete_invoice_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<FormState> {
    Json(state.pipeline.delete_invoice(&id).await)
}

/// Handler: invoice listing, read-through against the route cache.
#[utoipa::path(
    get,
    path = "/dashboard/invoices",
    responses((status = 200, body = InvoiceListResponse)),
    security(("bearer" = []))
)]
async fn list_invoices_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InvoiceListResponse>, StatusCode> {
    if let Some(snapshot) = state.cache.lookup(INVOICES_ROUTE) {
        if let Ok(invoices) = serde_json::from_value::<Vec<Invoice>>(snapshot) {
            return Ok(Json(InvoiceListResponse {
                invoices,
                cache_hit: true,
            }));
        }
    }

    let invoices = state.store.list_invoices().await.map_err(|err| {
        tracing::error!(error = %err, "invoice listing query failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if let Ok(snapshot) = serde_json::to_value(&invoices) {
        state.cache.store(INVOICES_ROUTE, snapshot);
    }
    Ok(Json(InvoiceListResponse {
        invoices,
        cache_hit: false,
    }))
}

/// Handler: customers for the invoice form's selector.
#[utoipa::path(
    get,
    path = "/dashboard/customers",
    responses((status = 200, body = [Customer])),
    security(("bearer" = []))
)]
async fn list_customers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Customer>>, StatusCode> {
    state
        .store
        .list_customers()
        .await
        .map(Json)
        .map_err(|err| {
            tracing::error!(error = %err, "customer listing query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Health check handler.
#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthResponse)))]
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "invoice dashboard healthy".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::models::User;
    use axum::body::{to_bytes, Body};
    use serde_json::Value;
    use tower::ServiceExt; // For .oneshot() testing

    async fn seeded_app() -> Router {
        let storage = Storage::open("sqlite::memory:").await.expect("storage");
        storage
            .create_user(&User {
                id: "u1".to_string(),
                name: "User".to_string(),
                email: "user@nextmail.com".to_string(),
                password: hash_password("123456").expect("hash"),
            })
            .await
            .expect("seed user");
        storage
            .create_customer(&Customer {
                id: "c1".to_string(),
                name: "Amy Burns".to_string(),
                email: "amy@burns.com".to_string(),
            })
            .await
            .expect("seed customer");
        create_router(storage)
    }

    fn form_request(method: &str, uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    async fn login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(form_request(
                "POST",
                "/login",
                "email=user%40nextmail.com&password=123456",
                None,
            ))
            .await
            .expect("login request");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/dashboard"
        );
        json_body(response).await["token"]
            .as_str()
            .expect("token")
            .to_string()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = seeded_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("health request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dashboard_routes_require_a_token() {
        let app = seeded_app().await;
        let response = app
            .oneshot(form_request(
                "POST",
                "/dashboard/invoices",
                "customerId=c1&amount=1&status=paid",
                None,
            ))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_password_returns_the_fixed_message() {
        let app = seeded_app().await;
        let response = app
            .oneshot(form_request(
                "POST",
                "/login",
                "email=user%40nextmail.com&password=wrong-secret",
                None,
            ))
            .await
            .expect("login request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["message"], "Invalid credentials.");
    }

    #[tokio::test]
    async fn test_create_list_update_delete_flow() {
        let app = seeded_app().await;
        let token = login(&app).await;

        // Create: 303 back to the listing.
        let response = app
            .clone()
            .oneshot(form_request(
                "POST",
                "/dashboard/invoices",
                "customerId=c1&amount=49.99&status=paid",
                Some(&token),
            ))
            .await
            .expect("create request");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/dashboard/invoices"
        );

        // First read misses the cache and sees the new row in cents.
        let response = app
            .clone()
            .oneshot(form_request("GET", "/dashboard/invoices", "", Some(&token)))
            .await
            .expect("list request");
        assert_eq!(response.status(), StatusCode::OK);
        let listing = json_body(response).await;
        assert_eq!(listing["cache_hit"], false);
        assert_eq!(listing["invoices"].as_array().unwrap().len(), 1);
        assert_eq!(listing["invoices"][0]["amount"], 4999);
        let invoice_id = listing["invoices"][0]["id"].as_str().unwrap().to_string();

        // Second read is served from the snapshot.
        let response = app
            .clone()
            .oneshot(form_request("GET", "/dashboard/invoices", "", Some(&token)))
            .await
            .expect("list request");
        assert_eq!(json_body(response).await["cache_hit"], true);

        // Update: 303 again, and the next read misses the cache.
        let response = app
            .clone()
            .oneshot(form_request(
                "PUT",
                &format!("/dashboard/invoices/{invoice_id}"),
                "customerId=c1&amount=12.50&status=pending",
                Some(&token),
            ))
            .await
            .expect("update request");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = app
            .clone()
            .oneshot(form_request("GET", "/dashboard/invoices", "", Some(&token)))
            .await
            .expect("list request");
        let listing = json_body(response).await;
        assert_eq!(listing["cache_hit"], false);
        assert_eq!(listing["invoices"][0]["amount"], 1250);
        assert_eq!(listing["invoices"][0]["status"], "pending");

        // Delete answers in place with a message, no redirect.
        let response = app
            .clone()
            .oneshot(form_request(
                "DELETE",
                &format!("/dashboard/invoices/{invoice_id}"),
                "",
                Some(&token),
            ))
            .await
            .expect("delete request");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Deleted Invoice.");

        let response = app
            .clone()
            .oneshot(form_request("GET", "/dashboard/invoices", "", Some(&token)))
            .await
            .expect("list request");
        let listing = json_body(response).await;
        assert_eq!(listing["cache_hit"], false);
        assert!(listing["invoices"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_submission_renders_field_errors() {
        let app = seeded_app().await;
        let token = login(&app).await;

        let response = app
            .clone()
            .oneshot(form_request(
                "POST",
                "/dashboard/invoices",
                "amount=-5&status=paid",
                Some(&token),
            ))
            .await
            .expect("create request");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let state = json_body(response).await;
        assert_eq!(state["message"], "Missing Fields. Failed to Create Invoice.");
        assert_eq!(
            state["errors"]["customerId"][0],
            "Please select a customer."
        );
        assert_eq!(
            state["errors"]["amount"][0],
            "Please enter an amount greater than $0."
        );
    }

    #[tokio::test]
    async fn test_delete_of_unknown_id_reports_a_database_error() {
        let app = seeded_app().await;
        let token = login(&app).await;

        let response = app
            .clone()
            .oneshot(form_request(
                "DELETE",
                "/dashboard/invoices/never-existed",
                "",
                Some(&token),
            ))
            .await
            .expect("delete request");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["message"],
            "Database Error: Failed to Delete Invoice."
        );
    }

    #[tokio::test]
    async fn test_customer_listing() {
        let app = seeded_app().await;
        let token = login(&app).await;

        let response = app
            .clone()
            .oneshot(form_request(
                "GET",
                "/dashboard/customers",
                "",
                Some(&token),
            ))
            .await
            .expect("customers request");
        assert_eq!(response.status(), StatusCode::OK);
        let customers = json_body(response).await;
        assert_eq!(customers[0]["name"], "Amy Burns");
    }
}
