use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json,
};

use super::RouteGroup;
use crate::error::ApiError;
use crate::loans::{Loan, NewLoan};
use crate::observability::pii::redact;
use crate::state::AppState;

pub fn group() -> RouteGroup {
    RouteGroup::new("loans")
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/:id", get(get_loan))
}

async fn create_loan(
    State(state): State<AppState>,
    Json(new): Json<NewLoan>,
) -> (StatusCode, Json<Loan>) {
    let loan = state.loans.record(new).await;

    // Loans are never removed, so each record moves the gauge by exactly one.
    state.metrics.loans_recorded_total.inc();
    state.metrics.loans_on_book.inc();

    let email = loan.email.as_deref().map(redact).unwrap_or_default();
    tracing::info!(
        loan_id = %loan.id,
        email = %email,
        principal_cents = loan.principal_cents,
        term_months = loan.term_months,
        "loan recorded"
    );

    (StatusCode::CREATED, Json(loan))
}

async fn list_loans(State(state): State<AppState>) -> Json<Vec<Loan>> {
    Json(state.loans.list().await)
}

async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Loan>, ApiError> {
    state
        .loans
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("loan {id}")))
}
