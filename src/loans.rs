//! In-memory loan record book.
//!
//! Records are kept for the lifetime of the process in insertion order. There
//! is no pricing, eligibility or amortization here; a loan is stored exactly as
//! it was submitted, plus an id and a timestamp.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub applicant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub principal_cents: u64,
    pub term_months: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoan {
    pub applicant: String,
    #[serde(default)]
    pub email: Option<String>,
    pub principal_cents: u64,
    pub term_months: u32,
}

#[derive(Debug, Default)]
pub struct LoanBook {
    loans: RwLock<Vec<Loan>>,
}

impl LoanBook {
    pub async fn record(&self, new: NewLoan) -> Loan {
        let loan = Loan {
            id: Uuid::new_v4().to_string(),
            applicant: new.applicant,
            email: new.email,
            principal_cents: new.principal_cents,
            term_months: new.term_months,
            created_at: Utc::now().to_rfc3339(),
        };
        self.loans.write().await.push(loan.clone());
        loan
    }

    pub async fn list(&self) -> Vec<Loan> {
        self.loans.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Loan> {
        self.loans.read().await.iter().find(|l| l.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.loans.read().await.len()
    }
}
