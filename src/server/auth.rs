//! Bearer token authentication for the admin API

use super::AppState;
use crate::error::Error;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::debug;

/// The authenticated operator, inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub email: String,
}

struct OperatorToken {
    email: String,
    token: String,
}

/// Configured operators and their bearer tokens
#[derive(Default)]
pub struct OperatorRegistry {
    operators: Vec<OperatorToken>,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let emails: Vec<&str> = self.operators.iter().map(|op| op.email.as_str()).collect();
        f.debug_struct("OperatorRegistry")
            .field("operators", &emails)
            .finish()
    }
}

impl OperatorRegistry {
    /// Build from `(email, token)` pairs; empty tokens are ignored
    pub fn new(operators: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            operators: operators
                .into_iter()
                .filter(|(_, token)| !token.is_empty())
                .map(|(email, token)| OperatorToken { email, token })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Match `token` against every operator in constant time.
    ///
    /// All tokens are compared even after a match so timing does not reveal
    /// which operator matched.
    pub fn authenticate(&self, token: &str) -> Option<AdminIdentity> {
        let mut matched = None;
        for operator in &self.operators {
            let equal = bool::from(token.as_bytes().ct_eq(operator.token.as_bytes()));
            if equal && matched.is_none() {
                matched = Some(AdminIdentity {
                    email: operator.email.clone(),
                });
            }
        }
        matched
    }
}

/// Reject requests without a valid operator bearer token
pub async fn require_operator(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| state.operators.authenticate(token.trim()));

    match identity {
        Some(identity) => {
            debug!(operator = %identity.email, path = %request.uri().path(), "Admin request");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => Error::Unauthorized.into_response(),
    }
}
