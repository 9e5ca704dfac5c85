// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::{Principal, UserRole},
};

/// 1. O Trait que define um portão de papéis
pub trait RoleGate: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
    fn label() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub Principal, PhantomData<T>);

impl<T> RequireRole<T> {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleGate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Extrai o principal (auth_guard já rodou)
        let principal = Principal::from_request_parts(parts, state).await?;

        // B. Verifica o papel
        if !T::allows(principal.role) {
            return Err(AppError::forbidden(format!(
                "Esta área é restrita a {}.",
                T::label()
            )));
        }

        Ok(RequireRole(principal, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PORTÕES (TIPOS)
// ---

pub struct AuditDesk;
impl RoleGate for AuditDesk {
    fn allows(role: UserRole) -> bool {
        matches!(role, UserRole::Manager | UserRole::Auditor)
    }
    fn label() -> &'static str { "MANAGER ou AUDITOR" }
}

pub struct ManagerOnly;
impl RoleGate for ManagerOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Manager
    }
    fn label() -> &'static str { "MANAGER" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    async fn extract<T: RoleGate>(role: Option<UserRole>) -> Result<RequireRole<T>, AppError> {
        let mut request = Request::builder().body(()).unwrap();
        if let Some(role) = role {
            request.extensions_mut().insert(Principal::new(Uuid::new_v4(), role));
        }
        let (mut parts, _) = request.into_parts();
        RequireRole::<T>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn audit_desk_admits_manager_and_auditor_only() {
        assert!(extract::<AuditDesk>(Some(UserRole::Auditor)).await.is_ok());
        assert!(extract::<AuditDesk>(Some(UserRole::Manager)).await.is_ok());
        let err = extract::<AuditDesk>(Some(UserRole::Marketer)).await.err().unwrap();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_principal_is_unauthenticated() {
        let err = extract::<ManagerOnly>(None).await.err().unwrap();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
