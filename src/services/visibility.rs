// src/services/visibility.rs
//
// Resolve quais donos (marketers) um principal pode ler ou escrever.
// Leitura: o escopo pedido é *grampeado* (nunca ampliado, nunca rejeitado).
// Escrita: fora do escopo falha fechado com 403.

use serde::Deserialize;
use sqlx::{Executor, Postgres};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Principal, UserRole},
};

/// Parâmetros de escopo vindos da query string (`scope=team`, `owner_id=`).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScopeQuery {
    /// `team` para o SUPERVISOR ver a própria equipe
    pub scope: Option<String>,
    /// Filtro opcional por dono (só estreita, nunca amplia)
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeRequest {
    pub team: bool,
    pub owner_id: Option<Uuid>,
}

impl ScopeRequest {
    pub fn from_parts(scope: Option<&str>, owner_id: Option<Uuid>) -> Self {
        Self {
            team: scope.map(str::trim) == Some("team"),
            owner_id,
        }
    }
}

impl From<&ScopeQuery> for ScopeRequest {
    fn from(query: &ScopeQuery) -> Self {
        Self::from_parts(query.scope.as_deref(), query.owner_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Owners(Vec<Uuid>),
    // AUDITOR: filtro por status (elegíveis à auditoria), independente do dono
    AuditEligible,
}

/// Forma do escopo consumida pelos repositórios como parâmetros SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    pub all: bool,
    pub owner_ids: Vec<Uuid>,
    pub audit_eligible_only: bool,
}

impl Scope {
    /// Filtro para consultas de clientes.
    pub fn client_filter(&self) -> ScopeFilter {
        match self {
            Scope::All => ScopeFilter { all: true, owner_ids: vec![], audit_eligible_only: false },
            Scope::Owners(ids) => ScopeFilter {
                all: false,
                owner_ids: ids.clone(),
                audit_eligible_only: false,
            },
            Scope::AuditEligible => {
                ScopeFilter { all: true, owner_ids: vec![], audit_eligible_only: true }
            }
        }
    }

    /// Filtro para registros de dono (atividades, relatórios): o AUDITOR não tem acesso.
    pub fn owner_filter(&self) -> Result<ScopeFilter, AppError> {
        match self {
            Scope::AuditEligible => Err(AppError::forbidden(
                "Auditores não têm acesso a atividades e relatórios.",
            )),
            other => Ok(other.client_filter()),
        }
    }

    pub fn single_owner(&self) -> Option<Uuid> {
        match self {
            Scope::Owners(ids) if ids.len() == 1 => Some(ids[0]),
            _ => None,
        }
    }
}

/// resolveScope puro: dado o time já resolvido, calcula o escopo de leitura.
pub fn clamp_scope(principal: &Principal, request: &ScopeRequest, team: &[Uuid]) -> Scope {
    match principal.role {
        UserRole::Manager => match request.owner_id {
            Some(owner) => Scope::Owners(vec![owner]),
            None => Scope::All,
        },
        UserRole::Auditor => Scope::AuditEligible,
        UserRole::Supervisor => {
            let mut allowed = vec![principal.user_id];
            if request.team {
                allowed.extend(team.iter().copied().filter(|id| *id != principal.user_id));
            }
            match request.owner_id {
                Some(owner) if allowed.contains(&owner) => Scope::Owners(vec![owner]),
                _ => Scope::Owners(allowed),
            }
        }
        // Parâmetros do cliente nunca enfraquecem a autorização do MARKETER
        UserRole::Marketer => Scope::Owners(vec![principal.user_id]),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAccess {
    Granted,
    Denied,
    // SUPERVISOR escrevendo para outro dono: depende da equipe atual
    NeedsTeamCheck,
}

pub fn write_access(principal: &Principal, owner_id: Uuid) -> WriteAccess {
    match principal.role {
        UserRole::Manager => WriteAccess::Granted,
        UserRole::Auditor => WriteAccess::Denied,
        UserRole::Marketer if owner_id == principal.user_id => WriteAccess::Granted,
        UserRole::Marketer => WriteAccess::Denied,
        UserRole::Supervisor if owner_id == principal.user_id => WriteAccess::Granted,
        UserRole::Supervisor => WriteAccess::NeedsTeamCheck,
    }
}

pub fn can_write_owner(principal: &Principal, owner_id: Uuid, team: &[Uuid]) -> bool {
    match write_access(principal, owner_id) {
        WriteAccess::Granted => true,
        WriteAccess::Denied => false,
        WriteAccess::NeedsTeamCheck => team.contains(&owner_id),
    }
}

#[derive(Clone)]
pub struct VisibilityResolver {
    user_repo: UserRepository,
}

impl VisibilityResolver {
    pub fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// resolveScope: a equipe só é consultada quando o SUPERVISOR pede `scope=team`.
    pub async fn resolve_scope<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        request: &ScopeRequest,
    ) -> Result<Scope, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let team = if principal.role == UserRole::Supervisor && request.team {
            self.user_repo.team_member_ids(executor, principal.user_id).await?
        } else {
            Vec::new()
        };
        Ok(clamp_scope(principal, request, &team))
    }

    pub async fn can_write<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        owner_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        Ok(match write_access(principal, owner_id) {
            WriteAccess::Granted => true,
            WriteAccess::Denied => false,
            WriteAccess::NeedsTeamCheck => {
                self.user_repo
                    .is_supervised_by(executor, owner_id, principal.user_id)
                    .await?
            }
        })
    }

    pub async fn ensure_can_write<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        owner_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if self.can_write(executor, principal, owner_id).await? {
            Ok(())
        } else {
            Err(AppError::forbidden("Registro fora do seu escopo de escrita."))
        }
    }
}
