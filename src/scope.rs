//! Who is asking, and which rows they may see.

use std::fmt;

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    store::ScheduleStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    Parent,
    /// A `user_type` this service does not grant anything to.
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            "parent" => Role::Parent,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Parent => "parent",
            Role::Other(s) => s,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated user as seen by the scoped operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn scope(&self) -> AppResult<Scope> {
        match self.role {
            Role::Admin => Ok(Scope::All),
            Role::Parent => Ok(Scope::ParentOf(self.id)),
            Role::Other(_) => Err(AppError::denied()),
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::denied())
        }
    }
}

/// Visibility of group-owned rows (lessons, courses, materials).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Rows of groups where this parent has at least one student.
    ParentOf(Uuid),
}

impl Scope {
    /// Appends ` AND EXISTS (...)` restricting `group_col` to the parent's groups.
    ///
    /// An `EXISTS` rather than a join keeps a lesson from appearing once per
    /// sibling in the same group.
    pub fn push_group_filter(&self, qb: &mut QueryBuilder<'_, Postgres>, group_col: &str) {
        if let Scope::ParentOf(parent_id) = self {
            qb.push(" AND EXISTS (SELECT 1 FROM students s WHERE s.group_id = ")
                .push(group_col)
                .push(" AND s.parent_user_id = ")
                .push_bind(*parent_id)
                .push(")");
        }
    }

    /// Decides access to a single row whose group membership is already known.
    pub fn check(&self, parent_has_student_in_group: bool) -> AppResult<()> {
        match self {
            Scope::All => Ok(()),
            Scope::ParentOf(_) if parent_has_student_in_group => Ok(()),
            Scope::ParentOf(_) => Err(AppError::denied()),
        }
    }
}

/// Lets admins through and parents only into groups of their own students.
pub async fn ensure_group_access(
    store: &dyn ScheduleStore,
    caller: &Caller,
    group_id: Uuid,
) -> AppResult<()> {
    match caller.scope()? {
        Scope::All => Ok(()),
        scope @ Scope::ParentOf(parent_id) => {
            let member = store.parent_has_student_in_group(parent_id, group_id).await?;
            scope.check(member)
        }
    }
}
