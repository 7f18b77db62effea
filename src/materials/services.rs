use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateMaterialRequest, MaterialsQuery},
    repo::{self, Material},
};
use crate::{
    error::{AppError, AppResult},
    pagination::{Direction, Limits, Page, PageRequest},
    scope::{ensure_group_access, Caller},
    store::ScheduleStore,
};

fn material_not_found() -> AppError {
    AppError::not_found("MATERIAL_NOT_FOUND", "Material not found")
}

/// Group check, then access, then cursor; drafts are admin-only.
pub async fn list(
    db: &PgPool,
    store: &dyn ScheduleStore,
    caller: &Caller,
    q: &MaterialsQuery,
) -> AppResult<Page<Material>> {
    let group_id = q.required_group()?;
    ensure_group_access(store, caller, group_id).await?;
    let request = PageRequest::parse(q.limit, q.cursor.as_deref(), Limits::FEED, Direction::Desc)?;
    let rows = repo::list_for_group(db, group_id, !caller.is_admin(), &request).await?;
    Ok(Page::from_rows(rows, &request)?)
}

pub async fn get(
    db: &PgPool,
    store: &dyn ScheduleStore,
    caller: &Caller,
    material_id: Uuid,
) -> AppResult<Material> {
    let material = repo::find(db, material_id)
        .await?
        .filter(|m| m.is_published || caller.is_admin())
        .ok_or_else(material_not_found)?;
    ensure_group_access(store, caller, material.group_id).await?;
    Ok(material)
}

pub async fn create(
    db: &PgPool,
    store: &dyn ScheduleStore,
    req: CreateMaterialRequest,
) -> AppResult<Material> {
    let new = req.into_new_material()?;
    if !store.group_exists(new.group_id).await? {
        return Err(AppError::not_found("GROUP_NOT_FOUND", "Group not found"));
    }
    let material = repo::insert(db, &new).await?;
    info!(material_id = %material.id, group_id = %material.group_id, "material created");
    Ok(material)
}
