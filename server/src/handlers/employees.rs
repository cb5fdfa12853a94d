use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use entity::employee;

use crate::{
    auth::Role,
    error::{ApiError, ApiResult},
    extract::CurrentUser,
    handlers::OneOrMany,
    http::AppState,
    serial::{self, BulkReport, NewEmployee},
};

const MAX_PAGE_SIZE: u64 = 100;
const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<u64>,
    size: Option<u64>,
    department: Option<String>,
    min_salary: Option<i32>,
    max_salary: Option<i32>,
    search: Option<String>,
    sort_by: Option<String>,
    order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<employee::Model>,
    pub page: u64,
    pub size: u64,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeReplace {
    pub name: String,
    pub salary: i32,
    pub department: String,
    pub joindate: Option<String>,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub salary: Option<i32>,
    pub department: Option<String>,
    pub joindate: Option<String>,
    pub profile_pic: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<OneOrMany<NewEmployee>>, ApiError>,
) -> ApiResult<(StatusCode, Json<BulkReport>)> {
    current.require(Role::Admin)?;
    let candidates = payload.into_vec();

    let _guard = state.mutation_lock.lock().await;
    let txn = state.db.begin().await?;
    let report = serial::bulk_insert(&txn, candidates, state.config.bulk_insert_mode).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, ApiError>,
) -> ApiResult<Json<ListResponse>> {
    current.require(Role::Employee)?;

    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::Validation("page must be >= 1".into()));
    }
    let size = params.size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(ApiError::Validation(format!(
            "size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let sort_col = match params.sort_by.as_deref() {
        None => employee::Column::SrNo,
        Some(key) => sort_column(key)
            .ok_or_else(|| ApiError::Validation(format!("invalid sort_by {key:?}")))?,
    };
    let sort_order = match params.order.as_deref() {
        None | Some("asc") => Order::Asc,
        Some("desc") => Order::Desc,
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "invalid order {other:?}; expected \"asc\" or \"desc\""
            )))
        }
    };

    let mut query = employee::Entity::find();
    if let Some(department) = params.department.as_deref() {
        query = query.filter(employee::Column::Department.eq(department));
    }
    if let Some(min) = params.min_salary {
        query = query.filter(employee::Column::Salary.gte(min));
    }
    if let Some(max) = params.max_salary {
        query = query.filter(employee::Column::Salary.lte(max));
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        query = query.filter(
            Expr::expr(Func::lower(Expr::col((
                employee::Entity,
                employee::Column::Name,
            ))))
            .like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    let offset = page
        .checked_sub(1)
        .and_then(|prev| prev.checked_mul(size))
        .ok_or_else(|| ApiError::Validation("page is out of range".into()))?;

    let total = query.clone().count(&state.db).await?;
    let items = query
        .order_by(sort_col, sort_order)
        .limit(size)
        .offset(offset)
        .all(&state.db)
        .await?;

    Ok(Json(ListResponse {
        items,
        page,
        size,
        total,
    }))
}

pub async fn get_one(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
) -> ApiResult<Json<employee::Model>> {
    current.require(Role::Employee)?;
    let found = employee::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;
    Ok(Json(found))
}

pub async fn replace(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<EmployeeReplace>, ApiError>,
) -> ApiResult<Json<employee::Model>> {
    current.require(Role::Manager)?;
    if payload.name.trim().is_empty() || payload.department.trim().is_empty() {
        return Err(ApiError::Validation(
            "name and department must not be empty".into(),
        ));
    }
    if payload.salary < 0 {
        return Err(ApiError::Validation("salary must not be negative".into()));
    }

    let _guard = state.mutation_lock.lock().await;
    let found = employee::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;
    if serial::find_duplicate(&state.db, &payload.name, &payload.department, Some(id))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "employee ({}, {}) already exists",
            payload.name, payload.department
        )));
    }

    let mut active: employee::ActiveModel = found.into();
    active.name = Set(payload.name);
    active.salary = Set(payload.salary);
    active.department = Set(payload.department);
    active.joindate = Set(payload.joindate);
    active.profile_pic = Set(payload.profile_pic);
    let updated = active.update(&state.db).await?;
    Ok(Json(updated))
}

pub async fn patch(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<EmployeePatch>, ApiError>,
) -> ApiResult<Json<employee::Model>> {
    current.require(Role::Manager)?;
    if let Some(name) = payload.name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
    }
    if let Some(department) = payload.department.as_deref() {
        if department.trim().is_empty() {
            return Err(ApiError::Validation("department must not be empty".into()));
        }
    }
    if matches!(payload.salary, Some(salary) if salary < 0) {
        return Err(ApiError::Validation("salary must not be negative".into()));
    }

    let _guard = state.mutation_lock.lock().await;
    let found = employee::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;

    let new_name = payload.name.as_deref().unwrap_or(&found.name);
    let new_department = payload.department.as_deref().unwrap_or(&found.department);
    let identity_changed = new_name != found.name || new_department != found.department;
    if identity_changed
        && serial::find_duplicate(&state.db, new_name, new_department, Some(id))
            .await?
            .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "employee ({new_name}, {new_department}) already exists"
        )));
    }

    let mut active: employee::ActiveModel = found.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(salary) = payload.salary {
        active.salary = Set(salary);
    }
    if let Some(department) = payload.department {
        active.department = Set(department);
    }
    if let Some(joindate) = payload.joindate {
        active.joindate = Set(Some(joindate));
    }
    if let Some(profile_pic) = payload.profile_pic {
        active.profile_pic = Set(Some(profile_pic));
    }
    let updated = active.update(&state.db).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
) -> ApiResult<StatusCode> {
    current.require(Role::Admin)?;

    let _guard = state.mutation_lock.lock().await;
    let txn = state.db.begin().await?;
    let found = employee::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;
    found.delete(&txn).await?;
    serial::renumber(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Escape LIKE metacharacters so `search` always matches literally; the
/// query pairs this with `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn sort_column(key: &str) -> Option<employee::Column> {
    // Explicit allow-list; anything else is a validation error.
    match key {
        "id" => Some(employee::Column::Id),
        "sr_no" => Some(employee::Column::SrNo),
        "name" => Some(employee::Column::Name),
        "salary" => Some(employee::Column::Salary),
        "department" => Some(employee::Column::Department),
        "joindate" => Some(employee::Column::Joindate),
        _ => None,
    }
}
