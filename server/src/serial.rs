//! Display-rank maintenance and duplicate-safe bulk insertion.
//!
//! `sr_no` is a dense 1..N rank over the employee table, recomputed in
//! full after every insert or delete. The rewrite is O(N) over a small
//! administrative table; callers serialize mutations behind the state
//! lock and run it inside the mutating transaction.

use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

use entity::employee;

use crate::{
    config::BulkInsertMode,
    error::{ApiError, ApiResult},
};

/// Rank newly inserted rows carry until the renumbering pass inside the
/// same transaction replaces it. Never visible outside the transaction.
pub const SR_NO_SENTINEL: i32 = 0;

#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub salary: i32,
    pub department: String,
    pub joindate: Option<String>,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SkippedCandidate {
    pub name: String,
    pub department: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BulkReport {
    pub inserted: Vec<employee::Model>,
    pub skipped: Vec<SkippedCandidate>,
}

/// Rewrite every row's `sr_no` to 1..N in ascending `id` order.
/// Idempotent; empty table is a no-op. Must run inside the transaction
/// of the triggering mutation.
pub async fn renumber<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let rows = employee::Entity::find()
        .order_by_asc(employee::Column::Id)
        .all(conn)
        .await?;
    for (idx, row) in rows.into_iter().enumerate() {
        let rank = idx as i32 + 1;
        let mut active: employee::ActiveModel = row.into();
        active.sr_no = Set(rank);
        active.update(conn).await?;
    }
    Ok(())
}

/// Insert a batch of candidates under the configured duplicate policy,
/// then renumber once for the whole batch. Caller owns the transaction
/// and the mutation lock.
pub async fn bulk_insert<C: ConnectionTrait>(
    conn: &C,
    candidates: Vec<NewEmployee>,
    mode: BulkInsertMode,
) -> ApiResult<BulkReport> {
    validate_batch(&candidates)?;

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut verdicts = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let reason = if seen.contains(&batch_key(candidate)) {
            Some("duplicate (name, department) within batch")
        } else if find_duplicate(conn, &candidate.name, &candidate.department, None)
            .await?
            .is_some()
        {
            Some("employee with this (name, department) already exists")
        } else {
            seen.insert(batch_key(candidate));
            None
        };
        verdicts.push(reason);
    }

    if mode == BulkInsertMode::Strict {
        let conflicts: Vec<String> = candidates
            .iter()
            .zip(verdicts.iter().copied())
            .filter_map(|(candidate, verdict)| {
                verdict.map(|reason| {
                    format!("({}, {}): {}", candidate.name, candidate.department, reason)
                })
            })
            .collect();
        if !conflicts.is_empty() {
            return Err(ApiError::Conflict(format!(
                "duplicate employees: {}",
                conflicts.join("; ")
            )));
        }
    }

    let mut inserted = Vec::new();
    let mut skipped = Vec::new();
    let mut inserted_ids = Vec::new();
    for (candidate, verdict) in candidates.into_iter().zip(verdicts) {
        if let Some(reason) = verdict {
            skipped.push(SkippedCandidate {
                name: candidate.name,
                department: candidate.department,
                reason: reason.to_string(),
            });
            continue;
        }
        let model = employee::ActiveModel {
            sr_no: Set(SR_NO_SENTINEL),
            name: Set(candidate.name),
            salary: Set(candidate.salary),
            department: Set(candidate.department),
            joindate: Set(candidate.joindate),
            profile_pic: Set(candidate.profile_pic),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        inserted_ids.push(model.id);
    }

    if !inserted_ids.is_empty() {
        renumber(conn).await?;
        // Reload so the response carries the final ranks, never the sentinel.
        inserted = employee::Entity::find()
            .filter(employee::Column::Id.is_in(inserted_ids))
            .order_by_asc(employee::Column::Id)
            .all(conn)
            .await?;
    }

    Ok(BulkReport { inserted, skipped })
}

/// Existing row sharing `(name, department)`, excluding `exclude_id` when
/// given (update paths exclude the row being updated).
pub async fn find_duplicate<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    department: &str,
    exclude_id: Option<i32>,
) -> Result<Option<employee::Model>, DbErr> {
    let mut query = employee::Entity::find()
        .filter(employee::Column::Name.eq(name))
        .filter(employee::Column::Department.eq(department));
    if let Some(id) = exclude_id {
        query = query.filter(employee::Column::Id.ne(id));
    }
    query.one(conn).await
}

fn batch_key(candidate: &NewEmployee) -> (String, String) {
    (candidate.name.clone(), candidate.department.clone())
}

fn validate_batch(candidates: &[NewEmployee]) -> ApiResult<()> {
    if candidates.is_empty() {
        return Err(ApiError::Validation("employee batch is empty".into()));
    }
    let mut problems = Vec::new();
    for (idx, candidate) in candidates.iter().enumerate() {
        if candidate.name.trim().is_empty() {
            problems.push(format!("candidate {idx}: name must not be empty"));
        }
        if candidate.department.trim().is_empty() {
            problems.push(format!("candidate {idx}: department must not be empty"));
        }
        if candidate.salary < 0 {
            problems.push(format!("candidate {idx}: salary must not be negative"));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(problems.join("; ")))
    }
}
