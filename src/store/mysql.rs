use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, FromRow, MySql, MySqlPool, Transaction};
use tracing::debug;

use super::{LeaveListQuery, LeaveStore, LeaveTx, OverlapQuery, StoreError};
use crate::model::employee::EmployeeLeaveProfile;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest, StatusUpdate};
use crate::utils::query_builder::{SqlValue, WhereClause};

const LEAVE_COLUMNS: &str = "lr.id, lr.employee_id, lr.leave_type, lr.start_date, lr.end_date, \
     lr.status, lr.reason, lr.is_paid, lr.created_at";

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    reason: Option<String>,
    is_paid: Option<bool>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<LeaveStatus>().map_err(|_| {
            StoreError::Corrupt(format!("leave {} has status {:?}", row.id, row.status))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: row.leave_type.into(),
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            reason: row.reason,
            is_paid: row.is_paid,
            created_at: row.created_at,
        })
    }
}

async fn fetch_request<'e, E>(
    executor: E,
    leave_id: u64,
    for_update: bool,
) -> Result<Option<LeaveRequest>, StoreError>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests lr WHERE lr.id = ?{}",
        if for_update { " FOR UPDATE" } else { "" }
    );

    sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(leave_id)
        .fetch_optional(executor)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()
}

async fn fetch_employee<'e, E>(
    executor: E,
    employee_id: u64,
    for_update: bool,
) -> Result<Option<EmployeeLeaveProfile>, StoreError>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        "SELECT id, department_id, leave_balance FROM employees WHERE id = ?{}",
        if for_update { " FOR UPDATE" } else { "" }
    );

    Ok(sqlx::query_as::<_, EmployeeLeaveProfile>(&sql)
        .bind(employee_id)
        .fetch_optional(executor)
        .await?)
}

async fn count_overlaps<'e, E>(executor: E, query: &OverlapQuery) -> Result<u64, StoreError>
where
    E: Executor<'e, Database = MySql>,
{
    let mut clause = WhereClause::new();
    clause
        .push("lr.status = ?", LeaveStatus::Approved.as_str().into())
        .push("e.department_id = ?", SqlValue::U64(query.department_id))
        .push_window("lr.start_date", "lr.end_date", &query.window)
        .push_if("lr.id <> ?", query.exclude_request_id);

    let sql = format!(
        "SELECT COUNT(*) FROM leave_requests lr JOIN employees e ON e.id = lr.employee_id{}",
        clause.sql()
    );
    debug!(sql = %sql, values = ?clause.values(), "Counting overlapping leaves");

    let count = clause
        .bind_scalar(sqlx::query_scalar::<_, i64>(&sql))
        .fetch_one(executor)
        .await?;

    Ok(count.max(0) as u64)
}

#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub struct MySqlLeaveTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl LeaveTx for MySqlLeaveTx {
    async fn lock_employee(
        &mut self,
        employee_id: u64,
    ) -> Result<Option<EmployeeLeaveProfile>, StoreError> {
        fetch_employee(&mut *self.tx, employee_id, true).await
    }

    async fn lock_request(&mut self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        fetch_request(&mut *self.tx, leave_id, true).await
    }

    async fn count_approved_overlaps(&mut self, query: &OverlapQuery) -> Result<u64, StoreError> {
        count_overlaps(&mut *self.tx, query).await
    }

    async fn insert_request(&mut self, new: &NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, start_date, end_date, status, reason)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.leave_type.as_str())
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.status.as_str())
        .bind(new.reason.as_deref())
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        fetch_request(&mut *self.tx, id, false)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("inserted leave {id} not readable")))
    }

    async fn update_request(
        &mut self,
        leave_id: u64,
        update: &StatusUpdate,
    ) -> Result<LeaveRequest, StoreError> {
        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?,
                reason = COALESCE(?, reason),
                is_paid = COALESCE(?, is_paid)
            WHERE id = ?
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.reason.as_deref())
        .bind(update.is_paid)
        .bind(leave_id)
        .execute(&mut *self.tx)
        .await?;

        fetch_request(&mut *self.tx, leave_id, false)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("leave {leave_id} vanished mid-transaction")))
    }

    async fn write_balance(&mut self, employee_id: u64, balance: f64) -> Result<(), StoreError> {
        sqlx::query("UPDATE employees SET leave_balance = ? WHERE id = ?")
            .bind(balance)
            .bind(employee_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlLeaveTx { tx }))
    }

    async fn find_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        fetch_request(&self.pool, leave_id, false).await
    }

    async fn find_employee(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmployeeLeaveProfile>, StoreError> {
        fetch_employee(&self.pool, employee_id, false).await
    }

    async fn count_approved_overlaps(&self, query: &OverlapQuery) -> Result<u64, StoreError> {
        count_overlaps(&self.pool, query).await
    }

    async fn list_requests(
        &self,
        query: &LeaveListQuery,
    ) -> Result<(Vec<LeaveRequest>, u64), StoreError> {
        // -------------------------
        // WHERE clause
        // -------------------------
        let mut clause = WhereClause::new();
        clause
            .push_window("lr.start_date", "lr.end_date", &query.window)
            .push_if("lr.status = ?", query.status.map(|s| s.as_str()))
            .push_if("lr.leave_type = ?", query.leave_type.as_ref().map(|t| t.as_str()))
            .push_if("e.department_id = ?", query.department_id)
            .push_if("lr.employee_id = ?", query.employee_id);

        let from_sql = format!(
            "FROM leave_requests lr LEFT JOIN employees e ON e.id = lr.employee_id{}",
            clause.sql()
        );

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) {from_sql}");
        debug!(sql = %count_sql, values = ?clause.values(), "Counting leave requests");

        let total = clause
            .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(&self.pool)
            .await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "SELECT {LEAVE_COLUMNS} {from_sql} ORDER BY lr.created_at DESC, lr.id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, limit = query.limit, offset = query.offset, "Fetching leave requests");

        let rows = clause
            .bind_as(sqlx::query_as::<_, LeaveRow>(&data_sql))
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let requests = rows
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((requests, total.max(0) as u64))
    }
}
