use chrono::NaiveDate;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{QueryAs, QueryScalar};

use crate::leave::days::DateWindow;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
}

/// ===============================
/// Dynamic WHERE clause
/// ===============================
///
/// Conditions are AND-ed in push order and values bind in the same order.
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: &str, value: SqlValue) -> &mut Self {
        self.conditions.push(condition.to_string());
        self.values.push(value);
        self
    }

    pub fn push_if<T>(&mut self, condition: &str, value: Option<T>) -> &mut Self
    where
        T: Into<SqlValue>,
    {
        if let Some(v) = value {
            self.push(condition, v.into());
        }
        self
    }

    /// Rows whose `[start_col, end_col]` share a day with `window`.
    /// Same semantics as [`DateWindow::covers`].
    pub fn push_window(&mut self, start_col: &str, end_col: &str, window: &DateWindow) -> &mut Self {
        if let Some(to) = window.to {
            self.push(&format!("{start_col} <= ?"), SqlValue::Date(to));
        }
        if let Some(from) = window.from {
            self.push(&format!("{end_col} >= ?"), SqlValue::Date(from));
        }
        self
    }

    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn bind_as<'q, O>(
        &'q self,
        mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        for value in &self.values {
            query = match value {
                SqlValue::String(v) => query.bind(v.as_str()),
                SqlValue::U64(v) => query.bind(*v),
                SqlValue::Date(v) => query.bind(*v),
            };
        }
        query
    }

    pub fn bind_scalar<'q, O>(
        &'q self,
        mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, O, MySqlArguments> {
        for value in &self.values {
            query = match value {
                SqlValue::String(v) => query.bind(v.as_str()),
                SqlValue::U64(v) => query.bind(*v),
                SqlValue::Date(v) => query.bind(*v),
            };
        }
        query
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::U64(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}
