/*!
 * Lazily evaluated, composable queries over the relational store.
 *
 * A `QuerySet` collects filter conditions without touching the database.
 * SQL is only built and executed when rows are requested (`fetch`, `count`,
 * `exists`, `get`, ...). Every value is bound as a `?` parameter, in the
 * order the conditions were added.
 *
 * Conditions refer to alias-qualified columns of the record's `FROM`
 * clause, for example `u.checksum` for units.
 */

use std::fmt;
use std::marker::PhantomData;

use anyhow::{Context, Result};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};

use crate::database::DatabaseConnection;
use crate::errors::LookupError;

/// A row type that can be loaded by a `QuerySet`
pub trait Record: Sized {
    /// Entity name used in lookup errors
    const ENTITY: &'static str;
    /// Base table, target of deletes
    const TABLE: &'static str;
    /// FROM clause including joins
    const FROM: &'static str;
    /// Selected columns, in `from_row` order
    const COLUMNS: &'static str;
    /// Qualified primary key column
    const PK: &'static str;
    /// Default ordering
    const ORDER: &'static str;

    /// Build a record from a selected row
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// A compiled `SELECT` producing one column, usable in `IN (...)`
#[derive(Debug, Clone)]
pub struct SubQuery {
    sql: String,
    params: Vec<Value>,
}

impl SubQuery {
    /// Raw sub-select with its bound parameters
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Filter condition
#[derive(Debug, Clone)]
pub enum Condition {
    /// `column = value`
    Eq(&'static str, Value),
    /// `column IS NOT value` (NULL-safe inequality)
    IsNot(&'static str, Value),
    /// `column IS NULL`
    IsNull(&'static str),
    /// `column IN (values)`
    In(&'static str, Vec<Value>),
    /// `column IN (SELECT ...)`
    InQuery(&'static str, SubQuery),
    /// `column >= value`
    Gte(&'static str, Value),
    /// Any of the nested conditions
    Any(Vec<Condition>),
}

impl Condition {
    /// Equality helper
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Eq(column, value.into())
    }

    /// Membership helper
    pub fn is_in<I, V>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In(column, values.into_iter().map(Into::into).collect())
    }

    fn compile(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Condition::Eq(col, value) => {
                sql.push_str(&format!("{} = ?", col));
                params.push(value.clone());
            }
            Condition::IsNot(col, value) => {
                sql.push_str(&format!("{} IS NOT ?", col));
                params.push(value.clone());
            }
            Condition::IsNull(col) => sql.push_str(&format!("{} IS NULL", col)),
            Condition::In(_, values) if values.is_empty() => sql.push_str("0 = 1"),
            Condition::In(col, values) => {
                let marks = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{} IN ({})", col, marks));
                params.extend(values.iter().cloned());
            }
            Condition::InQuery(col, sub) => {
                sql.push_str(&format!("{} IN ({})", col, sub.sql));
                params.extend(sub.params.iter().cloned());
            }
            Condition::Gte(col, value) => {
                sql.push_str(&format!("{} >= ?", col));
                params.push(value.clone());
            }
            Condition::Any(conditions) if conditions.is_empty() => sql.push_str("0 = 1"),
            Condition::Any(conditions) => {
                sql.push('(');
                for (idx, cond) in conditions.iter().enumerate() {
                    if idx > 0 {
                        sql.push_str(" OR ");
                    }
                    cond.compile(sql, params);
                }
                sql.push(')');
            }
        }
    }
}

/// Lazily evaluated set of records
pub struct QuerySet<T: Record> {
    db: DatabaseConnection,
    include: Vec<Condition>,
    exclude: Vec<Condition>,
    empty: bool,
    limit: Option<usize>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for QuerySet<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            empty: self.empty,
            limit: self.limit,
            _record: PhantomData,
        }
    }
}

impl<T: Record> fmt::Debug for QuerySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sql, params) = self.where_clause();
        write!(f, "QuerySet<{}>({} {:?})", T::ENTITY, sql, params)
    }
}

impl<T: Record> QuerySet<T> {
    /// Unfiltered set over the whole table
    pub fn all(db: DatabaseConnection) -> Self {
        Self {
            db,
            include: Vec::new(),
            exclude: Vec::new(),
            empty: false,
            limit: None,
            _record: PhantomData,
        }
    }

    /// Restrict to rows matching the condition
    pub fn filter(mut self, condition: Condition) -> Self {
        self.include.push(condition);
        self
    }

    /// Restrict to rows not matching the condition
    pub fn exclude(mut self, condition: Condition) -> Self {
        self.exclude.push(condition);
        self
    }

    /// Set that never matches anything
    pub fn none(mut self) -> Self {
        self.empty = true;
        self
    }

    /// Cap the number of returned rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the set carries no restriction at all
    pub fn is_unfiltered(&self) -> bool {
        !self.empty && self.include.is_empty() && self.exclude.is_empty()
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        if self.empty {
            return ("0 = 1".to_string(), params);
        }

        let mut parts = Vec::with_capacity(self.include.len() + self.exclude.len());
        for cond in &self.include {
            let mut sql = String::new();
            cond.compile(&mut sql, &mut params);
            parts.push(sql);
        }
        for cond in &self.exclude {
            let mut sql = String::from("NOT (");
            cond.compile(&mut sql, &mut params);
            sql.push(')');
            parts.push(sql);
        }

        if parts.is_empty() {
            ("1 = 1".to_string(), params)
        } else {
            (parts.join(" AND "), params)
        }
    }

    fn limit_clause(&self) -> String {
        self.limit
            .map(|n| format!(" LIMIT {}", n))
            .unwrap_or_default()
    }

    /// Load all matching records
    pub fn fetch(&self) -> Result<Vec<T>> {
        let (where_sql, params) = self.where_clause();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}{}",
            T::COLUMNS,
            T::FROM,
            where_sql,
            T::ORDER,
            self.limit_clause()
        );

        self.db.execute(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .with_context(|| format!("Failed to prepare {} query", T::ENTITY))?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| T::from_row(row))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Number of matching rows
    pub fn count(&self) -> Result<usize> {
        let (where_sql, params) = self.where_clause();
        let sql = match self.limit {
            Some(n) => format!(
                "SELECT COUNT(*) FROM (SELECT 1 FROM {} WHERE {} LIMIT {})",
                T::FROM,
                where_sql,
                n
            ),
            None => format!("SELECT COUNT(*) FROM {} WHERE {}", T::FROM, where_sql),
        };

        self.db.execute(|conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Whether any row matches
    pub fn exists(&self) -> Result<bool> {
        let (where_sql, params) = self.where_clause();
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
            T::FROM,
            where_sql
        );

        self.db.execute(|conn| {
            let exists: bool =
                conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
            Ok(exists)
        })
    }

    /// First record in default order
    pub fn first(&self) -> Result<Option<T>> {
        Ok(self.clone().limit(1).fetch()?.into_iter().next())
    }

    /// Exactly one matching record
    pub fn get(&self) -> Result<T, LookupError> {
        let mut rows = self.fetch()?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => {
                let (where_sql, params) = self.where_clause();
                Err(LookupError::DoesNotExist {
                    entity: T::ENTITY,
                    lookup: format!("{} {:?}", where_sql, params),
                })
            }
            count => Err(LookupError::MultipleObjectsReturned {
                entity: T::ENTITY,
                count,
            }),
        }
    }

    /// Sub-select of one column of the matching rows
    pub fn values(&self, column: &str) -> SubQuery {
        let (where_sql, params) = self.where_clause();
        SubQuery::new(
            format!(
                "SELECT {} FROM {} WHERE {}{}",
                column,
                T::FROM,
                where_sql,
                self.limit_clause()
            ),
            params,
        )
    }

    /// Primary keys of the matching rows
    pub fn ids(&self) -> Result<Vec<i64>> {
        let sub = self.values(T::PK);
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(&sub.sql)?;
            let ids = stmt
                .query_map(params_from_iter(sub.params.iter()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    /// Delete the matching rows from the base table
    pub fn delete(&self) -> Result<usize> {
        let sub = self.values(T::PK);
        let sql = format!("DELETE FROM {} WHERE id IN ({})", T::TABLE, sub.sql);

        let deleted = self
            .db
            .execute(|conn| Ok(conn.execute(&sql, params_from_iter(sub.params.iter()))?))?;
        debug!("Deleted {} {} rows", deleted, T::ENTITY);
        Ok(deleted)
    }
}
