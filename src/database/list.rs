use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseError;

/// Typed query parameter for runtime-built SQL.
#[derive(Debug, Clone)]
pub enum SqlParam {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Bool(bool),
}

/// Clamped limit/offset pair for list endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn from_query(limit: Option<i64>, offset: Option<i64>) -> Self {
        let api = &config::config().api;
        Self {
            limit: limit.unwrap_or(api.default_page_size).clamp(1, api.max_page_size),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Incrementally-built SELECT with numbered placeholders.
///
/// The base statement carries its own WHERE clause; every appended filter
/// is ANDed on. Column names never come from request input; `and_eq`
/// still validates them so a future mistake fails loudly instead of
/// producing injectable SQL.
pub struct ListBuilder {
    sql: String,
    params: Vec<SqlParam>,
}

impl ListBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            sql: base.into(),
            params: Vec::new(),
        }
    }

    /// Register a parameter and return its 1-based placeholder index.
    pub fn bind(&mut self, value: SqlParam) -> usize {
        self.params.push(value);
        self.params.len()
    }

    /// Append a raw SQL fragment. Placeholder indices come from [`bind`](Self::bind).
    pub fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// Append `AND column = $n` for a validated column name.
    pub fn and_eq(&mut self, column: &str, value: SqlParam) -> Result<(), DatabaseError> {
        if !is_safe_ident(column) {
            return Err(DatabaseError::QueryError(format!(
                "unsafe column identifier: {}",
                column
            )));
        }
        let n = self.bind(value);
        self.sql.push_str(&format!(" AND {} = ${}", column, n));
        Ok(())
    }

    pub fn order_by(&mut self, clause: &str) {
        self.sql.push_str(" ORDER BY ");
        self.sql.push_str(clause);
    }

    pub fn paginate(&mut self, page: Page) {
        let limit = self.bind(SqlParam::Int(page.limit));
        let offset = self.bind(SqlParam::Int(page.offset));
        self.sql
            .push_str(&format!(" LIMIT ${} OFFSET ${}", limit, offset));
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    pub async fn fetch_all<T>(&self, conn: &mut PgConnection) -> Result<Vec<T>, DatabaseError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut q = sqlx::query_as::<_, T>(&self.sql);
        for p in self.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(&mut *conn).await?;
        Ok(rows)
    }

    pub async fn fetch_optional<T>(
        &self,
        conn: &mut PgConnection,
    ) -> Result<Option<T>, DatabaseError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut q = sqlx::query_as::<_, T>(&self.sql);
        for p in self.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(&mut *conn).await?;
        Ok(row)
    }
}

fn is_safe_ident(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match p {
        SqlParam::Uuid(u) => q.bind(*u),
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Bool(b) => q.bind(*b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_order() {
        let mut b = ListBuilder::new("SELECT * FROM objectives WHERE deleted_at IS NULL");
        b.and_eq("status", SqlParam::Text("active".into())).unwrap();
        b.and_eq("quarter", SqlParam::Int(3)).unwrap();
        b.order_by("year DESC, quarter DESC");
        b.paginate(Page {
            limit: 50,
            offset: 100,
        });

        assert_eq!(
            b.sql(),
            "SELECT * FROM objectives WHERE deleted_at IS NULL AND status = $1 \
             AND quarter = $2 ORDER BY year DESC, quarter DESC LIMIT $3 OFFSET $4"
        );
        assert_eq!(b.params().len(), 4);
    }

    #[test]
    fn rejects_unsafe_column_names() {
        let mut b = ListBuilder::new("SELECT * FROM objectives WHERE true");
        assert!(b.and_eq("status; DROP TABLE objectives", SqlParam::Int(1)).is_err());
        assert!(b.and_eq("Status", SqlParam::Int(1)).is_err());
        assert!(b.and_eq("", SqlParam::Int(1)).is_err());
    }

    #[test]
    fn manual_bind_returns_placeholder_index() {
        let mut b = ListBuilder::new("SELECT * FROM activities WHERE true");
        let me = b.bind(SqlParam::Uuid(Uuid::new_v4()));
        b.push(&format!(" AND owner_id = ${}", me));
        assert!(b.sql().ends_with("AND owner_id = $1"));
    }

    #[test]
    fn page_clamps_limit_and_offset() {
        let page = Page::from_query(Some(10_000), Some(-5));
        assert!(page.limit <= 200);
        assert_eq!(page.offset, 0);

        let page = Page::from_query(Some(0), None);
        assert_eq!(page.limit, 1);

        let page = Page::from_query(None, None);
        assert_eq!(page.limit, 50);
    }
}
