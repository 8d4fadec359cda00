use sqlx::MySqlPool;

use crate::error::StoreError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    U64(u64),
    U32(u32),
    I32(i32),
    F64(f64),
}

/// ===============================
/// SQL insert container
/// ===============================
#[derive(Debug)]
pub struct SqlInsert {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build multi-row INSERT SQL
/// ===============================
pub fn build_bulk_insert(
    table: &str,
    columns: &[&str],
    rows: Vec<Vec<SqlValue>>,
) -> Result<SqlInsert, StoreError> {
    if columns.is_empty() {
        return Err(StoreError::Query(format!("insert into {table} without columns")));
    }
    if rows.is_empty() {
        return Err(StoreError::Query(format!("insert into {table} without rows")));
    }
    if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
        return Err(StoreError::Query(format!(
            "insert into {table}: row has {} values for {} columns",
            row.len(),
            columns.len()
        )));
    }

    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        vec![placeholders; rows.len()].join(", ")
    );

    Ok(SqlInsert {
        sql,
        values: rows.into_iter().flatten().collect(),
    })
}

/// ===============================
/// Execute the insert
/// ===============================
pub async fn execute_insert(pool: &MySqlPool, insert: SqlInsert) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&insert.sql);

    for value in insert.values {
        query = match value {
            SqlValue::U64(v) => query.bind(v),
            SqlValue::U32(v) => query.bind(v),
            SqlValue::I32(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_placeholder_group_per_row() {
        let insert = build_bulk_insert(
            "paid_leave_snapshots",
            &["user_id", "month", "hours_left"],
            vec![
                vec![SqlValue::U64(1), SqlValue::U32(1), SqlValue::F64(46.0)],
                vec![SqlValue::U64(2), SqlValue::U32(1), SqlValue::F64(0.0)],
            ],
        )
        .unwrap();

        assert_eq!(
            insert.sql,
            "INSERT INTO paid_leave_snapshots (user_id, month, hours_left) VALUES (?, ?, ?), (?, ?, ?)"
        );
        assert_eq!(insert.values.len(), 6);
        assert_eq!(insert.values[3], SqlValue::U64(2));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = build_bulk_insert(
            "paid_leave_snapshots",
            &["user_id", "month"],
            vec![vec![SqlValue::U64(1)]],
        )
        .unwrap_err();

        assert!(matches!(err, StoreError::Query(_)));
    }

    #[test]
    fn rejects_empty_insert() {
        assert!(build_bulk_insert("paid_leave_snapshots", &["user_id"], vec![]).is_err());
    }
}
