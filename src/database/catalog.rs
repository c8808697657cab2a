//! Schema introspection through the Firebird system tables.

use crate::config::FirebirdConfig;
use crate::database::result::{ColumnSchema, ForeignKey, IndexInfo, Row, TableInfo, TableSchema};
use crate::database::traits::{Connection, DatabaseClient};
use crate::error::DbResult;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const LIST_TABLES_SQL: &str = "\
SELECT TRIM(RDB$RELATION_NAME) AS TABLE_NAME, RDB$DESCRIPTION AS DESCRIPTION \
FROM RDB$RELATIONS \
WHERE RDB$VIEW_BLR IS NULL AND (RDB$SYSTEM_FLAG IS NULL OR RDB$SYSTEM_FLAG = 0) \
ORDER BY RDB$RELATION_NAME";

const COLUMNS_SQL: &str = "\
SELECT TRIM(rf.RDB$FIELD_NAME) AS COLUMN_NAME, f.RDB$FIELD_TYPE AS FIELD_TYPE, \
f.RDB$FIELD_SUB_TYPE AS FIELD_SUB_TYPE, f.RDB$CHARACTER_LENGTH AS CHAR_LENGTH, \
f.RDB$FIELD_LENGTH AS FIELD_LENGTH, f.RDB$FIELD_PRECISION AS FIELD_PRECISION, \
f.RDB$FIELD_SCALE AS FIELD_SCALE, rf.RDB$NULL_FLAG AS NULL_FLAG, \
CAST(rf.RDB$DEFAULT_SOURCE AS VARCHAR(255)) AS DEFAULT_SOURCE \
FROM RDB$RELATION_FIELDS rf \
JOIN RDB$FIELDS f ON f.RDB$FIELD_NAME = rf.RDB$FIELD_SOURCE \
WHERE rf.RDB$RELATION_NAME = ? \
ORDER BY rf.RDB$FIELD_POSITION";

const PRIMARY_KEYS_SQL: &str = "\
SELECT TRIM(s.RDB$FIELD_NAME) AS COLUMN_NAME \
FROM RDB$RELATION_CONSTRAINTS rc \
JOIN RDB$INDEX_SEGMENTS s ON s.RDB$INDEX_NAME = rc.RDB$INDEX_NAME \
WHERE rc.RDB$RELATION_NAME = ? AND rc.RDB$CONSTRAINT_TYPE = 'PRIMARY KEY' \
ORDER BY s.RDB$FIELD_POSITION";

const FOREIGN_KEYS_SQL: &str = "\
SELECT TRIM(rc.RDB$CONSTRAINT_NAME) AS CONSTRAINT_NAME, TRIM(s.RDB$FIELD_NAME) AS COLUMN_NAME, \
TRIM(ref_rc.RDB$RELATION_NAME) AS REFERENCED_TABLE, TRIM(ref_s.RDB$FIELD_NAME) AS REFERENCED_COLUMN \
FROM RDB$RELATION_CONSTRAINTS rc \
JOIN RDB$REF_CONSTRAINTS refc ON refc.RDB$CONSTRAINT_NAME = rc.RDB$CONSTRAINT_NAME \
JOIN RDB$RELATION_CONSTRAINTS ref_rc ON ref_rc.RDB$CONSTRAINT_NAME = refc.RDB$CONST_NAME_UQ \
JOIN RDB$INDEX_SEGMENTS s ON s.RDB$INDEX_NAME = rc.RDB$INDEX_NAME \
JOIN RDB$INDEX_SEGMENTS ref_s ON ref_s.RDB$INDEX_NAME = ref_rc.RDB$INDEX_NAME \
AND ref_s.RDB$FIELD_POSITION = s.RDB$FIELD_POSITION \
WHERE rc.RDB$RELATION_NAME = ? AND rc.RDB$CONSTRAINT_TYPE = 'FOREIGN KEY' \
ORDER BY rc.RDB$CONSTRAINT_NAME, s.RDB$FIELD_POSITION";

const INDEXES_SQL: &str = "\
SELECT TRIM(i.RDB$INDEX_NAME) AS INDEX_NAME, TRIM(s.RDB$FIELD_NAME) AS COLUMN_NAME, \
i.RDB$UNIQUE_FLAG AS UNIQUE_FLAG \
FROM RDB$INDICES i \
JOIN RDB$INDEX_SEGMENTS s ON s.RDB$INDEX_NAME = i.RDB$INDEX_NAME \
WHERE i.RDB$RELATION_NAME = ? AND (i.RDB$SYSTEM_FLAG IS NULL OR i.RDB$SYSTEM_FLAG = 0) \
ORDER BY i.RDB$INDEX_NAME, s.RDB$FIELD_POSITION";

/// Reads table metadata through a [`DatabaseClient`].
#[derive(Clone)]
pub struct SchemaCatalog {
    client: Arc<dyn DatabaseClient>,
    target: FirebirdConfig,
}

impl SchemaCatalog {
    pub fn new(client: Arc<dyn DatabaseClient>, target: FirebirdConfig) -> Self {
        Self { client, target }
    }

    /// User tables, ordered by name.
    pub fn list_tables(&self) -> DbResult<Vec<TableInfo>> {
        let mut conn = self.client.connect(&self.target)?;
        let result = conn.execute(LIST_TABLES_SQL, &[])?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .filter_map(|row| {
                Some(TableInfo {
                    name: row.text("TABLE_NAME")?,
                    description: row.text("DESCRIPTION"),
                })
            })
            .collect();

        debug!(count = tables.len(), "Listed user tables");
        Ok(tables)
    }

    /// Columns, keys and indexes of `table`. Names are matched upper-cased.
    pub fn table_schema(&self, table: &str) -> DbResult<TableSchema> {
        let name = table.trim().to_uppercase();
        let mut conn = self.client.connect(&self.target)?;
        let params = [Value::String(name.clone())];

        let columns = query(conn.as_mut(), COLUMNS_SQL, &params)?
            .iter()
            .filter_map(parse_column)
            .collect();

        let primary_keys = query(conn.as_mut(), PRIMARY_KEYS_SQL, &params)?
            .iter()
            .filter_map(|row| row.text("COLUMN_NAME"))
            .collect();

        let foreign_keys = query(conn.as_mut(), FOREIGN_KEYS_SQL, &params)?
            .iter()
            .filter_map(|row| {
                Some(ForeignKey {
                    constraint_name: row.text("CONSTRAINT_NAME")?,
                    column: row.text("COLUMN_NAME")?,
                    referenced_table: row.text("REFERENCED_TABLE")?,
                    referenced_column: row.text("REFERENCED_COLUMN")?,
                })
            })
            .collect();

        let indexes = group_indexes(&query(conn.as_mut(), INDEXES_SQL, &params)?);

        Ok(TableSchema {
            name,
            columns,
            primary_keys,
            foreign_keys,
            indexes,
        })
    }
}

fn query(conn: &mut dyn Connection, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
    Ok(conn.execute(sql, params)?.rows)
}

fn parse_column(row: &Row) -> Option<ColumnSchema> {
    let name = row.text("COLUMN_NAME")?;
    let field_type = row.int("FIELD_TYPE").unwrap_or_default();
    let scale = row.int("FIELD_SCALE").filter(|s| *s != 0);
    let length = row
        .int("CHAR_LENGTH")
        .or_else(|| row.int("FIELD_LENGTH"))
        .filter(|_| matches!(field_type, 14 | 37));

    Some(ColumnSchema {
        data_type: type_name(
            field_type,
            row.int("FIELD_SUB_TYPE").unwrap_or_default(),
            length,
            row.int("FIELD_PRECISION"),
            scale,
        ),
        nullable: row.int("NULL_FLAG").unwrap_or_default() == 0,
        length,
        scale,
        default_value: row
            .text("DEFAULT_SOURCE")
            .map(|d| d.trim_start_matches("DEFAULT").trim().to_string()),
        name,
    })
}

/// SQL type name for a `RDB$FIELD_TYPE` code.
pub fn type_name(
    code: i64,
    sub_type: i64,
    length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
) -> String {
    if let Some(scale) = scale
        && matches!(code, 7 | 8 | 16)
    {
        let kind = if sub_type == 2 { "DECIMAL" } else { "NUMERIC" };
        return format!("{}({},{})", kind, precision.unwrap_or(18), -scale);
    }

    let base = match code {
        7 => "SMALLINT",
        8 => "INTEGER",
        10 => "FLOAT",
        12 => "DATE",
        13 => "TIME",
        14 => "CHAR",
        16 => "BIGINT",
        23 => "BOOLEAN",
        27 => "DOUBLE PRECISION",
        35 => "TIMESTAMP",
        37 => "VARCHAR",
        261 if sub_type == 1 => "BLOB SUB_TYPE TEXT",
        261 => "BLOB",
        _ => return format!("UNKNOWN({})", code),
    };

    match length {
        Some(len) if matches!(code, 14 | 37) => format!("{}({})", base, len),
        _ => base.to_string(),
    }
}

fn group_indexes(rows: &[Row]) -> Vec<IndexInfo> {
    let mut indexes: Vec<IndexInfo> = Vec::new();
    for row in rows {
        let (Some(name), Some(column)) = (row.text("INDEX_NAME"), row.text("COLUMN_NAME")) else {
            continue;
        };
        match indexes.last_mut() {
            Some(last) if last.name == name => last.columns.push(column),
            _ => indexes.push(IndexInfo {
                name,
                columns: vec![column],
                is_unique: row.int("UNIQUE_FLAG").unwrap_or_default() == 1,
            }),
        }
    }
    indexes
}
