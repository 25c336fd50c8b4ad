//! Column metadata collection
//!
//! Binlog row images are positional. Column names, kinds and enum labels come
//! from `information_schema.COLUMNS` and are loaded once per tracked table.

use std::sync::Arc;

use binlog_types::Column;
use mysql_async::prelude::*;
use mysql_async::Conn;

use crate::error::CdcError;

const COLUMNS_QUERY: &str = "
    SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION";

/// Load the ordered column list of `schema.table`.
pub async fn load_table_columns(
    conn: &mut Conn,
    schema: &str,
    table: &str,
) -> Result<Arc<[Column]>, CdcError> {
    let schema_error = |reason: String| CdcError::Schema {
        table: format!("{schema}.{table}"),
        reason,
    };

    let rows: Vec<(String, String, String)> = conn
        .exec(COLUMNS_QUERY, (schema, table))
        .await
        .map_err(|e| schema_error(e.to_string()))?;

    if rows.is_empty() {
        return Err(schema_error("table not found".to_string()));
    }

    Ok(rows
        .into_iter()
        .map(|(name, data_type, column_type)| {
            Column::from_information_schema(name, &data_type, &column_type)
        })
        .collect())
}
