//! Catalog queries and definition retrieval.

use super::TdsClient;
use crate::error::DbExportError;
use crate::models::{ColumnDescriptor, ObjectDescriptor, ObjectKind, quote_identifier};
use crate::Result;
use tiberius::Row;

/// Scalar functions only (`FN`); inline and table-valued functions are not exported.
const FUNCTIONS_QUERY: &str =
    "SELECT SCHEMA_NAME(schema_id) AS schema_name, name FROM sys.objects WHERE type = 'FN'";

const TABLES_QUERY: &str = "SELECT SCHEMA_NAME(schema_id) AS schema_name, name FROM sys.tables";

const FUNCTION_SOURCE_QUERY: &str = "EXEC sp_helptext @P1";

const TABLE_COLUMNS_QUERY: &str = "SELECT COLUMN_NAME, DATA_TYPE, CHARACTER_MAXIMUM_LENGTH, IS_NULLABLE
     FROM INFORMATION_SCHEMA.COLUMNS
     WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
     ORDER BY ORDINAL_POSITION";

/// Server errors meaning the definition text cannot be read.
///
/// - 15197: there is no text for the object
/// - 15471: the text for the object is encrypted
pub const UNREADABLE_ERROR_CODES: [u32; 2] = [15197, 15471];

/// True if a server error number signals an unreadable definition.
pub fn is_unreadable_code(code: u32) -> bool {
    UNREADABLE_ERROR_CODES.contains(&code)
}

pub(super) async fn use_database(client: &mut TdsClient, database: &str) -> Result<()> {
    let statement = format!("USE {}", quote_identifier(database));

    client
        .simple_query(statement)
        .await
        .map_err(|e| DbExportError::database_selection(database, e))?
        .into_results()
        .await
        .map_err(|e| DbExportError::database_selection(database, e))?;

    Ok(())
}

pub(super) async fn list_objects(
    client: &mut TdsClient,
    kind: ObjectKind,
) -> Result<Vec<ObjectDescriptor>> {
    let query = match kind {
        ObjectKind::Function => FUNCTIONS_QUERY,
        ObjectKind::Table => TABLES_QUERY,
    };
    let context = || format!("enumerating {}", kind.plural().to_lowercase());

    let rows = client
        .simple_query(query)
        .await
        .map_err(|e| DbExportError::catalog(context(), e))?
        .into_first_result()
        .await
        .map_err(|e| DbExportError::catalog(context(), e))?;

    let mut objects = Vec::with_capacity(rows.len());
    for row in &rows {
        let schema = text_column(row, 0, "schema_name")?.unwrap_or("dbo");
        let name = text_column(row, 1, "name")?
            .ok_or_else(|| DbExportError::catalog(context(), "catalog returned a NULL object name"))?;
        objects.push(ObjectDescriptor::new(schema, name, kind));
    }

    tracing::debug!("Catalog returned {} {}", objects.len(), kind.plural());
    Ok(objects)
}

pub(super) async fn function_source(
    client: &mut TdsClient,
    object: &ObjectDescriptor,
) -> Result<Vec<String>> {
    let qualified = object.qualified_name();

    let rows = match client.query(FUNCTION_SOURCE_QUERY, &[&qualified.as_str()]).await {
        Ok(stream) => stream.into_first_result().await,
        Err(e) => Err(e),
    }
    .map_err(|e| classify_retrieval_error(&qualified, e))?;

    if rows.is_empty() {
        return Err(DbExportError::object_unreadable(
            qualified,
            "sp_helptext returned no text (encrypted or unavailable)",
        ));
    }

    let mut fragments = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(fragment) = text_column(row, 0, "Text")? {
            fragments.push(fragment.to_string());
        }
    }
    Ok(fragments)
}

pub(super) async fn table_columns(
    client: &mut TdsClient,
    object: &ObjectDescriptor,
) -> Result<Vec<ColumnDescriptor>> {
    let qualified = object.qualified_name();

    let rows = match client
        .query(TABLE_COLUMNS_QUERY, &[&object.schema.as_str(), &object.name.as_str()])
        .await
    {
        Ok(stream) => stream.into_first_result().await,
        Err(e) => Err(e),
    }
    .map_err(|e| classify_retrieval_error(&qualified, e))?;

    if rows.is_empty() {
        return Err(DbExportError::object_unreadable(
            qualified,
            "no columns are visible to this login",
        ));
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = text_column(row, 0, "COLUMN_NAME")?.unwrap_or_default();
        let data_type = text_column(row, 1, "DATA_TYPE")?.unwrap_or_default();
        let max_length = row
            .try_get::<i32, _>(2)
            .map_err(|e| decode_error("CHARACTER_MAXIMUM_LENGTH", e))?;
        let is_nullable = text_column(row, 3, "IS_NULLABLE")? == Some("YES");

        columns.push(ColumnDescriptor::new(name, data_type, max_length, is_nullable));
    }
    Ok(columns)
}

/// Maps a retrieval error to `ObjectUnreadable` when the server refused the text.
fn classify_retrieval_error(object: &str, error: tiberius::error::Error) -> DbExportError {
    match &error {
        tiberius::error::Error::Server(token) if is_unreadable_code(token.code()) => {
            DbExportError::object_unreadable(object, token.message().to_string())
        }
        _ => DbExportError::catalog(format!("retrieving definition of {}", object), error),
    }
}

fn text_column<'a>(row: &'a Row, index: usize, column: &str) -> Result<Option<&'a str>> {
    row.try_get::<&str, _>(index)
        .map_err(|e| decode_error(column, e))
}

fn decode_error(column: &str, error: tiberius::error::Error) -> DbExportError {
    DbExportError::catalog(format!("decoding column '{}'", column), error)
}
