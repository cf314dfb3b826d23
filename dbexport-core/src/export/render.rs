//! Script rendering.
//!
//! Every exported file starts with the same header block: a `USE`
//! directive, an object comment carrying the generation time, and the two
//! session settings scripted objects depend on, each followed by `GO`.
//! The body is the function source as stored on the server, or a
//! `CREATE TABLE` statement rebuilt from column metadata. Keys, constraints
//! and indexes are not part of the table body.

use crate::adapters::CatalogSession;
use crate::models::{ColumnDescriptor, ObjectDescriptor, ObjectKind, RenderedDocument, quote_identifier};
use crate::Result;
use chrono::NaiveDateTime;

/// Format of the `Script Date` stamp, e.g. `17-10-2026 09:30:00`.
pub const SCRIPT_DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Builds the fixed header block.
pub fn render_header(database: &str, object: &ObjectDescriptor, generated_at: NaiveDateTime) -> String {
    format!(
        "\nUSE {database}\nGO\n\n/****** Object:  {label} {name}    Script Date: {date} ******/\nSET ANSI_NULLS ON\nGO\nSET QUOTED_IDENTIFIER ON\nGO\n",
        database = quote_identifier(database),
        label = object.kind.label(),
        name = object.qualified_name(),
        date = generated_at.format(SCRIPT_DATE_FORMAT),
    )
}

/// Joins `sp_helptext` fragments in fetch order.
pub fn render_function_body(fragments: &[String]) -> String {
    fragments.concat()
}

/// Rebuilds a `CREATE TABLE` statement from column metadata.
///
/// One line per column, `[name] type NULL|NOT NULL`, comma separated.
pub fn render_create_table(object: &ObjectDescriptor, columns: &[ColumnDescriptor]) -> String {
    let lines: Vec<String> = columns
        .iter()
        .map(|column| {
            format!(
                "    {} {} {}",
                quote_identifier(&column.name),
                column.type_clause(),
                column.nullability()
            )
        })
        .collect();

    format!(
        "CREATE TABLE {} (\n{}\n);\n",
        object.qualified_name(),
        lines.join(",\n")
    )
}

/// Fetches an object's definition and renders the full document.
///
/// # Errors
/// Propagates session errors unchanged, including `ObjectUnreadable`
pub async fn render_object(
    session: &mut dyn CatalogSession,
    database: &str,
    object: &ObjectDescriptor,
    generated_at: NaiveDateTime,
) -> Result<RenderedDocument> {
    let body = match object.kind {
        ObjectKind::Function => {
            let fragments = session.function_source(object).await?;
            render_function_body(&fragments)
        }
        ObjectKind::Table => {
            let columns = session.table_columns(object).await?;
            render_create_table(object, &columns)
        }
    };

    Ok(RenderedDocument {
        header: render_header(database, object, generated_at),
        body,
    })
}
