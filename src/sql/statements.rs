//! DuckDB statements issued by a session.
//!
//! Table names are emitted verbatim so that qualified names such as
//! `staging.orders` keep working; column names and string literals are quoted.

use super::types::ColumnDef;

/// Quote an identifier with double quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal with single quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `CREATE TABLE name AS (query);`
pub fn create_table_as(name: &str, query: &str) -> String {
    format!("CREATE TABLE {} AS ({});", name, query)
}

/// `CREATE OR REPLACE VIEW name AS (query);`
pub fn create_view(name: &str, query: &str) -> String {
    format!("CREATE OR REPLACE VIEW {} AS ({});", name, query)
}

/// `CREATE TABLE name ("col" TYPE, ...);`
pub fn create_empty_table(name: &str, columns: &[ColumnDef]) -> String {
    let columns = columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), c.data_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({});", name, columns)
}

/// Load a CSV export, overriding type detection with the declared columns.
///
/// Type detection on an empty file assumes `VARCHAR` everywhere, so the
/// declared types are passed whenever there are any. Without a header row the
/// declared columns also supply the names, in file order.
pub fn load_csv(name: &str, uri: &str, columns: &[ColumnDef], header: bool) -> String {
    let mut options = format!("{}, header = {}", quote_literal(uri), header);
    if !columns.is_empty() {
        let types = columns
            .iter()
            .map(|c| {
                let data_type = c.data_type.to_string();
                format!("{}: {}", quote_literal(&c.name), quote_literal(&data_type))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let key = if header { "types" } else { "columns" };
        options.push_str(&format!(", {} = {{{}}}", key, types));
    }
    format!("CREATE TABLE {} AS SELECT * FROM read_csv({});", name, options)
}

/// Load a Parquet export.
pub fn load_parquet(name: &str, uri: &str) -> String {
    format!(
        "CREATE TABLE {} AS SELECT * FROM read_parquet({});",
        name,
        quote_literal(uri)
    )
}

/// `DROP <KIND> IF EXISTS name;`
pub fn drop_object(keyword: &str, name: &str) -> String {
    format!("DROP {} IF EXISTS {};", keyword, name)
}

/// `ATTACH 'path' AS alias;`
pub fn attach(path: &str, alias: &str) -> String {
    format!("ATTACH {} AS {};", quote_literal(path), alias)
}

/// `DETACH alias;`
pub fn detach(alias: &str) -> String {
    format!("DETACH {};", alias)
}

/// Copy the current rows of `name` into the attached database `alias`.
pub fn copy_into_attached(alias: &str, name: &str) -> String {
    format!("CREATE TABLE {}.{} AS SELECT * FROM {};", alias, name, name)
}
