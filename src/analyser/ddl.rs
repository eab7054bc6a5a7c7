//! DDL reconstruction
//!
//! Pure formatting of `CREATE` statements from catalog fields. Nothing here
//! touches a connection.

/// Quote an identifier (PostgreSQL rules)
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified(schema_name: &str, pure_name: &str) -> String {
    format!("{}.{}", quote_ident(schema_name), quote_ident(pure_name))
}

pub fn create_view(schema_name: &str, pure_name: &str, definition: &str) -> String {
    format!("CREATE VIEW {}\nAS\n{}", qualified(schema_name, pure_name), definition)
}

pub fn create_materialized_view(schema_name: &str, pure_name: &str, definition: &str) -> String {
    format!(
        "CREATE MATERIALIZED VIEW {}\nAS\n{}",
        qualified(schema_name, pure_name),
        definition
    )
}

pub fn create_procedure(schema_name: &str, pure_name: &str, language: &str, body: &str) -> String {
    format!(
        "CREATE PROCEDURE {}() LANGUAGE {}\nAS\n$$\n{}\n$$",
        qualified(schema_name, pure_name),
        language,
        body
    )
}

pub fn create_function(
    schema_name: &str,
    pure_name: &str,
    return_type: &str,
    language: &str,
    body: &str,
) -> String {
    format!(
        "CREATE FUNCTION {}() RETURNS {} LANGUAGE {}\nAS\n$$\n{}\n$$",
        qualified(schema_name, pure_name),
        return_type,
        language,
        body
    )
}
