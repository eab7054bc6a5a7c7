//! Catalog query templates for the PostgreSQL family
//!
//! Every template carries the `=OBJECT_ID_CONDITION` token, which is rendered
//! either as `is not null` or as an equality against a single object id.
//! Identifier columns are cast to `text` so rows decode the same way on every
//! server version.

/// Tables with server-side hashes of their column metadata and of every
/// constraint and index definition
pub const TABLE_MODIFICATIONS: &str = r#"
    SELECT
        t.table_schema::text AS schema_name,
        t.table_name::text AS pure_name,
        (
            SELECT md5(string_agg(
                c.column_name || '|' || c.data_type || '|' || c.is_nullable || '|'
                    || coalesce(c.column_default, '') || '|'
                    || coalesce(c.character_maximum_length, -1)::text || '|'
                    || coalesce(c.numeric_precision, -1)::text || '|'
                    || coalesce(c.numeric_scale, -1)::text,
                ',' ORDER BY c.ordinal_position
            ))
            FROM information_schema.columns c
            WHERE c.table_schema = t.table_schema
                AND c.table_name = t.table_name
        ) AS hash_code_columns,
        coalesce((
            SELECT md5(string_agg(d.def, ',' ORDER BY d.def))
            FROM (
                SELECT con.conname || '|' || pg_get_constraintdef(con.oid) AS def
                FROM pg_catalog.pg_constraint con
                JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
                JOIN pg_catalog.pg_namespace ns ON ns.oid = cl.relnamespace
                WHERE ns.nspname = t.table_schema
                    AND cl.relname = t.table_name
                UNION ALL
                SELECT ix.indexname || '|' || ix.indexdef
                FROM pg_catalog.pg_indexes ix
                WHERE ix.schemaname = t.table_schema
                    AND ix.tablename = t.table_name
            ) d
        ), '') AS hash_code_constraints
    FROM information_schema.tables t
    WHERE t.table_type NOT LIKE '%VIEW%'
        AND t.table_schema <> 'pg_catalog'
        AND t.table_schema <> 'information_schema'
        AND t.table_schema NOT LIKE 'pg_temp%'
        AND t.table_schema !~ '^pg_toast'
        AND ('tables:' || t.table_schema || '.' || t.table_name) =OBJECT_ID_CONDITION
    ORDER BY t.table_schema, t.table_name
"#;

/// Plain table list for engines without aggregate string functions
pub const TABLE_LIST: &str = r#"
    SELECT
        t.table_schema::text AS schema_name,
        t.table_name::text AS pure_name
    FROM information_schema.tables t
    WHERE t.table_type NOT LIKE '%VIEW%'
        AND t.table_schema <> 'pg_catalog'
        AND t.table_schema <> 'information_schema'
        AND t.table_schema NOT LIKE 'pg_temp%'
        AND ('tables:' || t.table_schema || '.' || t.table_name) =OBJECT_ID_CONDITION
    ORDER BY t.table_schema, t.table_name
"#;

/// Columns of tables and views, in ordinal order
pub const COLUMNS: &str = r#"
    SELECT
        c.table_schema::text AS schema_name,
        c.table_name::text AS pure_name,
        c.column_name::text AS column_name,
        c.is_nullable::text AS is_nullable,
        c.data_type::text AS data_type,
        c.character_maximum_length::int4 AS char_max_length,
        c.numeric_precision::int4 AS numeric_precision,
        c.numeric_scale::int4 AS numeric_scale,
        c.column_default::text AS default_value
    FROM information_schema.columns c
    JOIN information_schema.tables t
        ON t.table_schema = c.table_schema
        AND t.table_name = c.table_name
    WHERE c.table_schema <> 'information_schema'
        AND c.table_schema <> 'pg_catalog'
        AND c.table_schema !~ '^pg_toast'
        AND (
            CASE WHEN t.table_type LIKE '%VIEW%' THEN 'views:' ELSE 'tables:' END
            || c.table_schema || '.' || c.table_name
        ) =OBJECT_ID_CONDITION
    ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

/// One row per primary key column, in key order
pub const PRIMARY_KEYS: &str = r#"
    SELECT
        tc.constraint_schema::text AS constraint_schema,
        tc.constraint_name::text AS constraint_name,
        tc.table_schema::text AS schema_name,
        tc.table_name::text AS pure_name,
        kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.constraint_schema = kcu.constraint_schema
        AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
        AND tc.table_schema <> 'pg_catalog'
        AND tc.table_schema <> 'information_schema'
        AND ('tables:' || tc.table_schema || '.' || tc.table_name) =OBJECT_ID_CONDITION
    ORDER BY tc.table_schema, tc.table_name, kcu.ordinal_position
"#;

/// One row per foreign key column pair, in key order
pub const FOREIGN_KEYS: &str = r#"
    SELECT
        fk.constraint_name::text AS constraint_name,
        fk.constraint_schema::text AS constraint_schema,
        base.table_name::text AS pure_name,
        base.table_schema::text AS schema_name,
        fk.update_rule::text AS update_action,
        fk.delete_rule::text AS delete_action,
        ref.table_name::text AS ref_table_name,
        ref.table_schema::text AS ref_schema_name,
        basecol.column_name::text AS column_name,
        refcol.column_name::text AS ref_column_name
    FROM information_schema.referential_constraints fk
    JOIN information_schema.table_constraints base
        ON fk.constraint_name = base.constraint_name
        AND fk.constraint_schema = base.constraint_schema
    JOIN information_schema.table_constraints ref
        ON fk.unique_constraint_name = ref.constraint_name
        AND fk.unique_constraint_schema = ref.constraint_schema #REFTABLECOND#
    JOIN information_schema.key_column_usage basecol
        ON base.table_name = basecol.table_name
        AND base.constraint_name = basecol.constraint_name
    JOIN information_schema.key_column_usage refcol
        ON ref.table_name = refcol.table_name
        AND ref.constraint_name = refcol.constraint_name
        AND basecol.position_in_unique_constraint = refcol.ordinal_position
    WHERE base.table_schema <> 'information_schema'
        AND base.table_schema <> 'pg_catalog'
        AND ('tables:' || base.table_schema || '.' || base.table_name) =OBJECT_ID_CONDITION
    ORDER BY base.table_schema, base.table_name, fk.constraint_name, basecol.ordinal_position
"#;

pub const VIEWS: &str = r#"
    SELECT
        v.table_schema::text AS schema_name,
        v.table_name::text AS pure_name,
        v.view_definition::text AS create_sql,
        md5(v.view_definition) AS hash_code
    FROM information_schema.views v
    WHERE v.table_schema <> 'information_schema'
        AND v.table_schema <> 'pg_catalog'
        AND v.table_schema !~ '^pg_toast'
        AND ('views:' || v.table_schema || '.' || v.table_name) =OBJECT_ID_CONDITION
    ORDER BY v.table_schema, v.table_name
"#;

pub const VIEW_MODIFICATIONS: &str = r#"
    SELECT
        v.table_schema::text AS schema_name,
        v.table_name::text AS pure_name,
        md5(v.view_definition) AS hash_code
    FROM information_schema.views v
    WHERE v.table_schema <> 'information_schema'
        AND v.table_schema <> 'pg_catalog'
        AND v.table_schema !~ '^pg_toast'
        AND ('views:' || v.table_schema || '.' || v.table_name) =OBJECT_ID_CONDITION
    ORDER BY v.table_schema, v.table_name
"#;

pub const MATVIEWS: &str = r#"
    SELECT
        m.schemaname::text AS schema_name,
        m.matviewname::text AS pure_name,
        m.definition::text AS definition,
        md5(m.definition) AS hash_code
    FROM pg_catalog.pg_matviews m
    WHERE m.schemaname NOT LIKE 'pg_%'
        AND ('matviews:' || m.schemaname || '.' || m.matviewname) =OBJECT_ID_CONDITION
    ORDER BY m.schemaname, m.matviewname
"#;

pub const MATVIEW_MODIFICATIONS: &str = r#"
    SELECT
        m.schemaname::text AS schema_name,
        m.matviewname::text AS pure_name,
        md5(m.definition) AS hash_code
    FROM pg_catalog.pg_matviews m
    WHERE m.schemaname NOT LIKE 'pg_%'
        AND ('matviews:' || m.schemaname || '.' || m.matviewname) =OBJECT_ID_CONDITION
    ORDER BY m.schemaname, m.matviewname
"#;

/// Materialized views are not in information_schema, so read pg_attribute
pub const MATVIEW_COLUMNS: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        c.relname::text AS pure_name,
        a.attname::text AS column_name,
        format_type(a.atttypid, a.atttypmod) AS data_type,
        CASE WHEN a.attnotnull THEN 'NO' ELSE 'YES' END AS is_nullable
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid
    WHERE c.relkind = 'm'
        AND a.attnum > 0
        AND NOT a.attisdropped
        AND ('matviews:' || n.nspname || '.' || c.relname) =OBJECT_ID_CONDITION
    ORDER BY n.nspname, c.relname, a.attnum
"#;

/// One row per overload; `hash_code` covers every overload sharing the
/// identity so it matches `ROUTINE_MODIFICATIONS` whichever row is kept
pub const ROUTINES: &str = r#"
    SELECT
        r.routine_schema::text AS schema_name,
        r.routine_name::text AS pure_name,
        r.routine_type::text AS object_type,
        r.routine_definition::text AS definition,
        r.data_type::text AS data_type,
        lower(r.external_language::text) AS language,
        md5(string_agg(
            coalesce(r.routine_definition, '') || '|' || coalesce(r.data_type, ''),
            ','
        ) OVER (
            PARTITION BY r.routine_schema, r.routine_name, r.routine_type
            ORDER BY r.specific_name
            ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING
        )) AS hash_code
    FROM information_schema.routines r
    WHERE r.routine_schema <> 'information_schema'
        AND r.routine_schema <> 'pg_catalog'
        AND r.routine_type IN ('PROCEDURE', 'FUNCTION')
        AND (
            CASE WHEN r.routine_type = 'PROCEDURE' THEN 'procedures:' ELSE 'functions:' END
            || r.routine_schema || '.' || r.routine_name
        ) =OBJECT_ID_CONDITION
    ORDER BY r.routine_schema, r.routine_name, r.specific_name
"#;

/// One row per routine identity, overloads folded into a single hash
pub const ROUTINE_MODIFICATIONS: &str = r#"
    SELECT
        r.routine_schema::text AS schema_name,
        r.routine_name::text AS pure_name,
        r.routine_type::text AS object_type,
        md5(string_agg(
            coalesce(r.routine_definition, '') || '|' || coalesce(r.data_type, ''),
            ',' ORDER BY r.specific_name
        )) AS hash_code
    FROM information_schema.routines r
    WHERE r.routine_schema <> 'information_schema'
        AND r.routine_schema <> 'pg_catalog'
        AND r.routine_type IN ('PROCEDURE', 'FUNCTION')
        AND (
            CASE WHEN r.routine_type = 'PROCEDURE' THEN 'procedures:' ELSE 'functions:' END
            || r.routine_schema || '.' || r.routine_name
        ) =OBJECT_ID_CONDITION
    GROUP BY r.routine_schema, r.routine_name, r.routine_type
    ORDER BY r.routine_schema, r.routine_name
"#;

/// Routines without hashes for engines lacking `string_agg`
pub const ROUTINE_LIST: &str = r#"
    SELECT
        r.routine_schema::text AS schema_name,
        r.routine_name::text AS pure_name,
        r.routine_type::text AS object_type,
        r.routine_definition::text AS definition,
        r.data_type::text AS data_type,
        lower(r.external_language::text) AS language
    FROM information_schema.routines r
    WHERE r.routine_schema <> 'information_schema'
        AND r.routine_schema <> 'pg_catalog'
        AND r.routine_type IN ('PROCEDURE', 'FUNCTION')
        AND (
            CASE WHEN r.routine_type = 'PROCEDURE' THEN 'procedures:' ELSE 'functions:' END
            || r.routine_schema || '.' || r.routine_name
        ) =OBJECT_ID_CONDITION
    ORDER BY r.routine_schema, r.routine_name, r.specific_name
"#;

pub const ROUTINE_NAME_LIST: &str = r#"
    SELECT DISTINCT
        r.routine_schema::text AS schema_name,
        r.routine_name::text AS pure_name,
        r.routine_type::text AS object_type
    FROM information_schema.routines r
    WHERE r.routine_schema <> 'information_schema'
        AND r.routine_schema <> 'pg_catalog'
        AND r.routine_type IN ('PROCEDURE', 'FUNCTION')
        AND (
            CASE WHEN r.routine_type = 'PROCEDURE' THEN 'procedures:' ELSE 'functions:' END
            || r.routine_schema || '.' || r.routine_name
        ) =OBJECT_ID_CONDITION
    ORDER BY 1, 2
"#;

/// Non-primary indexes; `indkey` is the space separated list of column numbers
pub const INDEXES: &str = r#"
    SELECT
        t.oid::int8 AS oid,
        n.nspname::text AS schema_name,
        t.relname::text AS table_name,
        i.relname::text AS index_name,
        ix.indisunique AS is_unique,
        ix.indkey::text AS indkey
    FROM pg_catalog.pg_class t
    JOIN pg_catalog.pg_index ix ON t.oid = ix.indrelid
    JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    WHERE t.relkind IN ('r', 'p')
        AND ix.indisprimary = false
        AND n.nspname <> 'pg_catalog'
        AND n.nspname <> 'information_schema'
        AND n.nspname !~ '^pg_toast'
        AND ('tables:' || n.nspname || '.' || t.relname) =OBJECT_ID_CONDITION
    ORDER BY n.nspname, t.relname, i.relname
"#;

/// Column numbers of indexed tables, joined against `indkey`
pub const INDEX_COLUMNS: &str = r#"
    SELECT
        a.attrelid::int8 AS oid,
        a.attnum::int4 AS attnum,
        a.attname::text AS column_name
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class t ON t.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    WHERE t.relkind IN ('r', 'p')
        AND a.attnum > 0
        AND NOT a.attisdropped
        AND EXISTS (SELECT 1 FROM pg_catalog.pg_index ix WHERE ix.indrelid = t.oid)
        AND n.nspname <> 'pg_catalog'
        AND n.nspname <> 'information_schema'
        AND ('tables:' || n.nspname || '.' || t.relname) =OBJECT_ID_CONDITION
    ORDER BY a.attrelid, a.attnum
"#;

pub const UNIQUE_NAMES: &str = r#"
    SELECT
        tc.constraint_name::text AS constraint_name,
        tc.table_schema::text AS schema_name,
        tc.table_name::text AS pure_name
    FROM information_schema.table_constraints tc
    WHERE tc.constraint_type = 'UNIQUE'
        AND tc.table_schema <> 'pg_catalog'
        AND tc.table_schema <> 'information_schema'
        AND ('tables:' || tc.table_schema || '.' || tc.table_name) =OBJECT_ID_CONDITION
"#;
