//! `CREATE TABLE` generation from entity schemas.

use super::column::{ColumnDefault, ColumnKind};
use super::entity::EntitySchema;
use super::relation::RelationType;
use crate::executor::{DbError, RecordExecutor};
use sea_query::{ColumnDef as SqlColumnDef, Expr, ForeignKey, PostgresQueryBuilder, Table};

/// Render `CREATE TABLE IF NOT EXISTS` for an entity, including a foreign
/// key for every `BelongsTo` relation.
pub fn create_table_statement(schema: &EntitySchema) -> String {
    let mut table = Table::create();
    table.table(schema.table).if_not_exists();

    for col in schema.columns {
        let mut def = SqlColumnDef::new(col.name);
        match col.kind {
            ColumnKind::Varchar(len) => def.string_len(len),
            ColumnKind::Text => def.text(),
            ColumnKind::Integer => def.integer(),
            ColumnKind::Boolean => def.boolean(),
            ColumnKind::Timestamp => def.timestamp(),
        };

        if col.nullable {
            def.null();
        } else {
            def.not_null();
        }
        if col.name == schema.primary_key {
            def.primary_key();
        } else if col.unique {
            def.unique_key();
        }

        match col.default {
            Some(ColumnDefault::CurrentTimestamp) => {
                def.default(Expr::current_timestamp());
            }
            Some(ColumnDefault::Bool(b)) => {
                def.default(b);
            }
            Some(ColumnDefault::Integer(i)) => {
                def.default(i);
            }
            None => {}
        }

        table.col(&mut def);
    }

    for rel in schema.relations {
        if rel.rel_type != RelationType::BelongsTo {
            continue;
        }
        let target = rel.target();
        let mut fk = ForeignKey::create();
        fk.name(format!("fk_{}_{}", schema.table, rel.from_col))
            .from(schema.table, rel.from_col)
            .to(target.table, rel.to_col);
        table.foreign_key(&mut fk);
    }

    table.build(PostgresQueryBuilder)
}

/// Create every table in order. Parents must come before children.
///
/// # Errors
///
/// Returns the first `DbError` raised by the executor.
pub fn create_all<E: RecordExecutor + ?Sized>(
    executor: &E,
    schemas: &[&EntitySchema],
) -> Result<(), DbError> {
    for schema in schemas {
        let sql = create_table_statement(schema);
        log::debug!("creating table {}", schema.table);
        executor.execute(&sql, &[])?;
    }
    Ok(())
}
