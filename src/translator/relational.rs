//! DDL for relational (MySQL-family) targets.

use super::{CreateInstruction, DropInstruction, ExistenceCheck, SchemaTranslator};
use crate::error::AppError;
use crate::model::{validate_identifier, validate_table, BackendKind, ColumnSpec};

#[derive(Clone, Copy, Debug, Default)]
pub struct RelationalTranslator;

/// `<name> <type> [PRIMARY KEY] [UNIQUE] [NOT NULL]`, type passed through verbatim.
fn column_definition(col: &ColumnSpec) -> String {
    let mut def = format!("{} {}", col.name, col.data_type.trim());
    if col.is_primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if col.is_unique {
        def.push_str(" UNIQUE");
    }
    if col.is_required {
        def.push_str(" NOT NULL");
    }
    def
}

impl SchemaTranslator for RelationalTranslator {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn create_instruction(&self, table: &str, columns: &[ColumnSpec]) -> Result<CreateInstruction, AppError> {
        validate_table(table, columns)?;
        let defs: Vec<String> = columns.iter().map(column_definition).collect();
        Ok(CreateInstruction::Ddl(format!("CREATE TABLE {} ({})", table, defs.join(", "))))
    }

    fn existence_check(&self, table: &str) -> Result<ExistenceCheck, AppError> {
        validate_identifier("table", table)?;
        Ok(ExistenceCheck::Sql {
            sql: "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND BINARY table_name = ?"
                .into(),
            params: vec![table.to_string()],
        })
    }

    fn drop_instruction(&self, table: &str) -> Result<DropInstruction, AppError> {
        validate_identifier("table", table)?;
        Ok(DropInstruction::Ddl(format!("DROP TABLE {}", table)))
    }

    fn catalog_data_type(&self, column: &ColumnSpec) -> Result<String, AppError> {
        Ok(column.data_type.trim().to_string())
    }
}
