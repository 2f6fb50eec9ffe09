//! Schema translation: abstract columns into backend-specific instructions.
//!
//! One implementation per backend family behind [`SchemaTranslator`]; [`TranslatorImpl`] dispatches
//! statically by [`BackendKind`].

mod document;
mod relational;

pub use document::{logical_type, max_length_hint, DocumentTranslator};
pub use relational::RelationalTranslator;

use crate::error::AppError;
use crate::model::{BackendKind, ColumnSpec};
use serde_json::Value;

/// Enforcement mode attached to generated collection validators.
pub const VALIDATION_ACTION: &str = "error";
/// Existing documents are only checked when they already satisfy the validator.
pub const VALIDATION_LEVEL: &str = "moderate";

#[derive(Clone, Debug, PartialEq)]
pub enum CreateInstruction {
    Ddl(String),
    Collection {
        name: String,
        validator: Option<Value>,
        validation_action: &'static str,
        validation_level: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExistenceCheck {
    /// Query returning a single count; `params` are bound in order.
    Sql { sql: String, params: Vec<String> },
    Collection { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropInstruction {
    Ddl(String),
    Collection { name: String },
}

pub trait SchemaTranslator {
    fn kind(&self) -> BackendKind;

    fn create_instruction(&self, table: &str, columns: &[ColumnSpec]) -> Result<CreateInstruction, AppError>;

    fn existence_check(&self, table: &str) -> Result<ExistenceCheck, AppError>;

    fn drop_instruction(&self, table: &str) -> Result<DropInstruction, AppError>;

    /// Type recorded in the catalog for this column.
    fn catalog_data_type(&self, column: &ColumnSpec) -> Result<String, AppError>;
}

#[derive(Clone, Debug)]
pub enum TranslatorImpl {
    Relational(RelationalTranslator),
    Document(DocumentTranslator),
}

pub fn translator_for(kind: BackendKind) -> TranslatorImpl {
    match kind {
        BackendKind::Relational => TranslatorImpl::Relational(RelationalTranslator),
        BackendKind::Document => TranslatorImpl::Document(DocumentTranslator),
    }
}

impl SchemaTranslator for TranslatorImpl {
    fn kind(&self) -> BackendKind {
        match self {
            TranslatorImpl::Relational(t) => t.kind(),
            TranslatorImpl::Document(t) => t.kind(),
        }
    }

    fn create_instruction(&self, table: &str, columns: &[ColumnSpec]) -> Result<CreateInstruction, AppError> {
        match self {
            TranslatorImpl::Relational(t) => t.create_instruction(table, columns),
            TranslatorImpl::Document(t) => t.create_instruction(table, columns),
        }
    }

    fn existence_check(&self, table: &str) -> Result<ExistenceCheck, AppError> {
        match self {
            TranslatorImpl::Relational(t) => t.existence_check(table),
            TranslatorImpl::Document(t) => t.existence_check(table),
        }
    }

    fn drop_instruction(&self, table: &str) -> Result<DropInstruction, AppError> {
        match self {
            TranslatorImpl::Relational(t) => t.drop_instruction(table),
            TranslatorImpl::Document(t) => t.drop_instruction(table),
        }
    }

    fn catalog_data_type(&self, column: &ColumnSpec) -> Result<String, AppError> {
        match self {
            TranslatorImpl::Relational(t) => t.catalog_data_type(column),
            TranslatorImpl::Document(t) => t.catalog_data_type(column),
        }
    }
}
