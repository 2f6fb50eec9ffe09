//! Per-request provisioning state machine.

use crate::error::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionStage {
    Idle,
    CredentialsResolved,
    ReachabilityConfirmed,
    ExistenceChecked,
    Mutated,
    CatalogWritten,
    Failed,
}

impl ProvisionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStage::Idle => "idle",
            ProvisionStage::CredentialsResolved => "credentials_resolved",
            ProvisionStage::ReachabilityConfirmed => "reachability_confirmed",
            ProvisionStage::ExistenceChecked => "existence_checked",
            ProvisionStage::Mutated => "mutated",
            ProvisionStage::CatalogWritten => "catalog_written",
            ProvisionStage::Failed => "failed",
        }
    }

    /// Drops skip the existence check; everything else moves strictly forward.
    pub fn can_advance_to(self, next: ProvisionStage) -> bool {
        use ProvisionStage::*;
        match (self, next) {
            (Failed, _) | (CatalogWritten, _) => false,
            (_, Failed) => true,
            (Idle, CredentialsResolved)
            | (CredentialsResolved, ReachabilityConfirmed)
            | (ReachabilityConfirmed, ExistenceChecked)
            | (ReachabilityConfirmed, Mutated)
            | (ExistenceChecked, Mutated)
            | (Mutated, CatalogWritten) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one create or drop request through its stages and logs each transition.
#[derive(Debug)]
pub struct StageTracker<'a> {
    operation: &'static str,
    table: &'a str,
    stage: ProvisionStage,
}

impl<'a> StageTracker<'a> {
    pub fn new(operation: &'static str, table: &'a str) -> Self {
        Self {
            operation,
            table,
            stage: ProvisionStage::Idle,
        }
    }

    pub fn stage(&self) -> ProvisionStage {
        self.stage
    }

    pub fn advance(&mut self, next: ProvisionStage) -> Result<(), AppError> {
        if !self.stage.can_advance_to(next) {
            return Err(AppError::Provision(format!(
                "{} of '{}' cannot move from {} to {}",
                self.operation, self.table, self.stage, next
            )));
        }
        tracing::debug!(operation = self.operation, table = self.table, from = %self.stage, to = %next, "stage");
        self.stage = next;
        Ok(())
    }

    /// Pass a step result through, moving to `Failed` on error.
    pub fn check<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result {
            tracing::warn!(
                operation = self.operation,
                table = self.table,
                stage = %self.stage,
                error = %e,
                "provisioning failed"
            );
            self.stage = ProvisionStage::Failed;
        }
        result
    }
}
