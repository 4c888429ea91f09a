//! The executed-migration record.

use serde::{Deserialize, Serialize};

/// Single document holding the ordered list of migration names that
/// have already run. The migration engine (catalog::migrations)
/// appends to this with `$addToSet` semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationRecord {
    pub executed: Vec<String>,
}

impl MigrationRecord {
    pub fn has_run(&self, name: &str) -> bool {
        self.executed.iter().any(|n| n == name)
    }

    pub fn mark_run(&mut self, name: &str) {
        if !self.has_run(name) {
            self.executed.push(name.to_string());
        }
    }
}
