//! Employee directory lookups.
//!
//! Submissions must reference an employee the institution actually knows
//! about. The engine only needs an existence check, so the directory is a
//! narrow trait; the server backs it with the seeded roster, and tests back
//! it with a fixed set.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::request::EmployeeId;
use crate::store::StoreError;

/// Source of truth for which employees exist.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn contains(&self, id: &EmployeeId) -> Result<bool, StoreError>;
}

/// Directory backed by a fixed in-memory set of employee IDs.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    employees: HashSet<EmployeeId>,
}

impl StaticDirectory {
    pub fn new(employees: impl IntoIterator<Item = EmployeeId>) -> Self {
        Self {
            employees: employees.into_iter().collect(),
        }
    }
}

#[async_trait]
impl EmployeeDirectory for StaticDirectory {
    async fn contains(&self, id: &EmployeeId) -> Result<bool, StoreError> {
        Ok(self.employees.contains(id))
    }
}
