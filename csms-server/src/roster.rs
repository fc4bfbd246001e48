//! The user and employee roster.
//!
//! The engine needs two things from the outside world: who is acting (a
//! username resolved to an [`Actor`]) and which employees exist. The roster
//! supplies both. It is loaded from a JSON seed file when `SEED_PATH` is
//! set, and otherwise falls back to the built-in seed so a fresh checkout
//! serves requests without any provisioning.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use csms_core::{Actor, EmployeeId, Role, StaticDirectory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUser {
    pub username: String,
    pub name: String,
    pub role: Role,
    /// Links an EMPLOYEE account to its personnel record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEmployee {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub users: Vec<RosterUser>,
    pub employees: Vec<RosterEmployee>,
}

fn user(username: &str, name: &str, role: Role) -> RosterUser {
    RosterUser {
        username: username.to_string(),
        name: name.to_string(),
        role,
        employee_id: None,
    }
}

fn employee_user(username: &str, name: &str, employee_id: &str) -> RosterUser {
    RosterUser {
        username: username.to_string(),
        name: name.to_string(),
        role: Role::Employee,
        employee_id: Some(employee_id.to_string()),
    }
}

fn employee(id: &str, name: &str) -> RosterEmployee {
    RosterEmployee {
        id: id.to_string(),
        name: name.to_string(),
    }
}

impl Roster {
    /// Load and validate a roster from a JSON seed file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read roster seed {}", path.display()))?;
        let roster: Roster = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse roster seed {}", path.display()))?;
        roster.validate()?;
        Ok(roster)
    }

    /// The built-in seed roster: one account per role, two HROs at
    /// different institutions, and a small set of employees.
    pub fn seed() -> Self {
        Self {
            users: vec![
                user("hro_user1", "HRO User One", Role::Hro),
                user("hro_user2", "HRO User Two", Role::Hro),
                user("hhrmd_user", "Head HHRMD", Role::Hhrmd),
                user("hrmo_user", "HRMO User", Role::Hrmo),
                user("do_user", "Disciplinary Officer", Role::Do),
                employee_user("employee1", "Alice Wonderland", "EMP001"),
                employee_user("employee2", "Bob The Builder", "EMP002"),
                user("po_user", "Planning Officer", Role::Po),
                user("cscs_user", "CSCS Head", Role::Cscs),
                user("hrrp_user_A", "HRRP Manager A", Role::Hrrp),
                user("hrrp_user_B", "HRRP Manager B", Role::Hrrp),
            ],
            employees: vec![
                employee("EMP001", "Alice Wonderland"),
                employee("EMP002", "Bob The Builder"),
                employee("EMP003", "Charlie Brown"),
            ],
        }
    }

    fn validate(&self) -> Result<()> {
        let mut usernames = HashSet::new();
        for user in &self.users {
            if !usernames.insert(user.username.as_str()) {
                bail!("duplicate username '{}' in roster", user.username);
            }
        }

        let mut employee_ids = HashSet::new();
        for employee in &self.employees {
            if !employee_ids.insert(employee.id.as_str()) {
                bail!("duplicate employee ID '{}' in roster", employee.id);
            }
        }

        for user in &self.users {
            if let Some(employee_id) = &user.employee_id {
                if !employee_ids.contains(employee_id.as_str()) {
                    bail!(
                        "user '{}' references unknown employee '{}'",
                        user.username,
                        employee_id
                    );
                }
            }
        }
        Ok(())
    }

    /// Resolve a username to the actor it represents.
    pub fn resolve(&self, username: &str) -> Option<Actor> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .map(|u| Actor::new(u.username.clone(), u.role))
    }

    /// The employee directory backed by this roster.
    pub fn directory(&self) -> StaticDirectory {
        StaticDirectory::new(
            self.employees
                .iter()
                .map(|e| EmployeeId::from(e.id.as_str())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csms_core::EmployeeDirectory;

    #[test]
    fn test_seed_roster_is_valid() {
        let roster = Roster::seed();
        roster.validate().unwrap();
    }

    #[test]
    fn test_resolve_maps_username_to_role() {
        let roster = Roster::seed();

        let actor = roster.resolve("hro_user1").unwrap();
        assert_eq!(actor.role, Role::Hro);
        assert_eq!(actor.username.0, "hro_user1");

        let actor = roster.resolve("do_user").unwrap();
        assert_eq!(actor.role, Role::Do);

        assert_eq!(roster.resolve("nobody"), None);
    }

    #[tokio::test]
    async fn test_directory_contains_seeded_employees() {
        let directory = Roster::seed().directory();
        assert!(directory
            .contains(&EmployeeId::from("EMP003"))
            .await
            .unwrap());
        assert!(!directory
            .contains(&EmployeeId::from("EMP999"))
            .await
            .unwrap());
    }

    #[test]
    fn test_load_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, serde_json::to_string_pretty(&Roster::seed()).unwrap()).unwrap();

        let loaded = Roster::load(&path).unwrap();
        assert_eq!(loaded, Roster::seed());
    }

    #[test]
    fn test_load_rejects_duplicate_usernames() {
        let mut roster = Roster::seed();
        roster.users.push(user("hro_user1", "Impostor", Role::Hro));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, serde_json::to_string(&roster).unwrap()).unwrap();

        let err = Roster::load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate username"));
    }

    #[test]
    fn test_load_rejects_dangling_employee_link() {
        let mut roster = Roster::seed();
        roster
            .users
            .push(employee_user("employee3", "Ghost", "EMP404"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, serde_json::to_string(&roster).unwrap()).unwrap();

        let err = Roster::load(&path).unwrap_err();
        assert!(err.to_string().contains("unknown employee"));
    }
}
