//! Document store (MongoDB) inspector
//!
//! `DB-01` reports accounts holding the `root` role and `DB-02` surveys
//! every database and its collections.
//!
//! Note on `DB-01` polarity: the presence of a root account is reported as
//! `Fail` and its absence as `Pass`. This is the opposite of the other
//! backends, where missing or default credentials are the insecure state.
//! Reports keep this polarity; do not invert it here.

use dbinspect_core::{BackendKind, Check, CheckInfo, CheckOutcome, Inspector, Result};
use tracing::debug;

/// Checks defined by the document store inspector
pub const CHECKS: [CheckInfo; 2] = [
    CheckInfo {
        id: "DB-01",
        title: "Administrator (root) accounts",
    },
    CheckInfo {
        id: "DB-02",
        title: "Databases and collections",
    },
];

/// Read-only queries the document store inspector needs
pub trait DocumentSession {
    /// Names of accounts in `admin.system.users` holding the `root` role
    fn root_accounts(&self) -> Result<Vec<String>>;

    /// Every database name
    fn database_names(&self) -> Result<Vec<String>>;

    /// Collection names of `database`
    fn collection_names(&self, database: &str) -> Result<Vec<String>>;
}

/// Inspector over a document store session
pub struct DocumentInspector<S: DocumentSession> {
    target: String,
    session: S,
}

impl<S: DocumentSession> DocumentInspector<S> {
    pub fn new(target: impl Into<String>, session: S) -> Self {
        Self {
            target: target.into(),
            session,
        }
    }

    fn root_account_check(&self) -> Result<CheckOutcome> {
        let id = CHECKS[0].id;
        let accounts = self.session.root_accounts()?;
        debug!(server = %self.target, count = accounts.len(), "Root accounts listed");

        if accounts.is_empty() {
            Ok(CheckOutcome::pass(id, "No administrator account has been created"))
        } else {
            Ok(CheckOutcome::fail(id, accounts.join(", ")))
        }
    }

    fn namespace_survey(&self) -> Result<CheckOutcome> {
        let id = CHECKS[1].id;
        let databases = self.session.database_names()?;

        if databases.is_empty() {
            return Ok(CheckOutcome::fail(id, "No databases or collections exist"));
        }

        let mut detail = String::new();
        for database in &databases {
            let collections = self.session.collection_names(database)?;
            detail.push_str(&format!("{} : {}\n", database, collections.join(", ")));
        }

        Ok(CheckOutcome::survey(id, detail))
    }
}

impl<S: DocumentSession> Inspector for DocumentInspector<S> {
    fn backend(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![
            Check::new(CHECKS[0], move || self.root_account_check()),
            Check::new(CHECKS[1], move || self.namespace_survey()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbinspect_core::{CheckStatus, InspectError};

    #[derive(Default)]
    struct FakeMongo {
        roots: Vec<String>,
        databases: Vec<(String, Vec<String>)>,
        fail_listing: bool,
    }

    impl DocumentSession for FakeMongo {
        fn root_accounts(&self) -> Result<Vec<String>> {
            Ok(self.roots.clone())
        }

        fn database_names(&self) -> Result<Vec<String>> {
            if self.fail_listing {
                return Err(InspectError::check("DB-02", "not authorized on admin"));
            }
            Ok(self.databases.iter().map(|(name, _)| name.clone()).collect())
        }

        fn collection_names(&self, database: &str) -> Result<Vec<String>> {
            Ok(self
                .databases
                .iter()
                .find(|(name, _)| name == database)
                .map(|(_, collections)| collections.clone())
                .unwrap_or_default())
        }
    }

    fn run(fake: FakeMongo) -> Vec<Result<CheckOutcome>> {
        let inspector = DocumentInspector::new("10.0.0.1:27017", fake);
        let outcomes = inspector.checks().iter().map(|c| c.run()).collect();
        outcomes
    }

    #[test]
    fn test_root_account_present_is_reported_as_fail() {
        let outcomes = run(FakeMongo {
            roots: vec!["admin".into(), "ops".into()],
            ..Default::default()
        });
        let first = outcomes[0].as_ref().unwrap();
        assert_eq!(first.check_id, "DB-01");
        assert_eq!(first.status, CheckStatus::Fail);
        assert_eq!(first.detail, "admin, ops");
    }

    #[test]
    fn test_no_root_account_is_pass() {
        let outcomes = run(FakeMongo::default());
        assert_eq!(outcomes[0].as_ref().unwrap().status, CheckStatus::Pass);
    }

    #[test]
    fn test_namespace_survey_lists_collections() {
        let outcomes = run(FakeMongo {
            databases: vec![
                ("admin".into(), vec!["system.users".into(), "system.version".into()]),
                ("shop".into(), vec!["orders".into()]),
            ],
            ..Default::default()
        });
        let survey = outcomes[1].as_ref().unwrap();
        assert_eq!(survey.status, CheckStatus::Survey);
        assert_eq!(survey.detail, "admin : system.users, system.version\nshop : orders\n");
    }

    #[test]
    fn test_empty_server_fails_survey() {
        let outcomes = run(FakeMongo::default());
        assert_eq!(outcomes[1].as_ref().unwrap().status, CheckStatus::Fail);
    }

    #[test]
    fn test_listing_error_propagates() {
        let outcomes = run(FakeMongo {
            fail_listing: true,
            ..Default::default()
        });
        assert!(matches!(outcomes[1], Err(InspectError::CheckExecution { .. })));
    }

    #[test]
    fn test_check_ids_are_ordered() {
        let inspector = DocumentInspector::new("10.0.0.1:27017", FakeMongo::default());
        let ids: Vec<_> = inspector.checks().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["DB-01", "DB-02"]);
    }
}
