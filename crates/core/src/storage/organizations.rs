//! Organization storage operations

use rusqlite::{params, Connection, Row};

use super::parse::{is_unique_violation, OptionalExt};
use crate::error::{Error, Result};
use crate::models::Organization;

pub struct OrganizationStore<'a> {
    conn: &'a Connection,
}

fn organization_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        room_id: row.get(0)?,
        name: row.get(1)?,
        package: row.get(2)?,
        intent: row.get(3)?,
    })
}

impl<'a> OrganizationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new organization
    ///
    /// Fails with [`Error::OrganizationExists`] when the room, name or package is taken.
    pub fn create(&self, org: &Organization) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO organizations (room_id, name, package, intent) VALUES (?1, ?2, ?3, ?4)",
            params![org.room_id, org.name, org.package, org.intent],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::OrganizationExists(org.name.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Find organization by room ID
    pub fn find_by_id(&self, room_id: &str) -> Result<Option<Organization>> {
        let mut stmt = self.conn.prepare(
            "SELECT room_id, name, package, intent FROM organizations WHERE room_id = ?1",
        )?;

        let org = stmt
            .query_row(params![room_id], organization_from_row)
            .optional()?;

        Ok(org)
    }

    /// List all organizations by name
    pub fn list(&self) -> Result<Vec<Organization>> {
        let mut stmt = self
            .conn
            .prepare("SELECT room_id, name, package, intent FROM organizations ORDER BY name")?;

        let orgs = stmt
            .query_map([], organization_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(orgs)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::models::Organization;
    use crate::storage::Database;

    fn acme() -> Organization {
        Organization::new("!acme:x", "Acme")
            .with_package("com.acme.app")
            .with_intent("acme")
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        db.organizations().create(&acme()).unwrap();

        let found = db.organizations().find_by_id("!acme:x").unwrap().unwrap();
        assert_eq!(found, acme());
        assert!(db.organizations().find_by_id("!other:x").unwrap().is_none());
    }

    #[test]
    fn test_unique_columns() {
        let db = Database::open_in_memory().unwrap();
        db.organizations().create(&acme()).unwrap();

        let same_room = Organization::new("!acme:x", "Other")
            .with_package("com.other")
            .with_intent("other");
        let same_name = Organization::new("!b:x", "Acme")
            .with_package("com.other")
            .with_intent("other");
        let same_package = Organization::new("!c:x", "Other")
            .with_package("com.acme.app")
            .with_intent("other");

        for org in [same_room, same_name, same_package] {
            let err = db.organizations().create(&org).unwrap_err();
            assert!(matches!(err, Error::OrganizationExists(_)), "{:?}", org);
        }
        assert_eq!(db.organizations().list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_sorted_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.organizations()
            .create(&Organization::new("!z:x", "Zeta").with_package("z").with_intent("z"))
            .unwrap();
        db.organizations().create(&acme()).unwrap();

        let names: Vec<_> = db
            .organizations()
            .list()
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, vec!["Acme", "Zeta"]);
    }
}
