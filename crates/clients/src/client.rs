use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordermgmt_core::{ClientId, DomainError, DomainResult, Entity, PersistenceResult};

/// Minimum length of a client display name (after trimming).
pub const NAME_MIN_LEN: usize = 3;
/// Maximum length of a client display name (after trimming).
pub const NAME_MAX_LEN: usize = 100;
/// Maximum length of the external identity code.
pub const IDENTITY_MAX_LEN: usize = 50;

/// A registered client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// External identity code, unique across clients (e.g. `0801-1990-12345`).
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> ClientId {
        self.id
    }
}

/// Editable client fields, used for both registration and edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
    pub name: String,
    pub identity: String,
}

impl ClientDetails {
    pub fn new(name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: identity.into(),
        }
    }

    /// Validate and normalize (trim) the fields.
    pub fn validated(&self) -> DomainResult<ClientDetails> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let name_len = name.chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_len) {
            return Err(DomainError::validation(format!(
                "name must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters"
            )));
        }

        let identity = self.identity.trim();
        if identity.is_empty() {
            return Err(DomainError::validation("identity cannot be empty"));
        }
        if identity.len() > IDENTITY_MAX_LEN {
            return Err(DomainError::validation(format!(
                "identity cannot exceed {IDENTITY_MAX_LEN} characters"
            )));
        }
        if !is_identity_code(identity) {
            return Err(DomainError::validation(
                "identity must have the format 0801-1990-12345",
            ));
        }

        Ok(ClientDetails {
            name: name.to_string(),
            identity: identity.to_string(),
        })
    }
}

/// `DDDD-DDDD-DDDDD`: three digit groups of 4, 4 and 5 digits.
fn is_identity_code(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 3
        && groups
            .iter()
            .zip([4usize, 4, 5])
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Read-only lookup of clients by id.
///
/// This is all the order workflow needs: it only checks that the client exists.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn find_by_id(&self, id: ClientId) -> PersistenceResult<Option<Client>>;
}

/// Client maintenance port.
///
/// Implementations enforce identity uniqueness (returning
/// `PersistenceError::Conflict`) and refuse to delete a client that owns orders.
#[async_trait]
pub trait ClientRepository: ClientDirectory {
    /// All clients, ordered by id.
    async fn list(&self) -> PersistenceResult<Vec<Client>>;

    async fn find_by_identity(&self, identity: &str) -> PersistenceResult<Option<Client>>;

    /// Persist a new client; `details` must already be validated.
    async fn insert(&self, details: &ClientDetails) -> PersistenceResult<Client>;

    /// Replace name and identity. Returns `None` when the client does not exist.
    async fn update(&self, id: ClientId, details: &ClientDetails) -> PersistenceResult<Option<Client>>;

    /// Returns `false` when the client does not exist.
    async fn delete(&self, id: ClientId) -> PersistenceResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_details_and_trims() {
        let details = ClientDetails::new("  Ana Torres ", " 0801-1990-12345 ")
            .validated()
            .unwrap();
        assert_eq!(details.name, "Ana Torres");
        assert_eq!(details.identity, "0801-1990-12345");
    }

    #[test]
    fn rejects_empty_or_short_names() {
        let err = ClientDetails::new("   ", "0801-1990-12345").validated().unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));

        let err = ClientDetails::new("Al", "0801-1990-12345").validated().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("between 3 and 100")));
    }

    #[test]
    fn rejects_malformed_identity() {
        for bad in ["", "0801199012345", "0801-1990-1234", "08a1-1990-12345", "0801-1990-12345-1"] {
            assert!(
                ClientDetails::new("Ana Torres", bad).validated().is_err(),
                "identity {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn client_identity_is_its_id() {
        let client = Client {
            id: ClientId::from_raw(9),
            name: "Ana Torres".into(),
            identity: "0801-1990-12345".into(),
            created_at: Utc::now(),
        };
        assert_eq!(Entity::id(&client), ClientId::from_raw(9));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any digits in the 4-4-5 layout validate.
            #[test]
            fn well_formed_identity_codes_validate(code in "[0-9]{4}-[0-9]{4}-[0-9]{5}") {
                prop_assert!(ClientDetails::new("Valid Name", code).validated().is_ok());
            }
        }
    }
}
