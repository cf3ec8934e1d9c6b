//! User Registry.

use chrono::Utc;
use meridian_domain::{LedgerEvent, Portfolio, User, UserId, UserUpdate};
use meridian_store::{Store, StoreError};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::Engine;

impl<S: Store> Engine<S> {
    /// Register a new user together with an empty portfolio.
    pub fn create_user(&self, id: &str, name: &str, email: &str) -> EngineResult<User> {
        let user_id = UserId::new(id)?;
        let user = User::new(user_id.clone(), name, email)?;

        // The portfolio insert arbitrates concurrent creates of the same id,
        // and a user is never visible without its portfolio.
        let portfolio = Portfolio::new(user_id.clone(), self.config.initial_cash);
        match self.store.portfolios().insert(portfolio) {
            Ok(_) => {},
            Err(StoreError::Duplicate { .. }) => {
                warn!(%user_id, "User already exists");
                return Err(EngineError::UserAlreadyExists(user_id.to_string()));
            },
            Err(err) => return Err(err.into()),
        }

        self.store.users().insert(user.clone())?;

        info!(%user_id, "User created");
        self.events.publish(LedgerEvent::UserCreated {
            user_id,
            timestamp: user.created_at,
        });

        Ok(user)
    }

    /// Look up a user.
    pub fn get_user(&self, id: &str) -> EngineResult<User> {
        let user_id = self.resolve_user(id)?;
        self.store
            .users()
            .find_by_id(&user_id)?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))
    }

    /// Update a user's mutable fields. The id never changes.
    pub fn update_user(&self, id: &str, update: &UserUpdate) -> EngineResult<User> {
        let user_id = self.resolve_user(id)?;
        let user = match self.store.users().update(&user_id, update) {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => {
                return Err(EngineError::UserNotFound(user_id.to_string()))
            },
            Err(err) => return Err(err.into()),
        };

        info!(%user_id, "User updated");
        self.events.publish(LedgerEvent::UserUpdated {
            user_id,
            timestamp: Utc::now(),
        });

        Ok(user)
    }

    /// Parse a caller-supplied id and check that the user exists.
    pub(crate) fn resolve_user(&self, id: &str) -> EngineResult<UserId> {
        let user_id = UserId::new(id).map_err(|_| EngineError::UserNotFound(id.to_string()))?;
        if !self.store.users().exists(&user_id)? {
            return Err(EngineError::UserNotFound(user_id.to_string()));
        }
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineConfig, EngineError};
    use meridian_domain::UserUpdate;
    use meridian_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn engine() -> Engine<MemoryStore> {
        Engine::new(MemoryStore::new(), EngineConfig::default())
    }

    #[test]
    fn test_create_and_get_user() {
        let engine = engine();
        let user = engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();

        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(engine.get_user("u1").unwrap(), user);
    }

    #[test]
    fn test_create_user_opens_portfolio_with_initial_cash() {
        let config = EngineConfig {
            initial_cash: dec!(1000000),
            ..EngineConfig::default()
        };
        let engine = Engine::new(MemoryStore::new(), config);
        engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();

        let portfolio = engine.get_portfolio("u1").unwrap();
        assert_eq!(portfolio.cash_balance, dec!(1000000));
        assert!(portfolio.positions.is_empty());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let engine = engine();
        engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();

        let result = engine.create_user("u1", "Other", "other@x.com");
        assert!(matches!(result, Err(EngineError::UserAlreadyExists(_))));
        assert_eq!(engine.get_user("u1").unwrap().name, "Jane Doe");
    }

    #[test]
    fn test_invalid_user_fields_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.create_user("u1", "  ", "jane@x.com"),
            Err(EngineError::InvalidUser(_))
        ));
        assert!(matches!(
            engine.create_user("u1", "Jane", "jane"),
            Err(EngineError::InvalidUser(_))
        ));
        assert!(matches!(engine.get_user("u1"), Err(EngineError::UserNotFound(_))));
    }

    #[test]
    fn test_update_user_keeps_id() {
        let engine = engine();
        engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();

        let update = UserUpdate {
            name: None,
            email: Some("jane.doe@x.com".to_string()),
        };
        let user = engine.update_user("u1", &update).unwrap();

        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(user.email.as_str(), "jane.doe@x.com");
        assert_eq!(user.name, "Jane Doe");
    }

    #[test]
    fn test_update_unknown_user() {
        let engine = engine();
        let result = engine.update_user("ghost", &UserUpdate::default());
        assert!(matches!(result, Err(EngineError::UserNotFound(_))));
    }
}
