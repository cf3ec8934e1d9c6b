//! In-memory store implementation
//!
//! Thread-safe using map-level RwLocks for lookup and per-entity Mutex
//! cells for mutation.

use std::collections::HashMap;
use std::sync::Arc;

use meridian_domain::{Order, OrderId, Portfolio, Trade, User, UserId, UserUpdate};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::StoreError;
use crate::repository::{
    HistoryRepository, OrderCell, OrderRepository, PortfolioCell, PortfolioRepository, Store,
    UserRepository,
};

/// Per-user append-only sequences
#[derive(Default)]
struct UserHistory {
    orders: Vec<OrderId>,
    trades: Vec<Trade>,
}

/// Order cells with a per-user index, updated together
#[derive(Default)]
struct OrderBook {
    cells: HashMap<OrderId, OrderCell>,
    by_user: HashMap<UserId, Vec<OrderId>>,
}

/// In-memory store, exclusively owned by the engine that created it
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    orders: RwLock<OrderBook>,
    portfolios: RwLock<HashMap<UserId, PortfolioCell>>,
    history: RwLock<HashMap<UserId, Arc<Mutex<UserHistory>>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            orders: RwLock::new(OrderBook::default()),
            portfolios: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of users
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    /// Get the number of orders
    pub fn order_count(&self) -> usize {
        self.orders.read().cells.len()
    }

    /// History cell for a user, created on first use
    fn history_cell(&self, user_id: &UserId) -> Arc<Mutex<UserHistory>> {
        if let Some(cell) = self.history.read().get(user_id) {
            return cell.clone();
        }
        self.history.write().entry(user_id.clone()).or_default().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User Repository Implementation
// =============================================================================

impl UserRepository for MemoryStore {
    fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(StoreError::duplicate("user", user.id.as_str()));
        }
        debug!(user_id = %user.id, "Storing user");
        users.insert(user.id.clone(), user);
        Ok(())
    }

    fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(id).cloned())
    }

    fn exists(&self, id: &UserId) -> Result<bool, StoreError> {
        Ok(self.users.read().contains_key(id))
    }

    fn update(&self, id: &UserId, update: &UserUpdate) -> Result<User, StoreError> {
        let mut users = self.users.write();
        let user = users.get_mut(id).ok_or_else(|| StoreError::not_found("user", id.as_str()))?;
        user.apply(update)?;
        Ok(user.clone())
    }
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

impl OrderRepository for MemoryStore {
    fn insert(&self, order: Order) -> Result<OrderCell, StoreError> {
        let mut book = self.orders.write();
        if book.cells.contains_key(&order.id) {
            return Err(StoreError::duplicate("order", order.id.to_string()));
        }
        let id = order.id;
        book.by_user.entry(order.user_id.clone()).or_default().push(id);
        let cell = Arc::new(Mutex::new(order));
        book.cells.insert(id, cell.clone());
        Ok(cell)
    }

    fn cell(&self, id: OrderId) -> Result<Option<OrderCell>, StoreError> {
        Ok(self.orders.read().cells.get(&id).cloned())
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let cell = self.orders.read().cells.get(&id).cloned();
        Ok(cell.map(|c| c.lock().clone()))
    }

    fn find_pending_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError> {
        // Cells are cloned out so no order lock is taken under the map lock
        let book = self.orders.read();
        let ids = book.by_user.get(user_id).map(Vec::as_slice).unwrap_or_default();
        let cells: Vec<OrderCell> = ids.iter().filter_map(|id| book.cells.get(id).cloned()).collect();
        drop(book);

        let mut pending: Vec<Order> = cells
            .iter()
            .map(|c| c.lock().clone())
            .filter(|o| o.is_pending())
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pending)
    }
}

// =============================================================================
// Portfolio Repository Implementation
// =============================================================================

impl PortfolioRepository for MemoryStore {
    fn insert(&self, portfolio: Portfolio) -> Result<PortfolioCell, StoreError> {
        let mut portfolios = self.portfolios.write();
        if portfolios.contains_key(&portfolio.user_id) {
            return Err(StoreError::duplicate("portfolio", portfolio.user_id.as_str()));
        }
        let user_id = portfolio.user_id.clone();
        let cell = Arc::new(Mutex::new(portfolio));
        portfolios.insert(user_id, cell.clone());
        Ok(cell)
    }

    fn cell(&self, user_id: &UserId) -> Result<Option<PortfolioCell>, StoreError> {
        Ok(self.portfolios.read().get(user_id).cloned())
    }

    fn snapshot(&self, user_id: &UserId) -> Result<Option<Portfolio>, StoreError> {
        let cell = self.portfolios.read().get(user_id).cloned();
        Ok(cell.map(|c| c.lock().clone()))
    }
}

// =============================================================================
// History Repository Implementation
// =============================================================================

impl HistoryRepository for MemoryStore {
    fn append_order(&self, user_id: &UserId, order_id: OrderId) -> Result<(), StoreError> {
        self.history_cell(user_id).lock().orders.push(order_id);
        Ok(())
    }

    fn append_trade(&self, user_id: &UserId, trade: &Trade) -> Result<(), StoreError> {
        self.history_cell(user_id).lock().trades.push(trade.clone());
        Ok(())
    }

    fn order_ids(&self, user_id: &UserId) -> Result<Vec<OrderId>, StoreError> {
        let cell = self.history.read().get(user_id).cloned();
        Ok(cell.map(|c| c.lock().orders.clone()).unwrap_or_default())
    }

    fn trades(&self, user_id: &UserId) -> Result<Vec<Trade>, StoreError> {
        let cell = self.history.read().get(user_id).cloned();
        Ok(cell.map(|c| c.lock().trades.clone()).unwrap_or_default())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

impl Store for MemoryStore {
    fn users(&self) -> &dyn UserRepository {
        self
    }

    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn portfolios(&self) -> &dyn PortfolioRepository {
        self
    }

    fn history(&self) -> &dyn HistoryRepository {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_domain::{OrderSide, Price, Quantity, Symbol};
    use rust_decimal_macros::dec;

    fn user_id(raw: &str) -> UserId {
        UserId::new(raw).unwrap()
    }

    fn create_test_user(raw: &str) -> User {
        User::new(user_id(raw), "Jane Doe", "jane@x.com").unwrap()
    }

    fn create_test_order(owner: &str) -> Order {
        Order::new(
            user_id(owner),
            Symbol::parse("GOLD").unwrap(),
            OrderSide::Buy,
            Quantity::new(dec!(100)).unwrap(),
            Price::new(dec!(1950.50)).unwrap(),
        )
    }

    // User Repository Tests
    #[test]
    fn test_user_insert_and_find() {
        let store = MemoryStore::new();
        store.users().insert(create_test_user("u1")).unwrap();

        let found = store.users().find_by_id(&user_id("u1")).unwrap();
        assert_eq!(found.unwrap().name, "Jane Doe");
        assert!(store.users().find_by_id(&user_id("u2")).unwrap().is_none());
    }

    #[test]
    fn test_user_duplicate_rejected() {
        let store = MemoryStore::new();
        store.users().insert(create_test_user("u1")).unwrap();

        let result = store.users().insert(create_test_user("u1"));
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
        assert_eq!(store.user_count(), 1);
    }

    #[test]
    fn test_user_update_not_found() {
        let store = MemoryStore::new();
        let result = store.users().update(&user_id("ghost"), &UserUpdate::default());
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_user_update_invalid_leaves_record() {
        let store = MemoryStore::new();
        store.users().insert(create_test_user("u1")).unwrap();

        let update = UserUpdate {
            name: None,
            email: Some("broken".to_string()),
        };
        assert!(matches!(store.users().update(&user_id("u1"), &update), Err(StoreError::Domain(_))));

        let user = store.users().find_by_id(&user_id("u1")).unwrap().unwrap();
        assert_eq!(user.email.as_str(), "jane@x.com");
    }

    // Order Repository Tests
    #[test]
    fn test_order_cell_shares_state() {
        let store = MemoryStore::new();
        let order = create_test_order("u1");
        let id = order.id;

        let cell = store.orders().insert(order).unwrap();
        cell.lock().mark_cancelled().unwrap();

        let found = store.orders().find_by_id(id).unwrap().unwrap();
        assert!(found.status.is_terminal());
    }

    #[test]
    fn test_order_find_pending_by_user() {
        let store = MemoryStore::new();

        let first = create_test_order("u1");
        let second = create_test_order("u1");
        let other = create_test_order("u2");
        let (first_id, second_id) = (first.id, second.id);

        store.orders().insert(first).unwrap();
        let cell = store.orders().insert(second).unwrap();
        store.orders().insert(other).unwrap();

        let pending = store.orders().find_pending_by_user(&user_id("u1")).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().any(|o| o.id == first_id));
        assert!(pending.iter().any(|o| o.id == second_id));

        cell.lock().mark_executed(Utc::now()).unwrap();
        let pending = store.orders().find_pending_by_user(&user_id("u1")).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(store.order_count(), 3);
    }

    #[test]
    fn test_pending_lookup_only_sees_own_orders() {
        let store = MemoryStore::new();
        for _ in 0..20 {
            store.orders().insert(create_test_order("u2")).unwrap();
        }
        let own = create_test_order("u1");
        let own_id = own.id;
        store.orders().insert(own).unwrap();

        let pending = store.orders().find_pending_by_user(&user_id("u1")).unwrap();
        assert_eq!(pending.iter().map(|o| o.id).collect::<Vec<_>>(), vec![own_id]);
        assert!(store.orders().find_pending_by_user(&user_id("u3")).unwrap().is_empty());

        let book = store.orders.read();
        assert_eq!(book.by_user[&user_id("u1")], vec![own_id]);
        assert_eq!(book.by_user[&user_id("u2")].len(), 20);
    }

    // Portfolio Repository Tests
    #[test]
    fn test_portfolio_insert_once() {
        let store = MemoryStore::new();
        store.portfolios().insert(Portfolio::new(user_id("u1"), dec!(500))).unwrap();

        let duplicate = store.portfolios().insert(Portfolio::new(user_id("u1"), dec!(0)));
        assert!(duplicate.is_err());

        let snapshot = store.portfolios().snapshot(&user_id("u1")).unwrap().unwrap();
        assert_eq!(snapshot.cash_balance, dec!(500));
    }

    // History Repository Tests
    #[test]
    fn test_history_is_insertion_ordered() {
        let store = MemoryStore::new();
        let owner = user_id("u1");
        let orders: Vec<Order> = (0..5).map(|_| create_test_order("u1")).collect();

        for order in &orders {
            store.history().append_order(&owner, order.id).unwrap();
        }

        let ids = store.history().order_ids(&owner).unwrap();
        assert_eq!(ids, orders.iter().map(|o| o.id).collect::<Vec<_>>());
        assert!(store.history().order_ids(&user_id("u2")).unwrap().is_empty());
    }

    #[test]
    fn test_history_trades_per_user() {
        let store = MemoryStore::new();
        let order = create_test_order("u1");
        let trade = Trade::for_order(&order, Price::new(dec!(1950.50)).unwrap(), Utc::now());

        store.history().append_trade(&user_id("u1"), &trade).unwrap();

        assert_eq!(store.history().trades(&user_id("u1")).unwrap(), vec![trade]);
        assert!(store.history().trades(&user_id("u2")).unwrap().is_empty());
    }
}
