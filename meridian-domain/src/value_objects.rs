//! Value Objects for the Meridian Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation and entity rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Symbol must be a valid ticker
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Order side must be buy or sell
    #[error("Invalid order side: {0}")]
    InvalidSide(String),

    /// User identity fields failed validation
    #[error("Invalid user: {0}")]
    InvalidUser(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Sell quantity exceeds the held position
    #[error("Insufficient position in {symbol}: held {held}, requested {requested}")]
    InsufficientPosition {
        /// Symbol being sold
        symbol: String,
        /// Quantity currently held
        held: Decimal,
        /// Quantity requested
        requested: Decimal,
    },

    /// A computed amount does not fit in a `Decimal`
    #[error("Arithmetic overflow computing {0}")]
    ArithmeticOverflow(String),
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal price per unit
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice(format!("Price must be positive, got {}", value)));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive decimal quantity of units
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity(format!(
                "Quantity must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Notional value of this quantity at the given price
    ///
    /// # Errors
    /// Returns `DomainError::ArithmeticOverflow` if the product does not fit
    pub fn notional(&self, price: Price) -> Result<Decimal, DomainError> {
        self.0
            .checked_mul(price.as_decimal())
            .ok_or_else(|| DomainError::ArithmeticOverflow("notional".to_string()))
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Symbol
// =============================================================================

/// Symbol represents a traded instrument ticker (e.g., GOLD, BTC-USD)
///
/// # Invariants
/// - Trimmed and uppercased
/// - 1 to 16 characters from `A-Z`, `0-9`, `.`, `/`, `-`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Maximum ticker length
    pub const MAX_LEN: usize = 16;

    /// Parse and normalize a ticker
    ///
    /// # Examples
    /// ```
    /// # use meridian_domain::value_objects::Symbol;
    /// let symbol = Symbol::parse(" gold ").unwrap();
    /// assert_eq!(symbol.as_str(), "GOLD");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSymbol` if the ticker is empty, too long,
    /// or contains unsupported characters
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_uppercase();

        if normalized.is_empty() {
            return Err(DomainError::InvalidSymbol("Symbol must be non-empty".to_string()));
        }

        if normalized.len() > Self::MAX_LEN {
            return Err(DomainError::InvalidSymbol(format!(
                "Symbol {} exceeds {} characters",
                normalized,
                Self::MAX_LEN
            )));
        }

        let valid = normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '-'));
        if !valid {
            return Err(DomainError::InvalidSymbol(format!(
                "Symbol {} contains unsupported characters",
                normalized
            )));
        }

        Ok(Self(normalized))
    }

    /// Get the ticker as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl FromStr for Symbol {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// OrderSide
// =============================================================================

/// OrderSide represents the order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl OrderSide {
    /// Sign of the cash flow produced by a fill on this side
    ///
    /// Buy → -1 (cash leaves the account), Sell → +1
    pub fn cash_sign(&self) -> Decimal {
        match self {
            OrderSide::Buy => Decimal::NEGATIVE_ONE,
            OrderSide::Sell => Decimal::ONE,
        }
    }
}

impl FromStr for OrderSide {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(DomainError::InvalidSide(format!(
                "{}. Expected: buy or sell",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

// =============================================================================
// Email
// =============================================================================

/// Email address of a user
///
/// Only structural validation: exactly one `@` with non-empty local and
/// domain parts, and a dot somewhere in the domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parse an email address
    ///
    /// # Errors
    /// Returns `DomainError::InvalidUser` if the address is malformed
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split('@');

        let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => (local, domain),
            _ => {
                return Err(DomainError::InvalidUser(format!("Malformed email: {}", trimmed)));
            },
        };

        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(DomainError::InvalidUser(format!("Malformed email: {}", trimmed)));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
