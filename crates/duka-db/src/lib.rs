//! # duka-db: Database Layer for Duka POS
//!
//! SQLite persistence via sqlx. This crate owns every database operation
//! and, critically, the **stock ledger**: the single serialized path
//! through which product quantities change.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      duka-db (THIS CRATE)                           │
//! │                                                                     │
//! │   ┌───────────────┐   ┌────────────────────┐   ┌──────────────┐    │
//! │   │   Database    │   │    Repositories    │   │  Migrations  │    │
//! │   │   (pool.rs)   │◄──│  product, stock,   │   │  (embedded)  │    │
//! │   │  SqlitePool   │   │  sale, stock_take, │   │ 001_init.sql │    │
//! │   │               │   │  loyalty, ...      │   │              │    │
//! │   └───────────────┘   └────────────────────┘   └──────────────┘    │
//! │                                                                     │
//! │   Shared mutable state: products.quantity                           │
//! │   Writers: sales, receiving, stock-take apply — ALL routed          │
//! │   through repository::stock's conditional-update ledger             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{CustomerRepository, NewCustomer};
pub use repository::expense::ExpenseRepository;
pub use repository::loyalty::LoyaltyRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::sale::{CreateSale, CreatedSale, SaleItemInput, SaleRepository, SaleWithItems};
pub use repository::stock::{ReceiveStock, StockRepository};
pub use repository::stock_take::{
    StockTakeItemInput, StockTakeRepository, StockTakeWithItems, SubmitStockTake,
};
pub use repository::store::StoreRepository;
pub use repository::user::UserRepository;
