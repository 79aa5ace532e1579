//! Command handlers' business logic, one module per operation family.

pub mod databases;
pub mod rows;
pub mod session;
pub mod tables;
pub mod transfer;

pub use databases::DatabaseService;
pub use rows::RowService;
pub use session::SessionService;
pub use tables::TableService;
pub use transfer::TransferService;
