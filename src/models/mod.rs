//! Data models for the library server

pub mod author;
pub mod book;
pub mod book_return;
pub mod enums;
pub mod inventory;
pub mod issue;
pub mod reference;
pub mod report;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails};
pub use book_return::{BookReturn, ReturnDetails};
pub use enums::{BookCategory, InventoryStatus, Role};
pub use inventory::Inventory;
pub use issue::{IssueDetails, LoanStatus};
pub use reference::{Direction, Publisher};
pub use user::{User, UserClaims, UserShort};
