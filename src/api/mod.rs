// Typed endpoint wrappers
// One module per backend feature area

pub mod financial;
pub mod users;

pub use financial::DEFAULT_TRANSACTION_LIMIT;
