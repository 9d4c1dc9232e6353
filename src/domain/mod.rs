pub mod amount;
pub mod transaction;

pub use amount::{format_minor_units, to_minor_units, AmountError};
pub use transaction::{NewTransaction, Transaction, TxStatus};
