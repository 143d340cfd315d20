pub mod calculation;
pub mod history;
pub mod ledger;
pub mod product;
pub mod session;
pub mod settings;
