pub mod calculation_service;
pub mod history_service;
pub mod ledger_service;
