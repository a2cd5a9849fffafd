pub mod instruments;
pub mod serve;
pub mod update_market;
