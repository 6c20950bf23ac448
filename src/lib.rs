pub mod audit;
pub mod cli;
pub mod codes;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metadata;
pub mod report;
pub mod rules;
