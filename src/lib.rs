#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
/// Bank, credit and investment accounts
pub mod accounts;
/// Error handling and custom [`Error`](std::error::Error) types
pub mod errors;
/// Savings goals
pub mod goals;
/// Rule-based insights over a ledger
pub mod insights;
/// Functions for reading and writing ledgers and installment schedules
pub mod io;
/// Aggregate metrics over transactions
pub mod kpi;
/// Integer money type
pub mod money;
/// Ledger operations: recording purchases, paying and cancelling installments
pub mod ops;
/// Splitting a total into monthly installments
pub mod split;
/// Data types used throughout FluxoFin
pub mod types;
/// Checks applied to purchases before they are recorded
pub mod validation;
