//! Dispatch helpers on [`DiagnosticsLogger`](crate::DiagnosticsLogger), one
//! module per logger category.

mod command;
mod connection;
mod migration;
mod model;
mod transaction;
mod update;
