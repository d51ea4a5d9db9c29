//! leadsync: lead capture, operator CRM backend and Google Ads offline
//! conversion sync for a healthcare marketing agency.

pub mod admin;
pub mod attribution;
pub mod commands;
pub mod config;
pub mod error;
pub mod gads;
pub mod history;
pub mod leads;
pub mod notify;
pub mod server;
pub mod validation;

pub use error::{Error, Result};
