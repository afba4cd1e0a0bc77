//! Record store implementations

pub mod airtable;

pub use airtable::AirtableStore;
