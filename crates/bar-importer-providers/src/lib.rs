pub mod error;
pub mod importer;
pub mod provider;
pub mod yahoo;
