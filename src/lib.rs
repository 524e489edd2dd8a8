pub mod configuration;
pub mod conflict;
pub mod domain;
pub mod provision;
pub mod routes;
pub mod startup;
pub mod storage;
pub mod store;
pub mod telemetry;
