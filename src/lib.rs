pub mod cli;
pub mod configuration;
pub mod cookies;
pub mod domain;
pub mod error;
pub mod startup;
pub mod telemetry;
pub mod transcode;
pub mod youtube;
