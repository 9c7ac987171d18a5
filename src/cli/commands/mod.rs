pub mod config;
pub mod frameworks;
pub mod generate;
pub mod health;
pub mod serve;
