pub mod config;
pub mod context;
pub mod convertor;
pub mod descriptor;
pub mod errors;
pub mod metrics;
pub mod naming;
pub mod operations;
pub mod orchestrator;
pub mod render;
pub mod rules;
pub mod schema;

#[cfg(test)]
mod tests;
