pub mod export;
pub mod instance;
pub mod models;
pub mod pareto;
