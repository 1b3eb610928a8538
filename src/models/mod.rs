pub mod harvest;
pub mod utils;
