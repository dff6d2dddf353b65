pub mod match_engine;
pub mod match_result;
