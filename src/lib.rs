pub mod arranger;
pub mod common;
pub mod layout_engine;
pub mod sys;
