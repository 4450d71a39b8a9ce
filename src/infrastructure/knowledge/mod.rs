//! Knowledge base loading

mod loader;

pub use loader::load_rule_set;
