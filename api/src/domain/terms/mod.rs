pub mod term_policy;
