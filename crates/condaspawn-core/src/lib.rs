pub mod config;
pub mod layout;
pub mod observability;
pub mod path_validation;
