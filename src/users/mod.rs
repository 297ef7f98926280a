pub mod dto;
pub mod repo_types;
pub mod services;
