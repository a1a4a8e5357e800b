//! Configuration loading
//!
//! The binary builds one [`clout_domain::AppConfig`] here at startup and
//! passes it down; nothing else reads the environment.

pub mod loader;

pub use loader::{
    config_from_vars, load, load_from_env, load_from_file, load_dotenv, parse_config,
    probe_config_paths,
};
