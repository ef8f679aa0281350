//! # tabula-config
//!
//! Connection settings for tabula databases.
//!
//! - [`ConnectionSpec`]: driver, credentials, host, port and database name,
//!   rendered to / parsed from a database URL.
//! - [`DatabaseEnv`]: the same settings sourced from a `.env` file and
//!   process environment variables (see [`defaults`] for variable names).
//! - [`get_database_url`]: build a URL from explicit parameters, optionally
//!   overridden by a [`DatabaseEnv`].
//!
//! ```no_run
//! use tabula_config::{get_database_url, ConnectionSpec, DatabaseEnv};
//!
//! let env = DatabaseEnv::from_env().unwrap();
//! let url = get_database_url(&ConnectionSpec::default(), Some(&env)).unwrap();
//! println!("{url}");
//! ```

pub mod defaults;
pub mod dotenv;
pub mod error;
pub mod spec;

pub use dotenv::{get_database_url, DatabaseEnv, EnvKey};
pub use error::ConfigError;
pub use spec::ConnectionSpec;
