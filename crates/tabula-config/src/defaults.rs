//! Default environment variable names and connection values.
//!
//! | Setting  | Variable                   | Default      |
//! |----------|----------------------------|--------------|
//! | driver   | `TABULA_DATABASE_DRIVER`   | `postgresql` |
//! | user     | `TABULA_DATABASE_USER`     | `tabula`     |
//! | password | `TABULA_DATABASE_PASSWORD` | `tabula123`  |
//! | host     | `TABULA_DATABASE_HOST`     | `localhost`  |
//! | port     | `TABULA_DATABASE_PORT`     | `5432`       |
//! | database | `TABULA_DATABASE_NAME`     | `tabula`     |

/// Env file read by [`DatabaseEnv::new`](crate::DatabaseEnv::new).
pub const DEFAULT_ENV_FILE: &str = "./.env";

pub const ENV_DRIVER:   &str = "TABULA_DATABASE_DRIVER";
pub const ENV_USER:     &str = "TABULA_DATABASE_USER";
pub const ENV_PASSWORD: &str = "TABULA_DATABASE_PASSWORD";
pub const ENV_HOST:     &str = "TABULA_DATABASE_HOST";
pub const ENV_PORT:     &str = "TABULA_DATABASE_PORT";
pub const ENV_DATABASE: &str = "TABULA_DATABASE_NAME";

pub const DEFAULT_DRIVER:   &str = "postgresql";
pub const DEFAULT_USER:     &str = "tabula";
pub const DEFAULT_PASSWORD: &str = "tabula123";
pub const DEFAULT_HOST:     &str = "localhost";
pub const DEFAULT_PORT:     u16  = 5432;
pub const DEFAULT_DATABASE: &str = "tabula";

/// Well-known listen port for a driver backend (`postgresql+psycopg2` → `postgresql`).
///
/// File-based backends such as `sqlite` have no port.
pub fn default_port(backend: &str) -> Option<u16> {
    match backend {
        "postgresql" | "postgres" => Some(5432),
        "mysql" | "mariadb"       => Some(3306),
        "mssql"                   => Some(1433),
        "oracle"                  => Some(1521),
        _                         => None,
    }
}
