//! Connection parameters and session options.

/// Where and how to connect.
///
/// Every field is optional the way the engine's connect call treats
/// them: unset fields fall back to engine defaults (local socket,
/// current user, no database selected).
#[derive(Debug, Clone, Default)]
pub struct ConnectParams {
    /// Hostname or IP address.
    pub host: Option<String>,
    /// Port number; 0 lets the engine pick its default.
    pub port: u16,
    /// Username for authentication.
    pub user: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Database to select at connect time.
    pub database: Option<String>,
    /// Unix socket path, used instead of TCP when set.
    pub unix_socket: Option<String>,
}

impl ConnectParams {
    /// Create parameters with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the unix socket path.
    pub fn unix_socket(mut self, path: impl Into<String>) -> Self {
        self.unix_socket = Some(path.into());
        self
    }
}

/// Options applied to the engine session before connecting.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Connection character set (default: utf8mb4).
    pub charset: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            charset: "utf8mb4".to_string(),
        }
    }
}

impl SessionOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection character set.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_builder() {
        let params = ConnectParams::new()
            .host("db.example.com")
            .port(3307)
            .user("myuser")
            .password("secret")
            .database("testdb");

        assert_eq!(params.host.as_deref(), Some("db.example.com"));
        assert_eq!(params.port, 3307);
        assert_eq!(params.user.as_deref(), Some("myuser"));
        assert_eq!(params.password.as_deref(), Some("secret"));
        assert_eq!(params.database.as_deref(), Some("testdb"));
        assert_eq!(params.unix_socket, None);
    }

    #[test]
    fn defaults_leave_everything_to_the_engine() {
        let params = ConnectParams::default();
        assert_eq!(params.host, None);
        assert_eq!(params.port, 0);
        assert_eq!(params.user, None);
    }

    #[test]
    fn default_charset_is_utf8mb4() {
        assert_eq!(SessionOptions::default().charset, "utf8mb4");
        assert_eq!(SessionOptions::new().charset("latin1").charset, "latin1");
    }
}
