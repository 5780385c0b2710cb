use secrecy::{ExposeSecret, Secret};

/// API credentials for one client instance.
///
/// Immutable for the lifetime of the client; the secret material never
/// appears in `Debug` output or logs.
#[derive(Clone)]
pub struct Credentials {
    api_key: Secret<String>,
    secret_key: Secret<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
        }
    }

    /// Read credentials from `{PREFIX}_API_KEY` / `{PREFIX}_SECRET_KEY`.
    pub fn from_env(prefix: &str) -> Result<Self, MissingCredentials> {
        let api_key_var = format!("{}_API_KEY", prefix.to_uppercase());
        let secret_key_var = format!("{}_SECRET_KEY", prefix.to_uppercase());

        let api_key =
            std::env::var(&api_key_var).map_err(|_| MissingCredentials(api_key_var))?;
        let secret_key =
            std::env::var(&secret_key_var).map_err(|_| MissingCredentials(secret_key_var))?;

        Ok(Self::new(api_key, secret_key))
    }

    /// Like [`from_env`](Self::from_env), but loads a `.env` file first when
    /// one exists. Never commit `.env` files to version control.
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, MissingCredentials> {
        let _ = dotenv::dotenv();
        Self::from_env(prefix)
    }

    /// Use carefully, exposes the secret.
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Use carefully, exposes the secret.
    pub fn secret_key(&self) -> &Secret<String> {
        &self.secret_key
    }
}

#[derive(Debug, thiserror::Error)]
#[error("missing environment variable: {0}")]
pub struct MissingCredentials(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let creds = Credentials::new("live-api-key".to_string(), "hunter2".to_string());
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("live-api-key"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
