use std::env;

/// Server configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub admin_emails: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
        let admin_emails = env::var("ADMIN_EMAILS")
            .unwrap_or_else(|_| "admin@stackit.com".into())
            .split(',')
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .collect();

        Self {
            bind_addr,
            admin_emails,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // Only assert the parsing shape; the env itself may vary.
        let config = ServerConfig::from_env();
        assert!(!config.admin_emails.is_empty());
        assert!(config.bind_addr.contains(':'));
    }
}
