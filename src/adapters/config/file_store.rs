use crate::domain::UserId;
use crate::ports::{AppConfig, ConfigError, ConfigResult, ConfigStore, DEFAULT_API_BASE_URL};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    api_base_url: Option<String>,
    user_id: Option<String>,
}

pub struct FileConfigStore {
    config_path: PathBuf,
    keyring_service: String,
}

impl FileConfigStore {
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ReadError("Cannot determine config directory".to_string())
        })?;

        let app_config_dir = config_dir.join("todo-cli");
        let config_path = app_config_dir.join("config.json");

        Ok(Self {
            config_path,
            keyring_service: "todo-cli".to_string(),
        })
    }

    async fn ensure_config_dir(&self) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }
        Ok(())
    }

    fn token_file_path(&self) -> PathBuf {
        self.config_path.parent().unwrap().join(".token")
    }

    async fn get_token_from_file(&self) -> ConfigResult<Option<String>> {
        let token_path = self.token_file_path();
        match fs::read_to_string(&token_path).await {
            Ok(token) => Ok(Some(token.trim().to_string())),
            Err(_) => Ok(None), // File doesn't exist or can't be read
        }
    }

    async fn set_token_in_file(&self, token: &str) -> ConfigResult<()> {
        self.ensure_config_dir().await?;
        let token_path = self.token_file_path();
        fs::write(&token_path, token)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        // Restrict to the owner (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&token_path)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&token_path, perms)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load_config(&self) -> ConfigResult<AppConfig> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(_) => {
                // No config file yet: defaults plus whatever token we find
                let api_token = self.get_api_token().await?;
                return Ok(AppConfig {
                    api_token,
                    ..Default::default()
                });
            }
        };

        let config_file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        let user_id = match config_file.user_id.as_deref() {
            Some(raw) => Some(UserId::from_str(raw).map_err(|e| {
                ConfigError::InvalidFormat(format!("user id must be a UUID: {e}"))
            })?),
            None => None,
        };

        // Always resolve the freshest token (keyring, file, or env)
        let mut api_token = self.get_api_token().await?;
        if api_token.is_none() {
            if let Ok(env_token) = std::env::var("TODO_TOKEN") {
                api_token = Some(env_token);
            }
        }

        Ok(AppConfig {
            api_token,
            api_base_url: config_file
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            user_id,
        })
    }

    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()> {
        self.ensure_config_dir().await?;

        let config_file = ConfigFile {
            api_base_url: Some(config.api_base_url.clone()),
            user_id: config.user_id.map(|u| u.to_string()),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        // The token never goes into config.json
        if let Some(token) = &config.api_token {
            self.set_api_token(token).await?;
        }

        Ok(())
    }

    async fn get_api_token(&self) -> ConfigResult<Option<String>> {
        // Keyring first, then the token file
        match keyring::Entry::new(&self.keyring_service, "api_token") {
            Ok(entry) => match entry.get_password() {
                Ok(token) => return Ok(Some(token)),
                Err(keyring::Error::NoEntry) => {
                    // No token in keyring, try other methods
                }
                Err(_) => {
                    tracing::warn!("Keyring not available, falling back to file storage");
                }
            },
            Err(_) => {
                tracing::warn!("Keyring service not available, falling back to file storage");
            }
        }

        self.get_token_from_file().await
    }

    async fn set_api_token(&self, token: &str) -> ConfigResult<()> {
        match keyring::Entry::new(&self.keyring_service, "api_token") {
            Ok(entry) => match entry.set_password(token) {
                Ok(()) => return Ok(()),
                Err(_) => {
                    tracing::warn!("Failed to store in keyring, falling back to file storage");
                }
            },
            Err(_) => {
                tracing::warn!("Keyring not available, using file storage");
            }
        }

        self.set_token_in_file(token).await
    }
}
