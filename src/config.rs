use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub database_path: String,
    pub media_dir: String,
    pub jwt_secret: Option<String>,
    pub access_token_expire_minutes: i64,
    pub allowed_origins: Vec<String>,
    pub allowed_image_types: Vec<String>,
    pub max_image_size: usize,
    pub profile_picture_max_dimension: u32,
    pub post_image_max_dimension: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8000".to_string(),
            database_path: "./murmur.sqlite3".to_string(),
            media_dir: "./media".to_string(),
            jwt_secret: None,
            access_token_expire_minutes: 30,
            allowed_origins: vec!["*".to_string()],
            allowed_image_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
            ],
            max_image_size: 5 * 1024 * 1024,
            profile_picture_max_dimension: 500,
            post_image_max_dimension: 1080,
        }
    }
}

impl Config {
    /// Reads the TOML config at `path`, writing out the defaults first if it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let mut file = std::fs::File::open(path)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Config::default();
            let toml_string = toml::to_string_pretty(&default_config)?;
            let mut file = std::fs::File::create(path)?;
            file.write_all(toml_string.as_bytes())?;
            log::info!("wrote default config to {}", path.display());
            Ok(default_config)
        }
    }

    pub fn from_env_config() -> anyhow::Result<Self> {
        let path = std::env::var("MURMUR_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let mut final_cfg = Self::load(Path::new(&path))?;

        if final_cfg.jwt_secret.is_none() {
            log::warn!("no jwt_secret configured, tokens will not survive a restart");
            final_cfg.jwt_secret = Some(uuid::Uuid::new_v4().to_string());
        }
        std::fs::create_dir_all(&final_cfg.media_dir)?;
        Ok(final_cfg)
    }

    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_deref().unwrap_or_default().as_bytes()
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_expire_minutes)
    }
}
