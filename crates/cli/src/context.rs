//! Loaded configuration and the services built from it

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::info;

use notifier_core::{
    AuthorizationGate, Config, Database, Error, InviteTokenService, LogMailer, Result,
};
use notifier_matrix::MatrixClient;

pub struct Context {
    pub config: Config,
    pub db: Database,
    pub matrix: MatrixClient,
    pub mailer: LogMailer,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        let config = Config::load(&path)?;

        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::open(&config.database.path)?;

        let matrix = MatrixClient::new(
            &config.matrix.homeserver,
            config.matrix.access_token.clone(),
            config.matrix.timeout(),
        )?;
        let mailer = LogMailer::new(config.mailer.from.clone(), config.mailer.subject.clone());

        info!(
            config = %path.display(),
            database = %config.database.path.display(),
            "Context ready"
        );

        Ok(Self {
            config,
            db,
            matrix,
            mailer,
        })
    }

    pub fn gate(&self) -> AuthorizationGate<'_, Database, MatrixClient> {
        AuthorizationGate::new(self.config.rules.clone(), &self.db, &self.matrix)
            .with_retry(self.config.matrix.retry_backoff())
    }

    pub fn tokens(&self) -> InviteTokenService {
        InviteTokenService::new(&self.config.server.secret)
    }
}

/// `notifier.toml` in the platform config directory
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "notifier", "notifier").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine config directory",
        ))
    })?;

    Ok(dirs.config_dir().join("notifier.toml"))
}
