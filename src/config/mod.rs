use std::env;

use crate::models::stage::{StageVocabulary, UnknownVocabulary, VocabularyKind};

#[derive(Clone)]
pub struct Config {
	pub server_host: String,
	pub server_port: u16,
	pub database_url: String,
	pub max_pool_size: u32,
	pub jwt_secret: String,
	pub jwt_expiration_hours: i64,
	pub admin_username: String,
	pub admin_password: Option<String>,
	pub vocabulary: VocabularyKind,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		// Load .env file if it exists
		let _ = dotenvy::dotenv();

		Ok(Self {
			server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
			server_port: env::var("SERVER_PORT")
				.unwrap_or_else(|_| "8080".to_string())
				.parse()
				.map_err(|_| ConfigError::InvalidPort)?,
			database_url: env::var("DATABASE_URL")
				.unwrap_or_else(|_| "sqlite://carpet_orders.db".to_string()),
			max_pool_size: env::var("MAX_POOL_SIZE")
				.unwrap_or_else(|_| "5".to_string())
				.parse()
				.unwrap_or(5),
			jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
			jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
				.unwrap_or_else(|_| "24".to_string())
				.parse()
				.map_err(|_| ConfigError::InvalidNumber("JWT_EXPIRATION_HOURS"))?,
			admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
			admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
			vocabulary: env::var("STAGE_VOCABULARY")
				.unwrap_or_else(|_| "production".to_string())
				.parse::<VocabularyKind>()?,
		})
	}

	pub fn server_addr(&self) -> String {
		format!("{}:{}", self.server_host, self.server_port)
	}

	pub fn stage_vocabulary(&self) -> StageVocabulary {
		StageVocabulary::from_kind(self.vocabulary)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid port number")]
	InvalidPort,
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{0} must be a number")]
	InvalidNumber(&'static str),
	#[error(transparent)]
	InvalidVocabulary(#[from] UnknownVocabulary),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_vocabulary_is_a_config_error() {
		let err: ConfigError = "nightly".parse::<VocabularyKind>().unwrap_err().into();
		assert!(matches!(err, ConfigError::InvalidVocabulary(_)));
		assert_eq!(err.to_string(), "Unknown stage vocabulary: nightly");
	}
}
