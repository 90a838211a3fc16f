//! Configuration for the quiz console.

use crate::stats::UpsertStrategy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "quiz-console")
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|d| d.config_dir().join("config.toml"))
    }

    /// Configured database path, else the platform data dir.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.database
            .path
            .clone()
            .or_else(|| Self::project_dirs().map(|d| d.data_dir().join("quiz.db")))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::project_dirs().map(|d| d.data_dir().join("quiz-console.log"))
    }

    pub fn is_admin_name(&self, username: &str) -> bool {
        self.accounts.admins.iter().any(|a| a == username.trim())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_min_questions")]
    pub min_questions: usize,
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    #[serde(default = "default_questions")]
    pub default_questions: usize,
    #[serde(default = "default_feedback_delay")]
    pub feedback_delay_ms: u64,
    /// Fixed seed for reproducible sessions.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_min_questions() -> usize { 1 }
fn default_max_questions() -> usize { 20 }
fn default_questions() -> usize { 10 }
fn default_feedback_delay() -> u64 { 1500 }

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            min_questions: default_min_questions(),
            max_questions: default_max_questions(),
            default_questions: default_questions(),
            feedback_delay_ms: default_feedback_delay(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub upsert: UpsertStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Usernames that are granted admin rights on account creation.
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub seed_sample_questions: bool,
}

fn default_true() -> bool { true }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            seed_sample_questions: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.quiz.max_questions, 20);
        assert_eq!(config.quiz.default_questions, 10);
        assert_eq!(config.quiz.feedback_delay_ms, 1500);
        assert_eq!(config.stats.upsert, UpsertStrategy::ReadThenWrite);
        assert!(config.database.seed_sample_questions);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [quiz]
            default_questions = 5
            seed = 42

            [stats]
            upsert = "atomic"

            [accounts]
            admins = ["root"]
            "#,
        )
        .unwrap();
        assert_eq!(config.quiz.default_questions, 5);
        assert_eq!(config.quiz.max_questions, 20);
        assert_eq!(config.quiz.seed, Some(42));
        assert_eq!(config.stats.upsert, UpsertStrategy::Atomic);
        assert!(config.is_admin_name(" root "));
        assert!(!config.is_admin_name("guest"));
    }

    #[test]
    fn test_default_impl_matches_serde_defaults() {
        let parsed: Config = toml::from_str("[quiz]\n[database]\n[logging]\n").unwrap();
        let built = Config::default();
        assert_eq!(parsed.quiz.min_questions, built.quiz.min_questions);
        assert_eq!(parsed.quiz.max_questions, built.quiz.max_questions);
        assert_eq!(parsed.quiz.default_questions, built.quiz.default_questions);
        assert_eq!(parsed.quiz.feedback_delay_ms, built.quiz.feedback_delay_ms);
        assert_eq!(parsed.database.seed_sample_questions, built.database.seed_sample_questions);
        assert_eq!(parsed.logging.level, built.logging.level);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.quiz.max_questions, config.quiz.max_questions);
    }
}
