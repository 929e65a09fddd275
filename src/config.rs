use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Write},
    path::PathBuf,
};

use home::home_dir;
use serde::{Deserialize, Serialize};

use diplomat::DiplomatError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scanned for input files when no single file is given
    in_dir: PathBuf,
    out_dir: PathBuf,
    /// Class path of the Java oracles
    classpath: String,
    java: String,
    /// Development flag handed to the Java oracles
    dev: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            in_dir: PathBuf::from("in"),
            out_dir: PathBuf::from("out"),
            classpath: String::new(),
            java: "java".to_string(),
            dev: false,
        }
    }
}

impl Config {
    // folder placed in $HOME directory
    const FOLDER: &'static str = ".diplomat";

    pub fn in_dir(&self) -> &PathBuf {
        &self.in_dir
    }

    pub fn out_dir(&self) -> &PathBuf {
        &self.out_dir
    }

    pub fn classpath(&self) -> &str {
        &self.classpath
    }

    pub fn java(&self) -> &str {
        &self.java
    }

    pub const fn dev(&self) -> bool {
        self.dev
    }

    /// Command line values win over the stored ones, without touching the file.
    pub fn with_overrides(
        mut self,
        in_dir: Option<PathBuf>,
        out_dir: Option<PathBuf>,
        classpath: Option<String>,
    ) -> Self {
        if let Some(in_dir) = in_dir {
            self.in_dir = in_dir;
        }
        if let Some(out_dir) = out_dir {
            self.out_dir = out_dir;
        }
        if let Some(classpath) = classpath {
            self.classpath = classpath;
        }
        self
    }

    fn get_base_path() -> Result<PathBuf, DiplomatError> {
        let home = home_dir()
            .ok_or_else(|| DiplomatError::ConfigError("Could not find home directory".to_string()))?;
        let path = home.join(Self::FOLDER);
        Ok(path)
    }

    fn get_path() -> Result<PathBuf, DiplomatError> {
        let base = Self::get_base_path()?;
        Ok(base.join("config.json"))
    }

    /// Creates config if it does not exist
    pub fn read_config() -> Result<Self, DiplomatError> {
        let base_path = Self::get_base_path()?;
        if !base_path.exists() {
            create_dir_all(base_path)?;
        }
        let config_path = Self::get_path()?;
        if !config_path.exists() {
            // create default config
            Self::default().save_config()?;
        }
        let file = File::open(config_path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader).map_err(|err| {
            DiplomatError::ConfigError(format!("Could not read local configuration {err:}"))
        })?;
        Ok(config)
    }

    /// Assumes the config folder exists
    pub fn save_config(&self) -> Result<(), DiplomatError> {
        let config_path = Self::get_path()?;
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            DiplomatError::ConfigError(format!("Could not save local configuration {err:}"))
        })?;
        let mut file = File::create(config_path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{"classpath": "lib/*"}"#).unwrap();
        assert_eq!(config.classpath(), "lib/*");
        assert_eq!(config.java(), "java");
        assert_eq!(config.in_dir(), &PathBuf::from("in"));
        assert!(!config.dev());
    }

    #[test]
    fn overrides_replace_stored_values() {
        let config = Config::default().with_overrides(Some(PathBuf::from("tabs")), None, None);
        assert_eq!(config.in_dir(), &PathBuf::from("tabs"));
        assert_eq!(config.out_dir(), &PathBuf::from("out"));
    }
}
