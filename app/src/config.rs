use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub library_path: PathBuf,
    pub data_path: PathBuf,
    pub page_size: usize,
}

pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub library_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub page_size: Option<usize>,
}

fn default_library() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".photoshelf")
}

impl AppConfig {
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let mut builder = config::Config::builder();
        let path = match path {
            Some(p) => p,
            None => default_data_dir().join("config"),
        };
        builder = builder.add_source(config::File::from(path).required(false));
        let cfg = builder.build().unwrap_or_default();

        let log_level = cfg
            .get_string("log_level")
            .unwrap_or_else(|_| "info".to_string());
        let library_path = cfg
            .get_string("library_path")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_library());
        let data_path = cfg
            .get_string("data_path")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let page_size = cfg.get_int("page_size").unwrap_or(100) as usize;

        Self {
            log_level,
            library_path,
            data_path,
            page_size,
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(p) = &ov.library_path {
            self.library_path = p.clone();
        }
        if let Some(p) = &ov.data_path {
            self.data_path = p.clone();
        }
        if let Some(n) = ov.page_size {
            self.page_size = n;
        }
        self
    }

    pub fn save_to(&self, path: Option<PathBuf>) -> std::io::Result<()> {
        let path = match path {
            Some(p) => p,
            None => default_data_dir().join("config"),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }
}
