use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub http_host: String,
    pub http_port: u16,
    /// 每个流一个输出目录
    pub streams_dir: PathBuf,
    /// 持久化数据（streams.json / overlays.json）
    pub data_dir: PathBuf,
    pub ffmpeg_bin: PathBuf,
    /// 为空表示允许任意来源
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let http_port = get("HTTP_PORT", "5000")
            .parse()
            .context("HTTP_PORT must be a valid port number")?;

        let cors = get("CORS_ORIGINS", "*");
        let cors_origins = if cors.trim() == "*" {
            Vec::new()
        } else {
            cors.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        };

        Ok(Self {
            http_host: get("HTTP_HOST", "0.0.0.0"),
            http_port,
            streams_dir: absolutize(Path::new(&get("STREAMS_DIR", "./streams")))?,
            data_dir: absolutize(Path::new(&get("DATA_DIR", "./data")))?,
            ffmpeg_bin: PathBuf::from(get("FFMPEG_BIN", "ffmpeg")),
            cors_origins,
        })
    }

    pub fn streams_store_path(&self) -> PathBuf {
        self.data_dir.join("streams.json")
    }

    pub fn overlays_store_path(&self) -> PathBuf {
        self.data_dir.join("overlays.json")
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    Ok(cwd.join(path))
}
