use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveTime;
use tracing::{debug, info, trace, warn};

use crate::slots::BookingWindow;

/// Flat key=value configuration loaded from `~/.parlorrc` (or `PARLORRC`),
/// with `include` directives and `rc.key=value` command-line overrides.
#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    #[tracing::instrument(skip(parlorrc_override))]
    pub fn load(parlorrc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map.insert(
            "api.url".to_string(),
            "http://localhost:3000/api".to_string(),
        );
        cfg.map
            .insert("data.location".to_string(), "~/.parlor".to_string());
        cfg.map.insert(
            "default.command".to_string(),
            "appointments".to_string(),
        );
        cfg.map
            .insert("booking.open".to_string(), "09:00".to_string());
        cfg.map
            .insert("booking.close".to_string(), "17:00".to_string());
        cfg.map.insert("color".to_string(), "on".to_string());

        let parlorrc = resolve_parlorrc_path(parlorrc_override)?;
        if let Some(path) = parlorrc {
            info!(parlorrc = %path.display(), "loading parlorrc");
            cfg.load_file(&path)?;
        } else {
            warn!("no parlorrc found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn api_url(&self) -> String {
        self.get("api.url")
            .unwrap_or_else(|| "http://localhost:3000/api".to_string())
    }

    /// The working window the slot generator uses. Keys: `booking.open`,
    /// `booking.close` (`HH:MM`), optional `booking.break` as
    /// `HH:MM-HH:MM`.
    pub fn booking_window(&self) -> anyhow::Result<BookingWindow> {
        let open = self.window_time("booking.open", "09:00")?;
        let close = self.window_time("booking.close", "17:00")?;

        let lunch_break = match self.get("booking.break") {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => {
                let (start, end) = raw
                    .split_once('-')
                    .ok_or_else(|| anyhow!("booking.break must be HH:MM-HH:MM, got: {raw}"))?;
                Some((parse_window_time(start)?, parse_window_time(end)?))
            }
        };

        BookingWindow::new(open, close, lunch_break)
    }

    fn window_time(&self, key: &str, default: &str) -> anyhow::Result<NaiveTime> {
        let raw = self.get(key).unwrap_or_else(|| default.to_string());
        parse_window_time(&raw).with_context(|| format!("invalid {key}"))
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }

            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );

                if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(include = %include_path.display(), "include file does not exist; skipping");
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

fn parse_window_time(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|err| anyhow!("invalid HH:MM time {raw}: {err}"))
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_parlorrc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(parlorrc_env) = std::env::var("PARLORRC") {
        if parlorrc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(parlorrc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".parlorrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".parlor"))
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let raw = PathBuf::from(include);
    let expanded = expand_tilde(&raw);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
