use crate::logs::{DEFAULT_LOG_CAPACITY, DEFAULT_TAIL_LINES};
use crate::model::ResourceKind;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_REFRESH_SECS: u64 = 5;
const DEFAULT_TOAST_SECS: u64 = 3;
const DEFAULT_LEFT_COLUMN_PERCENT: u16 = 25;

/// Settings resolved from the optional YAML file, before CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub source: Option<PathBuf>,
    pub panels: Vec<ResourceKind>,
    pub refresh_secs: u64,
    pub log_buffer_lines: usize,
    pub log_tail_lines: i64,
    pub left_column_percent: u16,
    pub toast_ttl: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            panels: ResourceKind::ALL.to_vec(),
            refresh_secs: DEFAULT_REFRESH_SECS,
            log_buffer_lines: DEFAULT_LOG_CAPACITY,
            log_tail_lines: DEFAULT_TAIL_LINES,
            left_column_percent: DEFAULT_LEFT_COLUMN_PERCENT,
            toast_ttl: Duration::from_secs(DEFAULT_TOAST_SECS),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DashboardConfigFile {
    #[serde(default)]
    panels: Option<Vec<String>>,
    #[serde(default, alias = "refresh")]
    refresh_secs: Option<u64>,
    #[serde(default)]
    log_buffer_lines: Option<usize>,
    #[serde(default, alias = "tail_lines")]
    log_tail_lines: Option<i64>,
    #[serde(default)]
    left_column_percent: Option<u16>,
    #[serde(default)]
    toast_secs: Option<u64>,
}

impl RuntimeConfig {
    /// Loads the first config file found; an explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_default();
        let path = discover_config_path(
            explicit,
            std::env::var("KUBEDASH_CONFIG").ok(),
            &cwd,
            std::env::var_os("HOME").map(PathBuf::from),
        );
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let mut config = Self::parse(&raw)
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        config.source = Some(path);
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let defaults = Self::default();
        if raw.trim().is_empty() {
            return Ok(defaults);
        }
        let parsed: DashboardConfigFile = serde_yaml::from_str(raw)?;

        let panels = match parsed.panels {
            Some(tokens) => parse_panels(&tokens)?,
            None => defaults.panels,
        };
        Ok(Self {
            source: None,
            panels,
            refresh_secs: parsed.refresh_secs.unwrap_or(defaults.refresh_secs).max(1),
            log_buffer_lines: parsed
                .log_buffer_lines
                .unwrap_or(defaults.log_buffer_lines)
                .max(1),
            log_tail_lines: parsed
                .log_tail_lines
                .unwrap_or(defaults.log_tail_lines)
                .max(0),
            left_column_percent: parsed
                .left_column_percent
                .unwrap_or(defaults.left_column_percent)
                .clamp(15, 60),
            toast_ttl: parsed
                .toast_secs
                .map_or(defaults.toast_ttl, |secs| Duration::from_secs(secs.max(1))),
        })
    }
}

/// Resolves panel tokens in order, ignoring repeats.
pub fn parse_panels(tokens: &[String]) -> Result<Vec<ResourceKind>> {
    let mut kinds = Vec::new();
    let mut unknown = Vec::new();
    for token in tokens {
        match ResourceKind::from_token(token) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => unknown.push(token.as_str()),
        }
    }
    if !unknown.is_empty() {
        bail!("unknown panel kinds: {}", unknown.join(", "));
    }
    if kinds.is_empty() {
        bail!("panels must name at least one resource kind");
    }
    Ok(kinds)
}

fn discover_config_path(
    explicit: Option<&Path>,
    env_path: Option<String>,
    cwd: &Path,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_path
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    for candidate in ["kubedash.yaml", ".kubedash.yaml"] {
        let candidate = cwd.join(candidate);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = home?.join(".config/kubedash/config.yaml");
    candidate.exists().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::{RuntimeConfig, discover_config_path, parse_panels};
    use crate::model::ResourceKind;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_file_gives_defaults() {
        let config = RuntimeConfig::parse("").unwrap_or_default();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.refresh_secs, 5);
        assert_eq!(config.panels.len(), ResourceKind::ALL.len());
    }

    #[test]
    fn fields_are_clamped() {
        let config = RuntimeConfig::parse(
            "panels: [deploy, pods, deploy]\nrefresh_secs: 0\nleft_column_percent: 90\ntoast_secs: 0\nlog_tail_lines: 20\n",
        );
        let Ok(config) = config else {
            panic!("config should parse");
        };
        assert_eq!(
            config.panels,
            vec![ResourceKind::Deployments, ResourceKind::Pods]
        );
        assert_eq!(config.refresh_secs, 1);
        assert_eq!(config.left_column_percent, 60);
        assert_eq!(config.toast_ttl, Duration::from_secs(1));
        assert_eq!(config.log_tail_lines, 20);
    }

    #[test]
    fn unknown_panels_are_named() {
        let error = parse_panels(&["pods".to_string(), "widgets".to_string()])
            .err()
            .map(|error| error.to_string());
        assert_eq!(error.as_deref(), Some("unknown panel kinds: widgets"));
        assert!(parse_panels(&[]).is_err());
    }

    #[test]
    fn discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let cwd = dir.path().join("work");
        fs::create_dir_all(home.join(".config/kubedash")).unwrap();
        fs::create_dir_all(&cwd).unwrap();

        assert_eq!(
            discover_config_path(None, None, &cwd, Some(home.clone())),
            None
        );

        let user = home.join(".config/kubedash/config.yaml");
        fs::write(&user, "refresh_secs: 9\n").unwrap();
        assert_eq!(
            discover_config_path(None, None, &cwd, Some(home.clone())),
            Some(user)
        );

        let hidden = cwd.join(".kubedash.yaml");
        fs::write(&hidden, "").unwrap();
        assert_eq!(
            discover_config_path(None, None, &cwd, Some(home.clone())),
            Some(hidden)
        );

        let local = cwd.join("kubedash.yaml");
        fs::write(&local, "").unwrap();
        assert_eq!(
            discover_config_path(None, None, &cwd, Some(home.clone())),
            Some(local)
        );

        assert_eq!(
            discover_config_path(None, Some("/etc/kd.yaml".to_string()), &cwd, None),
            Some(PathBuf::from("/etc/kd.yaml"))
        );
        let explicit = PathBuf::from("/tmp/explicit.yaml");
        assert_eq!(
            discover_config_path(Some(&explicit), Some("/etc/kd.yaml".to_string()), &cwd, None),
            Some(explicit)
        );
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.yaml");
        fs::write(&path, "panels: [nodes]\nlog_buffer_lines: 500\n").unwrap();
        let config = RuntimeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.source, Some(path));
        assert_eq!(config.panels, vec![ResourceKind::Nodes]);
        assert_eq!(config.log_buffer_lines, 500);

        let missing = dir.path().join("missing.yaml");
        assert!(RuntimeConfig::load(Some(&missing)).is_err());
    }
}
