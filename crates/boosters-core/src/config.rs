use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use serde::Deserialize;
use tracing::{
  debug,
  info
};

use crate::status::{
  DEFAULT_DUE_SOON_DAYS,
  Thresholds
};

const CONFIG_ENV_VAR: &str =
  "BOOSTERS_CONFIG";
const CONFIG_DIR_NAME: &str =
  "boosters";
const CONFIG_FILE_NAME: &str =
  "config.toml";
const DATA_DIR_NAME: &str = "boosters";
const DEFAULT_COMMAND: &str =
  "dashboard";

/// `config.toml` as written by the
/// user. Absent keys keep their
/// defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
  data_dir:        Option<PathBuf>,
  default_command: Option<String>,
  color:           Option<bool>,
  due:             DueSection
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DueSection {
  soon_days:     Option<i64>,
  upcoming_days: Option<i64>
}

/// Effective settings for one run,
/// handed to every command that needs
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// `None` falls back to the
  /// platform data directory.
  pub data_dir:        Option<PathBuf>,
  pub default_command: String,
  pub color:           bool,
  pub thresholds:      Thresholds,
  pub source:          Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir:        None,
      default_command: DEFAULT_COMMAND
        .to_string(),
      color:           true,
      thresholds:      Thresholds::default(
      ),
      source:          None
    }
  }
}

impl Config {
  /// Reads `explicit`, else
  /// `$BOOSTERS_CONFIG`, else
  /// `<config dir>/boosters/config.toml`
  /// when it exists.
  #[tracing::instrument]
  pub fn load(
    explicit: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      locate_config_file(explicit)
    else {
      debug!(
        "no config file; using defaults"
      );
      return Ok(Self::default());
    };

    info!(file = %path.display(), "loading config");
    let raw = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;

    let mut cfg = Self::from_toml(&raw)
      .with_context(|| {
        format!(
          "invalid config file {}",
          path.display()
        )
      })?;
    cfg.source = Some(path);
    Ok(cfg)
  }

  pub fn from_toml(
    raw: &str
  ) -> anyhow::Result<Self> {
    let file: ConfigFile =
      toml::from_str(raw)?;

    let mut cfg = Self::default();
    if let Some(dir) = file.data_dir {
      cfg.data_dir =
        Some(expand_home(&dir));
    }
    if let Some(command) =
      file.default_command
    {
      cfg.default_command = command;
    }
    if let Some(color) = file.color {
      cfg.color = color;
    }
    cfg.thresholds = Thresholds::new(
      file
        .due
        .soon_days
        .unwrap_or(DEFAULT_DUE_SOON_DAYS),
      file.due.upcoming_days
    )?;

    Ok(cfg)
  }

  /// Applies `--set key=value` pairs
  /// using the config file's key
  /// names. The threshold pair is
  /// validated once all pairs are in.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<'a, I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (&'a str, &'a str)
    >
  {
    let mut soon =
      self.thresholds.due_soon_days;
    let mut upcoming =
      self.thresholds.upcoming_days;

    for (key, value) in overrides {
      debug!(key, value, "applying override");
      match key {
        | "data_dir" => {
          self.data_dir = Some(
            expand_home(Path::new(value))
          );
        }
        | "default_command" => {
          self.default_command =
            value.to_string();
        }
        | "color" => {
          self.color =
            parse_switch(value)?;
        }
        | "due.soon_days" => {
          soon = parse_days(key, value)?;
        }
        | "due.upcoming_days" => {
          upcoming = match value {
            | "" | "none" => None,
            | days => {
              Some(parse_days(key, days)?)
            }
          };
        }
        | other => {
          bail!("unknown setting: {other}")
        }
      }
    }

    self.thresholds =
      Thresholds::new(soon, upcoming)?;
    Ok(())
  }

  pub fn data_dir(
    &self
  ) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }
    dirs::data_dir()
      .map(|dir| dir.join(DATA_DIR_NAME))
      .ok_or_else(|| {
        anyhow!(
          "cannot determine a data \
           directory; set data_dir in \
           config.toml or pass --data"
        )
      })
  }

  /// Effective settings in config-file
  /// key order.
  pub fn entries(
    &self
  ) -> Vec<(&'static str, String)> {
    let data_dir = self
      .data_dir()
      .map(|dir| {
        dir.display().to_string()
      })
      .unwrap_or_else(|err| {
        format!("<{err}>")
      });
    let upcoming = self
      .thresholds
      .upcoming_days
      .map(|days| days.to_string())
      .unwrap_or_else(|| {
        "none".to_string()
      });
    let source = self
      .source
      .as_ref()
      .map(|path| {
        path.display().to_string()
      })
      .unwrap_or_else(|| {
        "(defaults)".to_string()
      });

    vec![
      ("config", source),
      ("data_dir", data_dir),
      (
        "default_command",
        self.default_command.clone()
      ),
      ("color", self.color.to_string()),
      (
        "due.soon_days",
        self
          .thresholds
          .due_soon_days
          .to_string()
      ),
      ("due.upcoming_days", upcoming),
    ]
  }
}

fn locate_config_file(
  explicit: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  if let Some(raw) =
    std::env::var_os(CONFIG_ENV_VAR)
  {
    // Set but empty disables the file.
    return (!raw.is_empty())
      .then(|| PathBuf::from(raw));
  }

  dirs::config_dir()
    .map(|dir| {
      dir
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
    })
    .filter(|path| path.is_file())
}

fn expand_home(path: &Path) -> PathBuf {
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

fn parse_switch(
  value: &str
) -> anyhow::Result<bool> {
  match value
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "true" | "1" => {
      Ok(true)
    }
    | "off" | "no" | "false" | "0" => {
      Ok(false)
    }
    | other => {
      bail!(
        "expected on/off for color, \
         got: {other}"
      )
    }
  }
}

fn parse_days(
  key: &str,
  value: &str
) -> anyhow::Result<i64> {
  value.trim().parse().with_context(
    || {
      format!(
        "invalid day count for {key}: \
         {value}"
      )
    }
  )
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::PathBuf;

  use tempfile::tempdir;

  use super::Config;
  use crate::status::Thresholds;

  #[test]
  fn loads_typed_settings_from_toml() {
    let dir =
      tempdir().expect("tempdir");
    let path =
      dir.path().join("config.toml");
    fs::write(
      &path,
      "data_dir = \"/srv/boosters\"\n\
       color = false\n\
       \n\
       [due]\n\
       soon_days = 14\n\
       upcoming_days = 90\n"
    )
    .expect("write config");

    let cfg = Config::load(Some(&path))
      .expect("load config");
    assert_eq!(
      cfg.data_dir().expect("data dir"),
      PathBuf::from("/srv/boosters")
    );
    assert!(!cfg.color);
    assert_eq!(
      cfg.default_command,
      "dashboard"
    );
    assert_eq!(
      cfg.thresholds,
      Thresholds::new(14, Some(90))
        .expect("thresholds")
    );
    assert_eq!(
      cfg.source.as_deref(),
      Some(path.as_path())
    );
  }

  #[test]
  fn rejects_unknown_keys_and_bad_thresholds()
  {
    assert!(
      Config::from_toml(
        "colour = true\n"
      )
      .is_err()
    );
    assert!(
      Config::from_toml(
        "[due]\nsoon_days = 30\n\
         upcoming_days = 20\n"
      )
      .is_err()
    );
  }

  #[test]
  fn missing_file_is_an_error() {
    let dir =
      tempdir().expect("tempdir");
    assert!(
      Config::load(Some(
        &dir.path().join("absent.toml")
      ))
      .is_err()
    );
  }

  #[test]
  fn overrides_are_validated_together()
  {
    let mut cfg = Config::default();
    cfg
      .apply_overrides([
        ("due.upcoming_days", "20"),
        ("due.soon_days", "7"),
        ("color", "off")
      ])
      .expect("valid overrides");
    assert_eq!(
      cfg.thresholds,
      Thresholds::new(7, Some(20))
        .expect("thresholds")
    );
    assert!(!cfg.color);

    cfg
      .apply_overrides([(
        "due.upcoming_days",
        "none"
      )])
      .expect("clear upcoming");
    assert_eq!(
      cfg.thresholds.upcoming_days,
      None
    );

    assert!(
      cfg
        .apply_overrides([(
          "color", "maybe"
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides([(
          "due.soon", "3"
        )])
        .is_err()
    );
  }

  #[test]
  fn entries_report_effective_values() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides([(
        "data_dir",
        "/tmp/boosters-data"
      )])
      .expect("override");
    let entries = cfg.entries();
    assert!(entries.contains(&(
      "data_dir",
      "/tmp/boosters-data".to_string()
    )));
    assert!(entries.contains(&(
      "due.upcoming_days",
      "none".to_string()
    )));
  }
}
