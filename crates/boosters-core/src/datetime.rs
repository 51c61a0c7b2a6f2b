use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  Months,
  NaiveDate,
  NaiveDateTime,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::error::ScheduleError;

const TIMEZONE_CONFIG_FILE: &str =
  "boosters-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "BOOSTERS_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "BOOSTERS_TIME_CONFIG";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "UTC";

const LOCAL_TIMESTAMP_FORMATS: [&str;
  5] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M"
];

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// A date in one of the encodings the
/// record sources hand us.
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
  Text(&'a str),
  Date(NaiveDate),
  Local(NaiveDateTime),
  Timestamp(DateTime<Utc>)
}

impl<'a> From<&'a str>
  for DateInput<'a>
{
  fn from(raw: &'a str) -> Self {
    Self::Text(raw)
  }
}

impl<'a> From<&'a String>
  for DateInput<'a>
{
  fn from(raw: &'a String) -> Self {
    Self::Text(raw.as_str())
  }
}

impl From<NaiveDate>
  for DateInput<'_>
{
  fn from(date: NaiveDate) -> Self {
    Self::Date(date)
  }
}

impl From<NaiveDateTime>
  for DateInput<'_>
{
  fn from(
    local: NaiveDateTime
  ) -> Self {
    Self::Local(local)
  }
}

impl From<DateTime<Utc>>
  for DateInput<'_>
{
  fn from(
    stamp: DateTime<Utc>
  ) -> Self {
    Self::Timestamp(stamp)
  }
}

pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

#[must_use]
pub fn to_project_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  dt.with_timezone(project_timezone())
    .date_naive()
}

/// Wall-clock "now" truncated to the
/// calendar date it falls on locally.
#[must_use]
pub fn today(
  now: DateTime<Utc>
) -> NaiveDate {
  to_project_date(now)
}

/// Signed number of days from `from`
/// to `to`; negative when `to` is
/// earlier.
#[must_use]
pub fn days_between(
  from: NaiveDate,
  to: NaiveDate
) -> i64 {
  to.signed_duration_since(from)
    .num_days()
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Reduces any supported date encoding
/// to a calendar date, dropping the
/// time of day in the project
/// timezone.
pub fn normalize_date<'a>(
  input: impl Into<DateInput<'a>>
) -> Result<NaiveDate, ScheduleError> {
  match input.into() {
    | DateInput::Text(raw) => {
      parse_date_text(raw)
    }
    | DateInput::Date(date) => Ok(date),
    | DateInput::Local(local) => {
      Ok(local.date())
    }
    | DateInput::Timestamp(stamp) => {
      Ok(to_project_date(stamp))
    }
  }
}

/// Absent or blank input is "no date";
/// only malformed text is an error.
pub fn normalize_optional_date(
  input: Option<&str>
) -> Result<Option<NaiveDate>, ScheduleError>
{
  match input.map(str::trim) {
    | None => Ok(None),
    | Some(raw) if raw.is_empty() => {
      Ok(None)
    }
    | Some(raw) => {
      parse_date_text(raw).map(Some)
    }
  }
}

pub fn require_date(
  input: Option<&str>
) -> Result<NaiveDate, ScheduleError> {
  normalize_optional_date(input)?
    .ok_or_else(|| {
      ScheduleError::invalid_date(
        input.unwrap_or_default()
      )
    })
}

#[tracing::instrument(level = "trace", fields(input = raw))]
fn parse_date_text(
  raw: &str
) -> Result<NaiveDate, ScheduleError> {
  let token = raw.trim();
  if token.is_empty() {
    return Err(
      ScheduleError::invalid_date(raw)
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(to_project_date(
      dt.with_timezone(&Utc)
    ));
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y%m%dT%H%M%SZ"
    )
  {
    return Ok(to_project_date(
      DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)
    ));
  }

  for fmt in LOCAL_TIMESTAMP_FORMATS {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt.date());
    }
  }

  tracing::debug!(
    input = token,
    "unrecognized date encoding"
  );
  Err(ScheduleError::invalid_date(raw))
}

/// Date entry on the command line:
/// everything `normalize_date` accepts
/// plus `today`, `yesterday` and
/// `-Nd`/`-Nw`/`-Nm` offsets into the
/// past.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "yesterday" => {
      return today
        .checked_sub_signed(
          Duration::days(1)
        )
        .ok_or_else(|| {
          anyhow!(
            "failed to step back from \
             {today}"
          )
        });
    }
    | _ => {}
  }

  let rel_re = Regex::new(r"^-(?P<num>\d+)(?P<unit>[dwm])$")
    .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: u32 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let shifted = match unit {
      | "d" => {
        today.checked_sub_signed(
          Duration::days(i64::from(
            num
          ))
        )
      }
      | "w" => {
        today.checked_sub_signed(
          Duration::weeks(i64::from(
            num
          ))
        )
      }
      | "m" => {
        today.checked_sub_months(
          Months::new(num)
        )
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    };

    return shifted.ok_or_else(|| {
      anyhow!(
        "relative date out of range: \
         {input}"
      )
    });
  }

  normalize_date(token)
    .map_err(anyhow::Error::from)
    .with_context(|| {
      "supported formats: \
       today/yesterday, -Nd/-Nw/-Nm, \
       YYYY-MM-DD, RFC3339, \
       YYYY-MM-DDTHH:MM[:SS], \
       YYYY-MM-DD HH:MM[:SS], \
       YYYYMMDDTHHMMSSZ"
    })
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
  {
    if let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    ) {
      return tz;
    }
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "DEFAULT_PROJECT_TIMEZONE"
  )
  .unwrap_or(chrono_tz::UTC)
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}


/// Serde adapter storing calendar
/// dates as `YYYY-MM-DD` while
/// accepting any encoding
/// `normalize_date` understands on the
/// way in.
pub mod calendar_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    date: &NaiveDate,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_date(*date)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDate, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::normalize_date(raw.as_str())
      .map_err(serde::de::Error::custom)
  }

  pub mod option {
    use chrono::NaiveDate;
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    pub fn serialize<S>(
      date: &Option<NaiveDate>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match date {
        | Some(value) => {
          super::serialize(
            value, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<
      Option<NaiveDate>,
      D::Error
    >
    where
      D: Deserializer<'de>
    {
      let opt =
        Option::<String>::deserialize(
          deserializer
        )?;
      crate::datetime::normalize_optional_date(
        opt.as_deref()
      )
      .map_err(serde::de::Error::custom)
    }
  }
}
