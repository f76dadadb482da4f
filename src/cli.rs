use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;

use levelgate_core::{Level, ValidityGate};

/// levelgate - Filter log lines through runtime level overrides
#[derive(Parser, Debug)]
#[command(name = "levelgate")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Root override level, applied to every logger without a longer match
    #[arg(long, default_value = "warn")]
    pub root: Level,

    /// Prefix override as PREFIX=LEVEL (repeatable)
    #[arg(long = "override", value_name = "PREFIX=LEVEL")]
    pub overrides: Vec<OverrideSpec>,

    /// When overrides are active: always, off, count:N, for:SECONDS or until:RFC3339
    #[arg(long, default_value = "always")]
    pub gate: GateSpec,

    /// Baseline level for lines the overrides have no opinion on
    #[arg(long, default_value = "info")]
    pub threshold: Level,

    /// Read a per-line level override from KEY=LEVEL tokens in the message
    #[arg(long, value_name = "KEY")]
    pub context_key: Option<String>,

    /// Print each line prefixed by its verdict instead of filtering
    #[arg(long)]
    pub verdicts: bool,

    /// Print the override table as JSON to stderr before reading input
    #[arg(long)]
    pub dump_overrides: bool,
}

/// A single PREFIX=LEVEL override
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideSpec {
    pub prefix: String,
    pub level: Level,
}

impl FromStr for OverrideSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, level) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected PREFIX=LEVEL, got '{}'", s))?;
        let level = level.parse::<Level>().map_err(|e| e.to_string())?;
        Ok(Self {
            prefix: prefix.to_string(),
            level,
        })
    }
}

/// Gate selection from the command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateSpec {
    Always,
    Off,
    Count(u64),
    For(Duration),
    Until(DateTime<Utc>),
}

impl GateSpec {
    /// Build the gate, `None` when overriding is switched off
    pub fn build(&self) -> Option<ValidityGate> {
        match self {
            Self::Always => Some(ValidityGate::always()),
            Self::Off => None,
            Self::Count(limit) => Some(ValidityGate::until_count(*limit)),
            Self::For(duration) => Some(ValidityGate::until_duration(*duration)),
            Self::Until(deadline) => Some(ValidityGate::until_time(*deadline)),
        }
    }
}

impl FromStr for GateSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "always" => Ok(Self::Always),
            None if s == "off" => Ok(Self::Off),
            Some(("count", n)) => n
                .parse()
                .map(Self::Count)
                .map_err(|e| format!("invalid count '{}': {}", n, e)),
            Some(("for", secs)) => secs
                .parse()
                .map(|secs| Self::For(Duration::from_secs(secs)))
                .map_err(|e| format!("invalid seconds '{}': {}", secs, e)),
            Some(("until", ts)) => DateTime::parse_from_rfc3339(ts)
                .map(|ts| Self::Until(ts.with_timezone(&Utc)))
                .map_err(|e| format!("invalid timestamp '{}': {}", ts, e)),
            _ => Err(format!(
                "unknown gate '{}', expected always, off, count:N, for:SECONDS or until:RFC3339",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        let spec: OverrideSpec = "com.foo=debug".parse().unwrap();
        assert_eq!(spec.prefix, "com.foo");
        assert_eq!(spec.level, Level::Debug);

        let root: OverrideSpec = "=ERROR".parse().unwrap();
        assert_eq!(root.prefix, "");

        assert!("com.foo".parse::<OverrideSpec>().is_err());
        assert!("com.foo=loud".parse::<OverrideSpec>().is_err());
    }

    #[test]
    fn test_parse_gate() {
        assert_eq!("always".parse::<GateSpec>(), Ok(GateSpec::Always));
        assert_eq!("off".parse::<GateSpec>(), Ok(GateSpec::Off));
        assert_eq!("count:3".parse::<GateSpec>(), Ok(GateSpec::Count(3)));
        assert_eq!("for:90".parse::<GateSpec>(), Ok(GateSpec::For(Duration::from_secs(90))));
        assert!(matches!("until:2030-01-01T00:00:00Z".parse::<GateSpec>(), Ok(GateSpec::Until(_))));

        assert!("count:many".parse::<GateSpec>().is_err());
        assert!("until:tomorrow".parse::<GateSpec>().is_err());
        assert!("sometimes".parse::<GateSpec>().is_err());
    }

    #[test]
    fn test_off_builds_no_gate() {
        assert!(GateSpec::Off.build().is_none());
        assert!(GateSpec::Count(1).build().is_some());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "levelgate",
            "--override",
            "com.foo=debug",
            "--override",
            "org=error",
            "--gate",
            "count:10",
        ])
        .unwrap();
        assert_eq!(args.root, Level::Warn);
        assert_eq!(args.threshold, Level::Info);
        assert_eq!(args.overrides.len(), 2);
        assert_eq!(args.gate, GateSpec::Count(10));
    }
}
