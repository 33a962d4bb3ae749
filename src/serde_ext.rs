// -- std imports
use std::time::Duration;

// -- crate imports
use serde::{Deserialize, Deserializer};

/// Durations written as humantime strings, e.g. `"30s"` or `"1m 30s"`.
pub mod humantime_serde_duration {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "humantime_serde_duration::deserialize")]
        wait: Duration,
    }

    #[test]
    fn parses_humantime_strings() {
        let h: Holder = serde_yaml::from_str("wait: 1m 30s").unwrap();
        assert_eq!(h.wait, Duration::from_secs(90));
    }

    #[test]
    fn rejects_bare_numbers_without_unit() {
        assert!(serde_yaml::from_str::<Holder>("wait: \"30\"").is_err());
    }
}
