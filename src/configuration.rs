// -- std imports
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::{fs, time::Duration};

// -- crate imports
use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

// -- module imports
use crate::serde_ext::humantime_serde_duration;

/// Netgraph HCI node names as created by `ng_ubt(4)`.
static HCI_DEVICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ubt[0-9]+hci$").expect("Invalid HCI_DEVICE_PATTERN regex")
});

/// Whether `name` has the `ubt<N>hci` shape of a netgraph HCI node.
pub fn is_hci_device_name(name: &str) -> bool {
    HCI_DEVICE_PATTERN.is_match(name)
}

/// Returns the path to the configuration file.
///
/// In debug builds this is `./contrib/config.yml` in the current working directory. In release
/// builds the XDG config directories (including `/etc/xdg`) are searched for
/// `bt-daemon/config.yml`.
///
/// # Errors
/// - [`anyhow::Error`] if no config file can be located (release builds only).
pub fn conf_filepath() -> Result<PathBuf> {
    #[cfg(debug_assertions)]
    {
        Ok(PathBuf::from("./contrib/config.yml"))
    }

    #[cfg(not(debug_assertions))]
    {
        xdg::BaseDirectories::with_prefix("bt-daemon")
            .find_config_file("config.yml")
            .context("Could not locate bt-daemon/config.yml in the XDG config directories")
    }
}

/// Daemon configuration.
///
/// Deserialized from YAML; every missing field takes its built-in default. The resolved value is
/// handed to the components that need it, it is never stored globally.
#[derive(Debug, PartialEq, Eq, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Conf {
    /// Netgraph HCI node the inquiry runs against.
    ///
    /// Default: `ubt0hci`.
    pub hci_device: String,

    /// Filesystem path of the IPC socket.
    ///
    /// Default: `/var/run/bt-tui.sock`.
    pub socket_path: PathBuf,

    /// Permission bits applied to the socket after binding.
    ///
    /// Default: `0o660`.
    pub socket_mode: u32,

    /// Pairing store read and appended by `pair`.
    ///
    /// Default: `/etc/bluetooth/hcsecd.conf`.
    pub hcsecd_conf_path: PathBuf,

    /// Device inquiry invocation.
    pub inquiry: InquiryConf,

    /// Security daemon reload invocation.
    pub reload: ReloadConf,
}

/// Device inquiry configuration. Part of [`Conf`].
#[derive(Debug, PartialEq, Eq, Clone, serde::Deserialize)]
#[serde(default)]
pub struct InquiryConf {
    /// Host tool used for the inquiry.
    ///
    /// Default: `hccontrol`.
    pub command: String,

    /// Upper bound for a single inquiry run.
    ///
    /// Default: `30s`.
    #[serde(deserialize_with = "humantime_serde_duration::deserialize")]
    pub timeout: Duration,
}

/// Reload configuration for the host security daemon. Part of [`Conf`].
#[derive(Debug, PartialEq, Eq, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ReloadConf {
    /// Program followed by its arguments.
    ///
    /// Default: `["service", "hcsecd", "restart"]`.
    pub command: Vec<String>,

    /// Upper bound for the reload command.
    ///
    /// Default: `30s`.
    #[serde(deserialize_with = "humantime_serde_duration::deserialize")]
    pub timeout: Duration,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            hci_device: "ubt0hci".to_string(),
            socket_path: PathBuf::from("/var/run/bt-tui.sock"),
            socket_mode: 0o660,
            hcsecd_conf_path: PathBuf::from("/etc/bluetooth/hcsecd.conf"),
            inquiry: InquiryConf::default(),
            reload: ReloadConf::default(),
        }
    }
}

impl Default for InquiryConf {
    fn default() -> Self {
        Self {
            command: "hccontrol".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ReloadConf {
    fn default() -> Self {
        Self {
            command: vec![
                "service".to_string(),
                "hcsecd".to_string(),
                "restart".to_string(),
            ],
            timeout: Duration::from_secs(30),
        }
    }
}

impl Conf {
    /// Loads the configuration from `path`, or from [`conf_filepath`] when no path is given.
    ///
    /// If the path cannot be determined or the file cannot be read or parsed, falls back to
    /// [`Conf::default`].
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::from_file(p),
            None => match conf_filepath() {
                Ok(p) => Self::from_file(&p),
                Err(e) => {
                    warn!(
                        "Could not determine config file path: {}. Falling back to defaults.",
                        e
                    );
                    Self::default()
                }
            },
        }
    }

    /// Reads the YAML file at `path`. On any read or parse error, falls back to
    /// [`Conf::default`].
    pub fn from_file(path: &Path) -> Self {
        fs::read_to_string(path)
            .map_err(|e| {
                warn!(
                    "Could not read config file '{}': {}. Falling back to defaults.",
                    path.display(),
                    e
                );
            })
            .and_then(|contents| {
                Self::from_yaml(&contents).map_err(|e| {
                    warn!(
                        "Could not parse config file '{}': {:#}. Falling back to defaults.",
                        path.display(),
                        e
                    );
                })
            })
            .map(|conf| {
                info!("Successfully loaded configuration from '{}'.", path.display());
                conf
            })
            .unwrap_or_default()
    }

    /// Warns when `hci_device` is not a `ubt<N>hci` node name. The value is used regardless.
    pub fn check_hci_device(&self) -> bool {
        let valid = is_hci_device_name(&self.hci_device);
        if !valid {
            warn!(
                "HCI device '{}' does not match ubt<N>hci; using it anyway",
                self.hci_device
            );
        }
        valid
    }

    /// Parses a YAML document. An empty document yields the defaults.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).context("Invalid configuration document")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(Conf::from_yaml("").unwrap(), Conf::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let conf = Conf::from_yaml(
            "hci_device: ubt1hci\ninquiry:\n  timeout: 10s\nreload:\n  command: [/bin/true]\n",
        )
        .unwrap();

        assert_eq!(conf.hci_device, "ubt1hci");
        assert_eq!(conf.inquiry.timeout, Duration::from_secs(10));
        assert_eq!(conf.inquiry.command, "hccontrol");
        assert_eq!(conf.reload.command, vec!["/bin/true".to_string()]);
        assert_eq!(conf.reload.timeout, Duration::from_secs(30));
        assert_eq!(conf.socket_path, PathBuf::from("/var/run/bt-tui.sock"));
        assert_eq!(conf.socket_mode, 0o660);
    }

    #[test]
    fn sample_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("contrib/config.yml");
        let conf = Conf::from_yaml(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(conf, Conf::default());
        assert_eq!(conf.socket_mode, 0o660);
    }

    #[test]
    fn hci_device_names() {
        for name in ["ubt0hci", "ubt1hci", "ubt9hci", "ubt10hci", "ubt123hci"] {
            assert!(is_hci_device_name(name), "{name:?} rejected");
        }
        for name in [
            "", "ubt", "hci0", "ubthci", "ubt0", "UBT0HCI", "ubt0hci ", " ubt0hci", "ubtxhci",
        ] {
            assert!(!is_hci_device_name(name), "{name:?} accepted");
        }
    }

    #[test]
    fn unusual_hci_device_is_kept() {
        let conf = Conf::from_yaml("hci_device: \"UBT0HCI \"\n").unwrap();
        assert!(!conf.check_hci_device());
        assert_eq!(conf.hci_device, "UBT0HCI ");
        assert!(Conf::default().check_hci_device());
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(Conf::from_yaml("inquiry: [not, a, map]").is_err());
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let conf = Conf::from_file(&dir.path().join("missing.yml"));
        assert_eq!(conf, Conf::default());
    }

    #[test]
    fn loads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "hcsecd_conf_path: /tmp/hcsecd.conf\n").unwrap();

        let conf = Conf::load(Some(&path));
        assert_eq!(conf.hcsecd_conf_path, PathBuf::from("/tmp/hcsecd.conf"));
    }
}
