use crate::text::UnregisteredPolicy;
use crate::GameVersion;
use std::path::{Path, PathBuf};

/// What a save load reads and which saves it accepts.
///
/// ```
/// use rome_loader::{GameVersion, LoadOptions};
///
/// let options = LoadOptions::builder("save.rome")
///     .prehistory("configurables/prehistory.txt")
///     .max_version(GameVersion::parse("2.0").unwrap())
///     .build();
/// assert_eq!(options.save_path().to_str(), Some("save.rome"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "derive", derive(serde::Deserialize))]
#[cfg_attr(feature = "derive", serde(deny_unknown_fields))]
pub struct LoadOptions {
    save_path: PathBuf,

    #[cfg_attr(feature = "derive", serde(default))]
    prehistory_path: Option<PathBuf>,

    #[cfg_attr(feature = "derive", serde(default = "default_min_version"))]
    min_version: GameVersion,

    #[cfg_attr(feature = "derive", serde(default = "default_max_version"))]
    max_version: GameVersion,

    #[cfg_attr(feature = "derive", serde(default))]
    unregistered: UnregisteredPolicy,

    #[cfg_attr(feature = "derive", serde(default))]
    melt_output: Option<PathBuf>,
}

fn default_min_version() -> GameVersion {
    GameVersion::new(2, 0, 0)
}

fn default_max_version() -> GameVersion {
    // Accepts any 2.0.x save
    GameVersion::parse("2.0").unwrap_or_else(|_| GameVersion::new(2, 0, 0))
}

impl LoadOptions {
    /// Start building options for the save at the path
    pub fn builder<P: Into<PathBuf>>(save_path: P) -> LoadOptionsBuilder {
        LoadOptionsBuilder {
            options: LoadOptions {
                save_path: save_path.into(),
                prehistory_path: None,
                min_version: default_min_version(),
                max_version: default_max_version(),
                unregistered: UnregisteredPolicy::default(),
                melt_output: None,
            },
        }
    }

    /// Read options from a JSON document
    ///
    /// ```
    /// use rome_loader::LoadOptions;
    /// let options = LoadOptions::from_json_slice(br#"{
    ///     "save_path": "save.rome",
    ///     "max_version": "2.1",
    ///     "unregistered": "collect"
    /// }"#).unwrap();
    /// assert_eq!(options.max_version().to_string(), "2.1");
    /// ```
    #[cfg(feature = "json")]
    pub fn from_json_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// The save to load
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Optional script of rulers that predate the save's start
    pub fn prehistory_path(&self) -> Option<&Path> {
        self.prehistory_path.as_deref()
    }

    /// Oldest accepted save version
    pub fn min_version(&self) -> GameVersion {
        self.min_version
    }

    /// Newest accepted save version, compared at its own precision
    pub fn max_version(&self) -> GameVersion {
        self.max_version
    }

    /// How save keys without a handler are treated
    pub fn unregistered(&self) -> UnregisteredPolicy {
        self.unregistered
    }

    /// Fixed path for the melted save. A fresh temporary directory is used
    /// for each load when unset.
    pub fn melt_output(&self) -> Option<&Path> {
        self.melt_output.as_deref()
    }
}

/// Builds [`LoadOptions`]
#[derive(Debug, Clone)]
pub struct LoadOptionsBuilder {
    options: LoadOptions,
}

impl LoadOptionsBuilder {
    /// Load pre-Imperator ruler terms from this file after linking
    pub fn prehistory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.prehistory_path = Some(path.into());
        self
    }

    /// Reject saves older than this version
    pub fn min_version(mut self, version: GameVersion) -> Self {
        self.options.min_version = version;
        self
    }

    /// Reject saves newer than this version
    pub fn max_version(mut self, version: GameVersion) -> Self {
        self.options.max_version = version;
        self
    }

    /// Set how save keys without a handler are treated
    pub fn unregistered(mut self, policy: UnregisteredPolicy) -> Self {
        self.options.unregistered = policy;
        self
    }

    /// Write the melted save to this path instead of a temporary directory
    pub fn melt_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.melt_output = Some(path.into());
        self
    }

    /// Finish building
    pub fn build(self) -> LoadOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = LoadOptions::builder("a.rome").build();
        assert_eq!(options.min_version(), GameVersion::new(2, 0, 0));
        assert!(options
            .max_version()
            .is_largerish_than(&GameVersion::new(2, 0, 9)));
        assert_eq!(options.unregistered(), UnregisteredPolicy::Ignore);
        assert!(options.prehistory_path().is_none());
        assert!(options.melt_output().is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let options = LoadOptions::builder("a.rome")
            .min_version(GameVersion::new(1, 5, 0))
            .unregistered(UnregisteredPolicy::Log)
            .melt_output("/tmp/melted.rome")
            .build();
        assert_eq!(options.min_version(), GameVersion::new(1, 5, 0));
        assert_eq!(options.unregistered(), UnregisteredPolicy::Log);
        assert_eq!(options.melt_output(), Some(Path::new("/tmp/melted.rome")));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_defaults() {
        let options = LoadOptions::from_json_slice(br#"{"save_path": "b.rome"}"#).unwrap();
        assert_eq!(options, LoadOptions::builder("b.rome").build());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_unknown_field() {
        assert!(LoadOptions::from_json_slice(br#"{"save_path": "b.rome", "x": 1}"#).is_err());
    }
}
