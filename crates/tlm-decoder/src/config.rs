use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tlm_types::{DescriptorPool, SchemaBinding};

use crate::decompression::DEFAULT_MAX_DECOMPRESSED_SIZE;
use crate::error::ConfigError;
use crate::flatten::FilterTable;

/// Decoder configuration.
///
/// Every field is optional; an empty document gives flat output with no
/// filters, `~` as the path delimiter and no compact schemas.
///
/// Compact row schemas come from a serialized `FileDescriptorSet`, as
/// written by `protoc --include_imports --descriptor_set_out`. Each
/// `[[schemas]]` entry binds a schema path to a message in that set.
///
/// ```toml
/// mode = "flat"
/// delimiter = "~"
/// max_decompressed_size = 67108864
/// descriptor_set = "telemetry.desc"
///
/// [[filters]]
/// name = "interface"
/// pattern = "RootOper~InterfaceProperties~DataNodes~DataNode~SystemView~Interfaces~Interface~(?P<InterfaceName>.*)"
///
/// [[schemas]]
/// path = "RootOper.InfraStatistics.Interface.Latest.GenericCounters"
/// message = "cisco.ifstats.IfstatsbagGeneric"
/// ```
///
/// ```text
/// ┌───────────────────────┬──────────────────────────────────────────────┐
/// │ Field                 │ Purpose                                      │
/// ├───────────────────────┼──────────────────────────────────────────────┤
/// │ mode                  │ flat (default) or raw JSON output            │
/// │ delimiter             │ joins path segments; splits filter patterns  │
/// │ filters               │ ordered flattening rules, first match wins   │
/// │ max_decompressed_size │ per-frame inflate ceiling in bytes           │
/// │ descriptor_set        │ compiled .proto definitions for compact rows │
/// │ schemas               │ schema path → message in the descriptor set  │
/// └───────────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    pub mode: OutputMode,
    pub delimiter: String,
    /// Evaluated in declaration order.
    pub filters: Vec<FilterConfig>,
    pub max_decompressed_size: usize,
    /// Relative paths in a config file resolve against the file's
    /// directory.
    pub descriptor_set: Option<PathBuf>,
    pub schemas: Vec<SchemaBinding>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            delimiter: "~".to_string(),
            filters: Vec::new(),
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            descriptor_set: None,
            schemas: Vec::new(),
        }
    }
}

/// One flattening rule.
///
/// `pattern` is split on the configured delimiter; each piece is a regex
/// anchored to a whole key at that depth. Named groups become captures
/// reported under `"key"`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Event `type` for matches. Without a name the matched subtree is
    /// emitted as-is and typed by its key.
    #[serde(default)]
    pub name: Option<String>,
    pub pattern: String,
}

/// How JSON payloads become events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One event per leaf or per filter match.
    #[default]
    Flat,
    /// One event per document.
    Raw,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "raw" => Ok(Self::Raw),
            other => Err(format!("unknown output mode {other:?}, expected flat or raw")),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flat => "flat",
            Self::Raw => "raw",
        })
    }
}

impl DecoderConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`validate`](Self::validate).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = contents.parse()?;
        config.descriptor_set = config.descriptor_set.map(|set| match path.parent() {
            Some(dir) if set.is_relative() => dir.join(set),
            _ => set,
        });
        Ok(config)
    }

    /// Load the descriptor set named by `descriptor_set`, or an empty pool
    /// when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Descriptor`] if it is not a valid descriptor set.
    pub fn load_descriptors(&self) -> Result<DescriptorPool, ConfigError> {
        let Some(path) = &self.descriptor_set else {
            return Ok(DescriptorPool::new());
        };
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        DescriptorPool::decode(bytes.as_slice()).map_err(|source| ConfigError::Descriptor {
            path: path.clone(),
            source,
        })
    }

    /// Check everything deserialisation cannot, handing back the compiled
    /// filter table so callers do not compile it again.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyDelimiter`] / [`ConfigError::ZeroDecompressionLimit`]
    ///   for unusable scalars.
    /// - [`ConfigError::EmptyPattern`] / [`ConfigError::InvalidPattern`] if
    ///   a filter does not compile.
    /// - [`ConfigError::DuplicateSchema`] if two schemas share a path.
    pub fn validate(&self) -> Result<FilterTable, ConfigError> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        if self.max_decompressed_size == 0 {
            return Err(ConfigError::ZeroDecompressionLimit);
        }

        let filters = FilterTable::compile(&self.filters, &self.delimiter)?;

        let mut seen = HashSet::new();
        for schema in &self.schemas {
            if !seen.insert(schema.path.as_str()) {
                return Err(ConfigError::DuplicateSchema {
                    path: schema.path.clone(),
                });
            }
        }
        Ok(filters)
    }
}

impl FromStr for DecoderConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: DecoderConfig = "".parse().unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert_eq!(config.mode, OutputMode::Flat);
        assert_eq!(config.delimiter, "~");
        assert_eq!(config.max_decompressed_size, 64 * 1024 * 1024);
    }

    #[test]
    fn filters_keep_declaration_order() {
        let config: DecoderConfig = r#"
            mode = "raw"

            [[filters]]
            name = "second"
            pattern = "b~c"

            [[filters]]
            pattern = "a"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.mode, OutputMode::Raw);
        assert_eq!(config.filters[0].name.as_deref(), Some("second"));
        assert_eq!(config.filters[1].name, None);
    }

    #[test]
    fn rejects_invalid_regex() {
        let result: Result<DecoderConfig, _> = r#"
            [[filters]]
            name = "broken"
            pattern = "ok~(unclosed"
        "#
        .parse();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidPattern { ref segment, .. }) if segment == "(unclosed"
        ));
    }

    #[test]
    fn rejects_empty_delimiter_and_pattern() {
        assert!(matches!(
            r#"delimiter = """#.parse::<DecoderConfig>(),
            Err(ConfigError::EmptyDelimiter)
        ));
        assert!(matches!(
            "[[filters]]\npattern = \"\"".parse::<DecoderConfig>(),
            Err(ConfigError::EmptyPattern { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_schema_paths() {
        let result = r#"
            [[schemas]]
            path = "A.B"
            message = "pkg.One"

            [[schemas]]
            path = "A.B"
            message = "pkg.Two"
        "#
        .parse::<DecoderConfig>();
        assert!(matches!(result, Err(ConfigError::DuplicateSchema { ref path }) if path == "A.B"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            "xform = \"flat\"".parse::<DecoderConfig>(),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn validate_hands_back_compiled_filters() {
        let config: DecoderConfig = r#"
            [[filters]]
            name = "a"
            pattern = "x~y"

            [[filters]]
            pattern = "z"
        "#
        .parse()
        .unwrap();
        let filters = config.validate().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters.entries()[0].atoms().len(), 2);
        assert_eq!(filters.delimiter(), "~");
    }

    #[test]
    fn schemas_bind_messages() {
        let config: DecoderConfig = r#"
            descriptor_set = "/etc/tlm/telemetry.desc"

            [[schemas]]
            path = "RootOper.Interfaces"
            message = "cisco.ifstats.IfStats"
            type = "Ifstats"
        "#
        .parse()
        .unwrap();
        assert_eq!(
            config.descriptor_set.as_deref(),
            Some(Path::new("/etc/tlm/telemetry.desc"))
        );
        assert_eq!(config.schemas[0].message, "cisco.ifstats.IfStats");
        assert_eq!(config.schemas[0].type_name.as_deref(), Some("Ifstats"));
    }

    #[test]
    fn no_descriptor_set_gives_empty_pool() {
        let pool = DecoderConfig::default().load_descriptors().unwrap();
        assert_eq!(pool.all_messages().count(), 0);
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tlm-config-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn descriptor_set_resolves_against_config_dir() {
        let dir = scratch_dir("relative");
        let file = dir.join("tlm.toml");
        fs::write(&file, "descriptor_set = \"telemetry.desc\"\n").unwrap();

        let config = DecoderConfig::from_file(&file).unwrap();
        assert_eq!(config.descriptor_set, Some(dir.join("telemetry.desc")));
        assert!(matches!(config.load_descriptors(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn loads_descriptor_set_from_disk() {
        use prost::Message;
        use prost_types::{DescriptorProto, FileDescriptorProto, FileDescriptorSet};

        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("empty.proto".into()),
                package: Some("pkg".into()),
                message_type: vec![DescriptorProto {
                    name: Some("Empty".into()),
                    ..DescriptorProto::default()
                }],
                syntax: Some("proto3".into()),
                ..FileDescriptorProto::default()
            }],
        };
        let dir = scratch_dir("load");
        let path = dir.join("set.desc");
        fs::write(&path, set.encode_to_vec()).unwrap();

        let config = DecoderConfig {
            descriptor_set: Some(path),
            ..DecoderConfig::default()
        };
        let pool = config.load_descriptors().unwrap();
        assert!(pool.get_message_by_name("pkg.Empty").is_some());
    }

    #[test]
    fn garbage_descriptor_set_is_rejected() {
        let dir = scratch_dir("garbage");
        let path = dir.join("bad.desc");
        fs::write(&path, [0xFF, 0xFF, 0xFF]).unwrap();

        let config = DecoderConfig {
            descriptor_set: Some(path.clone()),
            ..DecoderConfig::default()
        };
        let err = config.load_descriptors().unwrap_err();
        assert!(matches!(err, ConfigError::Descriptor { path: ref p, .. } if *p == path));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = DecoderConfig::from_file("/nonexistent/tlm.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tlm.toml"));
    }

    #[test]
    fn output_mode_from_str() {
        assert_eq!("raw".parse::<OutputMode>().unwrap(), OutputMode::Raw);
        assert!("tree".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::Flat.to_string(), "flat");
    }
}
