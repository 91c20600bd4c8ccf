use serde::{Deserialize, Serialize};

/// Tunables for one resolver instance.
///
/// Usually read from the `[resolver]` table of a TOML document with
/// [`ResolverConfig::from_toml_str`]; every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverConfig {
    /// Log every rejected branch together with its full dependency set.
    #[serde(default)]
    pub log_rejections: bool,

    /// Remember conflicts against root-level requirements across branches.
    #[serde(default = "default_true")]
    pub cache_conflicts: bool,

    /// Collect rejected branches into the resolution's rejection report.
    #[serde(default = "default_true")]
    pub record_rejections: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            log_rejections: false,
            cache_conflicts: true,
            record_rejections: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    resolver: ResolverConfig,
}

impl ResolverConfig {
    /// Parse the `[resolver]` table out of a TOML document.
    ///
    /// A document without the table yields the defaults.
    pub fn from_toml_str(content: &str) -> miette::Result<Self> {
        let doc: ConfigDocument = toml::from_str(content).map_err(|e| {
            depsolve_util::errors::DepsolveError::Config {
                message: format!("Failed to parse resolver config: {e}"),
            }
        })?;
        tracing::debug!(config = ?doc.resolver, "loaded resolver config");
        Ok(doc.resolver)
    }

    /// Serialize back to a `[resolver]` table.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        #[derive(Serialize)]
        struct Out<'a> {
            resolver: &'a ResolverConfig,
        }
        toml::to_string_pretty(&Out { resolver: self })
    }
}
