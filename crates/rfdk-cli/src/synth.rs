//! Reads a synthesis file and builds the Spot Event Plugin configuration of
//! every render queue declared in it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use rfdk_deadline::{
    configure::{
        self, ConfigureSpotEventPlugin, ConfigureSpotEventPluginProps,
        ConfigureSpotEventPluginSpec,
    },
    registry::EndpointRegistry,
};
use serde::Deserialize;
use snafu::{ResultExt, Snafu, ensure};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read synthesis file {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse synthesis file {path:?}"))]
    ParseFile {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("configuration name {name:?} is used more than once"))]
    DuplicateName { name: String },

    #[snafu(display("failed to build configuration {name:?}"))]
    Configure {
        source: configure::Error,
        name: String,
    },
}

/// The contents of a synthesis file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisFile {
    pub configurations: Vec<NamedConfiguration>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedConfiguration {
    /// Keys the configuration in the output.
    pub name: String,

    #[serde(flatten)]
    pub spec: ConfigureSpotEventPluginSpec,
}

impl SynthesisFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::from_yaml(&contents, path)
    }

    fn from_yaml(contents: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(contents).context(ParseFileSnafu { path })
    }

    /// Builds every configuration, in file order.
    ///
    /// All configurations share one [`EndpointRegistry`], so two entries
    /// pointing at the same render queue are rejected.
    pub fn synthesize(self) -> Result<IndexMap<String, serde_json::Value>> {
        let mut registry = EndpointRegistry::new();
        let mut output: IndexMap<String, serde_json::Value> =
            IndexMap::with_capacity(self.configurations.len());

        for NamedConfiguration { name, spec } in self.configurations {
            ensure!(!output.contains_key(&name), DuplicateNameSnafu { name });

            let _span = tracing::info_span!("configuration", %name).entered();
            let properties = ConfigureSpotEventPluginProps::try_from(spec)
                .and_then(|props| ConfigureSpotEventPlugin::new(&mut registry, props))
                .and_then(|configuration| configuration.to_json())
                .context(ConfigureSnafu { name: &name })?;

            output.insert(name, properties);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn parse(yaml: &str) -> SynthesisFile {
        SynthesisFile::from_yaml(yaml, Path::new("test.yaml")).unwrap()
    }

    #[test]
    fn configurations_keep_file_order() {
        let output = parse(indoc! {"
            configurations:
              - name: zeta
                connection: { hostname: rq-1.internal, port: 4433 }
                awsRegion: us-west-2
              - name: alpha
                connection: { hostname: rq-2.internal, port: 4433 }
                awsRegion: us-west-2
        "})
        .synthesize()
        .unwrap();

        assert_eq!(output.keys().collect::<Vec<_>>(), ["zeta", "alpha"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = parse(indoc! {"
            configurations:
              - name: farm
                connection: { hostname: rq-1.internal, port: 4433 }
                awsRegion: us-west-2
              - name: farm
                connection: { hostname: rq-2.internal, port: 4433 }
                awsRegion: us-west-2
        "})
        .synthesize()
        .unwrap_err();

        assert!(matches!(err, Error::DuplicateName { name } if name == "farm"));
    }

    #[test]
    fn endpoints_are_shared_across_entries() {
        let err = parse(indoc! {"
            configurations:
              - name: first
                connection: { hostname: rq.internal, port: 4433 }
                awsRegion: us-west-2
              - name: second
                connection: { hostname: RQ.internal, port: 4433, protocol: HTTP }
                awsRegion: us-west-2
        "})
        .synthesize()
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Configure {
                source: configure::Error::RegisterEndpoint { .. },
                ..
            }
        ));
    }

    #[test]
    fn malformed_file_is_reported() {
        let err = SynthesisFile::from_yaml("configurations: 5", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, Error::ParseFile { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }
}
