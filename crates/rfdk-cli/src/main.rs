use std::{fs, path::PathBuf};

use clap::{Args, Parser};
use rfdk_cli::{
    APP_NAME, LOG_ENV,
    logging::{self, initialize_logging},
    synth::{self, SynthesisFile},
};
use rfdk_deadline::{
    names::AwsRegion,
    settings::{self, PluginSettings},
};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    Logging { source: logging::Error },

    #[snafu(display("failed to synthesize configurations"))]
    Synthesize { source: synth::Error },

    #[snafu(display("failed to resolve the default plugin settings"))]
    ResolveDefaults { source: settings::Error },

    #[snafu(display("failed to serialize output"))]
    SerializeOutput { source: serde_json::Error },

    #[snafu(display("failed to write output to {path:?}"))]
    WriteOutput {
        source: std::io::Error,
        path: PathBuf,
    },
}

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(author, version, about)]
enum Command {
    /// Generate the custom resource properties of every configuration in a
    /// synthesis file.
    Synth(SynthArguments),

    /// Print the plugin settings used when none are overridden.
    Defaults(DefaultsArguments),
}

#[derive(Debug, PartialEq, Eq, Args)]
struct SynthArguments {
    /// Path to the synthesis file
    #[arg(long, short = 'c', value_name = "FILE", env = "RFDK_CONFIG")]
    config: PathBuf,

    /// Write the output to this file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE", env = "RFDK_OUTPUT")]
    output: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq, Args)]
struct DefaultsArguments {
    /// The AWS region the configuration would be deployed to
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    aws_region: AwsRegion,
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let command = Command::parse();
    initialize_logging(LOG_ENV, APP_NAME).context(LoggingSnafu)?;

    match command {
        Command::Synth(SynthArguments { config, output }) => {
            let configurations = SynthesisFile::from_path(&config)
                .and_then(SynthesisFile::synthesize)
                .context(SynthesizeSnafu)?;
            tracing::info!(
                count = configurations.len(),
                "synthesized Spot Event Plugin configurations"
            );

            write_json(&configurations, output)
        }
        Command::Defaults(DefaultsArguments { aws_region }) => {
            let defaults = PluginSettings::default()
                .resolve(&aws_region)
                .context(ResolveDefaultsSnafu)?;

            write_json(&defaults, None)
        }
    }
}

fn write_json(value: &impl serde::Serialize, output: Option<PathBuf>) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value).context(SerializeOutputSnafu)?;

    match output {
        Some(path) => fs::write(&path, json).context(WriteOutputSnafu { path }),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
