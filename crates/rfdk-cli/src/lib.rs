//! Command line front end of the Deadline Spot Event Plugin configuration
//! generator.

pub mod logging;
pub mod synth;

/// Environment variable holding the log filter, `{LOG_ENV}_DIRECTORY` enables
/// file logging.
pub const LOG_ENV: &str = "RFDK_LOG";
pub const APP_NAME: &str = "rfdk";
