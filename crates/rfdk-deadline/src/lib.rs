//! Generates the configuration consumed by the custom resource that sets up the
//! Deadline Spot Event Plugin.
//!
//! Spot fleets are declared with [`fleet::FleetSpec`] and validated into
//! [`fleet::FleetDefinition`]s. [`configure::ConfigureSpotEventPlugin`] turns
//! a set of fleets, the plugin [`settings`] and the render queue
//! [`connection`] into one property bag:
//!
//! 1. every fleet is synthesized into one Spot Fleet request specification,
//!    bound to each of its Deadline groups ([`spot::synthesize`]),
//! 2. all fleets are merged into one mapping keyed by group name, rejecting
//!    group names used by more than one fleet ([`spot::merge`]),
//! 3. plugin settings get their defaults applied ([`settings::PluginSettings::resolve`]).
//!
//! Only one configuration may target a render queue endpoint per synthesis
//! run, which is tracked by an explicit [`registry::EndpointRegistry`].

pub mod configure;
pub mod connection;
pub mod fleet;
pub mod names;
pub mod registry;
pub mod settings;
pub mod spot;
pub mod tags;
pub mod validation;
pub mod version;

// Internal re-exports
pub use rfdk_shared as shared;
