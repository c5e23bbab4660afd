use std::sync::Arc;

use indexmap::{IndexMap, map::Entry};
use serde::Serialize;
use snafu::Snafu;

use crate::{
    fleet::FleetDefinition,
    names::GroupName,
    spot::{RequestSpecification, synthesize},
};

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum MergeError {
    #[snafu(display(
        "Bad Group Name: {name}. Group names in Spot Fleet Request Configurations should be unique."
    ))]
    DuplicateGroup { name: GroupName },
}

/// The Spot Fleet requests of all fleets, keyed by lowercase Deadline group
/// name.
///
/// Every group maps to exactly one request. Groups of the same fleet share
/// the same [`RequestSpecification`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigurationMapping(IndexMap<String, Arc<RequestSpecification>>);

impl ConfigurationMapping {
    /// Looks up the request for `group`, ignoring case.
    pub fn get(&self, group: &str) -> Option<&Arc<RequestSpecification>> {
        self.0.get(&group.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Group keys in the order the fleets declared them.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<RequestSpecification>)> {
        self.0.iter().map(|(key, spec)| (key.as_str(), spec))
    }
}

/// Synthesizes every fleet and merges the results into one
/// [`ConfigurationMapping`].
///
/// Returns [`None`] when there are no fleets, so that no configuration is
/// pushed to the plugin at all. Fails on the first group name (compared
/// case-insensitively) claimed by a second fleet; no partial mapping is
/// returned in that case.
pub fn merge<'a>(
    fleets: impl IntoIterator<Item = &'a FleetDefinition>,
) -> Result<Option<ConfigurationMapping>, MergeError> {
    let mut fleets = fleets.into_iter().peekable();
    if fleets.peek().is_none() {
        return Ok(None);
    }

    let mut mapping: IndexMap<String, Arc<RequestSpecification>> = IndexMap::new();
    for fleet in fleets {
        let request = synthesize(fleet);

        for (group, specification) in request.bindings() {
            match mapping.entry(group.key()) {
                Entry::Occupied(_) => {
                    tracing::debug!(fleet = fleet.name(), %group, "group is already bound");
                    return DuplicateGroupSnafu {
                        name: group.clone(),
                    }
                    .fail();
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::clone(specification));
                }
            }
        }
    }

    Ok(Some(ConfigurationMapping(mapping)))
}
