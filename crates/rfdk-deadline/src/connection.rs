//! The connection details of the Deadline render queue the Spot Event Plugin
//! configuration is applied to.

use std::{fmt::Display, net::IpAddr, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};
use snafu::Snafu;
use strum::{Display as StrumDisplay, EnumString};

use crate::{names::Arn, validation};

/// A validated domain name type conforming to RFC 1123.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl FromStr for DomainName {
    type Err = validation::Errors;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        validation::is_rfc_1123_subdomain(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for DomainName {
    type Error = validation::Errors;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DomainName> for String {
    fn from(value: DomainName) -> Self {
        value.0
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for DomainName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Snafu)]
pub enum HostNameParseError {
    #[snafu(display(
        "the given hostname {hostname:?} is not a valid hostname, which needs to be either a domain name or IP address"
    ))]
    InvalidHostname { hostname: String },
}

/// A validated hostname (either a [`DomainName`] or IP address) type.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(try_from = "String", into = "String")]
pub enum HostName {
    IpAddress(IpAddr),
    DomainName(DomainName),
}

impl FromStr for HostName {
    type Err = HostNameParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Ok(ip) = value.parse::<IpAddr>() {
            return Ok(Self::IpAddress(ip));
        }

        if let Ok(domain_name) = value.parse() {
            return Ok(Self::DomainName(domain_name));
        }

        InvalidHostnameSnafu { hostname: value }.fail()
    }
}

impl TryFrom<String> for HostName {
    type Error = HostNameParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HostName> for String {
    fn from(value: HostName) -> Self {
        value.to_string()
    }
}

impl Display for HostName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IpAddress(ip) => write!(f, "{ip}"),
            Self::DomainName(domain_name) => write!(f, "{domain_name}"),
        }
    }
}

/// The application protocol the render queue listens with.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

/// How the configuration custom resource reaches the render queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub hostname: HostName,

    /// The custom resource expects the port as a string.
    #[serde(serialize_with = "serialize_port")]
    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,

    /// The Secrets Manager secret holding the CA certificate that signed the
    /// render queue's TLS certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate_arn: Option<Arn>,
}

impl Connection {
    pub fn new(hostname: HostName, port: u16, protocol: Protocol) -> Self {
        Self {
            hostname,
            port,
            protocol,
            ca_certificate_arn: None,
        }
    }

    pub fn with_ca_certificate(mut self, arn: Arn) -> Self {
        self.ca_certificate_arn = Some(arn);
        self
    }

    /// Identifies the render queue this connection points at. Two connections
    /// with the same endpoint address the same scheduler, regardless of the
    /// protocol or certificate used.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.port).to_lowercase()
    }
}

fn serialize_port<S>(port: &u16, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(port)
}
