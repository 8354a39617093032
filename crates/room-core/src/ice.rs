//! ICE transport options
//!
//! [`IceOptions`] is an immutable value handed to
//! [`ConnectOptionsBuilder::ice_options`](crate::ConnectOptionsBuilder::ice_options).
//! It can only be produced by [`IceOptionsBuilder::build`] (or by
//! deserializing, which goes through the same validation), so a value that
//! reaches the connection builder is always well formed:
//!
//! - every server has at least one `stun:`, `stuns:`, `turn:` or `turns:` URL
//! - TURN servers carry a username and password
//! - the `Relay` policy has at least one TURN server to relay through
//!
//! ```rust
//! use confab_room_core::{IceOptions, IceServer, IceTransportPolicy};
//!
//! let ice = IceOptions::builder()
//!     .server(IceServer::new(["stun:stun.example.com:3478"]))
//!     .server(IceServer::new(["turn:turn.example.com:3478?transport=udp"])
//!         .with_credentials("user", "secret"))
//!     .transport_policy(IceTransportPolicy::Relay)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(ice.servers().len(), 2);
//! assert_eq!(ice.transport_policy(), IceTransportPolicy::Relay);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RoomError, RoomResult};

/// Which candidates the ICE agent may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTransportPolicy {
    /// Host, server-reflexive and relay candidates
    #[default]
    All,
    /// Relay candidates only
    Relay,
}

impl fmt::Display for IceTransportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IceTransportPolicy::All => write!(f, "all"),
            IceTransportPolicy::Relay => write!(f, "relay"),
        }
    }
}

/// A STUN or TURN server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl IceServer {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Whether any of the server's URLs is a TURN URL
    pub fn is_turn(&self) -> bool {
        self.urls.iter().any(|url| url.starts_with("turn:") || url.starts_with("turns:"))
    }

    fn validate(&self) -> RoomResult<()> {
        if self.urls.is_empty() {
            return Err(RoomError::invalid_ice_options("ICE server has no URLs"));
        }

        for raw in &self.urls {
            let url = Url::parse(raw)
                .map_err(|e| RoomError::invalid_ice_options(format!("invalid ICE server URL '{}': {}", raw, e)))?;

            match url.scheme() {
                "stun" | "stuns" => {}
                "turn" | "turns" => {
                    let has_credentials = self.username.as_deref().is_some_and(|u| !u.is_empty())
                        && self.password.is_some();
                    if !has_credentials {
                        return Err(RoomError::invalid_ice_options(format!(
                            "TURN server '{}' requires a username and password",
                            raw
                        )));
                    }
                }
                other => {
                    return Err(RoomError::invalid_ice_options(format!(
                        "unsupported ICE server scheme '{}' in '{}'",
                        other, raw
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Validated ICE transport options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IceOptionsBuilder")]
pub struct IceOptions {
    servers: Vec<IceServer>,
    transport_policy: IceTransportPolicy,
}

impl IceOptions {
    pub fn builder() -> IceOptionsBuilder {
        IceOptionsBuilder::new()
    }

    pub fn servers(&self) -> &[IceServer] {
        &self.servers
    }

    pub fn transport_policy(&self) -> IceTransportPolicy {
        self.transport_policy
    }
}

impl Default for IceOptions {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            transport_policy: IceTransportPolicy::All,
        }
    }
}

/// Builder for [`IceOptions`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IceOptionsBuilder {
    servers: Vec<IceServer>,
    transport_policy: IceTransportPolicy,
}

impl IceOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server
    pub fn server(mut self, server: IceServer) -> Self {
        self.servers.push(server);
        self
    }

    /// Replace the server list
    pub fn servers(mut self, servers: Vec<IceServer>) -> Self {
        self.servers = servers;
        self
    }

    pub fn transport_policy(mut self, policy: IceTransportPolicy) -> Self {
        self.transport_policy = policy;
        self
    }

    /// Validate and freeze the options
    pub fn build(self) -> RoomResult<IceOptions> {
        for server in &self.servers {
            server.validate()?;
        }

        if self.transport_policy == IceTransportPolicy::Relay && !self.servers.iter().any(IceServer::is_turn) {
            return Err(RoomError::invalid_ice_options("relay policy requires at least one TURN server"));
        }

        Ok(IceOptions {
            servers: self.servers,
            transport_policy: self.transport_policy,
        })
    }
}

impl TryFrom<IceOptionsBuilder> for IceOptions {
    type Error = RoomError;

    fn try_from(builder: IceOptionsBuilder) -> RoomResult<Self> {
        builder.build()
    }
}
