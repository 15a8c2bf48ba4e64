use crate::core::notification::ChannelId;
use crate::traits::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Built-in defaults merged into user options
#[derive(Debug, Clone, Copy)]
pub struct ConfigDefaults {
    pub auth_user: &'static str,
    pub auth_pass: &'static str,
    pub core: EndpointDefaults,
    pub event: EndpointDefaults,
    pub auto_reconnect: bool,
    pub reconnection_timer_ms: u64,
    pub secure_websocket: bool,
    pub connect_core: bool,
    pub connect_event: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct EndpointDefaults {
    pub host: &'static str,
    pub port: u16,
    pub sub_protocol: &'static str,
    pub origin: &'static str,
}

/// The single default configuration value
pub const DEFAULTS: ConfigDefaults = ConfigDefaults {
    auth_user: "ext",
    auth_pass: "external",
    core: EndpointDefaults {
        host: "127.0.0.1",
        port: 1003,
        sub_protocol: "ce.iotransit.net",
        origin: "core",
    },
    event: EndpointDefaults {
        host: "127.0.0.1",
        port: 1004,
        sub_protocol: "ee.iotransit.net",
        origin: "events",
    },
    auto_reconnect: true,
    reconnection_timer_ms: 5000,
    secure_websocket: false,
    connect_core: true,
    connect_event: true,
};

/// Accepted tags as supplied by the user: one tag or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AcceptTags {
    One(String),
    Many(Vec<String>),
}

/// User-supplied applet options
///
/// Every field is optional here; `appletId` is enforced by
/// [`ClientConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppletOptions {
    pub applet_id: Option<String>,
    pub accepts: Option<AcceptTags>,
    pub auth_user: Option<String>,
    pub auth_pass: Option<String>,
    pub core_engine_uri: Option<String>,
    pub core_engine_port: Option<u16>,
    pub core_engine_sub_protocol: Option<String>,
    pub core_engine_origin: Option<String>,
    pub event_engine_uri: Option<String>,
    pub event_engine_port: Option<u16>,
    pub event_engine_sub_protocol: Option<String>,
    pub event_engine_origin: Option<String>,
    pub auto_reconnect: Option<bool>,
    /// Reconnection delay in milliseconds
    pub reconnection_timer: Option<u64>,
    pub secure_web_socket: Option<bool>,
    #[serde(rename = "connectCE")]
    pub connect_ce: Option<bool>,
    #[serde(rename = "connectEE")]
    pub connect_ee: Option<bool>,
}

impl AppletOptions {
    pub fn new(applet_id: impl Into<String>) -> Self {
        Self {
            applet_id: Some(applet_id.into()),
            ..Self::default()
        }
    }
}

/// What a client can be constructed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOptions {
    /// Bare applet identity, everything else defaulted
    AppletId(String),
    /// Full option set
    Full(AppletOptions),
}

impl From<&str> for ClientOptions {
    fn from(applet_id: &str) -> Self {
        ClientOptions::AppletId(applet_id.to_string())
    }
}

impl From<String> for ClientOptions {
    fn from(applet_id: String) -> Self {
        ClientOptions::AppletId(applet_id)
    }
}

impl From<AppletOptions> for ClientOptions {
    fn from(options: AppletOptions) -> Self {
        ClientOptions::Full(options)
    }
}

/// Username and password sent in the auth request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCredentials {
    pub user: String,
    pub pass: String,
}

/// Where one channel connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoint {
    pub host: String,
    pub port: u16,
    pub sub_protocol: String,
    pub origin: String,
    /// Use `wss://` instead of `ws://`
    pub secure: bool,
}

impl ChannelEndpoint {
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}/", scheme, self.host, self.port)
    }

    pub fn connect_request(&self) -> ConnectRequest {
        ConnectRequest {
            url: self.url(),
            sub_protocol: self.sub_protocol.clone(),
            origin: self.origin.clone(),
        }
    }
}

/// Per-channel settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub endpoint: ChannelEndpoint,
}

/// Resolved, validated client configuration
///
/// Built once by [`ClientConfig::resolve`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    applet_id: String,
    accept_tags: Vec<String>,
    auth: AuthCredentials,
    core: ChannelConfig,
    event: ChannelConfig,
    auto_reconnect: bool,
    reconnection_delay: Duration,
}

impl ClientConfig {
    /// Merge user options with [`DEFAULTS`] and validate
    ///
    /// Empty strings and zero ports/timers count as unset, so they take
    /// the default.
    pub fn resolve(options: impl Into<ClientOptions>) -> Result<Self> {
        let options = match options.into() {
            ClientOptions::AppletId(applet_id) => AppletOptions::new(applet_id),
            ClientOptions::Full(options) => options,
        };

        let applet_id = options
            .applet_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                IoTransitError::Configuration("mandatory appletId not provided".to_string())
            })?;

        let accept_tags = resolve_accept_tags(options.accepts, &applet_id);
        let secure = options.secure_web_socket.unwrap_or(DEFAULTS.secure_websocket);

        let reconnection_ms = options
            .reconnection_timer
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULTS.reconnection_timer_ms);

        Ok(Self {
            applet_id,
            accept_tags,
            auth: AuthCredentials {
                user: or_default(options.auth_user, DEFAULTS.auth_user),
                pass: or_default(options.auth_pass, DEFAULTS.auth_pass),
            },
            core: ChannelConfig {
                enabled: options.connect_ce.unwrap_or(DEFAULTS.connect_core),
                endpoint: resolve_endpoint(
                    &DEFAULTS.core,
                    options.core_engine_uri,
                    options.core_engine_port,
                    options.core_engine_sub_protocol,
                    options.core_engine_origin,
                    secure,
                ),
            },
            event: ChannelConfig {
                enabled: options.connect_ee.unwrap_or(DEFAULTS.connect_event),
                endpoint: resolve_endpoint(
                    &DEFAULTS.event,
                    options.event_engine_uri,
                    options.event_engine_port,
                    options.event_engine_sub_protocol,
                    options.event_engine_origin,
                    secure,
                ),
            },
            auto_reconnect: options.auto_reconnect.unwrap_or(DEFAULTS.auto_reconnect),
            reconnection_delay: Duration::from_millis(reconnection_ms),
        })
    }

    pub fn applet_id(&self) -> &str {
        &self.applet_id
    }

    /// Never empty
    pub fn accept_tags(&self) -> &[String] {
        &self.accept_tags
    }

    pub fn auth(&self) -> &AuthCredentials {
        &self.auth
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelConfig {
        match id {
            ChannelId::Core => &self.core,
            ChannelId::Event => &self.event,
        }
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub fn reconnection_delay(&self) -> Duration {
        self.reconnection_delay
    }

    /// Auth provider for this applet's credentials and tags
    pub fn applet_auth(&self) -> AppletAuth {
        AppletAuth::new(
            self.auth.user.clone(),
            self.auth.pass.clone(),
            self.accept_tags.clone(),
        )
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn resolve_accept_tags(accepts: Option<AcceptTags>, applet_id: &str) -> Vec<String> {
    let tags = match accepts {
        Some(AcceptTags::One(tag)) => vec![tag],
        Some(AcceptTags::Many(tags)) => tags,
        None => Vec::new(),
    };

    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.into_iter().filter(|t| !t.is_empty()) {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }

    if unique.is_empty() {
        unique.push(applet_id.to_string());
    }
    unique
}

fn resolve_endpoint(
    defaults: &EndpointDefaults,
    host: Option<String>,
    port: Option<u16>,
    sub_protocol: Option<String>,
    origin: Option<String>,
    secure: bool,
) -> ChannelEndpoint {
    ChannelEndpoint {
        host: or_default(host, defaults.host),
        port: port.filter(|p| *p > 0).unwrap_or(defaults.port),
        sub_protocol: or_default(sub_protocol, defaults.sub_protocol),
        origin: or_default(origin, defaults.origin),
        secure,
    }
}
