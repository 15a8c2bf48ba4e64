use crate::error::Result;
use crate::transport::Frame;
use async_trait::async_trait;
use serde::Serialize;

/// Type tag of the applet authentication request
pub const AUTH_MESSAGE_TYPE: &str = "authapp";

/// Trait for providing the authentication message
///
/// Implement this trait to define what a channel sends right after
/// its transport opens.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Get the authentication message to send after connection
    ///
    /// This method is called immediately after a successful transport
    /// connection is established (or re-established after reconnection).
    /// No acknowledgement is awaited; the channel is usable right away.
    ///
    /// # Returns
    /// * `Ok(Some(frame))` - Send this frame for authentication
    /// * `Ok(None)` - No authentication required
    /// * `Err(IoTransitError)` - Authentication preparation failed
    async fn auth_message(&self) -> Result<Option<Frame>>;
}

/// A no-op auth provider that doesn't require authentication
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn auth_message(&self) -> Result<Option<Frame>> {
        Ok(None)
    }
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    t: &'static str,
    p: AuthPayload<'a>,
}

#[derive(Serialize)]
struct AuthPayload<'a> {
    user: &'a str,
    pass: &'a str,
    accept: &'a [String],
}

/// Applet credentials plus the tags it accepts messages for
///
/// Serializes to `{"t":"authapp","p":{"user":..,"pass":..,"accept":[..]}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppletAuth {
    user: String,
    pass: String,
    accept: Vec<String>,
}

impl AppletAuth {
    pub fn new(user: impl Into<String>, pass: impl Into<String>, accept: Vec<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
            accept,
        }
    }

    /// Serialized auth request
    pub fn to_json(&self) -> Result<String> {
        let request = AuthRequest {
            t: AUTH_MESSAGE_TYPE,
            p: AuthPayload {
                user: &self.user,
                pass: &self.pass,
                accept: &self.accept,
            },
        };
        Ok(serde_json::to_string(&request)?)
    }
}

#[async_trait]
impl AuthProvider for AppletAuth {
    async fn auth_message(&self) -> Result<Option<Frame>> {
        Ok(Some(Frame::Text(self.to_json()?)))
    }
}
