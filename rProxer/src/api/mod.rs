//! API modules.

pub mod de;
mod envelope;
mod info;
mod messenger;
mod notification;
mod ucp;
mod user;

pub use envelope::{parse_data, parse_unit, ApiResponse};
pub use info::InfoApi;
pub use messenger::MessengerApi;
pub use notification::NotificationApi;
pub use ucp::UcpApi;
pub use user::UserApi;

use serde::de::DeserializeOwned;

use crate::client::Request;
use crate::error::Result;
use crate::session::SessionInner;

/// Send a versioned API request and unwrap its envelope.
pub(crate) async fn fetch<T: DeserializeOwned>(session: &SessionInner, request: Request) -> Result<T> {
    parse_data(&session.send(&request).await?)
}

/// Send a versioned API request that answers without payload.
pub(crate) async fn fetch_unit(session: &SessionInner, request: Request) -> Result<()> {
    parse_unit(&session.send(&request).await?)
}
