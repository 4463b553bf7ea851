use std::time::Duration;

use tracing::{debug, info, warn};

use crate::logger::{logged_get, ResponseLogger};
use crate::protocol::{parse_home_id, parse_temperature_unit, Endpoints};
use crate::storage::Storage;
use crate::transport::Transport;
use crate::types::SessionInfo;
use crate::{Error, Result};

pub const SESSION_KEY: &str = "Tado_API";

/// Delay between attempts to read the home's temperature unit.
pub const UNIT_RETRY: Duration = Duration::from_secs(30);

/// Returns the persisted session, or fetches and persists one.
///
/// Network failures are retried forever: the home id step waits `home_retry`
/// between attempts, the unit step waits [`UNIT_RETRY`]. Only storage errors
/// are returned.
pub(crate) async fn ensure_session<T, S>(
    transport: &T,
    storage: &mut S,
    mut logger: Option<&mut ResponseLogger>,
    endpoints: &Endpoints,
    home_retry: Duration,
) -> Result<SessionInfo>
where
    T: Transport,
    S: Storage,
{
    if let Some(stored) = storage.get(SESSION_KEY)? {
        match serde_json::from_value::<SessionInfo>(stored) {
            Ok(session) => {
                debug!(home_id = session.home_id, "session restored from storage");
                return Ok(session);
            }
            Err(e) => warn!("ignoring unreadable stored session: {e}"),
        }
    }

    info!("requesting session information from tado");

    let home_id = loop {
        match logged_get(transport, logger.as_deref_mut(), "me", &endpoints.me())
            .await
            .and_then(|body| parse_home_id(&body))
        {
            Ok(home_id) => break home_id,
            Err(e) => retry_after("home id", home_retry, &e).await,
        }
    };

    let temperature_unit = loop {
        match logged_get(transport, logger.as_deref_mut(), "home", &endpoints.home(home_id))
            .await
            .and_then(|body| parse_temperature_unit(&body))
        {
            Ok(unit) => break unit,
            Err(e) => retry_after("temperature unit", UNIT_RETRY, &e).await,
        }
    };

    let session = SessionInfo {
        home_id,
        temperature_unit,
    };
    let value = serde_json::to_value(&session).map_err(|e| Error::Storage(e.to_string()))?;
    storage.set(SESSION_KEY, value)?;
    info!(home_id, unit = ?temperature_unit, "session stored");
    Ok(session)
}

async fn retry_after(step: &str, delay: Duration, err: &Error) {
    warn!(kind = ?err.kind(), "failed to fetch {step}, retrying in {}s: {err}", delay.as_secs());
    tokio::time::sleep(delay).await;
}
