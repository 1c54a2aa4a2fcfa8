//! Player resolution: raw game identity → durable player id.
//!
//! Normalizes identifiers, validates names, and upserts through the player
//! repository using `(uniqueId, game)` as the natural key. Concurrent
//! requests for the same key are coalesced onto one in-flight upsert so
//! racing connects cannot create duplicate players.

use crate::error::{CoreError, CoreResult};
use crate::repository::{NewPlayer, PlayerRepository};
use crate::steam::{bot_unique_id, is_bot_id, normalize_steam_id, sanitize_player_name};
use futures::future::{BoxFuture, FutureExt, Shared};
use scorekeep_event_system::{PlayerId, ServerId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

type CoalesceKey = (String, String);
type SharedResolve = Shared<BoxFuture<'static, Result<PlayerId, CoreError>>>;

/// How long a completed entry lingers in the coalescing map, letting
/// stragglers of the same burst share the result.
const SUCCESS_EVICTION: Duration = Duration::from_secs(1);

pub struct PlayerResolver {
    players: Arc<dyn PlayerRepository>,
    in_flight: Arc<Mutex<HashMap<CoalesceKey, SharedResolve>>>,
}

impl PlayerResolver {
    pub fn new(players: Arc<dyn PlayerRepository>) -> Self {
        Self {
            players,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolves a raw identity to a durable player id, creating the player
    /// if needed.
    ///
    /// `server_id` is required to disambiguate bots: their durable identity
    /// is `BOT_<server>_<sanitized-name>` while real players normalize to
    /// the canonical 64-bit Steam id.
    pub async fn get_or_create_player(
        &self,
        raw_steam_id: &str,
        player_name: &str,
        game: &str,
        server_id: Option<ServerId>,
    ) -> CoreResult<PlayerId> {
        let name = sanitize_player_name(player_name)?;
        let effective_id = if is_bot_id(raw_steam_id) {
            let server_id = server_id.ok_or_else(|| {
                CoreError::validation("bot identity requires a server context")
            })?;
            bot_unique_id(server_id, &name)
        } else {
            normalize_steam_id(raw_steam_id)?
        };

        let key = (effective_id.clone(), game.to_string());
        let (future, created_here) = self.join_or_start(key.clone(), effective_id, name);
        let result = future.await;

        // Only the task that created the entry manages its eviction:
        // failures leave immediately, successes linger briefly so a burst
        // of identical connects shares the one upsert.
        if created_here {
            match &result {
                Ok(_) => {
                    let in_flight = Arc::clone(&self.in_flight);
                    tokio::spawn(async move {
                        tokio::time::sleep(SUCCESS_EVICTION).await;
                        in_flight.lock().unwrap().remove(&key);
                    });
                }
                Err(_) => {
                    self.in_flight.lock().unwrap().remove(&key);
                }
            }
        }
        result
    }

    fn join_or_start(
        &self,
        key: CoalesceKey,
        effective_id: String,
        name: String,
    ) -> (SharedResolve, bool) {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(existing) = in_flight.get(&key) {
            debug!("Coalescing player resolution for {}/{}", key.0, key.1);
            return (existing.clone(), false);
        }

        let players = Arc::clone(&self.players);
        let game = key.1.clone();
        let future: SharedResolve = async move {
            players
                .upsert_player(NewPlayer {
                    last_name: name,
                    game,
                    unique_id: effective_id,
                })
                .await
        }
        .boxed()
        .shared();

        in_flight.insert(key, future.clone());
        (future, true)
    }

    /// Current number of in-flight (or recently completed) resolutions.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}
