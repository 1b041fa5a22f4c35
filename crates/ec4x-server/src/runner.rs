//! The autonomous turn loop.
//!
//! Each poll tick, for every unfinished game: drain order uploads from the
//! relay into the inbox, advance the turn when every live house has
//! submitted (or the poll deadline passes with at least one packet
//! waiting), persist the committed turn, and publish per-house deltas.
//! Shutdown is only observed between turns, so a turn is never abandoned
//! half-resolved.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use ec4x_core::GameState;
use ec4x_rules::RuleSnapshot;
use ec4x_transport::{
    KIND_FULL_STATE, KIND_ORDER_PACKET, KIND_TURN_DELTA, OrderSubscription, RelayClient,
    RelayEvent,
};
use ec4x_types::ids::HouseId;
use ec4x_types::orders::CommandPacket;
use ec4x_types::player_state::PlayerState;

use crate::error::ServerError;
use crate::inbox::PacketInbox;

/// One game under management.
struct ManagedGame {
    id: Uuid,
    state: GameState,
    snapshot: RuleSnapshot,
    inbox: PacketInbox,
    orders: OrderSubscription,
    /// Last projection sent per house, for delta extraction.
    projections: BTreeMap<HouseId, PlayerState>,
    /// Whether the full state has been published at least once.
    published_full: bool,
}

/// Run the turn loop until ctrl-c.
///
/// # Errors
///
/// Returns [`ServerError`] on unrecoverable persistence or relay
/// failures. Engine invariant violations are logged and leave the game on
/// its last good turn; the loop continues with other games.
pub async fn run_loop(
    db: &ec4x_db::PostgresPool,
    relay: &RelayClient,
    server_secret: [u8; 32],
    poll: Duration,
) -> Result<(), ServerError> {
    let game_store = ec4x_db::GameStore::new(db.pool());
    let state_store = ec4x_db::StateStore::new(db.pool());

    let mut games: Vec<ManagedGame> = Vec::new();
    for row in game_store.list_games().await? {
        let snapshot: RuleSnapshot = serde_json::from_value(row.config_json.clone())
            .map_err(ec4x_db::DbError::Serialization)?;
        let state = state_store.load_latest(row.id).await?;
        if state.finished {
            continue;
        }
        let orders = relay.subscribe_orders(row.id).await?;
        info!(game = %row.id, turn = state.turn, "game loaded");
        games.push(ManagedGame {
            id: row.id,
            state,
            snapshot,
            inbox: PacketInbox::new(),
            orders,
            projections: BTreeMap::new(),
            published_full: false,
        });
    }
    info!(games = games.len(), poll_secs = poll.as_secs(), "turn loop started");

    let mut ticker = tokio::time::interval(poll);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        for game in &mut games {
            if game.state.finished {
                continue;
            }
            drain_orders(game, &server_secret);
            let live = game.state.live_houses();
            let should_advance = game.inbox.all_in(&live) || game.inbox.any();
            if !should_advance && game.published_full {
                continue;
            }
            if let Err(err) = step_game(game, &game_store, &state_store, relay).await {
                match err {
                    ServerError::Engine(ref engine_err) => {
                        warn!(game = %game.id, %engine_err, "turn aborted; game held");
                    }
                    other => return Err(other),
                }
            }
        }
    }
}

/// Pull buffered order uploads into the inbox.
fn drain_orders(game: &mut ManagedGame, server_secret: &[u8; 32]) {
    for event in game.orders.drain_buffered() {
        if event.kind != KIND_ORDER_PACKET || event.game_id != game.id {
            continue;
        }
        let plaintext = match ec4x_transport::decrypt(&event.envelope, server_secret) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                warn!(game = %game.id, %err, "dropping undecryptable order envelope");
                continue;
            }
        };
        let packet: CommandPacket = match ec4x_transport::decode_payload(&plaintext) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(game = %game.id, %err, "dropping undecodable order packet");
                continue;
            }
        };
        let expected_turn = game.state.turn.saturating_add(1);
        if packet.turn != expected_turn {
            warn!(
                game = %game.id,
                house = %packet.house,
                packet_turn = packet.turn,
                expected_turn,
                "dropping stale order packet"
            );
            continue;
        }
        game.inbox.deposit(packet);
    }
}

/// Advance one game a turn, persist it, and publish per-house updates.
async fn step_game(
    game: &mut ManagedGame,
    game_store: &ec4x_db::GameStore<'_>,
    state_store: &ec4x_db::StateStore<'_>,
    relay: &RelayClient,
) -> Result<(), ServerError> {
    let packets = game.inbox.drain();
    let outcome = ec4x_core::advance_turn(&mut game.state, &game.snapshot, &packets)?;

    state_store
        .save_turn(game.id, &game.state, &outcome.events)
        .await?;
    game_store.set_turn(game.id, game.state.turn).await?;
    info!(game = %game.id, turn = outcome.turn, events = outcome.events.len(), "turn committed");

    publish_updates(game, relay, &outcome.events).await?;
    game.published_full = true;
    Ok(())
}

/// Project, diff, seal, and publish an update for every live house with a
/// registered transport key.
async fn publish_updates(
    game: &mut ManagedGame,
    relay: &RelayClient,
    events: &[ec4x_types::events::GameEvent],
) -> Result<(), ServerError> {
    for house_id in game.state.live_houses() {
        let pubkey_hex = game
            .state
            .houses
            .get(&house_id)
            .map(|house| house.transport_pubkey.clone())
            .unwrap_or_default();
        if pubkey_hex.is_empty() {
            continue;
        }
        let Ok(pubkey) = ec4x_transport::parse_key(&pubkey_hex) else {
            warn!(game = %game.id, %house_id, "house has an unparseable transport key");
            continue;
        };

        let next = ec4x_core::player_state(&game.state, house_id, events);
        let (kind, payload) = match game.projections.get(&house_id) {
            Some(previous) => {
                let delta = ec4x_core::diff_player_states(previous, &next);
                (KIND_TURN_DELTA, ec4x_transport::encode_payload(&delta)?)
            }
            None => (KIND_FULL_STATE, ec4x_transport::encode_payload(&next)?),
        };
        let envelope = ec4x_transport::encrypt(&payload, &pubkey)?;
        relay
            .publish_state(&RelayEvent {
                kind,
                game_id: game.id,
                turn: game.state.turn,
                pubkey: pubkey_hex,
                envelope,
            })
            .await?;
        game.projections.insert(house_id, next);
    }
    relay.flush().await?;
    Ok(())
}
