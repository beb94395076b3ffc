use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;
use warp::http::StatusCode;

use crate::ai::MoveProvider;
use crate::auth::AuthService;
use crate::broadcaster::Broadcaster;
use crate::errors::ServiceError;
use crate::game_manager::{GameManager, ManagerTimeouts};
use crate::presence::PresenceRegistry;
use crate::stats::StatsService;
use crate::websocket::{ConnectionManager, RateLimit};
use game_persistence::{FallbackStatsSource, GameStore, StatsSource};
use game_types::{RankingSort, UserId};

pub mod ai;
pub mod auth;
pub mod broadcaster;
pub mod config;
pub mod errors;
pub mod game_manager;
pub mod matchmaking;
pub mod pending;
pub mod presence;
pub mod stats;
pub mod websocket;

#[derive(Deserialize)]
struct RankingsQuery {
    sort_by: Option<RankingSort>,
}

#[derive(Serialize)]
struct OnlineUsersResponse {
    online_users: Vec<UserId>,
    count: u32,
}

/// Wires the stores, broadcaster and game manager together. `secondary`
/// answers stats reads while the store cannot.
pub fn build_game_manager<S>(
    store: Arc<S>,
    secondary: Arc<dyn StatsSource>,
    connection_manager: Arc<ConnectionManager>,
    ai: Arc<dyn MoveProvider>,
    timeouts: ManagerTimeouts,
) -> Arc<GameManager>
where
    S: GameStore + 'static,
{
    let primary: Arc<dyn StatsSource> = store.clone();
    let store: Arc<dyn GameStore> = store;
    let stats = Arc::new(StatsService::new(
        store.clone(),
        FallbackStatsSource::new(primary, secondary),
    ));
    let broadcaster = Arc::new(Broadcaster::new(
        connection_manager,
        Arc::new(PresenceRegistry::new()),
    ));
    Arc::new(GameManager::new(store, stats, broadcaster, ai, timeouts))
}

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    game_manager: Arc<GameManager>,
    auth_service: Arc<AuthService>,
    rate_limit: RateLimit,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let game_manager_filter = warp::any().map({
        let game_manager = game_manager.clone();
        move || game_manager.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter)
        .and(game_manager_filter.clone())
        .and(auth_filter)
        .map(move |ws: warp::ws::Ws, conn_mgr, game_mgr, auth| {
            ws.on_upgrade(move |socket| {
                websocket::handle_connection(socket, conn_mgr, game_mgr, auth, rate_limit)
            })
        });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let game = warp::path!("game" / String)
        .and(warp::get())
        .and(game_manager_filter.clone())
        .and_then(handle_game_request);

    let game_moves = warp::path!("game" / String / "moves")
        .and(warp::get())
        .and(game_manager_filter.clone())
        .and_then(handle_game_moves_request);

    let user_stats = warp::path!("user" / Uuid / "stats")
        .and(warp::get())
        .and(game_manager_filter.clone())
        .then(|user_id: Uuid, games: Arc<GameManager>| async move {
            warp::reply::json(&games.stats().get_user_stats(user_id).await)
        });

    let online_stats = warp::path!("user" / Uuid / "online-stats")
        .and(warp::get())
        .and(game_manager_filter.clone())
        .then(|user_id: Uuid, games: Arc<GameManager>| async move {
            warp::reply::json(&games.stats().get_online_game_stats(user_id).await)
        });

    let achievements = warp::path!("user" / Uuid / "achievements")
        .and(warp::get())
        .and(game_manager_filter.clone())
        .then(|user_id: Uuid, games: Arc<GameManager>| async move {
            warp::reply::json(&games.stats().get_user_achievements(user_id).await)
        });

    let themes = warp::path!("user" / Uuid / "themes")
        .and(warp::get())
        .and(game_manager_filter.clone())
        .then(|user_id: Uuid, games: Arc<GameManager>| async move {
            warp::reply::json(&games.stats().get_user_themes(user_id).await)
        });

    let blocked = warp::path!("user" / Uuid / "blocked")
        .and(warp::get())
        .and(game_manager_filter.clone())
        .and_then(handle_blocked_request);

    let rankings = warp::path("rankings")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<RankingsQuery>())
        .and(game_manager_filter.clone())
        .then(|query: RankingsQuery, games: Arc<GameManager>| async move {
            let sort_by = query.sort_by.unwrap_or_default();
            warp::reply::json(&games.stats().get_player_rankings(sort_by).await)
        });

    let room = warp::path!("room" / String)
        .and(warp::get())
        .and(game_manager_filter.clone())
        .and_then(handle_room_request);

    let queue = warp::path("queue")
        .and(warp::path::end())
        .and(warp::get())
        .and(game_manager_filter.clone())
        .then(|games: Arc<GameManager>| async move {
            warp::reply::json(&games.queue_stats().await)
        });

    let online = warp::path("online")
        .and(warp::path::end())
        .and(warp::get())
        .and(game_manager_filter)
        .map(|games: Arc<GameManager>| {
            let snapshot = games.broadcaster().presence().snapshot();
            warp::reply::json(&OnlineUsersResponse {
                count: snapshot.online_users.len() as u32,
                online_users: snapshot.online_users,
            })
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .or(game)
        .or(game_moves)
        .or(user_stats)
        .or(online_stats)
        .or(achievements)
        .or(themes)
        .or(blocked)
        .or(rankings)
        .or(room)
        .or(queue)
        .or(online)
        .with(cors)
        .with(warp::log("grid_arena"))
}

fn error_reply(message: &str, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        status,
    )
}

async fn handle_game_request(
    game_id: String,
    game_manager: Arc<GameManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Ok(game_id) = Uuid::parse_str(&game_id) else {
        return Ok(error_reply("Invalid game ID format", StatusCode::BAD_REQUEST));
    };

    match game_manager.get_game(game_id).await {
        Ok(Some(game)) => Ok(warp::reply::with_status(
            warp::reply::json(&game),
            StatusCode::OK,
        )),
        Ok(None) => Ok(error_reply("Game not found", StatusCode::NOT_FOUND)),
        Err(e) => {
            tracing::error!("Failed to fetch game {}: {}", game_id, e);
            Ok(error_reply(
                "Game storage unavailable",
                StatusCode::SERVICE_UNAVAILABLE,
            ))
        }
    }
}

async fn handle_room_request(
    code: String,
    game_manager: Arc<GameManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match game_manager.find_room(&code).await {
        Ok(Some(details)) => Ok(warp::reply::with_status(
            warp::reply::json(&details),
            StatusCode::OK,
        )),
        Ok(None) => Ok(error_reply("Room not found", StatusCode::NOT_FOUND)),
        Err(ServiceError::Rejected(e)) => Ok(error_reply(&e.to_string(), StatusCode::BAD_REQUEST)),
        Err(e) => {
            tracing::error!("Failed to look up room {}: {}", code, e);
            Ok(error_reply(
                "Room storage unavailable",
                StatusCode::SERVICE_UNAVAILABLE,
            ))
        }
    }
}

async fn handle_blocked_request(
    user_id: Uuid,
    game_manager: Arc<GameManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match game_manager.blocked_users(user_id).await {
        Ok(blocked) => Ok(warp::reply::with_status(
            warp::reply::json(&blocked),
            StatusCode::OK,
        )),
        Err(e) => {
            tracing::error!("Failed to list blocks of {}: {}", user_id, e);
            Ok(error_reply(
                "User storage unavailable",
                StatusCode::SERVICE_UNAVAILABLE,
            ))
        }
    }
}

async fn handle_game_moves_request(
    game_id: String,
    game_manager: Arc<GameManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Ok(game_id) = Uuid::parse_str(&game_id) else {
        return Ok(error_reply("Invalid game ID format", StatusCode::BAD_REQUEST));
    };

    match game_manager.get_game_moves(game_id).await {
        Ok(moves) => Ok(warp::reply::with_status(
            warp::reply::json(&moves),
            StatusCode::OK,
        )),
        Err(e) => {
            tracing::error!("Failed to fetch moves of game {}: {}", game_id, e);
            Ok(error_reply(
                "Game storage unavailable",
                StatusCode::SERVICE_UNAVAILABLE,
            ))
        }
    }
}
