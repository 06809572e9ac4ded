//! Single binary web server: JSON API over the bracket engine.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default so the app is reachable via DNS on a VPS.
//! Override with env: HOST (e.g. 0.0.0.0), PORT (e.g. 8080).

use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use court_bracket::{
    bracket_view, confirm_match, end_set, koth, score_point, start_tournament, MemoryStore,
    RuleConfig, Side, Tournament, TournamentError, TournamentId, TournamentStatus, TournamentStore,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Shared store: many tournaments by id. Entries are removed after 12h inactivity.
type AppState = Data<MemoryStore>;

/// Inactivity threshold: tournaments not written to for this long are removed.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(12 * 3600);

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTournamentBody {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_format")]
    format_id: String,
    #[serde(default)]
    sport_id: Option<String>,
    /// Explicit rules win over the sport's defaults.
    #[serde(default)]
    rules: Option<RuleConfig>,
}

fn default_name() -> String {
    "Tournament".to_string()
}

fn default_format() -> String {
    "ko_8".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPlayerBody {
    name: String,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct ScoreBody {
    side: Side,
    #[serde(default = "default_delta")]
    delta: i32,
}

fn default_delta() -> i32 {
    1
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and player name
#[derive(Deserialize)]
struct TournamentPlayerPath {
    id: TournamentId,
    name: String,
}

/// Path segments: tournament id and match id (e.g. /api/tournaments/{id}/matches/r1m1)
#[derive(Deserialize)]
struct TournamentMatchPath {
    id: TournamentId,
    match_id: String,
}

/// Map an engine error to a JSON error response.
fn error_response(e: TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        TournamentError::NotFound(_) => HttpResponse::NotFound().json(body),
        TournamentError::Conflict | TournamentError::IntegrityViolation(_) => {
            log::warn!("Rejected write: {}", e);
            HttpResponse::Conflict().json(body)
        }
        TournamentError::Storage(_) => HttpResponse::InternalServerError().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

fn respond<T: serde::Serialize>(result: Result<T, TournamentError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "court-bracket",
    })
}

/// Create a new tournament (returns it with id; client stores id for subsequent requests).
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let body = body.into_inner();
    let result = (|| -> Result<Tournament, TournamentError> {
        let mut tournament = match &body.sport_id {
            Some(sport) => Tournament::for_sport(body.name.clone(), body.format_id.clone(), sport)?,
            None => Tournament::new(body.name.clone(), body.format_id.clone(), RuleConfig::default()),
        };
        if let Some(rules) = body.rules {
            tournament.set_rules(rules)?;
        }
        tournament.topology()?;
        state.insert_tournament(tournament.clone())?;
        log::info!("Created tournament {} ({})", tournament.id, tournament.config.format_id);
        Ok(tournament)
    })();
    respond(result)
}

/// Get a tournament by id (404 if not found).
#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.get_tournament(path.id))
}

/// Register a player (Draft; or Live for KOTH, where they join the queue).
#[post("/api/tournaments/{id}/players")]
async fn api_add_player(state: AppState, path: Path<TournamentPath>, body: Json<AddPlayerBody>) -> HttpResponse {
    let result = state.get_tournament(path.id).and_then(|t| {
        if t.status == TournamentStatus::Live {
            koth::join(state.get_ref(), path.id, &body.name, body.user_id.clone())?;
            state.get_tournament(path.id)
        } else {
            state.update_tournament(path.id, &mut |t: &mut Tournament| {
                t.add_player(body.name.trim(), body.user_id.clone()).map(|_| ())
            })
        }
    });
    respond(result)
}

/// Remove a player by name (Draft only).
#[delete("/api/tournaments/{id}/players/{name}")]
async fn api_remove_player(state: AppState, path: Path<TournamentPlayerPath>) -> HttpResponse {
    respond(state.update_tournament(path.id, &mut |t: &mut Tournament| t.remove_player(&path.name)))
}

/// Register players from a CSV roster body (`name[,userId]` per line).
#[post("/api/tournaments/{id}/roster")]
async fn api_import_roster(state: AppState, path: Path<TournamentPath>, body: String) -> HttpResponse {
    respond(state.update_tournament(path.id, &mut |t: &mut Tournament| {
        t.import_roster(body.as_bytes()).map(|added| {
            log::info!("Imported {} players into {}", added, t.id);
        })
    }))
}

/// Replace the rules (Draft only).
#[put("/api/tournaments/{id}/rules")]
async fn api_set_rules(state: AppState, path: Path<TournamentPath>, body: Json<RuleConfig>) -> HttpResponse {
    let rules = body.into_inner();
    respond(state.update_tournament(path.id, &mut |t: &mut Tournament| t.set_rules(rules)))
}

/// Close registration (Draft -> Locked).
#[post("/api/tournaments/{id}/lock")]
async fn api_lock_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.update_tournament(path.id, &mut |t: &mut Tournament| t.lock()))
}

/// Start the tournament: generate the bracket and resolve byes.
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(start_tournament(state.get_ref(), path.id))
}

/// All match records of a tournament.
#[get("/api/tournaments/{id}/matches")]
async fn api_list_matches(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.list_matches(path.id))
}

/// Bracket grouped by stage, each slot as unscheduled / awaiting players / scheduled.
#[get("/api/tournaments/{id}/bracket")]
async fn api_bracket(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let result = state.get_tournament(path.id).and_then(|t| {
        let topology = state.get_topology(&t.config.format_id)?;
        let matches: BTreeMap<_, _> = state
            .list_matches(path.id)?
            .into_iter()
            .map(|m| (m.match_id.clone(), m))
            .collect();
        Ok(bracket_view(&topology, &matches))
    });
    respond(result)
}

/// Add or remove points for one side of the set in play.
#[post("/api/tournaments/{id}/matches/{match_id}/score")]
async fn api_score(state: AppState, path: Path<TournamentMatchPath>, body: Json<ScoreBody>) -> HttpResponse {
    respond(score_point(state.get_ref(), path.id, &path.match_id, body.side, body.delta))
}

/// Close the set in play.
#[post("/api/tournaments/{id}/matches/{match_id}/end-set")]
async fn api_end_set(state: AppState, path: Path<TournamentMatchPath>) -> HttpResponse {
    let result = end_set(state.get_ref(), path.id, &path.match_id)
        .map(|(end, m)| serde_json::json!({ "end": end, "match": m }));
    respond(result)
}

/// Confirm the match winner and advance them.
#[post("/api/tournaments/{id}/matches/{match_id}/confirm")]
async fn api_confirm_match(state: AppState, path: Path<TournamentMatchPath>) -> HttpResponse {
    respond(confirm_match(state.get_ref(), path.id, &path.match_id))
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(MemoryStore::new());

    // Background task: every 30 minutes, remove tournaments inactive for 12+ hours
    let state_cleanup = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(30 * 60));
        loop {
            interval.tick().await;
            match state_cleanup.remove_inactive(INACTIVITY_TIMEOUT) {
                Ok(0) => {}
                Ok(removed) => {
                    log::info!("Cleaned up {} inactive tournament(s) (no activity for 12h)", removed)
                }
                Err(e) => log::warn!("Cleanup skipped: {}", e),
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_add_player)
            .service(api_remove_player)
            .service(api_import_roster)
            .service(api_set_rules)
            .service(api_lock_tournament)
            .service(api_start_tournament)
            .service(api_list_matches)
            .service(api_bracket)
            .service(api_score)
            .service(api_end_set)
            .service(api_confirm_match)
    })
    .bind(bind)?
    .run()
    .await
}
