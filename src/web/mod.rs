use std::{
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info};

use crate::{
    config::SimulationConfig,
    daisy::DaisyColor,
    engine::{Engine, EngineBuilder, EngineError, EngineSettings, TickSummary},
    grid::Cell,
    world::{GlobalStats, World, WorldSnapshot},
};

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<Engine>>,
    broadcaster: broadcast::Sender<String>,
    simulation_done: Arc<AtomicBool>,
}

pub struct WebServerConfig {
    pub config: SimulationConfig,
    /// Stop stepping after this many ticks; `None` runs until shutdown.
    pub ticks: Option<u64>,
    pub tick_interval: Duration,
    pub snapshot_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("engine lock poisoned")]
    LockPoisoned,
    #[error("simulation has not been set up")]
    NotSetUp,
    #[error("patch ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(Cell),
    #[error("patch ({}, {}) is already occupied", .0.x, .0.y)]
    Occupied(Cell),
    #[error("patch ({}, {}) has no daisy", .0.x, .0.y)]
    Empty(Cell),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::LockPoisoned | ApiError::NotSetUp => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::OutOfBounds(_) | ApiError::Empty(_) => StatusCode::NOT_FOUND,
            ApiError::Occupied(_) => StatusCode::CONFLICT,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub async fn run(server: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        config,
        ticks,
        tick_interval,
        snapshot_dir,
        host,
        port,
    } = server;

    let mut engine = EngineBuilder::new(EngineSettings { snapshot_dir })
        .with_daisyworld_systems()
        .build();
    engine.setup(&config)?;

    let (tx, _) = broadcast::channel::<String>(512);
    let state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        broadcaster: tx,
        simulation_done: Arc::new(AtomicBool::new(false)),
    };

    let sim_handle = tokio::spawn(drive_simulation(state.clone(), ticks, tick_interval));

    let router = Router::new()
        .route("/api/stats", get(latest_stats))
        .route("/api/snapshot", get(world_snapshot))
        .route("/api/patches/:x/:y", get(patch))
        .route(
            "/api/patches/:x/:y/daisy",
            put(place_daisy).delete(remove_daisy),
        )
        .route("/api/events", get(stream_events))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, run = %config.name, "daisyworld web surface listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sim_handle.abort();
    Ok(())
}

async fn drive_simulation(state: AppState, ticks: Option<u64>, interval: Duration) {
    let mut timer = tokio::time::interval(interval);
    let mut completed = 0_u64;
    while ticks.map_or(true, |limit| completed < limit) {
        timer.tick().await;
        let Some(summary) = step_locked(&state.engine) else {
            error!("engine lock poisoned, stopping simulation");
            break;
        };
        match summary {
            Ok(summary) => {
                completed += 1;
                if let Ok(payload) = serde_json::to_string(&summary) {
                    let _ = state.broadcaster.send(payload);
                }
            }
            Err(err) => {
                error!(%err, "simulation step failed");
                break;
            }
        }
    }
    state.simulation_done.store(true, Ordering::SeqCst);
    info!(ticks = completed, "simulation loop finished");
}

fn step_locked(engine: &Mutex<Engine>) -> Option<Result<TickSummary, EngineError>> {
    let mut engine = engine.lock().ok()?;
    Some(engine.step())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down web surface");
}

fn with_engine<T>(
    state: &AppState,
    f: impl FnOnce(&mut Engine) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let mut engine = state.engine.lock().map_err(|_| ApiError::LockPoisoned)?;
    f(&mut *engine)
}

fn with_world<T>(
    state: &AppState,
    f: impl FnOnce(&mut World) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    with_engine(state, |engine| {
        let world = engine.world_mut().ok_or(ApiError::NotSetUp)?;
        f(world)
    })
}

#[derive(Serialize)]
struct StatsResponse {
    name: String,
    solar_luminosity: f64,
    completed: bool,
    #[serde(flatten)]
    stats: GlobalStats,
}

async fn latest_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let completed = state.simulation_done.load(Ordering::SeqCst);
    let response = with_engine(&state, |engine| {
        let name = engine.name().unwrap_or_default().to_string();
        let world = engine.world().ok_or(ApiError::NotSetUp)?;
        Ok(StatsResponse {
            name,
            solar_luminosity: world.solar_luminosity(),
            completed,
            stats: world.global_stats(),
        })
    })?;
    Ok(Json(response))
}

async fn world_snapshot(State(state): State<AppState>) -> Result<Json<WorldSnapshot>, ApiError> {
    let snapshot = with_engine(&state, |engine| {
        let name = engine.name().unwrap_or_default().to_string();
        let world = engine.world().ok_or(ApiError::NotSetUp)?;
        Ok(world.snapshot(&name))
    })?;
    Ok(Json(snapshot))
}

#[derive(Serialize)]
struct PatchResponse {
    x: u32,
    y: u32,
    temperature: f64,
    occupant: Option<DaisyColor>,
}

async fn patch(
    Path((x, y)): Path<(u32, u32)>,
    State(state): State<AppState>,
) -> Result<Json<PatchResponse>, ApiError> {
    let cell = Cell::new(x, y);
    let response = with_world(&state, |world| {
        let temperature = world
            .patch_temperature(cell)
            .ok_or(ApiError::OutOfBounds(cell))?;
        Ok(PatchResponse {
            x,
            y,
            temperature,
            occupant: world.occupant(cell),
        })
    })?;
    Ok(Json(response))
}

#[derive(Deserialize)]
struct PlaceRequest {
    color: DaisyColor,
}

async fn place_daisy(
    Path((x, y)): Path<(u32, u32)>,
    State(state): State<AppState>,
    Json(request): Json<PlaceRequest>,
) -> Result<StatusCode, ApiError> {
    let cell = Cell::new(x, y);
    with_world(&state, |world| {
        if !world.contains(cell) {
            return Err(ApiError::OutOfBounds(cell));
        }
        if world.place_daisy(cell, request.color) {
            Ok(StatusCode::CREATED)
        } else {
            Err(ApiError::Occupied(cell))
        }
    })
}

async fn remove_daisy(
    Path((x, y)): Path<(u32, u32)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let cell = Cell::new(x, y);
    with_world(&state, |world| {
        if !world.contains(cell) {
            return Err(ApiError::OutOfBounds(cell));
        }
        if world.remove_daisy(cell) {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(ApiError::Empty(cell))
        }
    })
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;
    use crate::config::GridConfig;

    fn state() -> AppState {
        let mut engine = EngineBuilder::new(EngineSettings::default())
            .with_daisyworld_systems()
            .build();
        let config = SimulationConfig {
            grid: GridConfig {
                width: 4,
                height: 4,
            },
            start_percent_blacks: 0.0,
            start_percent_whites: 0.0,
            ..SimulationConfig::default()
        };
        engine.setup(&config).unwrap();
        let (tx, _) = broadcast::channel(4);
        AppState {
            engine: Arc::new(Mutex::new(engine)),
            broadcaster: tx,
            simulation_done: Arc::new(AtomicBool::new(false)),
        }
    }

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    fn status<T>(result: Result<T, ApiError>) -> StatusCode
    where
        T: IntoResponse,
    {
        match result {
            Ok(body) => body.into_response().status(),
            Err(err) => err.into_response().status(),
        }
    }

    fn place(state: &AppState, x: u32, y: u32, color: DaisyColor) -> StatusCode {
        status(block_on(place_daisy(
            Path((x, y)),
            State(state.clone()),
            Json(PlaceRequest { color }),
        )))
    }

    fn remove(state: &AppState, x: u32, y: u32) -> StatusCode {
        status(block_on(remove_daisy(Path((x, y)), State(state.clone()))))
    }

    #[test]
    fn placing_on_occupied_patch_conflicts() {
        let state = state();
        assert_eq!(place(&state, 1, 2, DaisyColor::White), StatusCode::CREATED);
        assert_eq!(place(&state, 1, 2, DaisyColor::Black), StatusCode::CONFLICT);

        let occupant = block_on(patch(Path((1, 2)), State(state.clone())))
            .map(|Json(body)| body.occupant)
            .ok()
            .flatten();
        assert_eq!(occupant, Some(DaisyColor::White));
    }

    #[test]
    fn removing_from_empty_patch_is_not_found() {
        let state = state();
        assert_eq!(remove(&state, 0, 0), StatusCode::NOT_FOUND);
        assert_eq!(place(&state, 0, 0, DaisyColor::Black), StatusCode::CREATED);
        assert_eq!(remove(&state, 0, 0), StatusCode::NO_CONTENT);
        assert_eq!(remove(&state, 0, 0), StatusCode::NOT_FOUND);
    }

    #[test]
    fn off_grid_patches_are_not_found() {
        let state = state();
        assert_eq!(place(&state, 4, 0, DaisyColor::Black), StatusCode::NOT_FOUND);
        assert_eq!(remove(&state, 0, 9), StatusCode::NOT_FOUND);
        assert_eq!(
            status(block_on(patch(Path((7, 7)), State(state.clone())))),
            StatusCode::NOT_FOUND
        );
    }
}
