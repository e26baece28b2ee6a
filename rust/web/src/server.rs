use crate::errors::handle_rejection;
use crate::events::EventBus;
use crate::handlers;
use crate::middleware::with_request_logging;
use crate::settings::AppSettings;
use holdem_engine::events::Notifier;
use holdem_engine::lobby::Lobby;
use holdem_engine::table::TableConfig;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;
use warp::filters::BoxedFilter;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    event_bus: Arc<EventBus>,
    lobby: Arc<Lobby>,
}

impl AppContext {
    pub fn new(config: ServerConfig, table: TableConfig) -> Self {
        let event_bus = Arc::new(EventBus::new());
        let notifier: Arc<dyn Notifier> = event_bus.clone();
        let lobby = Arc::new(Lobby::new(table, notifier));
        Self::new_with_dependencies(config, event_bus, lobby)
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        let event_bus = Arc::new(EventBus::new());
        let notifier: Arc<dyn Notifier> = event_bus.clone();
        let mut lobby = Lobby::new(settings.table.clone(), notifier);
        if let Some(seed) = settings.deck_seed {
            lobby = lobby.with_deck_seed(seed);
        }
        Self::new_with_dependencies(settings.server_config(), event_bus, Arc::new(lobby))
    }

    /// The lobby must deliver through `event_bus` for SSE clients to see
    /// anything.
    pub fn new_with_dependencies(
        config: ServerConfig,
        event_bus: Arc<EventBus>,
        lobby: Arc<Lobby>,
    ) -> Self {
        Self {
            config,
            event_bus,
            lobby,
        }
    }

    pub fn new_for_tests() -> Self {
        Self::new(ServerConfig::for_tests(), TableConfig::default())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn lobby(&self) -> Arc<Lobby> {
        Arc::clone(&self.lobby)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            context: AppContext::from_settings(settings),
        }
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes(&context))
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        info!(%addr, "holdem server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, context))
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(io_err) = err
            .source()
            .and_then(|source| source.downcast_ref::<std::io::Error>())
        {
            return ServerError::BindError(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }

        ServerError::ConfigError(err.to_string())
    }
}

/// Every HTTP route, with rejections rendered as JSON errors.
pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let routes = health_route()
        .or(room_routes(context))
        .unify()
        .or(player_routes(context))
        .unify()
        .or(sse_route(context))
        .unify()
        .recover(handle_rejection)
        .unify()
        .boxed();
    with_request_logging(routes)
}

fn health_route() -> BoxedFilter<(Response,)> {
    warp::path("health")
        .and(warp::get())
        .and(warp::path::end())
        .map(|| handlers::health().into_response())
        .boxed()
}

fn room_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let lobby = context.lobby();

    let create = warp::path!("api" / "rooms")
        .and(warp::post())
        .and(with_lobby(lobby.clone()))
        .and(json_body())
        .and_then(
            |lobby: Arc<Lobby>, request: handlers::CreateRoomRequest| async move {
                Ok::<_, Infallible>(handlers::create_room(lobby, request).await)
            },
        );

    let show = warp::path!("api" / "rooms" / String)
        .and(warp::get())
        .and(with_lobby(lobby.clone()))
        .and_then(|code: String, lobby: Arc<Lobby>| async move {
            Ok::<_, Infallible>(handlers::get_room(lobby, code).await)
        });

    let start = warp::path!("api" / "rooms" / String / "start")
        .and(warp::post())
        .and(with_lobby(lobby.clone()))
        .and_then(|code: String, lobby: Arc<Lobby>| async move {
            Ok::<_, Infallible>(handlers::start_hand(lobby, code).await)
        });

    let actions = warp::path!("api" / "rooms" / String / "actions")
        .and(warp::post())
        .and(with_lobby(lobby.clone()))
        .and(json_body())
        .and_then(
            |code: String, lobby: Arc<Lobby>, request: handlers::ActionBody| async move {
                Ok::<_, Infallible>(handlers::submit_action(lobby, code, request).await)
            },
        );

    let winners = warp::path!("api" / "rooms" / String / "winners")
        .and(warp::post())
        .and(with_lobby(lobby))
        .and(json_body())
        .and_then(
            |code: String, lobby: Arc<Lobby>, request: handlers::ChooseWinnersRequest| async move {
                Ok::<_, Infallible>(handlers::choose_winners(lobby, code, request).await)
            },
        );

    create
        .or(show)
        .unify()
        .or(start)
        .unify()
        .or(actions)
        .unify()
        .or(winners)
        .unify()
        .boxed()
}

fn player_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let lobby = context.lobby();

    let join = warp::path!("api" / "rooms" / String / "players")
        .and(warp::post())
        .and(with_lobby(lobby.clone()))
        .and(json_body())
        .and_then(
            |code: String, lobby: Arc<Lobby>, request: handlers::JoinRoomRequest| async move {
                Ok::<_, Infallible>(handlers::join_room(lobby, code, request).await)
            },
        );

    let rejoin = warp::path!("api" / "rooms" / String / "players" / String / "rejoin")
        .and(warp::post())
        .and(with_lobby(lobby.clone()))
        .and_then(
            |code: String, player_id: String, lobby: Arc<Lobby>| async move {
                Ok::<_, Infallible>(handlers::rejoin_room(lobby, code, player_id).await)
            },
        );

    let leave = warp::path!("api" / "rooms" / String / "players" / String)
        .and(warp::delete())
        .and(with_lobby(lobby))
        .and_then(
            |code: String, player_id: String, lobby: Arc<Lobby>| async move {
                Ok::<_, Infallible>(handlers::leave_room(lobby, code, player_id).await)
            },
        );

    join.or(rejoin).unify().or(leave).unify().boxed()
}

fn sse_route(context: &AppContext) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "rooms" / String / "events")
        .and(warp::get())
        .and(warp::query::<handlers::EventsQuery>())
        .and(with_lobby(context.lobby()))
        .and(with_event_bus(context.event_bus()))
        .and_then(
            |code: String,
             query: handlers::EventsQuery,
             lobby: Arc<Lobby>,
             event_bus: Arc<EventBus>| async move {
                Ok::<_, Infallible>(handlers::stream_events(code, query, lobby, event_bus).await)
            },
        )
        .boxed()
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with_lobby(
    lobby: Arc<Lobby>,
) -> impl Filter<Extract = (Arc<Lobby>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&lobby))
}

fn with_event_bus(
    event_bus: Arc<EventBus>,
) -> impl Filter<Extract = (Arc<EventBus>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&event_bus))
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        info!(addr = %self.addr, "holdem server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
