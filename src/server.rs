//! TCP front end: the command session, the status stream and the model tick.

use crate::config::SimulatorConfig;
use crate::dispatcher::Dispatcher;
use crate::state::ArrayState;
use crate::telemetry::render_status;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot resolve listen address {0}")]
    Resolve(String),
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Listen on `addr` with an explicit accept backlog.
pub async fn bind_listener(addr: &str, backlog: u32) -> Result<TcpListener, ServerError> {
    let socket_addr = tokio::net::lookup_host(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_owned(),
            source,
        })?
        .next()
        .ok_or_else(|| ServerError::Resolve(addr.to_owned()))?;

    let bind = || -> io::Result<TcpListener> {
        let socket = match socket_addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(socket_addr)?;
        socket.listen(backlog)
    };

    bind().map_err(|source| ServerError::Bind {
        addr: addr.to_owned(),
        source,
    })
}

/// Both listeners bound and the shared state built; nothing runs until
/// [`Simulator::run`].
pub struct Simulator {
    state: Arc<ArrayState>,
    command_listener: TcpListener,
    status_listener: TcpListener,
    model_tick: Duration,
}

impl Simulator {
    pub async fn bind(config: &SimulatorConfig) -> Result<Self, ServerError> {
        let model_tick = config.model_tick();
        let state = Arc::new(ArrayState::new(model_tick.as_secs_f64()));
        state.set_status_interval_secs(config.status_interval_secs);

        let command_listener = bind_listener(&config.command_addr(), config.listen_backlog).await?;
        let status_listener = bind_listener(&config.status_addr(), config.listen_backlog).await?;

        Ok(Self {
            state,
            command_listener,
            status_listener,
            model_tick,
        })
    }

    pub fn state(&self) -> &Arc<ArrayState> {
        &self.state
    }

    pub fn command_addr(&self) -> io::Result<SocketAddr> {
        self.command_listener.local_addr()
    }

    pub fn status_addr(&self) -> io::Result<SocketAddr> {
        self.status_listener.local_addr()
    }

    /// Spawn the three loops as separate tasks and wait on them. None of
    /// them return.
    pub async fn run(self) {
        let dispatcher = Dispatcher::new(Arc::clone(&self.state));

        let tasks = [
            ("command", tokio::spawn(command_loop(self.command_listener, dispatcher))),
            (
                "status",
                tokio::spawn(status_loop(self.status_listener, Arc::clone(&self.state))),
            ),
            (
                "model",
                tokio::spawn(model_loop(Arc::clone(&self.state), self.model_tick)),
            ),
        ];

        for (name, task) in tasks {
            if let Err(e) = task.await {
                error!("{} loop stopped: {}", name, e);
            }
        }
    }
}

/// Bind according to `config` and serve forever.
pub async fn run(config: &SimulatorConfig) -> Result<(), ServerError> {
    let simulator = Simulator::bind(config).await?;
    info!("📡 command port {}", simulator.command_addr()?);
    info!("📡 status port {}", simulator.status_addr()?);
    simulator.run().await;
    Ok(())
}

/// Serve one command client at a time.
pub async fn command_loop(listener: TcpListener, dispatcher: Dispatcher) {
    loop {
        info!("waiting for command connection");
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("🔗 command client connected: {}", peer);
                if let Err(e) = serve_commands(stream, &dispatcher).await {
                    warn!("command client {} error: {}", peer, e);
                }
                info!("🔌 command client {} disconnected", peer);
            }
            Err(e) => error!("failed to accept command connection: {}", e),
        }
    }
}

/// Read lines until EOF, answering each with one `\n`-terminated response.
pub async fn serve_commands(stream: TcpStream, dispatcher: &Dispatcher) -> Result<(), ServerError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        // Bytes that are not UTF-8 become U+FFFD and fail to dispatch like
        // any other bad word.
        let line = String::from_utf8_lossy(&buf);
        let command = line.trim_end_matches(&['\r', '\n'][..]);
        info!("received: '{}'", command);

        let response = dispatcher.dispatch(command);
        info!("returning: '{}'", response);

        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
}

/// Push a status snapshot to one client every status interval.
pub async fn status_loop(listener: TcpListener, state: Arc<ArrayState>) {
    loop {
        info!("waiting for status connection");
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("🔗 status client connected: {}", peer);
                if let Err(e) = stream_status(stream, &state).await {
                    warn!("status client {} error: {}", peer, e);
                }
                info!("🔌 status client {} disconnected", peer);
            }
            Err(e) => error!("failed to accept status connection: {}", e),
        }
    }
}

async fn stream_status(mut stream: TcpStream, state: &ArrayState) -> Result<(), ServerError> {
    loop {
        let report = render_status(state, SystemTime::now());
        stream.write_all(report.as_bytes()).await?;
        stream.flush().await?;
        debug!("status sent ({} bytes)", report.len());

        // Re-read every time so MONITOR takes effect on the next report.
        time::sleep(state.status_interval()).await;
    }
}

/// Advance every subarray model once per tick.
pub async fn model_loop(state: Arc<ArrayState>, tick: Duration) {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        state.subarrays.update_all();
    }
}
