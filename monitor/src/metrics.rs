//! Prometheus gauges for the monitored process tree
//!
//! The sink owns a dedicated registry holding four gauges and serves it over
//! HTTP from a background task: `/metrics` in the text exposition format and
//! `/health` for liveness checks. `close()` leaves the listener running so
//! the last values stay scrapeable; dropping the sink shuts it down.

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::config::MetricsConfig;
use crate::error::{MetricsError, MetricsResult};
use crate::sample::Sample;
use crate::sink::OutputSink;

/// Gauges mirroring the fields of a [`Sample`].
#[derive(Clone)]
pub struct ProcessGauges {
    pub memory_mb: Gauge,
    pub cpu_percent: Gauge,
    pub io_read_mb: Gauge,
    pub io_write_mb: Gauge,
}

impl ProcessGauges {
    /// Create the gauges and register them in `registry`.
    pub fn register(registry: &Registry) -> MetricsResult<Self> {
        let gauges = Self {
            memory_mb: gauge("process_memory_usage_mb", "Memory usage of the process in MB")?,
            cpu_percent: gauge("process_cpu_usage_percent", "CPU usage of the process in percent")?,
            io_read_mb: gauge("process_io_read_mb", "I/O read of the process in MB")?,
            io_write_mb: gauge("process_io_write_mb", "I/O write of the process in MB")?,
        };

        for (name, metric) in [
            ("process_memory_usage_mb", &gauges.memory_mb),
            ("process_cpu_usage_percent", &gauges.cpu_percent),
            ("process_io_read_mb", &gauges.io_read_mb),
            ("process_io_write_mb", &gauges.io_write_mb),
        ] {
            registry
                .register(Box::new(metric.clone()))
                .map_err(|_| MetricsError::RegistrationFailed { name: name.to_string() })?;
        }

        Ok(gauges)
    }

    pub fn record(&self, sample: &Sample) {
        self.memory_mb.set(sample.memory_mb);
        self.cpu_percent.set(sample.cpu_percent);
        self.io_read_mb.set(sample.io_read_mb);
        self.io_write_mb.set(sample.io_write_mb);
    }
}

fn gauge(name: &str, help: &str) -> MetricsResult<Gauge> {
    Gauge::with_opts(Opts::new(name, help))
        .map_err(|_| MetricsError::RegistrationFailed { name: name.to_string() })
}

/// Render a registry in the Prometheus text format.
pub fn encode_registry(registry: &Registry) -> MetricsResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| MetricsError::ExportFailed { reason: e.to_string() })?;
    String::from_utf8(buffer).map_err(|e| MetricsError::ExportFailed { reason: e.to_string() })
}

/// Sink publishing samples as Prometheus gauges.
pub struct MetricsSink {
    registry: Registry,
    gauges: ProcessGauges,
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    closed: bool,
}

impl MetricsSink {
    /// Register the gauges and start serving them.
    ///
    /// Must be called from within a tokio runtime. Bind errors are returned
    /// here rather than from the background task.
    pub fn start(config: &MetricsConfig) -> MetricsResult<Self> {
        let handle = Handle::try_current().map_err(|e| MetricsError::ServerStartFailed {
            reason: format!("no async runtime: {}", e),
        })?;

        let registry = Registry::new();
        let gauges = ProcessGauges::register(&registry)?;

        let bind_addr = config.socket_address();
        let listener = TcpListener::bind(&bind_addr).map_err(|e| MetricsError::ServerStartFailed {
            reason: format!("{}: {}", bind_addr, e),
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|e| MetricsError::ServerStartFailed { reason: e.to_string() })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| MetricsError::ServerStartFailed { reason: e.to_string() })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let _runtime = handle.enter();
        let builder = Server::from_tcp(listener)
            .map_err(|e| MetricsError::ServerStartFailed { reason: e.to_string() })?;

        let served = registry.clone();
        let make_svc = make_service_fn(move |_conn| {
            let registry = served.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let registry = registry.clone();
                    async move { Ok::<_, Infallible>(route(&registry, &req)) }
                }))
            }
        });

        let server = builder.serve(make_svc).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        handle.spawn(async move {
            if let Err(e) = server.await {
                error!("Metrics server error: {}", e);
            }
            debug!("Metrics server stopped");
        });

        info!("Metrics server listening on {}", local_addr);

        Ok(Self {
            registry,
            gauges,
            local_addr,
            shutdown: Some(shutdown_tx),
            closed: false,
        })
    }

    /// Address the server actually bound, useful with port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[cfg(test)]
    /// Current exposition text, as a scrape would see it
    pub fn render(&self) -> MetricsResult<String> {
        encode_registry(&self.registry)
    }

    /// Stop the HTTP listener now instead of on drop.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl OutputSink for MetricsSink {
    fn emit(&mut self, sample: &Sample) {
        self.gauges.record(sample);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        println!("\nPrometheus server shutting down...");
        info!("Metrics sink closed; endpoint on {} serves final values until exit", self.local_addr);
    }

    fn name(&self) -> &str {
        "prometheus"
    }
}

impl Drop for MetricsSink {
    fn drop(&mut self) {
        self.stop();
    }
}

fn route(registry: &Registry, req: &Request<Body>) -> Response<Body> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => match encode_registry(registry) {
            Ok(body) => {
                let mut response = Response::new(Body::from(body));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(prometheus::TEXT_FORMAT));
                response
            }
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                status_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        },
        (&Method::GET, "/health") => status_response(StatusCode::OK, "OK"),
        _ => status_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn status_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}
