mod config;
mod metrics;
mod shutdown;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use taskvisor::{Subscribe, Supervisor, SupervisorConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tandem_api::{BrokerAdapter, HttpApi};
use tandem_core::prelude::*;
use tandem_core::service::to_task_spec;
use tandem_observe::{EventLogger, LoggerConfig, init_logger};
use tandem_prometheus::PrometheusMetrics;
use tandem_transport::{DeviceTransport, MemoryQueue, MemoryRegistry};

use crate::config::RelayConfig;
use crate::shutdown::shutdown_signal;

/// Time the supervised services get to wind down after the HTTP server stopped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) environment + logger
    let dotenv = dotenvy::dotenv();
    init_logger(&LoggerConfig::from_env()?)?;
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }
    let cfg = RelayConfig::from_env().context("invalid relay configuration")?;
    info!(
        inbound = %cfg.inbound_queue(),
        topic = %cfg.job_topic(),
        hub = %cfg.hub_name,
        bind = %cfg.bind_addr,
        embedded_solver = cfg.embedded_solver,
        "relay configuration loaded"
    );

    // 2) collaborators
    let inbound = Arc::new(MemoryQueue::new(cfg.inbound_queue()));
    let jobs = Arc::new(MemoryQueue::new(cfg.job_topic()));
    let devices = Arc::new(MemoryRegistry::new());
    let hub = Arc::new(FanoutHub::new(cfg.hub_name.clone()));
    let broker = Arc::new(IdentityBroker::new(
        devices.clone(),
        hub,
        cfg.broker_settings(),
    ));
    let prometheus = Arc::new(PrometheusMetrics::new()?);
    let metrics: MetricsHandle = prometheus.clone();

    // 3) services
    let router = Arc::new(
        RelayRouter::new(inbound.clone(), devices.clone())
            .with_config(cfg.router.clone())
            .with_metrics(metrics.clone()),
    );
    let (errors_tx, mut errors_rx) = mpsc::unbounded_channel::<ProcessingError>();
    tokio::spawn(async move {
        while let Some(err) = errors_rx.recv().await {
            warn!(kind = err.kind(), error = %err, "relay processing error reported");
        }
    });

    let policy = ServicePolicy::default();
    let mut specs = vec![to_task_spec(relay_service(router, errors_tx), &policy)];
    if cfg.embedded_solver {
        let transport = Arc::new(DeviceTransport::new(
            broker.clone(),
            cfg.api_key.clone(),
            devices.clone(),
            inbound.clone(),
        ));
        let solver = SolverRunner::new(transport)
            .with_config(RunnerConfig::default().with_step_delay(cfg.step_delay));
        let worker = Arc::new(
            SolverWorker::new(jobs.clone(), Arc::new(solver)).with_metrics(metrics.clone()),
        );
        specs.push(to_task_spec(solver_worker_service(worker), &policy));
    }

    // 4) supervisor
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(EventLogger)];
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .build();
    let stop = CancellationToken::new();
    let supervisor = {
        let sup = Arc::clone(&sup);
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = sup.run(specs).await {
                error!(error = %e, "supervisor stopped with error");
            }
            stop.cancel();
        })
    };

    // 5) http
    let app = HttpApi::new(Arc::new(BrokerAdapter::new(broker, jobs.clone())))
        .router()
        .merge(metrics::router(prometheus));
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, "http api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(stop))
        .await
        .context("http server failed")?;

    // 6) drain
    info!("shutting down relay services");
    inbound.close();
    jobs.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, supervisor).await.is_err() {
        warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "services did not stop in time");
    }
    info!("relay stopped");
    Ok(())
}
