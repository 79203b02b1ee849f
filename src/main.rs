// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use extdns::{
    config::Config,
    constants::{TOKIO_WORKER_THREADS, WEBHOOK_TIMEOUT_SECS},
    context::Context,
    credentials::CredentialProvisioner,
    crd::ExternalDNS,
    provider::DefaultProviderFactory,
    reconcilers::{error_policy, forget_resource, reconcile_externaldns, KubeExternalDnsApi},
    server::{start_server, ServerState},
    source::KubeSource,
    watch_registry::{secret_referrers, KubeWatchSource, WatchRegistry},
};
use futures::channel::mpsc;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = Config::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("extdns-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<()> {
    // Respects RUST_LOG (default info) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!(
        namespace = config.watch_namespace().unwrap_or("<all>"),
        credentials_dir = %config.credentials_dir.display(),
        resync_secs = config.resync_secs,
        "Starting ExternalDNS controller"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let server_state = Arc::new(ServerState::default());

    tokio::select! {
        result = start_server(&config.metrics_bind_address, config.metrics_port, server_state.clone()) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = run_controller(client, &config, server_state) => {
            error!("CRITICAL: ExternalDNS controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ExternalDNS controller exited unexpectedly without error")
        }
    }
}

/// Run the `ExternalDNS` controller.
///
/// Besides the resources themselves, the controller reacts to changes of
/// referenced Secrets and to events on dynamically watched source kinds,
/// which arrive on the trigger channel fed by [`KubeWatchSource`].
async fn run_controller(client: Client, config: &Config, server_state: Arc<ServerState>) -> Result<()> {
    info!("Starting ExternalDNS controller");

    let namespace = config.watch_namespace().map(str::to_string);
    let (resources, secrets): (Api<ExternalDNS>, Api<Secret>) = match &namespace {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client.clone(), ns),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    let controller = Controller::new(resources, watcher::Config::default());
    let store = controller.store();

    let (trigger_tx, trigger_rx) = mpsc::unbounded();
    let watches = Arc::new(WatchRegistry::new());
    watches.bind(Arc::new(KubeWatchSource::new(
        client.clone(),
        namespace,
        store.clone(),
        trigger_tx,
    )));

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
        .build()?;

    let ctx = Arc::new(Context::new(
        Arc::new(KubeExternalDnsApi::new(client.clone())),
        watches,
        CredentialProvisioner::new(config.credentials_dir.clone()),
        Arc::new(DefaultProviderFactory::new(http_client)),
        Arc::new(KubeSource::new(client)),
        config.reconcile_settings(),
    ));

    let secret_store = store.clone();
    let cleanup_ctx = ctx.clone();
    server_state.set_ready(true);

    controller
        .watches(secrets, watcher::Config::default(), move |secret: Secret| {
            secret_referrers(
                &secret_store.state(),
                secret.namespace().as_deref(),
                &secret.name_any(),
            )
        })
        .reconcile_on(trigger_rx)
        .shutdown_on_signal()
        .run(reconcile_externaldns, error_policy, ctx)
        .for_each(|result| {
            if let Err(controller::Error::ObjectNotFound(object)) = &result {
                forget_resource(&cleanup_ctx, object.namespace.as_deref(), &object.name);
            }
            futures::future::ready(())
        })
        .await;

    server_state.set_ready(false);
    Ok(())
}
