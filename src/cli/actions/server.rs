use crate::{
    api::{self, ApiState},
    auth::{
        AuthorityConfig, BackendOptions, BackendRegistry, FileSecretSource, SessionAuthority,
    },
    cli::telemetry,
};
use anyhow::{Context, Result};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct Args {
    pub listen: IpAddr,
    pub port: u16,
    pub auth_enabled: bool,
    pub unauthenticated_paths: Vec<String>,
    pub internal_type: String,
    pub internal_options: BackendOptions,
    pub force_internal_users: Vec<String>,
    pub external_type: Option<String>,
    pub external_options: BackendOptions,
    pub totp_secret_path: Option<PathBuf>,
    pub session_expire_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a backend can't be built, the port can't be bound, the
/// server fails or backend cleanup fails.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let registry = BackendRegistry::with_defaults();
    debug!(
        "Available auth backends: {}",
        registry.names().collect::<Vec<_>>().join(", ")
    );
    let authority = Arc::new(build_authority(&registry, &args)?);

    let state = Arc::new(
        ApiState::new(authority.clone()).with_default_expire_seconds(args.session_expire_seconds),
    );

    let addr = SocketAddr::new(args.listen, args.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let served = api::serve(listener, state, shutdown_signal()).await;

    // Backends are released even if the server stopped on an error.
    let cleaned = authority.cleanup().await;
    telemetry::shutdown_tracer();

    served?;
    cleaned.context("Failed to clean up auth backends")?;

    info!("Stopped");

    Ok(())
}

/// Build the authority and its backends from the CLI arguments.
///
/// Backends are only instantiated when authorization is enabled.
///
/// # Errors
/// Returns an error for unknown backends or invalid backend options.
pub fn build_authority(registry: &BackendRegistry, args: &Args) -> Result<SessionAuthority> {
    let mut config = AuthorityConfig::new(args.auth_enabled)
        .with_unauthenticated_paths(args.unauthenticated_paths.iter())
        .with_force_internal_users(args.force_internal_users.iter());

    if args.auth_enabled {
        let internal = registry
            .build(&args.internal_type, &args.internal_options)
            .context("Failed to build internal auth service")?;
        config = config.with_internal(internal);

        if let Some(external_type) = &args.external_type {
            let external = registry
                .build(external_type, &args.external_options)
                .context("Failed to build external auth service")?;
            config = config.with_external(external);
        }

        if let Some(path) = &args.totp_secret_path {
            config = config.with_totp_secret_source(Arc::new(FileSecretSource::new(path)));
        }
    }

    SessionAuthority::new(config).context("Failed to initialize the session authority")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received ctrl-c"),
        () = terminate => info!("Received SIGTERM"),
    }
}
