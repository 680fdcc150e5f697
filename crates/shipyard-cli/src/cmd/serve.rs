use anyhow::Context;
use shipyard_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, open_browser: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load shipyard.yaml")?;
    let port = port.unwrap_or(config.server.port);
    for warning in config.validate() {
        tracing::warn!(level = ?warning.level, "{}", warning.message);
    }

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();

        if open_browser {
            let url = format!("http://localhost:{actual_port}/api/projects");
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, "could not open browser");
            }
        }

        shipyard_server::serve_on(root_buf, listener).await
    })
}
