pub mod api;

use crate::agent::RecipeAgent;
use crate::cli::Args;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use log::info;

pub struct Server {
    addr: String,
    agent: Arc<RecipeAgent>,
    args: Args,
}

impl Server {
    pub fn new(
        addr: String,
        agent: Arc<RecipeAgent>,
        args: Args,
    ) -> Self {
        Self {
            addr,
            agent,
            args,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;
        let app = api::router(self.agent.clone(), &self.args.frontend_dir);

        if self.args.enable_tls {
            let cert_path = self.args.tls_cert_path.as_ref()
                .ok_or("ENABLE_TLS is set but TLS_CERT_PATH is missing")?;
            let key_path = self.args.tls_key_path.as_ref()
                .ok_or("ENABLE_TLS is set but TLS_KEY_PATH is missing")?;

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("Serving recipe chatbot on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        } else {
            let listener = tokio::net::TcpListener::bind(addr).await
                .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
            info!("Serving recipe chatbot on http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }

        Ok(())
    }
}
