pub mod agent;
pub mod bulk;
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;
pub mod synth;

use agent::RecipeAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Model Name: {}", args.model_name);
    info!("LLM Base URL: {}", args.llm.llm_base_url.as_deref().unwrap_or("provider default"));
    info!("Frontend Dir: {}", args.frontend_dir.display());
    match &args.system_prompt_path {
        Some(path) => info!("System Prompt: {}", path.display()),
        None => info!("System Prompt: built-in"),
    }
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(RecipeAgent::from_args(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
