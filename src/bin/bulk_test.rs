use chrono::Local;
use clap::Parser;
use dotenv::dotenv;
use log::info;
use recipe_chatbot::bulk::{ self, BulkRunner };
use recipe_chatbot::cli::BulkTestArgs;
use std::error::Error;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = BulkTestArgs::parse();

    info!("--- Bulk Test ---");
    info!("Input CSV: {}", args.csv.display());
    info!("Endpoint: {}", args.endpoint);
    info!("Results Dir: {}", args.results_dir.display());
    match args.max_concurrency {
        Some(n) => info!("Max Concurrency: {}", n),
        None => info!("Max Concurrency: unbounded"),
    }
    info!("-----------------");

    let started = Instant::now();
    let queries = bulk::load_queries(&args.csv)?;
    let runner = BulkRunner::new(args.endpoint.clone(), args.max_concurrency);
    let results = runner.run(&queries).await;

    let output = bulk::results_path(&args.results_dir, Local::now());
    bulk::write_results(&output, &results)?;

    let failed = results.iter().filter(|r| r.is_error()).count();
    info!(
        "Wrote {} rows ({} ok, {} failed) to {} in {:.2}s",
        results.len(),
        results.len() - failed,
        failed,
        output.display(),
        started.elapsed().as_secs_f64()
    );

    Ok(())
}
