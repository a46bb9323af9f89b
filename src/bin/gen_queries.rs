use chrono::Local;
use clap::Parser;
use dotenv::dotenv;
use log::{ error, info };
use recipe_chatbot::cli::GenQueriesArgs;
use recipe_chatbot::llm::chat::{ new_client, CompletionOptions };
use recipe_chatbot::llm::LlmConfig;
use recipe_chatbot::synth::{ self, QueryGenerator, SynthSettings };
use std::error::Error;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = GenQueriesArgs::parse();

    info!("--- Synthetic Query Generation ---");
    info!("Model Name: {}", args.model_name);
    info!("Dimension Tuples: {}", args.num_tuples);
    info!("Queries Per Tuple: {}", args.queries_per_tuple);
    info!("Ambiguous Queries: {}", args.num_ambiguous);
    info!("Adversarial Queries: {}", args.num_adversarial);
    info!("Max Workers: {}", args.max_workers);
    info!("Output Dir: {}", args.output_dir.display());
    info!("----------------------------------");

    let config = LlmConfig::from_model_name(
        &args.model_name,
        args.llm.llm_api_key.clone(),
        args.llm.llm_base_url.clone()
    )?;
    let client = new_client(&config)?;
    let settings = SynthSettings {
        num_tuples: args.num_tuples,
        queries_per_tuple: args.queries_per_tuple,
        num_ambiguous: args.num_ambiguous,
        num_adversarial: args.num_adversarial,
        max_workers: args.max_workers,
    };
    let options = CompletionOptions {
        temperature: args.llm.temperature,
        max_tokens: args.llm.max_tokens,
        json_response: true,
    };
    let generator = QueryGenerator::new(client, settings, options);

    let started = Instant::now();
    let (queries, counts) = match generator.generate_all().await {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to generate dimension tuples. Exiting.");
            return Err(e.into());
        }
    };

    let output = synth::output_path(&args.output_dir, Local::now());
    if synth::save_queries(&output, &queries)? {
        info!(
            "Generated {} queries ({} regular, {} ambiguous, {} adversarial) in {:.2}s",
            counts.total(),
            counts.regular,
            counts.ambiguous,
            counts.adversarial,
            started.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
