use clap::Parser;
use std::path::PathBuf;

/// Provider options shared by every binary that talks to a model directly.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LlmArgs {
    /// API key for the selected provider. Overrides OPENAI_API_KEY, ANTHROPIC_API_KEY, etc.
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Base URL for the provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "LLM_BASE_URL")] // No default, let adapters handle defaults if None
    pub llm_base_url: Option<String>,

    /// Sampling temperature. Provider default when unset.
    #[arg(long, env = "LLM_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens. Provider default when unset.
    #[arg(long, env = "LLM_MAX_TOKENS")]
    pub max_tokens: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Recipe chatbot web server", long_about = None)]
pub struct Args {
    /// Provider-prefixed model name (e.g., openai/gpt-4.1-nano, anthropic/claude-3-5-haiku-latest, ollama/llama3)
    #[arg(long, env = "MODEL_NAME", default_value = "gpt-4.1-nano")]
    pub model_name: String,

    #[command(flatten)]
    pub llm: LlmArgs,

    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8000")]
    pub server_addr: String,

    /// Directory holding the chat frontend (index.html and assets).
    #[arg(long, env = "FRONTEND_DIR", default_value = "frontend")]
    pub frontend_dir: PathBuf,

    /// Optional file replacing the built-in system prompt.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<PathBuf>,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Fire a CSV of test queries at the chat endpoint", long_about = None)]
pub struct BulkTestArgs {
    /// CSV file with `id` and `query` columns.
    #[arg(long, env = "BULK_CSV", default_value = "data/sample_queries.csv")]
    pub csv: PathBuf,

    /// Chat endpoint of a running server.
    #[arg(long, env = "CHAT_ENDPOINT", default_value = "http://127.0.0.1:8000/chat")]
    pub endpoint: String,

    /// Directory the timestamped results CSV is written to.
    #[arg(long, env = "RESULTS_DIR", default_value = "results")]
    pub results_dir: PathBuf,

    /// Cap on in-flight requests. Unlimited when unset.
    #[arg(long, env = "BULK_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Generate synthetic recipe-bot test queries with an LLM", long_about = None)]
pub struct GenQueriesArgs {
    /// Provider-prefixed model used for generation.
    #[arg(long, env = "SYNTH_MODEL_NAME", default_value = "gpt-4o-mini")]
    pub model_name: String,

    #[command(flatten)]
    pub llm: LlmArgs,

    /// Number of dimension tuples to request.
    #[arg(long, env = "SYNTH_NUM_TUPLES", default_value = "10")]
    pub num_tuples: usize,

    /// Queries generated per dimension tuple.
    #[arg(long, env = "SYNTH_QUERIES_PER_TUPLE", default_value = "5")]
    pub queries_per_tuple: usize,

    #[arg(long, env = "SYNTH_NUM_AMBIGUOUS", default_value = "15")]
    pub num_ambiguous: usize,

    #[arg(long, env = "SYNTH_NUM_ADVERSARIAL", default_value = "3")]
    pub num_adversarial: usize,

    /// Parallel tuple expansions.
    #[arg(long, env = "SYNTH_MAX_WORKERS", default_value = "5")]
    pub max_workers: usize,

    /// Directory the generated CSV is written to.
    #[arg(long, env = "SYNTH_OUTPUT_DIR", default_value = "data")]
    pub output_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn flags_without_env(cmd: clap::Command) -> Vec<String> {
        cmd.get_arguments()
            .filter(|a| !matches!(a.get_id().as_str(), "help" | "version"))
            .filter(|a| a.get_env().is_none())
            .map(|a| a.get_id().to_string())
            .collect()
    }

    #[test]
    fn every_flag_has_an_env_var() {
        assert_eq!(flags_without_env(Args::command()), Vec::<String>::new());
        assert_eq!(flags_without_env(BulkTestArgs::command()), Vec::<String>::new());
        assert_eq!(flags_without_env(GenQueriesArgs::command()), Vec::<String>::new());

        let bulk = BulkTestArgs::command();
        let env_of = |id: &str| {
            bulk.get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_env())
                .map(|e| e.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("csv").as_deref(), Some("BULK_CSV"));
        assert_eq!(env_of("max_concurrency").as_deref(), Some("BULK_MAX_CONCURRENCY"));
    }

    #[test]
    fn server_defaults() {
        let args = Args::try_parse_from(["recipe-chatbot"]).unwrap();
        assert_eq!(args.server_addr, "127.0.0.1:8000");
        assert_eq!(args.frontend_dir, PathBuf::from("frontend"));
        assert!(!args.enable_tls);
    }

    #[test]
    fn server_accepts_model_and_provider_flags() {
        let args = Args::try_parse_from([
            "recipe-chatbot",
            "--model-name",
            "ollama/llama3",
            "--llm-base-url",
            "http://gpu-box:11434",
            "--temperature",
            "0.3",
        ]).unwrap();
        assert_eq!(args.model_name, "ollama/llama3");
        assert_eq!(args.llm.llm_base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(args.llm.temperature, Some(0.3));
    }

    #[test]
    fn bulk_test_defaults_to_bundled_sample() {
        let args = BulkTestArgs::try_parse_from(["bulk-test"]).unwrap();
        assert_eq!(args.csv, PathBuf::from("data/sample_queries.csv"));
        assert!(args.max_concurrency.is_none());

        let args = BulkTestArgs::try_parse_from(["bulk-test", "--csv", "mine.csv", "--max-concurrency", "4"]).unwrap();
        assert_eq!(args.csv, PathBuf::from("mine.csv"));
        assert_eq!(args.max_concurrency, Some(4));
    }

    #[test]
    fn gen_queries_defaults() {
        let args = GenQueriesArgs::try_parse_from(["gen-queries"]).unwrap();
        assert_eq!(args.num_tuples, 10);
        assert_eq!(args.queries_per_tuple, 5);
        assert_eq!(args.num_ambiguous, 15);
        assert_eq!(args.num_adversarial, 3);
        assert_eq!(args.max_workers, 5);
    }
}
