use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use reflection_agent::{display, utils::init_logger, Config, ReflectionAgent};

#[derive(Parser, Debug)]
#[command(name = "reflection-agent")]
#[command(about = "Answer a question, critique the answer, search, and revise with sources")]
struct Args {
    /// Question to answer; prompts on stdin when omitted
    #[arg(trailing_var_arg = true)]
    question: Vec<String>,

    /// Print the outcome as JSON instead of formatted text
    #[arg(long)]
    json: bool,

    /// Log each pipeline step to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors (overrides VERBOSE)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Revision cycles after the initial answer (overrides MAX_ITERATIONS)
    #[arg(long, value_name = "N")]
    max_iterations: Option<u32>,

    /// Model name (overrides LLM_MODEL)
    #[arg(long, value_name = "NAME")]
    model: Option<String>,

    /// LLM provider: google, openai, anthropic, openrouter, groq (overrides LLM_PROVIDER)
    #[arg(long, value_name = "NAME")]
    provider: Option<String>,
}

impl Args {
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(n) = self.max_iterations {
            overrides.push(("MAX_ITERATIONS", n.to_string()));
        }
        if let Some(model) = &self.model {
            overrides.push(("LLM_MODEL", model.clone()));
        }
        if let Some(provider) = &self.provider {
            overrides.push(("LLM_PROVIDER", provider.clone()));
        }
        if self.verbose {
            overrides.push(("VERBOSE", "true".to_string()));
        }
        if self.quiet {
            overrides.push(("VERBOSE", "false".to_string()));
        }
        overrides
    }
}

fn read_question(args: &Args) -> anyhow::Result<String> {
    let joined = args.question.join(" ");
    if !joined.trim().is_empty() {
        return Ok(joined);
    }

    print!("Enter your question: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read question from stdin")?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_env_with_overrides(&args.overrides())?;
    init_logger(config.agent.verbose);
    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        max_iterations = config.agent.max_iterations,
        "Configuration loaded"
    );

    let question = read_question(&args)?;
    let agent = ReflectionAgent::from_config(&config)?;

    let outcome = match agent.run(&question).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Reflection run failed");
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", display::render_outcome(&outcome));
    }

    Ok(())
}
