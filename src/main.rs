use std::io;
use std::process::ExitCode;

use anyhow::Context;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chatrelay::chat::{ChatAdapter, FAILURE_MARKER};
use chatrelay::config::Config;
use chatrelay::providers;
use chatrelay::repl;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{FAILURE_MARKER}{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    println!("🤖 chatrelay: terminal chat for LLM APIs");
    println!("Supports DeepSeek and OpenAI models");
    println!("Type 'quit' or 'exit' to leave\n");

    let config = Config::load();
    let selection = match providers::resolve(&config) {
        Ok(selection) => selection,
        Err(e) => {
            println!("{FAILURE_MARKER}Error: {e}");
            println!("{}", e.hint());
            return Ok(());
        }
    };

    let adapter = ChatAdapter::new(&config).context("failed to build HTTP client")?;
    println!("✅ {} client initialized!\n", selection.provider());

    let mut editor = rustyline::DefaultEditor::new().context("failed to open line editor")?;
    // Ctrl-C at a non-terminal prompt: the read cannot be cancelled, so leave here.
    let interrupt = repl::Interrupt::install(|| {
        println!("\n👋 Interrupted, goodbye!");
        std::process::exit(0);
    });
    let outcome = repl::run(
        &mut editor,
        &adapter,
        &selection,
        &interrupt,
        &mut io::stdout(),
    )
    .await?;
    debug!(?outcome, "chat loop finished");
    Ok(())
}
