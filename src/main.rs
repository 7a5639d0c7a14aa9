//! querywright - a natural-language-to-SQL agent for SQLite databases.

use querywright::agent::{QueryWriter, Trainer};
use querywright::cli::{Cli, Command};
use querywright::config::Config;
use querywright::db::{self, QueryResult};
use querywright::error::Result;
use querywright::knowledge::KnowledgeBase;
use querywright::llm::{create_client, Embedder, LlmProvider, OllamaClient};
use querywright::logging;

use std::io::{BufRead, Write as _};
use tracing::{error, info, warn};

/// Rows shown per result before eliding the rest.
const DISPLAY_ROWS: usize = 10;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let db_path = cli.resolve_db_path(&config);
    let provider = cli.resolve_provider(&config)?;
    let model = cli.resolve_model(&config);

    // The schema subcommand needs neither a backend nor a knowledge base.
    if matches!(cli.command, Some(Command::Schema)) {
        let db = db::connect(&db_path).await?;
        let schema = db.introspect_schema().await?;
        print!("{}", schema.format_for_llm());
        return db.close().await;
    }

    let db = db::connect(&db_path).await?;
    let llm = create_client(provider, model.clone())?;
    let knowledge = open_knowledge(&cli, &config, provider).await;

    let writer = QueryWriter::from_parts(db, llm, knowledge)
        .await?
        .with_examples_per_prompt(config.knowledge.examples);

    info!(
        "Agent ready: {} ({} tables, provider {})",
        db_path.display(),
        writer.schema().tables.len(),
        provider
    );

    let outcome = match &cli.command {
        Some(Command::Ask {
            question,
            no_execute,
        }) => run_ask(&writer, question, *no_execute).await,
        Some(Command::Train { per_level }) => {
            let generator = create_client(provider, model)?;
            run_train(&writer, generator, *per_level).await
        }
        // Schema was handled before the agent was assembled.
        Some(Command::Repl) | Some(Command::Schema) | None => {
            run_repl(&writer, cli.no_learn).await
        }
    };

    writer.close().await?;
    outcome
}

/// Opens the knowledge base, degrading to no retrieval when disabled or
/// unavailable.
async fn open_knowledge(
    cli: &Cli,
    config: &Config,
    provider: LlmProvider,
) -> Option<KnowledgeBase> {
    if cli.no_learn || !config.knowledge.enabled {
        return None;
    }

    let path = cli.resolve_knowledge_path(config);
    let embedder: Option<Box<dyn Embedder>> = match provider {
        LlmProvider::Ollama => match OllamaClient::from_env() {
            Ok(client) => Some(Box::new(client)),
            Err(e) => {
                warn!("No embedding backend: {e}");
                None
            }
        },
        _ => None,
    };

    match KnowledgeBase::open(&path, embedder).await {
        Ok(kb) => Some(kb),
        Err(e) => {
            warn!("Knowledge base unavailable, continuing without it: {e}");
            None
        }
    }
}

/// One-shot: generate, print, optionally execute.
async fn run_ask(writer: &QueryWriter, question: &str, no_execute: bool) -> Result<()> {
    let sql = writer.generate_query(question).await?;

    if sql.is_empty() {
        println!("No query could be generated for that question.");
        return Ok(());
    }

    println!("{sql}");

    if !no_execute {
        match writer.execute(&sql).await {
            Ok(result) => print_result(&result),
            Err(e) => println!("Execution failed: {e}"),
        }
    }

    Ok(())
}

/// Interactive loop: question in, SQL and rows out, with an optional
/// learning step after each confirmed answer.
async fn run_repl(writer: &QueryWriter, no_learn: bool) -> Result<()> {
    println!("querywright interactive mode");
    println!("Tables:");
    for name in writer.schema().table_names() {
        println!("  - {name}");
    }
    println!("Type 'quit' or 'exit' to stop.\n");

    let stdin = std::io::stdin();
    loop {
        let Some(question) = read_line(&stdin, "Enter your question: ")? else {
            break;
        };
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("Goodbye!");
            break;
        }

        let sql = match writer.generate_query(&question).await {
            Ok(sql) if sql.is_empty() => {
                println!("No query could be generated for that question.\n");
                continue;
            }
            Ok(sql) => sql,
            Err(e) => {
                println!("{e}\n");
                continue;
            }
        };

        println!("\nGenerated SQL:\n{sql}\n");

        let result = match writer.execute(&sql).await {
            Ok(result) => result,
            Err(e) => {
                println!("Execution failed: {e}\n");
                continue;
            }
        };
        print_result(&result);

        if no_learn {
            continue;
        }
        if let Some(feedback) = read_line(&stdin, "\nWas this result correct? (y/n): ")? {
            if feedback.eq_ignore_ascii_case("y") {
                match writer.learn(&question, &sql).await {
                    Ok(()) => println!("Learned this query for next time.\n"),
                    Err(e) => warn!("Could not save learned query: {e}"),
                }
            }
        }
    }

    Ok(())
}

/// Runs the self-play curriculum and prints the per-level outcomes.
async fn run_train(
    writer: &QueryWriter,
    generator: Box<dyn querywright::llm::LlmClient>,
    per_level: usize,
) -> Result<()> {
    let trainer = Trainer::new(writer, generator).with_target_per_level(per_level);
    let report = trainer.run().await?;

    println!("Training complete: {} questions solved", report.total_solved());
    for outcome in &report.levels {
        println!(
            "  {:<6} {}/{}{}",
            outcome.level.as_str(),
            outcome.solved,
            outcome.target,
            if outcome.abandoned { " (abandoned)" } else { "" }
        );
    }

    Ok(())
}

/// Prompts on stdout and reads one trimmed line. `None` means EOF.
fn read_line(stdin: &std::io::Stdin, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout()
        .flush()
        .map_err(|e| querywright::error::WriterError::internal(format!("stdout: {e}")))?;

    let mut line = String::new();
    let read = stdin
        .lock()
        .read_line(&mut line)
        .map_err(|e| querywright::error::WriterError::internal(format!("stdin: {e}")))?;

    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Prints a result set: header, first rows, elision note, truncation note.
fn print_result(result: &QueryResult) {
    let total = result.total_rows.unwrap_or(result.row_count);
    println!("Results ({total} rows):");

    if !result.columns.is_empty() {
        let header = result
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        println!("{header}");
    }

    for row in result.rows.iter().take(DISPLAY_ROWS) {
        let line = row
            .iter()
            .map(|v| v.to_display_string())
            .collect::<Vec<_>>()
            .join(" | ");
        println!("{line}");
    }

    if result.row_count > DISPLAY_ROWS {
        println!("... and {} more rows", result.row_count - DISPLAY_ROWS);
    }
    if result.was_truncated {
        println!("(result truncated by the row cap)");
    }
}
