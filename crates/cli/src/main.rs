use anyhow::Result;
use arbiter_core::config;
use arbiter_core::config::AppConfig;
use arbiter_core::engine::{self, RulesQa};
use clap::{Parser, Subcommand};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { rebuild, json } => run_index(cfg, rebuild, json).await,
        Commands::Search { query, topk, json } => run_search(cfg, query, topk, json).await,
        Commands::Classify { query, json } => run_classify(cfg, query, json).await,
        Commands::Ask { query, deep, json } => run_ask(cfg, query, deep, json).await,
    }
}

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(about = "Retrieval-grounded Q&A over an arbitration rules text", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the article index, or load it if already persisted
    Index {
        /// Discard any persisted index and recompute it
        #[arg(long, default_value_t = false)]
        rebuild: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Semantic search over the indexed articles
    Search {
        /// Query text to embed and search
        query: String,
        /// Number of results
        #[arg(short = 'k', long, default_value_t = 5)]
        topk: usize,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify a query without generating an answer
    Classify {
        query: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Answer a question grounded in the retrieved articles
    Ask {
        query: String,
        /// Force the high-capability backend regardless of classification
        #[arg(long, default_value_t = false)]
        deep: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

async fn init_engine(cfg: AppConfig, rebuild: bool) -> Result<RulesQa> {
    let registry = engine::build_registry(&cfg);
    Ok(RulesQa::init_with_rebuild(cfg, registry, rebuild).await?)
}

async fn run_index(cfg: AppConfig, rebuild: bool, json: bool) -> Result<()> {
    let qa = init_engine(cfg, rebuild).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": "ok",
                "articles": qa.article_count(),
                "index_path": qa.index_path(),
            }))?
        );
    } else {
        println!(
            "index ready: {} articles ({})",
            qa.article_count(),
            qa.index_path()
        );
    }
    Ok(())
}

async fn run_search(cfg: AppConfig, query: String, topk: usize, json: bool) -> Result<()> {
    let qa = init_engine(cfg, false).await?;
    let results = qa.retrieve(&query, topk).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("no matching articles");
    } else {
        for r in &results {
            println!(
                "Article {:>3}  {:<40}  [{}]  similarity={:.3}",
                r.article.number,
                r.article.title,
                r.article.categories.join(", "),
                r.similarity
            );
        }
    }
    Ok(())
}

async fn run_classify(cfg: AppConfig, query: String, json: bool) -> Result<()> {
    let qa = init_engine(cfg, false).await?;
    let classification = qa.classify(&query).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!(
            "topic={} complexity={} keywords={}",
            classification.topic,
            serde_json::to_value(classification.complexity)?
                .as_str()
                .unwrap_or("medium"),
            classification.keywords.join(", ")
        );
    }
    Ok(())
}

async fn run_ask(cfg: AppConfig, query: String, deep: bool, json: bool) -> Result<()> {
    let qa = init_engine(cfg, false).await?;
    let routed = qa.answer(&query, deep).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&routed)?);
    } else {
        println!("{}", routed.answer);
        println!();
        println!("model: {} ({} tier)", routed.model_used, routed.tier.label());
        println!("grounded on:");
        for a in &routed.articles_used {
            println!(
                "  Article {:>3}  {:<40}  similarity={:.3}",
                a.number, a.title, a.similarity
            );
        }
    }
    Ok(())
}
