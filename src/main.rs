use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prodsearch::api::create_app;
use prodsearch::storage::{save_responses, Responses};
use prodsearch::{
    build_indices, Corpus, SearchEngine, SearchMode, SearchOptions, SearchResult, Storage,
    SynonymTable, Weights,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Product catalog search engine", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that answers queries
#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Index directory produced by `index`
    #[arg(short, long, default_value = "index")]
    index: PathBuf,

    /// Synonym file ({"representative": ["synonym", ...]})
    #[arg(short, long)]
    synonyms: Option<PathBuf>,

    /// Weights file; defaults are used when absent
    #[arg(short, long)]
    weights: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every index from a JSONL corpus
    Index {
        #[arg(short, long, default_value = "products.jsonl")]
        corpus: PathBuf,

        #[arg(short, long, default_value = "index")]
        output: PathBuf,

        /// Also write a single-file binary snapshot
        #[arg(long, default_value_t = false)]
        snapshot: bool,
    },
    /// Run one query and print the ranked documents
    Search {
        #[command(flatten)]
        query_args: QueryArgs,

        #[arg(short, long)]
        query: String,

        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,

        /// full, or, and
        #[arg(short, long, default_value = "full")]
        mode: SearchMode,

        /// Corpus used to print titles and features of the results
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Run several queries and merge the top results into a responses file
    Batch {
        #[command(flatten)]
        query_args: QueryArgs,

        #[arg(short, long, num_args = 1.., required = true)]
        queries: Vec<String>,

        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,

        #[arg(short, long, default_value = "responses.json")]
        output: PathBuf,
    },
    /// Serve the search API over HTTP
    Serve {
        #[command(flatten)]
        query_args: QueryArgs,

        #[arg(short, long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

fn open_engine(args: &QueryArgs) -> Result<SearchEngine> {
    let weights = match &args.weights {
        Some(path) => Weights::from_file(path)?,
        None => Weights::default(),
    };
    let synonyms = match &args.synonyms {
        Some(path) => SynonymTable::load(path),
        None => SynonymTable::empty(),
    };

    let start = Instant::now();
    let indices = Storage::open(&args.index)?
        .load_any()
        .with_context(|| format!("Failed to load indices from {}", args.index.display()))?;
    tracing::info!(
        documents = indices.total_documents(),
        elapsed = ?start.elapsed(),
        "indices ready"
    );

    Ok(SearchEngine::new(indices, synonyms, weights))
}

fn build(corpus_path: &Path, output: &Path, snapshot: bool) -> Result<()> {
    let start = Instant::now();
    let corpus = Corpus::load(corpus_path)?;
    let indices = build_indices(&corpus);
    println!("Indexed {} documents in {:?}", corpus.len(), start.elapsed());

    let storage = Storage::open(output)?;
    storage.save(&indices)?;
    if snapshot {
        storage.save_snapshot(&indices)?;
    }
    println!("Saved indices to {}", storage.root().display());
    Ok(())
}

fn print_results(engine: &SearchEngine, result: &SearchResult, corpus: Option<&Corpus>) {
    println!(
        "{} of {} documents matched (tokens: {})",
        result.matched_documents,
        result.total_documents,
        result.tokens.join(" ")
    );
    println!();

    if !result.has_results() {
        println!("No result.");
        return;
    }

    for (i, scored) in result.documents.iter().enumerate() {
        let doc = corpus.and_then(|c| c.get(&scored.doc_id));
        let title = doc.map_or("N/A", |d| d.title.as_str());
        println!("{}. [ {} ]", i + 1, title);
        println!("   Score: {:.4}", scored.score);

        match engine
            .indices()
            .reviews
            .get(&scored.doc_id)
            .and_then(|stats| stats.mean_marks)
        {
            Some(mean) => println!("   Mean mark: {:.2}/5", mean),
            None => println!("   Mean mark: N/A"),
        }
        if let Some(doc) = doc {
            let feature = |key: &str| doc.product_features.get(key).map_or("N/A", |v| v.as_str());
            println!("   Brand: {}", feature("brand"));
            println!("   Origin: {}", feature("made in"));
            if let Some(id) = doc.product_id() {
                println!("   Product: {}", id);
            }
            let variants = doc.variants();
            if !variants.is_empty() {
                println!("   Variants: {}", variants.join(", "));
            }
        }
        println!("   Link: {}", scored.doc_id);
        println!();
    }
}

async fn serve(engine: SearchEngine, addr: &str) -> Result<()> {
    let app = create_app(Arc::new(engine));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Index {
            corpus,
            output,
            snapshot,
        } => build(&corpus, &output, snapshot),
        Command::Search {
            query_args,
            query,
            top_k,
            mode,
            corpus,
        } => {
            let engine = open_engine(&query_args)?;
            let corpus = corpus.map(Corpus::load).transpose()?;

            println!("Searching for: \"{}\"", query);
            let options = SearchOptions {
                mode,
                limit: Some(top_k),
            };
            let start = Instant::now();
            let result = engine.search(&query, &options);
            println!("Ranked in {:?}", start.elapsed());

            print_results(&engine, &result, corpus.as_ref());
            Ok(())
        }
        Command::Batch {
            query_args,
            queries,
            top_k,
            output,
        } => {
            let engine = open_engine(&query_args)?;
            let options = SearchOptions {
                mode: SearchMode::Full,
                limit: Some(top_k),
            };

            let mut responses = Responses::new();
            for query in &queries {
                println!("Query: '{}'", query);
                let result = engine.search(query, &options);
                print_results(&engine, &result, None);

                // Queries without results are left out of the file
                if result.has_results() {
                    responses.insert(
                        query.clone(),
                        result
                            .documents
                            .into_iter()
                            .map(|d| (d.doc_id, d.score))
                            .collect(),
                    );
                }
            }

            save_responses(&output, &responses)?;
            println!("Saved {} responses to {}", responses.len(), output.display());
            Ok(())
        }
        Command::Serve { query_args, addr } => {
            let engine = open_engine(&query_args)?;
            serve(engine, &addr).await
        }
    }
}
