use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::Dataset;
use server::{DEFAULT_TOP_N, ModelUpdater, Recommender};
use std::path::PathBuf;
use std::time::Instant;
use store::{FeedbackLog, FeedbackRecord, SnapshotStore};

/// CineRecs - Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "cine-recs")]
#[command(about = "Movie recommendations from collaborative filtering", long_about = None)]
struct Cli {
    /// Path to MovieLens dataset directory
    #[arg(short, long, default_value = "data/ml-100k")]
    data_dir: PathBuf,

    /// Path to the feedback log
    #[arg(long, default_value = "feedback.csv")]
    feedback_file: PathBuf,

    /// Path to the persisted model snapshot
    #[arg(long, default_value = "dynamic_model.json")]
    model_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend similar movies (correlation strategy)
    Recommend {
        /// Movie title to find neighbors for (partial titles accepted)
        #[arg(long)]
        title: String,

        /// Number of recommendations to return
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },

    /// Recommend similar movies (matrix factorization strategy)
    Advanced {
        /// Movie title to find neighbors for (partial titles accepted)
        #[arg(long)]
        title: String,

        /// Number of recommendations to return
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },

    /// Show a summary of the loaded dataset
    Data,

    /// Record feedback on a recommendation
    Feedback {
        /// The movie the recommendation was generated for
        #[arg(long)]
        selected: String,

        /// The recommended movie being rated
        #[arg(long)]
        recommended: String,

        /// Similarity score that was shown with the recommendation
        #[arg(long)]
        score: f32,

        /// Your 1-5 verdict on the recommendation
        #[arg(long)]
        rating: f32,
    },

    /// Retrain the model with accumulated feedback
    Update,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Feedback capture does not need the dataset loaded
    if let Commands::Feedback {
        selected,
        recommended,
        score,
        rating,
    } = &cli.command
    {
        return handle_feedback(&cli.feedback_file, selected, recommended, *score, *rating);
    }

    println!("Loading MovieLens dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let dataset =
        Dataset::load_from_dir(&cli.data_dir).context("Failed to load MovieLens dataset")?;
    println!("{} Loaded dataset in {:?}", "✓".green(), start.elapsed());

    match cli.command {
        Commands::Recommend { title, top_n } => {
            let recommender = Recommender::new(dataset);
            handle_recommend(&recommender, &title, top_n, Strategy::Correlation)?
        }
        Commands::Advanced { title, top_n } => {
            let recommender = Recommender::new(dataset);
            handle_recommend(&recommender, &title, top_n, Strategy::Factorization)?
        }
        Commands::Data => handle_data(&dataset),
        Commands::Update => handle_update(dataset, &cli.feedback_file, &cli.model_file)?,
        Commands::Feedback { .. } => unreachable!("handled above"),
    }

    Ok(())
}

enum Strategy {
    Correlation,
    Factorization,
}

/// Resolve a free-text query to an exact matrix column by
/// case-insensitive substring match. Exact matches win; otherwise the
/// first (lexicographically smallest) substring match is taken.
fn resolve_title(titles: &[String], query: &str) -> Option<String> {
    let needle = query.to_lowercase();
    if let Some(exact) = titles.iter().find(|t| t.to_lowercase() == needle) {
        return Some(exact.clone());
    }
    titles
        .iter()
        .find(|t| t.to_lowercase().contains(&needle))
        .cloned()
}

fn handle_recommend(
    recommender: &Recommender,
    query: &str,
    top_n: usize,
    strategy: Strategy,
) -> Result<()> {
    let matrix = recommender.matrix()?;
    let Some(title) = resolve_title(matrix.titles(), query) else {
        println!(
            "{}",
            format!("No close match found for '{}'. Please try again.", query).red()
        );
        return Ok(());
    };
    println!("Best match found: {}", title.bold().green());

    let start = Instant::now();
    let recs = match strategy {
        Strategy::Correlation => recommender.similarity_recommendations(&title, top_n)?,
        Strategy::Factorization => recommender.latent_recommendations(&title, top_n)?,
    };

    if recs.is_empty() {
        println!(
            "{}",
            "No neighbors with enough co-rating users were found.".yellow()
        );
        return Ok(());
    }

    println!(
        "\n{} (computed in {:?}):",
        format!("Movies similar to '{}'", title).bold(),
        start.elapsed()
    );
    for (rank, rec) in recs.iter().enumerate() {
        println!(
            "  {:>2}. {} {}",
            rank + 1,
            rec.title,
            format!("({:.2})", rec.score).cyan()
        );
    }
    Ok(())
}

fn handle_data(dataset: &Dataset) {
    let (movies, ratings, users) = dataset.counts();
    println!("{}", "Dataset summary".bold());
    println!("  Movies:  {}", movies);
    println!("  Ratings: {}", ratings);
    println!("  Users:   {}", users);
}

fn handle_feedback(
    feedback_file: &PathBuf,
    selected: &str,
    recommended: &str,
    score: f32,
    rating: f32,
) -> Result<()> {
    let log = FeedbackLog::new(feedback_file);
    log.append(&[FeedbackRecord {
        selected_movie: selected.to_string(),
        recommended_movie: recommended.to_string(),
        similarity_score: score,
        user_rating: rating,
        timestamp: Utc::now().to_rfc3339(),
    }])
    .context("Failed to append feedback")?;

    println!(
        "{} Feedback saved to {}",
        "✓".green(),
        feedback_file.display()
    );
    Ok(())
}

fn handle_update(dataset: Dataset, feedback_file: &PathBuf, model_file: &PathBuf) -> Result<()> {
    let recommender = Recommender::new(dataset.clone());
    let mut updater = ModelUpdater::new(
        &dataset,
        FeedbackLog::new(feedback_file),
        SnapshotStore::new(model_file),
    );

    let start = Instant::now();
    let snapshot = recommender.update_model(&mut updater)?;
    println!(
        "{} Model updated in {:?} and saved to {}",
        "✓".green(),
        start.elapsed(),
        model_file.display()
    );
    println!(
        "  Feedback applied: {}, dropped: {}",
        snapshot.feedback_applied, snapshot.feedback_dropped
    );
    if !snapshot.factors.converged {
        println!(
            "{}",
            format!(
                "  Factorization stopped at the iteration limit ({} iterations); partial fit kept",
                snapshot.factors.iterations
            )
            .yellow()
        );
    }
    Ok(())
}
