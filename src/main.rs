//! Baseball Matchup Prediction CLI
//!
//! Pitcher/batter matchup statistics and a random forest for home-win prediction.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use matchup::{Config, Result};

#[derive(Parser)]
#[command(name = "matchup")]
#[command(about = "Baseball game prediction from pitcher/batter matchups", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train the random forest (uses the cached model unless forced)
    Train {
        /// Retrain even if a model file exists
        #[arg(long)]
        force: bool,
        /// Run the cross-validated grid search
        #[arg(long)]
        search: bool,
    },
    /// Predict a single pitcher/batter matchup
    Predict {
        /// Pitcher id
        pitcher: i64,
        /// Batter id
        batter: i64,
        /// The pitcher plays for the away team
        #[arg(long)]
        away: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict a game from lineups (pitcher id first, then batters)
    PredictGame {
        /// Home lineup, comma separated
        #[arg(long, value_delimiter = ',', requires = "away")]
        home: Vec<i64>,
        /// Away lineup, comma separated
        #[arg(long, value_delimiter = ',', requires = "home")]
        away: Vec<i64>,
        /// JSON lineup file with one entry per game
        #[arg(long, conflicts_with_all = ["home", "away"])]
        lineups: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Evaluate the stored model on a historical date range
    Backtest {
        /// First game date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last game date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import a statcast CSV export into the event table
    Import {
        /// CSV file path
        path: String,
    },
    /// Import a player_id,season,team roster CSV
    ImportRosters {
        /// CSV file path
        path: String,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
    /// Export model for deployment
    Export {
        /// Output path
        output: String,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { path } => commands::data_import(&config, &path),
            DataCommands::ImportRosters { path } => commands::import_rosters(&config, &path),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train { force, search } => commands::train(&config, force, search),
        Commands::Predict {
            pitcher,
            batter,
            away,
            format,
        } => commands::predict(&config, pitcher, batter, !away, format),
        Commands::PredictGame {
            home,
            away,
            lineups,
            format,
        } => commands::predict_game(&config, home, away, lineups, format),
        Commands::Backtest { start, end } => commands::backtest(&config, start, end),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
            ModelCommands::Export { output } => commands::model_export(&config, &output),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use matchup::data::{
        import_roster_csv, import_statcast_csv, Database, JsonLineupFile, Lineup, LineupSource,
        StaticLineups, TeamDirectory,
    };
    use matchup::features::PitcherTeams;
    use matchup::model::ModelArtifact;
    use matchup::predict::{format_matchup, format_prediction, Predictor};
    use matchup::training::ModelTrainer;
    use matchup::{PlateAppearance, PlayerId};
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        // Create data directory
        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'matchup data import <statcast.csv>' to load events");
        println!("  3. Run 'matchup train' to train the model");
        println!("  4. Run 'matchup predict <PITCHER_ID> <BATTER_ID>' to make predictions");

        Ok(())
    }

    fn open_database(config: &Config) -> Result<Database> {
        Database::open_with_table(&config.data.database_path, &config.data.table)
    }

    /// Events plus the pitcher team lookup built from them and the rosters
    fn load_history(config: &Config) -> Result<(Vec<PlateAppearance>, PitcherTeams)> {
        let db = open_database(config)?;
        let events = db.load_events()?;
        let rosters = db.load_rosters()?;
        log::info!(
            "Loaded {} events and {} roster entries",
            events.len(),
            rosters.len()
        );
        let teams = TeamDirectory::load_or_default(config.data.teams_path.as_deref())?;
        let pitcher_teams = PitcherTeams::from_events(&events)
            .with_rosters(&rosters)
            .with_directory(teams);
        Ok((events, pitcher_teams))
    }

    fn load_model(config: &Config) -> Result<ModelArtifact> {
        let artifact = ModelArtifact::load(&config.data.model_path)?;
        artifact.expect_feature_set(config.training.feature_set)?;
        Ok(artifact)
    }

    pub fn data_import(config: &Config, path: &str) -> Result<()> {
        let db = open_database(config)?;
        let summary = import_statcast_csv(&db, path)?;
        println!(
            "Stored {} events in {} ({} rows skipped)",
            summary.inserted, config.data.table, summary.skipped
        );
        Ok(())
    }

    pub fn import_rosters(config: &Config, path: &str) -> Result<()> {
        let db = open_database(config)?;
        let teams = TeamDirectory::load_or_default(config.data.teams_path.as_deref())?;
        let count = import_roster_csv(&db, path, &teams)?;
        println!("Stored {} roster entries", count);
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = open_database(config)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:       {}", config.data.database_path);
        println!("  Table:      {}", db.table());
        println!("  Events:     {} ({} with outcome)", stats.event_count, stats.outcome_count);
        println!("  Games:      {}", stats.game_count);
        println!("  Pitchers:   {}", stats.pitcher_count);
        println!("  Batters:    {}", stats.batter_count);
        println!("  Rosters:    {}", stats.roster_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:      {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn train(config: &Config, force: bool, search: bool) -> Result<()> {
        let mut config = config.clone();
        config.training.search |= search;

        let trainer = ModelTrainer::from_config(&config);
        let path = Path::new(&config.data.model_path);
        let outcome = trainer.load_or_train(path, force, || load_history(&config))?;

        let summary = &outcome.artifact.training;
        println!("\nModel: {}", config.data.model_path);
        println!("  Feature set:  {:?}", outcome.artifact.feature_set);
        println!(
            "  Rows:         {} (train {}, test {})",
            summary.rows, summary.train_rows, summary.test_rows
        );
        println!(
            "  Forest:       {} trees, max depth {:?}, min split {}",
            summary.forest.n_trees, summary.forest.max_depth, summary.forest.min_samples_split
        );
        if let Some(search) = &outcome.search {
            println!(
                "  Grid search:  {} candidates, best cv accuracy {:.2}%",
                search.candidates.len(),
                search.best_accuracy * 100.0
            );
        }
        match (&outcome.evaluation, summary.accuracy) {
            (Some(evaluation), _) => {
                println!("  Test:         {}", evaluation);
                println!("\n{}", evaluation.report);
            }
            (None, Some(accuracy)) => {
                println!("  Cached model test accuracy: {:.2}%", accuracy * 100.0);
            }
            (None, None) => println!("  No held-out rows"),
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        pitcher: i64,
        batter: i64,
        is_home: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let artifact = load_model(config)?;
        let (events, _) = load_history(config)?;
        let predictor = Predictor::from_events(artifact, &events);

        let prediction = predictor.predict_matchup(PlayerId(pitcher), PlayerId(batter), is_home)?;

        match format {
            OutputFormat::Table => {
                print!("{}", format_matchup(&prediction));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            }
            OutputFormat::Csv => {
                println!("pitcher,batter,is_home,probability,has_history");
                println!(
                    "{},{},{},{:.3},{}",
                    pitcher,
                    batter,
                    is_home,
                    prediction.probability,
                    prediction.availability.has_history()
                );
            }
        }

        Ok(())
    }

    pub fn predict_game(
        config: &Config,
        home: Vec<i64>,
        away: Vec<i64>,
        lineups: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let source: Box<dyn LineupSource> = match lineups {
            Some(path) => Box::new(JsonLineupFile::new(path)),
            None => Box::new(StaticLineups::single(
                Lineup::from_ids(&home)?,
                Lineup::from_ids(&away)?,
            )),
        };

        let artifact = load_model(config)?;
        let (events, _) = load_history(config)?;
        let predictor = Predictor::from_events(artifact, &events);
        let teams = TeamDirectory::load_or_default(config.data.teams_path.as_deref())?;

        let results = predictor.predict_games(source.as_ref());
        if results.is_empty() {
            println!("No lineups available from {}", source.name());
            return Ok(());
        }

        if let OutputFormat::Csv = format {
            println!("game,home,away,home_win_prob,matchups,with_history,confidence");
        }
        for (game, prediction) in results {
            let prediction = match prediction {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("{}: {}", game.label(), e);
                    continue;
                }
            };
            match format {
                OutputFormat::Table => {
                    print!("{}", format_prediction(&prediction, &game, &teams));
                }
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "game_pk": game.game_pk,
                        "home": game.home_team,
                        "away": game.away_team,
                        "home_win_prob": prediction.home_win_prob,
                        "with_history": prediction.with_history(),
                        "confidence": format!("{}", prediction.confidence),
                        "matchups": prediction.matchups,
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                OutputFormat::Csv => {
                    println!(
                        "{},{},{},{:.3},{},{},{}",
                        game.game_pk.map(|g| g.0.to_string()).unwrap_or_default(),
                        game.home_team,
                        game.away_team,
                        prediction.home_win_prob,
                        prediction.matchups.len(),
                        prediction.with_history(),
                        prediction.confidence
                    );
                }
            }
        }

        Ok(())
    }

    pub fn backtest(config: &Config, start: NaiveDate, end: NaiveDate) -> Result<()> {
        let artifact = load_model(config)?;
        let db = open_database(config)?;
        let events = db.load_events_between(start, end)?;
        let teams = TeamDirectory::load_or_default(config.data.teams_path.as_deref())?;
        let pitcher_teams = PitcherTeams::from_events(&events)
            .with_rosters(&db.load_rosters()?)
            .with_directory(teams);

        let report = matchup::training::backtest(&artifact, &events, &pitcher_teams, start, end)?;
        println!("{}", report);
        println!("\n{}", report.evaluation.report);

        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let artifact = ModelArtifact::load(&config.data.model_path)?;
        let summary = &artifact.training;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:           {}", config.data.model_path);
        println!("  Format version: {}", artifact.format_version);
        println!("  Features:       {}", artifact.feature_names.join(", "));
        println!("  Classes:        {:?}", artifact.classes);
        println!("  Trees:          {}", artifact.forest.n_trees());
        println!("  Max depth:      {:?}", summary.forest.max_depth);
        println!("  Min split:      {}", summary.forest.min_samples_split);
        println!("  Seed:           {}", summary.seed);
        println!(
            "  Rows:           {} (train {}, test {})",
            summary.rows, summary.train_rows, summary.test_rows
        );
        if let (Some(first), Some(last)) = (summary.first_game, summary.last_game) {
            println!("  Games:          {} to {}", first, last);
        }
        if let Some(accuracy) = summary.accuracy {
            println!("  Test accuracy:  {:.2}%", accuracy * 100.0);
        }
        if let Some(auc) = summary.roc_auc {
            println!("  Test ROC-AUC:   {:.4}", auc);
        }

        Ok(())
    }

    pub fn model_export(config: &Config, output: &str) -> Result<()> {
        // Validates before copying
        let artifact = ModelArtifact::load(&config.data.model_path)?;
        artifact.save_atomic(output)?;
        println!("Model exported to {}", output);

        Ok(())
    }
}
