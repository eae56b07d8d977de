use std::path::PathBuf;

use api_shared::{HistoryRes, ListMedicinesRes, Medicine, Profile, SearchRes, TrendingRes};
use clap::{Parser, Subcommand};
use medinfo_core::config::{
    fallback_timeout_from_env_value, ocr_command_from_env_value, summary_endpoint_from_env_value,
};
use medinfo_core::constants::{DEFAULT_DATA_DIR, TRENDING_QUERIES};
use medinfo_core::input::{FacingMode, ImageSource};
use medinfo_core::{catalogue, CaptureError, CoreConfig, Credentials, SearchOutcome, Services};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medinfo")]
#[command(about = "MedInfo medicine reference lookup")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search medicines, falling back to the encyclopedia
    Search {
        /// Query words
        query: Vec<String>,
    },
    /// Search by voice (Ctrl-C to stop listening)
    Listen,
    /// Search by the text in an image file
    Scan {
        /// Image file path
        image: PathBuf,
    },
    /// Capture a camera frame and search by its text
    Camera {
        /// Use the front camera instead of the rear one
        #[arg(long)]
        front: bool,
    },
    /// List all medicines
    Medicines,
    /// Show one medicine
    Show {
        /// Medicine identifier
        id: u32,
    },
    /// Show trending queries
    Trending,
    /// Recent searches
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Sign in, or register when a name is given
    Login {
        email: String,
        password: String,
        /// Full name (registers a new account)
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign in as the demo user
    DemoLogin,
    /// Sign out
    Logout,
    /// Show the signed-in user's profile
    Profile,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List recent searches
    List,
    /// Forget one search
    Remove {
        /// Query to forget
        query: String,
    },
    /// Forget all searches
    Clear,
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    let data_dir = std::env::var("MEDINFO_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let cfg = CoreConfig::new(
        PathBuf::from(data_dir),
        summary_endpoint_from_env_value(std::env::var("MEDINFO_SUMMARY_ENDPOINT").ok())?,
        fallback_timeout_from_env_value(std::env::var("MEDINFO_FALLBACK_TIMEOUT_SECS").ok())?,
        ocr_command_from_env_value(std::env::var("MEDINFO_OCR_CMD").ok()),
        std::env::var("MEDINFO_SPEECH_CMD").ok(),
        std::env::var("MEDINFO_CAMERA_CMD").ok(),
    )?;
    Ok(cfg)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_medicine(m: &Medicine) {
    println!("[{}] {}", m.id, m.name);
    println!("    Category:     {}", m.category);
    println!("    Uses:         {}", m.uses);
    println!("    Dosage:       {}", m.dosage);
    println!("    Side effects: {}", m.side_effects);
    println!("    Precautions:  {}", m.precautions);
}

fn print_outcome(json: bool, query: Option<String>, outcome: &SearchOutcome) -> anyhow::Result<()> {
    let res = SearchRes::new(query, outcome);
    if json {
        return print_json(&res);
    }

    match outcome {
        SearchOutcome::NoQuery => println!("Nothing to search for."),
        SearchOutcome::Local(_) => {
            println!("{} result(s):", res.medicines.len());
            for m in &res.medicines {
                print_medicine(m);
            }
        }
        SearchOutcome::Remote(_) => {
            if let Some(s) = &res.summary {
                println!("{}", s.title);
                if let Some(description) = &s.description {
                    println!("  {}", description);
                }
                println!();
                println!("{}", s.extract);
                println!();
                println!("Read more: {}", s.page_url);
            }
        }
        SearchOutcome::NoInformation => {
            println!(
                "No information found for \"{}\".",
                res.query.as_deref().unwrap_or_default()
            );
        }
        SearchOutcome::Superseded => println!("Search was superseded by a newer query."),
    }
    Ok(())
}

fn progress(p: u8) {
    eprint!("\rScanning... {p}%");
    if p >= 100 {
        eprintln!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medinfo=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let Some(command) = cli.command else {
        println!("Use 'medinfo --help' for commands");
        return Ok(());
    };

    let cfg = config_from_env()?;
    let services = Services::from_config(&cfg)?;
    tracing::debug!("storage at {}", cfg.storage_path().display());
    let pipeline = &services.pipeline;

    match command {
        Commands::Search { query } => {
            let query = query.join(" ");
            let outcome = pipeline.search(&query).await;
            print_outcome(json, Some(query), &outcome)?;
        }
        Commands::Listen => {
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            eprintln!("Listening...");
            match pipeline.search_speech(services.speech.as_deref(), cancel).await {
                Ok(Some(outcome)) => {
                    let query = pipeline.current_view().query;
                    print_outcome(json, query, &outcome)?;
                }
                Ok(None) => println!("No speech recognised."),
                Err(e) if e.is_unsupported() => {
                    anyhow::bail!("Voice search is not supported in this environment")
                }
                Err(e) => {
                    tracing::error!("voice search failed: {}", e);
                    anyhow::bail!(e)
                }
            }
        }
        Commands::Scan { image } => {
            let Some(ocr) = services.ocr.as_deref() else {
                anyhow::bail!(CaptureError::Unsupported("image search"));
            };
            let outcome = pipeline
                .search_image(ocr, &ImageSource::File(image), &progress)
                .await
                .inspect_err(|e| tracing::error!("image search failed: {}", e))?;
            print_outcome(json, pipeline.current_view().query, &outcome)?;
        }
        Commands::Camera { front } => {
            let (Some(camera), Some(ocr)) = (services.camera.as_deref(), services.ocr.as_deref())
            else {
                anyhow::bail!(CaptureError::Unsupported("camera search"));
            };
            let facing = if front {
                FacingMode::User
            } else {
                FacingMode::Environment
            };
            let outcome = pipeline
                .search_camera(camera, facing, ocr, &progress)
                .await
                .inspect_err(|e| tracing::error!("camera search failed: {}", e))?;
            print_outcome(json, pipeline.current_view().query, &outcome)?;
        }
        Commands::Medicines => {
            let medicines: Vec<Medicine> = catalogue::all().iter().map(Medicine::from).collect();
            if json {
                print_json(&ListMedicinesRes { medicines })?;
            } else {
                for m in &medicines {
                    println!("{:>2}  {:<32} {}", m.id, m.name, m.category);
                }
            }
        }
        Commands::Show { id } => {
            let Some(record) = catalogue::find_by_id(id) else {
                anyhow::bail!("No medicine with id {}", id);
            };
            let medicine = Medicine::from(record);
            if json {
                print_json(&medicine)?;
            } else {
                print_medicine(&medicine);
            }
        }
        Commands::Trending => {
            let queries: Vec<String> = TRENDING_QUERIES.iter().map(|q| q.to_string()).collect();
            if json {
                print_json(&TrendingRes { queries })?;
            } else {
                for q in queries {
                    println!("{}", q);
                }
            }
        }
        Commands::History { action } => {
            match action.unwrap_or(HistoryAction::List) {
                HistoryAction::List => {}
                HistoryAction::Remove { query } => {
                    if !pipeline.remove_history_entry(&query)? {
                        tracing::warn!("\"{}\" is not in the search history", query);
                    }
                }
                HistoryAction::Clear => pipeline.clear_history()?,
            }
            let entries = pipeline.history();
            if json {
                print_json(&HistoryRes { entries })?;
            } else if entries.is_empty() {
                println!("No recent searches.");
            } else {
                for entry in entries {
                    println!("{}", entry);
                }
            }
        }
        Commands::Login {
            email,
            password,
            name,
        } => {
            let credentials = match name {
                Some(name) => Credentials::Register {
                    name,
                    email,
                    password,
                },
                None => Credentials::SignIn { email, password },
            };
            let profile = Profile::from(services.session.sign_in(credentials)?);
            if json {
                print_json(&profile)?;
            } else {
                println!("Signed in as {} ({})", profile.name, profile.email);
            }
        }
        Commands::DemoLogin => {
            let profile = Profile::from(services.session.demo_sign_in()?);
            if json {
                print_json(&profile)?;
            } else {
                println!("Signed in as {} ({})", profile.name, profile.email);
            }
        }
        Commands::Logout => {
            services.session.sign_out()?;
            println!("Signed out");
        }
        Commands::Profile => match services.session.current_profile()? {
            Some(profile) => {
                let profile = Profile::from(profile);
                if json {
                    print_json(&profile)?;
                } else {
                    println!("{}", profile.name);
                    println!("  Email:    {}", profile.email);
                    println!("  Role:     {}", profile.role);
                    println!("  Joined:   {}", profile.join_date);
                    println!("  Verified: {}", if profile.verified { "yes" } else { "no" });
                }
            }
            None => anyhow::bail!("Not signed in. Use 'medinfo login' or 'medinfo demo-login'."),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_login_with_name_parses() {
        let cli = Cli::try_parse_from([
            "medinfo",
            "login",
            "jane@example.org",
            "secret",
            "--name",
            "Dr. Jane Doe",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Login { name: Some(ref n), .. }) if n == "Dr. Jane Doe"
        ));
    }

    #[test]
    fn test_history_defaults_to_list() {
        let cli = Cli::try_parse_from(["medinfo", "history"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::History { action: None })));
    }

    #[test]
    fn test_camera_front_flag() {
        let cli = Cli::try_parse_from(["medinfo", "camera", "--front"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Camera { front: true })));

        let cli = Cli::try_parse_from(["medinfo", "camera"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Camera { front: false })));
    }
}
