//! CLI entry point for spacetraveling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetraveling::{commands, server, Blog};

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "A static blog generated from a Prismic repository", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate static files
    #[command(alias = "g")]
    Generate,

    /// Start a local server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Serve the existing public folder without generating first
        #[arg(long)]
        r#static: bool,
    },

    /// Clean the public folder
    Clean,

    /// List all posts
    List,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,tower_http=debug,info"
    } else {
        "spacetraveling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Generate => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate().await?;
            println!("Generated successfully!");
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let blog = Blog::new(&base_dir)?;
            let client = blog.client()?;

            if !r#static {
                tracing::info!("Generating static files...");
                commands::generate::run_with(&blog, &client).await?;
            }

            tracing::info!("Starting server at http://{}:{}", ip, port);
            server::start(&blog, client, &ip, port, open).await?;
        }

        Commands::Clean => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List => {
            let blog = Blog::new(&base_dir)?;
            commands::list::run(&blog).await?;
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
