use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use filejy::api::auth::{CredentialError, CredentialStore, KeychainStore, Session};
use filejy::api::{ApiClient, ApiError};
use filejy::clipboard::{Clipboard, SystemClipboard, LINUX_HOLD};
use filejy::config::Config;
use filejy::render;
use filejy::views::home::HomeView;
use filejy::views::share::ShareView;
use filejy::views::sign_in::{SignInForm, SignInView};
use filejy::views::sign_up::{SignUpForm, SignUpView};
use filejy::views::ViewError;

#[derive(Parser, Debug)]
#[command(name = "filejy", version, about = "Personal cloud storage from the terminal")]
struct Cli {
    /// API base URL (overrides FILEJY_API_URL / VITE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List your uploaded files
    List,
    /// Upload a file into your storage
    Upload { path: PathBuf },
    /// Toggle sharing on a file; the public link is copied when sharing turns on
    Share { file_id: String },
    /// Download one of your files
    Download {
        file_id: String,
        /// Destination directory (defaults to the download directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Browse the files another user is sharing
    Shared {
        user_id: String,
        /// Download this file from the shared list
        #[arg(long)]
        download: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Sign in and remember the session
    SignIn {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Forget the stored session
    SignOut,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Could not read input: {0}")]
    Prompt(String),
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        CliError::View(ViewError::Api(err))
    }
}

impl CliError {
    fn is_unauthenticated(&self) -> bool {
        matches!(self, CliError::View(e) if e.is_unauthenticated())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("filejy=info")).init();

    let cli = Cli::parse();
    let config = Config::from_env().with_api_url(cli.api_url.as_deref());
    log::debug!("API base URL: {}", config.api_base_url);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupted, cancelling requests");
                shutdown.cancel();
            }
        });
    }

    match run(cli.command, &config, &shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_unauthenticated() => {
            eprintln!("{}. Sign in with `filejy sign-in --email <email>`.", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &Config, shutdown: &CancellationToken) -> Result<(), CliError> {
    let store: Arc<dyn CredentialStore> = Arc::new(KeychainStore::new(&config.keychain_service));
    let session = match Session::restore(Arc::clone(&store)) {
        Ok(session) => session,
        Err(e) => {
            log::warn!("Failed to read stored credential: {}", e);
            Session::signed_out(store)
        }
    };
    let client = Arc::new(ApiClient::new(&config.api_base_url, Arc::new(session)));
    let clipboard = Arc::new(SystemClipboard::new());

    match command {
        Command::List => {
            let home = mount_home(&client, &clipboard, config, shutdown).await?;
            print_home(&home);
        }
        Command::Upload { path } => {
            let home = mount_home(&client, &clipboard, config, shutdown).await?;
            home.upload(&path).await?;
            println!("Uploaded {}", path.display());
            print_home(&home);
        }
        Command::Share { file_id } => {
            let home = mount_home(&client, &clipboard, config, shutdown).await?;
            let outcome = home.toggle_sharing(&file_id).await?;
            match (outcome.link, outcome.copied) {
                (Some(link), true) => println!("Sharing on. Link copied: {}", link),
                (Some(link), false) => println!("Sharing on. Link: {}", link),
                (None, _) => println!("Sharing off."),
            }
            print_home(&home);
            if clipboard.holding() {
                println!(
                    "Keeping the link on the clipboard for up to {} s. Press Ctrl-C to stop.",
                    LINUX_HOLD.as_secs()
                );
                clipboard.settle(shutdown).await;
            }
        }
        Command::Download { file_id, out } => {
            let home = mount_home(&client, &clipboard, config, shutdown).await?;
            let dest = out.unwrap_or_else(|| config.download_dir.clone());
            let saved = home.download(&file_id, &dest).await.inspect_err(|e| {
                log::error!("Download of {} failed: {}", file_id, e);
            })?;
            println!("Saved {}", saved.display());
        }
        Command::Shared {
            user_id,
            download,
            out,
        } => {
            let view = ShareView::mount(Arc::clone(&client), &user_id, shutdown).await;
            if let Some(err) = view.files().error() {
                return Err(err.into());
            }
            if let Some(listing) = view.files().data() {
                println!("{}", render::file_table(&listing, |_| false, render::EMPTY_SHARED));
            }
            if let Some(file_id) = download {
                let dest = out.unwrap_or_else(|| config.download_dir.clone());
                let saved = view.download(&file_id, &dest).await.inspect_err(|e| {
                    log::error!("Download of {} failed: {}", file_id, e);
                })?;
                println!("Saved {}", saved.display());
            }
        }
        Command::SignIn { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password")?,
            };
            let view = SignInView::new(Arc::clone(&client), shutdown);
            let signed_in = view.submit(&SignInForm { email, password }).await?;
            println!("Signed in as {}", signed_in.username);

            let home = mount_home(&client, &clipboard, config, shutdown).await?;
            print_home(&home);
        }
        Command::SignUp {
            email,
            username,
            password,
            confirm_password,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password")?,
            };
            let confirm_password = match confirm_password {
                Some(p) => p,
                None => prompt_password("Confirm password")?,
            };
            let form = SignUpForm {
                email,
                username,
                password,
                confirm_password,
            };
            let view = SignUpView::new(Arc::clone(&client), shutdown);
            let username = view.submit(&form).await?;
            println!(
                "{} registered. Sign in with `filejy sign-in --email {}`.",
                username, form.email
            );
        }
        Command::SignOut => {
            client.session().sign_out().await?;
            println!("Signed out.");
        }
    }

    Ok(())
}

/// Mount the home view; a failed first load is an error for the CLI.
async fn mount_home(
    client: &Arc<ApiClient>,
    clipboard: &Arc<SystemClipboard>,
    config: &Config,
    shutdown: &CancellationToken,
) -> Result<HomeView, CliError> {
    let home = HomeView::mount(
        Arc::clone(client),
        Arc::clone(clipboard) as Arc<dyn Clipboard>,
        &config.share_domain,
        shutdown,
    )
    .await;
    match home.files().error() {
        Some(err) => Err(err.into()),
        None => Ok(home),
    }
}

fn print_home(home: &HomeView) {
    if let Some(listing) = home.files().data() {
        println!(
            "{}",
            render::file_table(&listing, |id| home.is_copied(id), render::EMPTY_HOME)
        );
    }
}

fn prompt_password(prompt: &str) -> Result<String, CliError> {
    dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| CliError::Prompt(e.to_string()))
}
