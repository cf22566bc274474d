mod commands;
mod render;

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clauseguard_api::parse::SignUpOutcome;
use clauseguard_appcore::AppService;
use clauseguard_appcore::service::update_config;
use clauseguard_core::listing::ContractQuery;
use clauseguard_core::route::{Route, Screen};
use clauseguard_core::toast::Toast;
use clauseguard_core::types::{ContractId, ToastId};
use clauseguard_engine::error::ClientError;
use clauseguard_engine::lifecycle::AnalysisState;
use clauseguard_engine::traits::{MemoryVault, SessionVault};
use clauseguard_runtime::defaults::default_config_path;
use clauseguard_runtime::secrets::KeyringVault;
use commands::{Cli, Commands};

const EXIT_SIGNED_OUT: i32 = 2;

fn init_logger(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Prints each toast once, in the order it was raised.
#[derive(Default)]
struct ToastPrinter {
    seen: HashSet<ToastId>,
}

impl ToastPrinter {
    fn flush(&mut self, toasts: &[Toast]) {
        for t in toasts {
            if self.seen.insert(t.id) {
                eprintln!("{}", render::toast(t));
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_logger(args.verbose);

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    let opened = config_path(args.config)
        .and_then(|path| open_service(&path, args.ephemeral).map(|svc| (path, svc)));
    let (path, svc) = match opened {
        Ok(opened) => opened,
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    };

    // Toasts can expire while a command runs; print them as they arrive.
    let mut toasts = svc.toasts().subscribe();
    let (stop, mut stopped) = tokio::sync::oneshot::channel::<()>();
    let printer = tokio::spawn(async move {
        let mut printer = ToastPrinter::default();
        loop {
            let list = toasts.borrow_and_update().clone();
            printer.flush(&list);
            tokio::select! {
                r = toasts.changed() => if r.is_err() { break },
                _ = &mut stopped => break,
            }
        }
        printer
    });

    let result = run(&svc, &path, command).await;

    let remaining = svc.toasts().snapshot();
    let _ = stop.send(());
    if let Ok(mut printer) = printer.await {
        printer.flush(&remaining);
    }

    if let Err(err) = result {
        process::exit(report(&err));
    }
}

fn config_path(given: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match given {
        Some(p) => Ok(p),
        None => default_config_path().context("cannot determine a config directory; pass --config"),
    }
}

fn open_service(path: &Path, ephemeral: bool) -> anyhow::Result<AppService> {
    let vault: Arc<dyn SessionVault> = if ephemeral {
        Arc::new(MemoryVault::default())
    } else {
        Arc::new(KeyringVault::default())
    };
    AppService::open(path, vault)
}

fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ClientError>() {
        Some(e) if e.is_auth_loss() => {
            eprintln!("{}", e.user_message());
            eprintln!("Sign in with: clauseguard login <email>");
            EXIT_SIGNED_OUT
        }
        Some(e) => {
            log::debug!("{e:?}");
            eprintln!("error: {}", e.user_message());
            1
        }
        None => {
            eprintln!("error: {err:#}");
            1
        }
    }
}

async fn run(svc: &AppService, config_path: &Path, command: Commands) -> anyhow::Result<()> {
    // Commands that read the contract list load it themselves.
    svc.session().init().await;

    if let Some(path) = command.route() {
        match svc.screen(&path) {
            Screen::Page(Route::NotFound(p)) => anyhow::bail!("no such page: {p}"),
            Screen::Page(_) => {}
            Screen::Login | Screen::Loading => return Err(ClientError::NotAuthenticated.into()),
        }
    }

    match command {
        Commands::Login { email, password } => {
            let password = password_or_prompt(password, "Password")?;
            let user = svc.sign_in(&email, &password).await?;
            println!("Signed in as {}", user.display_name());
        }
        Commands::Signup { email, password } => {
            let password = password_or_prompt(password, "Password")?;
            match svc.sign_up(&email, &password).await? {
                SignUpOutcome::SignedIn(session) => {
                    println!("Account created; signed in as {}", session.user.display_name());
                }
                SignUpOutcome::ConfirmationRequired(_) => {
                    println!("Check your email to confirm your account, then sign in.");
                }
            }
        }
        Commands::Logout => {
            svc.sign_out().await;
            println!("Signed out");
        }
        Commands::Whoami => {
            if let Some(user) = svc.session().current_user() {
                println!("{}", user.display_name());
                if let Some(email) = user.email.as_deref() {
                    println!("{email}");
                }
            }
        }
        Commands::ResetPassword { email, origin } => {
            svc.reset_password(&email, origin.as_deref()).await?;
            println!("If an account exists for {email}, a reset link is on its way.");
        }
        Commands::ChangePassword => {
            let new = prompt("New password")?;
            let confirm = prompt("Confirm new password")?;
            svc.change_password(&new, &confirm).await?;
        }
        Commands::ProviderUrl { provider, origin } => {
            println!("{}", svc.provider_sign_in_url(&provider, &origin)?);
        }
        Commands::Config {
            api_base,
            supabase_url,
            supabase_anon_key,
        } => {
            let cfg = if api_base.is_none() && supabase_url.is_none() && supabase_anon_key.is_none() {
                svc.config().clone()
            } else {
                update_config(config_path, |cfg| {
                    if let Some(v) = api_base {
                        cfg.api_base = v;
                    }
                    if let Some(v) = supabase_url {
                        cfg.supabase_url = v;
                    }
                    if let Some(v) = supabase_anon_key {
                        cfg.supabase_anon_key = v;
                    }
                })?
            };
            println!("config file: {}", config_path.display());
            print!("{}", render::settings(&cfg));
        }
        Commands::Dashboard => {
            cache_contracts(svc).await?;
            let stats = svc.dashboard().await?;
            print!("{}", render::dashboard(&stats));
        }
        Commands::List {
            search,
            status,
            sort,
        } => {
            svc.load_contracts().await?;
            let query = ContractQuery {
                search,
                status,
                sort,
            };
            print!("{}", render::contract_table(&svc.contracts(&query)));
        }
        Commands::Upload { path } => {
            let contract = svc.upload_path(&path).await?;
            println!("Uploaded as contract {}", contract.id);
            println!("Analyze it with: clauseguard analyze {}", contract.id);
        }
        Commands::Analyze { id, analysis_type } => {
            cache_contracts(svc).await?;
            let (screen, handle) = svc.start_analysis(ContractId::new(id), analysis_type);

            let mut state = screen.subscribe();
            let progress = tokio::spawn(async move {
                while state.changed().await.is_ok() {
                    match &*state.borrow_and_update() {
                        AnalysisState::Polling { attempt } => {
                            log::info!("waiting for analysis (check {attempt})")
                        }
                        other => log::info!("analysis {}", other.label()),
                    }
                }
            });

            let outcome = tokio::select! {
                r = handle.wait() => r,
                _ = tokio::signal::ctrl_c() => Err(ClientError::Cancelled),
            };
            progress.abort();

            let analysis = outcome?;
            let contract = svc.store().get(screen.contract_id());
            print!("{}", render::analysis(contract.as_deref(), &analysis));
        }
        Commands::Show { id } => {
            let screen = svc.analysis(ContractId::new(id));
            let contract = screen.load().await?;
            match screen.state() {
                AnalysisState::Completed(analysis) => {
                    print!("{}", render::analysis(Some(&contract), &analysis));
                }
                AnalysisState::Failed(f) => anyhow::bail!(f.message()),
                _ => {
                    println!(
                        "{} has not been analyzed yet ({}).",
                        contract.original_filename, contract.status
                    );
                    println!("Start one with: clauseguard analyze {}", contract.id);
                }
            }
        }
        Commands::Delete { id, yes } => {
            cache_contracts(svc).await?;
            let id = ContractId::new(id);
            let name = svc
                .store()
                .get(&id)
                .map(|c| c.original_filename.clone())
                .unwrap_or_else(|| format!("contract {id}"));
            if !yes && !prompt_confirm(&format!("Delete {name}?"), Some(false))? {
                return Ok(());
            }
            svc.delete_contract(&id).await?;
            println!("Deleted {name}");
        }
        Commands::Download { id, dest } => {
            let bytes = svc.download_to(&ContractId::new(id), &dest).await?;
            println!("Saved {} ({bytes} bytes)", dest.display());
        }
    }
    Ok(())
}

/// Loads the contract list for commands that can still work from a stale or
/// empty cache; only a lost session stops them. Other failures are toasted.
async fn cache_contracts(svc: &AppService) -> Result<(), ClientError> {
    match svc.load_contracts().await {
        Err(e) if e.is_auth_loss() => Err(e),
        _ => Ok(()),
    }
}

fn prompt(label: &str) -> io::Result<String> {
    let mut input = String::new();
    eprint!("{label}: ");
    io::stderr().flush()?;
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

fn password_or_prompt(given: Option<String>, label: &str) -> io::Result<String> {
    match given {
        Some(p) => Ok(p),
        None => prompt(label),
    }
}

fn prompt_confirm(question: &str, default: Option<bool>) -> io::Result<bool> {
    loop {
        let hint = match default {
            Some(true) => "(Y/n)",
            Some(false) | None => "(y/N)",
        };
        let answer = prompt(&format!("{question} {hint}"))?;
        match answer.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
