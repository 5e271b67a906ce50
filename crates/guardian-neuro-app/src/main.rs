#![warn(missing_docs)]
//! # guardian-neuro binary
//!
//! Terminal entry point for guardian-neuro: one-shot subcommands plus an
//! interactive case shell.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use guardian_neuro_app::{AppConfig, AppError, GuardianApp, app_version, init_tracing};
use guardian_neuro_core::PatientContext;
use guardian_neuro_intake::RejectedFile;
use guardian_neuro_ui::{render_image_list, render_report};

#[derive(Parser)]
#[command(name = "guardian-neuro")]
#[command(about = "AI-assisted CT head scan report client (demo)", long_about = None)]
#[command(version = guardian_neuro_app::APP_VERSION)]
struct Cli {
    /// Directory holding the session file (overrides GUARDIAN_NEURO_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show session, quota and configuration status
    Status,
    /// Sign in with the demo account
    Login {
        /// Username
        #[arg(long, short)]
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Sign out; the request count is kept
    Logout,
    /// Analyze one or more CT scan images
    Analyze {
        /// JPEG or PNG images
        images: Vec<PathBuf>,
        /// Patient name
        #[arg(long, default_value = "")]
        name: String,
        /// Patient age
        #[arg(long, default_value = "")]
        age: String,
        /// Patient gender
        #[arg(long, default_value = "")]
        gender: String,
        /// Clinical history
        #[arg(long, default_value = "")]
        history: String,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Write the JSON export to this file
        #[arg(long)]
        export: Option<PathBuf>,
        /// Write the print region to this file
        #[arg(long)]
        print: Option<PathBuf>,
    },
    /// Reset the persisted request count
    ResetQuota,
    /// Interactive case shell (default)
    Shell,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    init_tracing(&config.log_filter);
    tracing::info!(version = app_version(), data_dir = %config.data_dir.display(), "starting");
    for warning in config.startup_warnings() {
        tracing::warn!("{warning}");
        eprintln!("warning: {warning}");
    }

    let mut app = GuardianApp::from_config(&config);
    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Status => print_status(&app),
        Commands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };
            app.login(&username, &password).map_err(user_facing)?;
            println!("Signed in. {}", quota_line(&app));
        }
        Commands::Logout => {
            app.logout().map_err(user_facing)?;
            println!("Signed out.");
        }
        Commands::Analyze {
            images,
            name,
            age,
            gender,
            history,
            json,
            export,
            print,
        } => {
            report_rejections(&app.add_images(&images));
            app.set_patient(PatientContext {
                name,
                age,
                gender,
                history,
            });
            let report = app.analyze().map_err(user_facing)?;
            if json {
                println!("{}", app.export_report_json().map_err(user_facing)?);
            } else {
                print!("{}", render_report(&report));
            }
            if let Some(path) = export {
                let exported = app.export_report_json().map_err(user_facing)?;
                write_output(&path, &exported)?;
            }
            if let Some(path) = print
                && let Some(region) = app.print_region()
            {
                write_output(&path, &region)?;
            }
            eprintln!("{}", quota_line(&app));
        }
        Commands::ResetQuota => {
            app.reset_quota().map_err(user_facing)?;
            println!("{}", quota_line(&app));
        }
        Commands::Shell => run_shell(&mut app)?,
    }
    Ok(())
}

fn user_facing(error: AppError) -> anyhow::Error {
    anyhow::anyhow!(error.user_message())
}

fn quota_line(app: &GuardianApp) -> String {
    let status = app.status();
    format!(
        "Remaining Requests: {}/{}",
        status.remaining_requests, status.max_requests
    )
}

fn print_status(app: &GuardianApp) {
    let status = app.status();
    println!("guardian-neuro {}", app_version());
    println!(
        "session: {}",
        if status.authenticated {
            "signed in"
        } else {
            "signed out"
        }
    );
    println!("{}", quota_line(app));
    println!("analysis_configured={}", status.analysis_configured);
    println!("images={} can_analyze={}", status.images, status.can_analyze);
    println!("{}", status.analysis);
}

fn report_rejections(rejected: &[RejectedFile]) {
    for file in rejected {
        eprintln!("skipped: {}", file.error);
    }
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

const SHELL_HELP: &str = "\
commands:
  login <username> <password>   sign in with the demo account
  logout                        sign out and discard the case
  add <path>...                 add JPEG/PNG scan images
  remove <n>                    remove image number n
  images                        list image previews
  name|age|gender|history <v>   set a patient field
  analyze                       run the analysis
  report                        show the current report
  export [file]                 JSON export (stdout when no file)
  print [file]                  print region (stdout when no file)
  clear                         clear the case
  status                        show session and quota
  help                          show this help
  quit                          leave the shell";

fn run_shell(app: &mut GuardianApp) -> Result<()> {
    println!("GuardianNeuro {} - type `help` for commands", app_version());
    print!("{}", app.login_panel().render());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("guardian-neuro> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();

        let outcome = match command {
            "quit" | "exit" => break,
            "help" => {
                println!("{SHELL_HELP}");
                Ok(())
            }
            "status" => {
                print_status(app);
                Ok(())
            }
            "login" => match rest.as_slice() {
                [username, password] => app
                    .login(username, password)
                    .map(|()| println!("Signed in. {}", quota_line(app))),
                _ => {
                    println!("usage: login <username> <password>");
                    Ok(())
                }
            },
            "logout" => app.logout().map(|()| {
                println!("Signed out.");
                print!("{}", app.login_panel().render());
            }),
            "add" => {
                report_rejections(&app.add_images(&rest));
                print!("{}", render_image_list(&app.case().images));
                Ok(())
            }
            "remove" => {
                match rest.first().and_then(|value| value.parse::<usize>().ok()) {
                    Some(number) if number > 0 => match app.remove_image(number - 1) {
                        Some(image) => println!("removed {}", image.file_name),
                        None => println!("no image number {number}"),
                    },
                    _ => println!("usage: remove <n>"),
                }
                Ok(())
            }
            "images" => {
                print!("{}", render_image_list(&app.case().images));
                Ok(())
            }
            "name" | "age" | "gender" | "history" => {
                let value = rest.join(" ");
                let patient = app.patient_mut();
                match command {
                    "name" => patient.name = value,
                    "age" => patient.age = value,
                    "gender" => patient.gender = value,
                    _ => patient.history = value,
                }
                Ok(())
            }
            "analyze" => {
                println!("The AI is analyzing the scan. Please wait...");
                app.analyze().map(|report| {
                    print!("{}", render_report(&report));
                    println!("{}", quota_line(app));
                })
            }
            "report" => {
                match &app.case().report {
                    Some(report) => print!("{}", render_report(report)),
                    None => println!("{}", app.case().status_line()),
                }
                Ok(())
            }
            "export" => app.export_report_json().map(|json| match rest.first() {
                Some(path) => {
                    if let Err(error) = write_output(Path::new(path), &json) {
                        eprintln!("{error:#}");
                    }
                }
                None => println!("{json}"),
            }),
            "print" => {
                match (app.print_region(), rest.first()) {
                    (Some(region), Some(path)) => {
                        if let Err(error) = write_output(Path::new(path), &region) {
                            eprintln!("{error:#}");
                        }
                    }
                    (Some(region), None) => print!("{region}"),
                    (None, _) => println!("No report to print yet."),
                }
                Ok(())
            }
            "clear" => {
                app.clear_case();
                Ok(())
            }
            other => {
                println!("unknown command `{other}` (try `help`)");
                Ok(())
            }
        };

        if let Err(error) = outcome {
            eprintln!("Error: {}", error.user_message());
        }
    }
    Ok(())
}
