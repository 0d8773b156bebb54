use crate::provision::{Provisioner, TOKEN_VARIABLE};
use crate::runtime::{Memoized, Runtime, runtimes};
use crate::{Esc, GlobalConfig, GlobalDefaults};
use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use colored::Colorize;
use escbox_core::DEFAULT_RUNTIME;
use secrecy::SecretString;
use std::io::IsTerminal;
use std::process::Command;

/// Main CLI structure for the escbox application.
#[derive(Parser)]
#[command(name = "escbox")]
#[command(about = "Pulumi ESC config and secrets, fetched from a throwaway container", long_about = None)]
#[command(version)]
struct Cli {
    /// ESC environment to use (e.g. myorg/myproject/dev)
    #[arg(short, long, global = true, env = "ESCBOX_ENV")]
    env: Option<String>,
    /// Container runtime (docker, podman, docker://?platform=linux/amd64)
    #[arg(short, long, global = true, env = "ESCBOX_RUNTIME")]
    runtime: Option<String>,
    /// Reuse the result of an identical container within this invocation
    #[arg(long, global = true)]
    memoize: bool,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands for the escbox CLI.
#[derive(Subcommand)]
enum Commands {
    /// Get a value from the environment's pulumiConfig object
    Get {
        /// Name of the value
        name: String,
    },
    /// Set a value on the environment's pulumiConfig object
    Set {
        /// Name of the value
        name: String,
        /// The value (will prompt if not provided)
        value: Option<String>,
    },
    /// Open the environment and print one of its environment variables
    Secret {
        /// Name of the environment variable
        name: String,
    },
    /// Run a command with the environment's variables injected
    Run {
        /// Command and arguments to run
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Init or show ~/.config/escbox/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration-related subcommands.
#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize user configuration
    Init,
    /// Show current configuration
    Show,
}

/// Reads the access token from the environment, prompting on a terminal.
///
/// Tokens are never accepted as command-line arguments.
fn read_token() -> Result<Option<SecretString>> {
    if let Ok(token) = std::env::var(TOKEN_VARIABLE) {
        if !token.is_empty() {
            return Ok(Some(SecretString::from(token)));
        }
    }

    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let token = rpassword::prompt_password("Pulumi access token: ")
        .wrap_err("Failed to read access token")?;
    Ok((!token.is_empty()).then(|| SecretString::from(token)))
}

/// Environment and runtime after applying flags, their environment
/// variables, the config file and built-in defaults, in that order.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    environment: Option<String>,
    runtime: String,
}

fn resolve_target(cli: &Cli, config: &GlobalConfig) -> Target {
    let environment = cli
        .env
        .clone()
        .or_else(|| config.defaults.environment.clone());
    let runtime = cli
        .runtime
        .clone()
        .or_else(|| config.defaults.runtime.clone())
        .unwrap_or_else(|| DEFAULT_RUNTIME.to_string());
    Target {
        environment,
        runtime,
    }
}

fn build_session(cli: &Cli, config: &GlobalConfig) -> Result<Esc> {
    let target = resolve_target(cli, config);
    let runtime = Box::<dyn Runtime>::try_from(target.runtime.as_str())
        .wrap_err_with(|| format!("Failed to set up runtime '{}'", target.runtime))?;
    let runtime: Box<dyn Runtime> = if cli.memoize {
        Box::new(Memoized::new(runtime))
    } else {
        runtime
    };

    let mut esc = Esc::new(runtime).with_provisioner(Provisioner::from(&config.container));
    if let Some(token) = read_token()? {
        esc = esc.with_token(token);
    }
    if let Some(env) = target.environment {
        esc = esc.with_env(env);
    }
    Ok(esc)
}

/// Main entry point for the escbox CLI application.
///
/// # Returns
///
/// * `Ok(())` - If the command executed successfully
/// * `Err` - If any error occurred during execution
pub fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    let config = GlobalConfig::load()
        .wrap_err("Failed to load escbox configuration")?
        .unwrap_or_default();

    match &cli.command {
        Commands::Get { name } => {
            let esc = build_session(&cli, &config)?;
            let value = esc
                .get_config(name)
                .wrap_err_with(|| format!("Failed to get '{}'", name))?;
            println!("{}", value);
            Ok(())
        }
        Commands::Set { name, value } => {
            let esc = build_session(&cli, &config)?;
            let value = match value {
                Some(v) => v.clone(),
                None => rpassword::prompt_password(format!("Enter value for {}: ", name))
                    .wrap_err("Failed to read value")?,
            };
            esc.set_config(name, &value)
                .wrap_err_with(|| format!("Failed to set '{}'", name))?;
            println!(
                "{} '{}' saved to {}",
                "✓".green(),
                name,
                esc.environment().unwrap_or_default()
            );
            Ok(())
        }
        Commands::Secret { name } => {
            let mut esc = build_session(&cli, &config)?;
            let secret = esc
                .try_open()
                .wrap_err("Failed to open environment")?
                .get_secret_env_var(name)?;
            println!("{}", secret.expose());
            Ok(())
        }
        Commands::Run { command } => {
            let mut esc = build_session(&cli, &config)?;
            let secrets = esc
                .try_open()
                .wrap_err("Failed to open environment")?
                .secret_env_vars()?;
            tracing::info!(count = secrets.len(), "injecting environment variables");

            let (program, args) = command
                .split_first()
                .ok_or_else(|| eyre!("No command specified. Usage: escbox run -- <command> [args...]"))?;
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd.envs(secrets.iter().map(|s| (s.name(), s.expose())));

            let status = cmd
                .status()
                .wrap_err_with(|| format!("Failed to run '{}'", program))?;
            std::process::exit(status.code().unwrap_or(1));
        }
        Commands::Config { action } => match action {
            ConfigAction::Init => {
                use inquire::{Select, Text};

                let runtime_choices: Vec<String> = runtimes()
                    .into_iter()
                    .flat_map(|info| info.examples.iter())
                    .filter_map(|example| example.strip_suffix("://"))
                    .map(str::to_string)
                    .collect();
                let runtime = Select::new("Select your container runtime:", runtime_choices)
                    .prompt()
                    .wrap_err("Failed to read runtime")?;

                let environment = Text::new("Default ESC environment:")
                    .with_help_message("e.g. myorg/myproject/dev, leave empty for none")
                    .prompt()
                    .wrap_err("Failed to read environment")?;
                let environment = environment.trim();

                let config = GlobalConfig {
                    defaults: GlobalDefaults {
                        environment: (!environment.is_empty()).then(|| environment.to_string()),
                        runtime: Some(runtime),
                    },
                    container: config.container.clone(),
                };

                config.save()?;
                println!(
                    "\n{} Configuration saved to {}",
                    "✓".green(),
                    GlobalConfig::path()?.display()
                );
                Ok(())
            }
            ConfigAction::Show => {
                match GlobalConfig::load()? {
                    Some(config) => {
                        println!("Configuration file: {}\n", GlobalConfig::path()?.display());
                        match &config.defaults.environment {
                            Some(env) => println!("Environment: {}", env),
                            None => println!("Environment: (none)"),
                        }
                        match &config.defaults.runtime {
                            Some(runtime) => println!("Runtime:     {}", runtime),
                            None => println!("Runtime:     (none, using {})", DEFAULT_RUNTIME),
                        }
                        println!("Image:       {}", config.container.image());
                        println!("Install URL: {}", config.container.install_url());
                        println!("Client path: {}", config.container.client_path());
                    }
                    None => {
                        println!("No configuration found. Run 'escbox config init' to create one.");
                    }
                }
                Ok(())
            }
        },
    }
}
