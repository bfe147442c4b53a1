use clap::Parser;
use postperm::{
    Cli, OutputFormatter, OutputMode, PostPerm, PostPermError, RunOutcome, UserFriendlyError,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let postperm = match PostPerm::from_cli(&cli) {
        Ok(postperm) => postperm,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let Some(ref path) = cli.path else {
        postperm.output_formatter().error("No workbook or directory given");
        return 1;
    };

    match postperm.process(path) {
        Ok(RunOutcome::Batch(outcome)) if outcome.has_failures() => 2,
        Ok(_) => 0,
        Err(e) => {
            postperm.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &PostPermError) -> i32 {
    match error {
        PostPermError::NotFound { .. } => 3,
        PostPermError::Config { .. } | PostPermError::UnknownLayout { .. } => 4,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("postperm.toml"));

    match PostPerm::generate_sample_config(&config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!("  postperm <path> --config {}", config_path.display());
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &PostPermError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
