use clap::Parser;
use cryptstore::cli::{commands, output, Cli, Commands};
use cryptstore::config::Settings;
use cryptstore::errors::CryptStoreError;

fn main() {
    let cli = Cli::parse();

    let settings = match std::env::current_dir()
        .map_err(CryptStoreError::from)
        .and_then(|cwd| Settings::load(&cwd))
    {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    let log_level = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    if let Err(e) = cryptstore::telemetry::init(log_level) {
        output::warning(&e.to_string());
    }

    let result = match cli.command {
        Commands::Keygen { ref path } => commands::keygen::execute(path),
        Commands::Encrypt {
            ref message,
            ref ad,
        } => commands::encrypt::execute(&cli, &settings, message.as_deref(), ad),
        Commands::Decrypt {
            ref package,
            show_ad,
        } => commands::decrypt::execute(&cli, &settings, package.as_deref(), show_ad),
        Commands::Create { ref id } => commands::create::execute(&cli, &settings, id),
        Commands::Update {
            ref id,
            ref value,
            ref at,
        } => commands::update::execute(&cli, &settings, id, value.as_deref(), at.as_deref()),
        Commands::Get { ref id } => commands::get::execute(&cli, &settings, id),
        Commands::History { ref id } => commands::history::execute(&cli, &settings, id),
        Commands::Export { ref id } => commands::export::execute(&cli, &settings, id),
        Commands::Merge { ref records } => commands::merge::execute(&cli, &settings, records),
        Commands::Delete { ref id, force } => {
            commands::delete::execute(&cli, &settings, id, force)
        }
        Commands::List {
            page,
            page_size,
            all,
            unsorted,
        } => commands::list::execute(&cli, &settings, page, page_size, all, unsorted),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
