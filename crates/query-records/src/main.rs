use clap::Parser;

use query_records::{
    cli::{Args, Command},
    commands,
    error::{AppError, AppResult},
    logging,
};

fn main() -> AppResult<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    match args.command {
        Command::Run(run) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| AppError::Internal(e.to_string()))?;
            rt.block_on(commands::run(run))
        }
        Command::New(new) => commands::new(new),
    }
}
