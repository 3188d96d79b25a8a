use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match raslog_audit::cli::run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(raslog_audit::errors::get_exit_code(&e))
        }
    }
}
