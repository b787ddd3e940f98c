mod cli;
mod infra;
mod routes;
mod server;

use application_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
