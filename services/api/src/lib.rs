mod cli;
mod demo;
mod infra;
mod pricing;
mod routes;
mod server;

use microlend::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
