mod cli;
mod infra;
mod routes;
mod server;
mod validate;

use onroute_policy::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
