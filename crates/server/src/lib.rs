pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod routes;
pub mod services;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
}
