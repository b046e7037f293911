mod config;
mod query;
mod serve;
mod status;
mod train;

pub use config::ConfigCommand;
pub use query::QueryArgs;
pub use serve::ServeArgs;
pub use train::TrainArgs;

pub use config::handle_config;
pub use query::handle_query;
pub use serve::handle_serve;
pub use status::handle_status;
pub use train::handle_train;
