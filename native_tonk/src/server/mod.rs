pub mod bot_driver;
pub mod http;
pub mod run;
pub mod state;
pub mod table;
pub mod ws;

pub use run::run_server;
pub use state::AppState;
pub use table::handle_client_msg;
