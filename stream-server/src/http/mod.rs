mod error;
mod handlers;
mod routes;
mod server;


pub use error::ApiError;
pub use routes::create_router;
pub use server::HttpServer;
