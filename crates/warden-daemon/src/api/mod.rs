mod handlers;
mod responses;
mod server;

pub use handlers::{router, ApiState};
pub use responses::*;
pub use server::ApiServer;
