mod dto;
mod extractors;
mod handlers;
mod openapi;
mod routes;
mod state;

pub use dto::{ErrorBody, ExtractTextResponse, RootResponse, ROOT_MESSAGE};
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
