mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::AnalysisBackend;
