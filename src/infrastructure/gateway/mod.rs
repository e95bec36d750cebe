pub mod http;

pub use http::HttpGatewayClient;
