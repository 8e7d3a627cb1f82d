pub mod choreboard_http;
pub mod token;

pub use choreboard_http::ChoreBoardHttpAdapter;
pub use token::TokenSigner;
