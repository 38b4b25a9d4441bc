pub mod client;
pub mod config;
pub mod curl;
pub mod history;
pub mod l10n;
pub mod paths;
pub mod pipeline;
pub mod response;
pub mod store;
pub mod util;
pub mod warn;
