#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point of the mitwelten explore API server.

use mitwelten_explore_server::{ServerError, run_server};

#[actix_web::main]
async fn main() -> Result<(), ServerError> {
    run_server().await
}
