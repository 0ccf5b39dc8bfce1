use std::env::vars;

use dotenvy::dotenv;

/// Bake `DATACAT_*` settings from `.env` into the binary as build-time defaults.
fn main() {
    println!("cargo:rerun-if-changed=.env");
    dotenv().ok();

    for (k, v) in vars().filter(|(k, _)| k.starts_with("DATACAT_")) {
        println!("cargo:rerun-if-env-changed={k}");
        println!("cargo:rustc-env={k}={v}");
    }
}
