fn main() {
    // multiversx-sc-meta-lib resolves output paths relative to this crate,
    // so `cargo run --manifest-path meta/Cargo.toml` must not depend on cwd.
    std::env::set_current_dir(env!("CARGO_MANIFEST_DIR"))
        .expect("chdir to meta crate dir failed");
    multiversx_sc_meta_lib::cli_main::<chess_match_registry::AbiProvider>();
}
