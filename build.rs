use std::{env, fs, path::PathBuf};

// Ship settings.json next to the binary so `cargo run` picks it up.
fn main() {
    println!("cargo:rerun-if-changed=settings.json");
    if !PathBuf::from("settings.json").exists() {
        return;
    }
    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return;
    };
    if let Some(target_dir) = out_dir.ancestors().nth(3) {
        if let Err(e) = fs::copy("settings.json", target_dir.join("settings.json")) {
            println!("cargo:warning=could not copy settings.json: {e}");
        }
    }
}
