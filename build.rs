extern crate bindgen;

use std::env;
use std::path::PathBuf;

fn add_binding(header_path: &str) {
    println!("cargo:rerun-if-changed={}", header_path);

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let binding_path = out_dir.join(header_path.replace(".h", ".rs"));
    std::fs::create_dir_all(binding_path.parent().unwrap())
        .expect(&format!("Cannot create directory for {}", binding_path.to_string_lossy()));

    bindgen::Builder::default()
        .header(header_path)
        .derive_default(true)
        .allowlist_type("fw_cdev_.*")
        .allowlist_var("(TCODE|RCODE|FW_CDEV)_.*")
        .parse_callbacks(Box::new(bindgen::CargoCallbacks))
        .generate()
        .expect(&format!("Unable to generate binding {}", header_path))
        .write_to_file(binding_path)
        .expect("Cannot write binding");
}

fn main() {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("linux")
        && env::var_os("CARGO_FEATURE_NATIVE_CDEV").is_some()
    {
        add_binding("src/driver/fw_cdev/bindings.h");
    }
}
