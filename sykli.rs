//! Sykli CI pipeline for kube-ca-server
//!
//! Run locally: sykli run
//! Or: cargo run --bin sykli --features sykli -- --emit | sykli run -

use sykli::Pipeline;

fn main() {
    let mut p = Pipeline::new();

    let src = p.dir(".");
    let cargo_registry = p.cache("cargo-registry");
    let target_cache = p.cache("target");

    let rust = sykli::Template::new()
        .container("rust:1.85")
        .mount_dir(&src, "/src")
        .mount_cache(&cargo_registry, "/usr/local/cargo/registry")
        .mount_cache(&target_cache, "/src/target")
        .workdir("/src");

    let _ = p
        .task("test")
        .from(&rust)
        .run("cargo test")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    let _ = p
        .task("lint")
        .from(&rust)
        .run("cargo clippy --all-targets -- -D warnings")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    let _ = p
        .task("fmt")
        .from(&rust)
        .run("cargo fmt -- --check")
        .inputs(&["**/*.rs"]);

    let _ = p
        .task("build")
        .from(&rust)
        .run("cargo build --release --bin kube-ca-server")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"])
        .output("binary", "target/release/kube-ca-server")
        .after(&["test", "lint", "fmt"]);

    // Serve a throwaway certificate, scrape it, then stop with SIGTERM
    let _ = p
        .task("smoke-test")
        .from(&rust)
        .run(
            r#"#!/bin/bash
set -e

openssl req -x509 -newkey rsa:2048 -nodes -days 30 -subj "/CN=smoke-ca" \
  -keyout /tmp/ca.key -out /tmp/ca.crt

./target/release/kube-ca-server -p 18080 -f /tmp/ca.crt &
PID=$!
sleep 2

curl -sf http://127.0.0.1:18080/ | grep -q "BEGIN CERTIFICATE"
curl -sf http://127.0.0.1:18080/metrics | grep -Eq "^ca_cert_expiry_timestamp [0-9.e+]+$"

kill -TERM $PID
wait $PID
"#,
        )
        .input_from("build", "binary", "/src/target/release/kube-ca-server")
        .timeout(120);

    p.emit();
}
