//! Shared test helpers and utilities

use axum::Router;
use axum::routing::get;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;

/// Path to the built jqdeps binary
#[allow(dead_code)]
pub(crate) fn jqdeps_binary() -> &'static str {
    env!("CARGO_BIN_EXE_jqdeps")
}

/// Gzipped tarball containing `files` as (path, contents, mode) entries.
#[allow(dead_code)]
pub(crate) fn tarball(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, contents, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("Failed to append tar entry");
    }
    builder
        .into_inner()
        .expect("Failed to finish tar stream")
        .finish()
        .expect("Failed to finish gzip stream")
}

/// `configure` for the fake regex library: records `--prefix` and the
/// deployment target it saw.
const ONIG_CONFIGURE: &str = r#"#!/bin/sh
set -e
prefix=
for arg in "$@"; do
  case "$arg" in
    --prefix=*) prefix="${arg#--prefix=}" ;;
  esac
done
[ -n "$prefix" ] || { echo "configure: --prefix is required" >&2; exit 1; }
echo "$prefix" > .prefix
echo "${MACOSX_DEPLOYMENT_TARGET:-unset}" > .deployment_target
"#;

/// Stand-in for `make` / `make install`.
const ONIG_MAKE: &str = r#"#!/bin/sh
set -e
if [ "$1" = install ]; then
  prefix=$(cat .prefix)
  mkdir -p "$prefix/lib" "$prefix/include"
  cp libonig.a "$prefix/lib/libonig.a"
  echo '/* oniguruma */' > "$prefix/include/oniguruma.h"
else
  printf '!<arch>\nonig\n' > libonig.a
fi
"#;

/// `configure` for the fake query library: refuses to run unless the regex
/// library is already installed under `--with-oniguruma`.
const JQ_CONFIGURE: &str = r#"#!/bin/sh
set -e
onig=
for arg in "$@"; do
  case "$arg" in
    --with-oniguruma=*) onig="${arg#--with-oniguruma=}" ;;
  esac
done
[ -f "$onig/lib/libonig.a" ] || { echo "configure: oniguruma not found in $onig" >&2; exit 1; }
echo "$onig" > .configured
"#;

const JQ_MAKE: &str = r#"#!/bin/sh
set -e
[ -f .configured ] || { echo "make: run configure first" >&2; exit 1; }
mkdir -p .libs
printf '!<arch>\njq\n' > .libs/libjq.a
"#;

/// Source archive for the fake regex library, unpacking to `onig-6.9.4/`.
#[allow(dead_code)]
pub(crate) fn oniguruma_tarball() -> Vec<u8> {
    tarball(&[
        ("onig-6.9.4/configure", ONIG_CONFIGURE, 0o755),
        ("onig-6.9.4/make.sh", ONIG_MAKE, 0o644),
        ("onig-6.9.4/src/regcomp.c", "/* regex compiler */\n", 0o644),
    ])
}

/// Source archive for the fake query library, unpacking to `jq-1.6/`.
#[allow(dead_code)]
pub(crate) fn jq_tarball() -> Vec<u8> {
    tarball(&[
        ("jq-1.6/configure", JQ_CONFIGURE, 0o755),
        ("jq-1.6/make.sh", JQ_MAKE, 0o644),
        ("jq-1.6/src/jq.h", "/* jq */\n", 0o644),
    ])
}

/// HTTP server on an ephemeral localhost port, stopped when dropped.
#[allow(dead_code)]
pub(crate) struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl TestServer {
    /// Serve each (route, body) pair; any other path answers 404.
    pub(crate) async fn start(files: Vec<(&'static str, Vec<u8>)>) -> Self {
        let mut router = Router::new();
        for (route, body) in files {
            router = router.route(
                route,
                get(move || {
                    let body = body.clone();
                    async move { body }
                }),
            );
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Absolute URL for `path`
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Every regular file under `dir`, relative, with contents, sorted.
#[allow(dead_code)]
pub(crate) fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
        for entry in std::fs::read_dir(dir).expect("Failed to read directory") {
            let path = entry.expect("Failed to read entry").path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path
                    .strip_prefix(base)
                    .expect("Path outside base")
                    .to_string_lossy()
                    .to_string();
                out.push((rel, std::fs::read(&path).expect("Failed to read file")));
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
