mod common;

use common::helpers::{TestServer, jq_tarball, oniguruma_tarball, snapshot};
use jqdeps::download::compute_checksum;
use jqdeps::native::BuildError;
use jqdeps::native::AssemblyError;
use jqdeps::{
    BuildCommand, BuildCommandError, BuildEnvironment, BuildVariant, Config, DependencyBuilder,
    DependencySource, DependencySpec, ExtensionSpecAssembler, FetchError, Linkage, PrepareError,
    PrepareOptions, TarballFetcher, prepare,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn cmd(args: &[&str]) -> BuildCommand {
    BuildCommand::new(args.iter().copied()).unwrap()
}

fn onig_install(deps: &Path) -> PathBuf {
    deps.join("onig-install-6.9.4")
}

/// Regex library: configure --prefix=P, make, make install
fn onig_spec(server: &TestServer, deps: &Path) -> DependencySpec {
    let prefix = onig_install(deps);
    DependencySpec {
        name: "oniguruma".to_string(),
        source: DependencySource::Remote {
            url: server.url("/onig-6.9.4.tar.gz"),
            archive_path: deps.join("onig-6.9.4.tar.gz"),
        },
        working_dir: deps.join("onig-6.9.4"),
        install_dir: Some(prefix.clone()),
        build_commands: vec![
            cmd(&[
                "./configure",
                "CFLAGS=-fPIC",
                &format!("--prefix={}", prefix.display()),
            ]),
            cmd(&["sh", "make.sh"]),
            cmd(&["sh", "make.sh", "install"]),
        ],
        sha256: None,
    }
}

/// Query library: configure --with-oniguruma=P, make
fn jq_spec(server: &TestServer, deps: &Path) -> DependencySpec {
    DependencySpec {
        name: "jq".to_string(),
        source: DependencySource::Remote {
            url: server.url("/jq-1.6.tar.gz"),
            archive_path: deps.join("jq-1.6.tar.gz"),
        },
        working_dir: deps.join("jq-1.6"),
        install_dir: None,
        build_commands: vec![
            cmd(&[
                "./configure",
                &format!("--with-oniguruma={}", onig_install(deps).display()),
            ]),
            cmd(&["sh", "make.sh"]),
        ],
        sha256: None,
    }
}

async fn upstream() -> TestServer {
    TestServer::start(vec![
        ("/onig-6.9.4.tar.gz", oniguruma_tarball()),
        ("/jq-1.6.tar.gz", jq_tarball()),
    ])
    .await
}

fn builder(deps: &Path, environment: BuildEnvironment) -> DependencyBuilder {
    DependencyBuilder::new(
        deps.to_path_buf(),
        TarballFetcher::with_timeout(Duration::from_secs(30)).unwrap(),
        environment,
    )
    .with_quiet(true)
}

#[tokio::test(flavor = "multi_thread")]
async fn builds_regex_then_query_engine() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");

    let specs = [onig_spec(&server, &deps), jq_spec(&server, &deps)];
    let report = builder(&deps, BuildEnvironment::default())
        .build(&specs)
        .await
        .unwrap();

    assert!(deps.join("jq-1.6/.libs/libjq.a").is_file());
    assert!(onig_install(&deps).join("lib/libonig.a").is_file());

    let names: Vec<&str> = report.built.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["oniguruma", "jq"]);

    let onig = report.built.first().unwrap();
    assert_eq!(
        onig.archive_sha256.as_deref(),
        Some(compute_checksum(&deps.join("onig-6.9.4.tar.gz")).unwrap().as_str())
    );

    let spec = ExtensionSpecAssembler::new("jq", vec![PathBuf::from("jq.c")])
        .networked(&deps.join("jq-1.6"), &onig_install(&deps));
    ExtensionSpecAssembler::verify(&spec).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn rebuild_replaces_stale_state() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");
    let specs = [onig_spec(&server, &deps), jq_spec(&server, &deps)];
    let builder = builder(&deps, BuildEnvironment::default());

    builder.build(&specs).await.unwrap();
    let first = snapshot(&deps);

    // Leave debris from an imaginary failed run
    fs::write(deps.join("jq-1.6/stale.o"), "old object").unwrap();
    fs::write(deps.join("onig-6.9.4.tar.gz"), "truncated").unwrap();
    fs::remove_file(deps.join("jq-1.6/.libs/libjq.a")).unwrap();

    builder.build(&specs).await.unwrap();
    let second = snapshot(&deps);

    assert!(!deps.join("jq-1.6/stale.o").exists());
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn misordered_specs_are_rejected_before_any_work() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");

    let specs = [jq_spec(&server, &deps), onig_spec(&server, &deps)];
    let err = builder(&deps, BuildEnvironment::default())
        .build(&specs)
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::OrderViolation { .. }));
    assert!(!deps.join("jq-1.6.tar.gz").exists());
    assert!(!deps.join("onig-6.9.4.tar.gz").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_command_stops_everything_after_it() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");

    let mut onig = onig_spec(&server, &deps);
    onig.build_commands = vec![
        cmd(&["sh", "-c", "touch before"]),
        cmd(&["sh", "-c", "exit 7"]),
        cmd(&["sh", "-c", "touch after"]),
    ];
    let specs = [onig, jq_spec(&server, &deps)];

    let err = builder(&deps, BuildEnvironment::default())
        .build(&specs)
        .await
        .unwrap_err();

    match err {
        BuildError::Command(BuildCommandError::Failed {
            exit_code,
            working_dir,
            ..
        }) => {
            assert_eq!(exit_code, Some(7));
            assert_eq!(working_dir, deps.join("onig-6.9.4"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(deps.join("onig-6.9.4/before").exists());
    assert!(!deps.join("onig-6.9.4/after").exists());
    // The dependent library was never fetched
    assert!(!deps.join("jq-1.6.tar.gz").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn query_engine_configure_needs_installed_regex_engine() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");

    // Without the regex build, jq's configure cannot find the prefix
    let err = builder(&deps, BuildEnvironment::default())
        .build(&[jq_spec(&server, &deps)])
        .await
        .unwrap_err();

    let BuildError::Command(err) = err else {
        panic!("expected a command failure");
    };
    assert!(err.command().starts_with("./configure"));
    assert!(err.to_string().contains("oniguruma not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn deployment_target_reaches_build_commands() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");

    let environment = BuildEnvironment {
        platform_deployment_target: Some("10.13".to_string()),
    };
    builder(&deps, environment)
        .build(&[onig_spec(&server, &deps)])
        .await
        .unwrap();

    let seen = fs::read_to_string(deps.join("onig-6.9.4/.deployment_target")).unwrap();
    assert_eq!(seen.trim(), "10.13");
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_archive_is_fetch_error_with_status() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("missing.tar.gz");

    let err = TarballFetcher::new()
        .unwrap()
        .fetch(&server.url("/missing.tar.gz"), &destination, None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert!(err.to_string().contains("/missing.tar.gz"));
    assert!(!destination.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn checksum_mismatch_keeps_no_archive() {
    let server = upstream().await;
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");

    let mut spec = onig_spec(&server, &deps);
    spec.sha256 = Some("0".repeat(64));

    let err = builder(&deps, BuildEnvironment::default())
        .build(&[spec])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BuildError::Fetch(FetchError::ChecksumMismatch { .. })
    ));
    assert!(!deps.join("onig-6.9.4.tar.gz").exists());
    assert!(!deps.join("onig-6.9.4").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn vendored_archive_is_extracted_fresh() {
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("_deps");
    let vendored = temp.path().join("vendor/onig-6.9.4.tar.gz");
    fs::create_dir_all(vendored.parent().unwrap()).unwrap();
    fs::write(&vendored, oniguruma_tarball()).unwrap();

    let prefix = onig_install(&deps);
    let spec = DependencySpec {
        name: "oniguruma".to_string(),
        source: DependencySource::VendoredArchive {
            archive_path: vendored.clone(),
        },
        working_dir: deps.join("onig-6.9.4"),
        install_dir: Some(prefix.clone()),
        build_commands: vec![
            cmd(&["./configure", &format!("--prefix={}", prefix.display())]),
            cmd(&["sh", "make.sh"]),
            cmd(&["sh", "make.sh", "install"]),
        ],
        sha256: None,
    };

    let report = builder(&deps, BuildEnvironment::default())
        .build(&[spec])
        .await
        .unwrap();

    assert!(prefix.join("lib/libonig.a").is_file());
    assert!(vendored.is_file(), "vendored archive must be left in place");
    assert_eq!(
        report.built.first().unwrap().archive_sha256.as_deref(),
        Some(compute_checksum(&vendored).unwrap().as_str())
    );
}

fn prebuilt_tree(root: &Path) {
    let vendor = root.join("jq");
    fs::create_dir_all(vendor.join(".libs")).unwrap();
    fs::create_dir_all(vendor.join("src")).unwrap();
    fs::create_dir_all(vendor.join("modules/oniguruma/src/.libs")).unwrap();
    fs::write(vendor.join(".libs/libjq.so.1"), "").unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_links_prebuilt_tree_dynamically() {
    let temp = TempDir::new().unwrap();
    prebuilt_tree(temp.path());

    let prepared = prepare(PrepareOptions {
        root: temp.path().to_path_buf(),
        config: Config::default(),
        variant: Some(BuildVariant::VendoredPrebuilt),
        quiet: true,
    })
    .await
    .unwrap();

    assert!(prepared.plan.dependencies.is_empty());
    assert!(prepared.report.built.is_empty());
    assert!(matches!(prepared.plan.extension.linkage, Linkage::Dynamic { .. }));
    assert_eq!(prepared.plan.extension.libraries(), ["jq", "onig"]);
    assert!(prepared.plan.extension.static_objects().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_reports_missing_prebuilt_artifacts() {
    let temp = TempDir::new().unwrap();

    let err = prepare(PrepareOptions {
        root: temp.path().to_path_buf(),
        config: Config::default(),
        variant: Some(BuildVariant::VendoredPrebuilt),
        quiet: true,
    })
    .await
    .unwrap_err();

    let PrepareError::Assembly(AssemblyError::MissingArtifact { path }) = err else {
        panic!("expected a missing artifact");
    };
    assert!(path.starts_with(temp.path().join("jq")));
}
