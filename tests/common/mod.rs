//! Shared fixtures for deplink integration tests
//!
//! Fixtures are small Poetry monorepos written into a temporary directory.

use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Writes `<root>/<dir>/pyproject.toml` for a Poetry package
#[allow(unused)]
pub fn write_package(root: &Path, dir: &str, name: &str, version: &str, deps: &[(&str, &str)]) {
    let mut content = format!(
        r#"[build-system]
requires = ["poetry-core>=1.0.0"]
build-backend = "poetry.core.masonry.api"

[tool.poetry]
name = "{name}"
version = "{version}"
description = ""

[tool.poetry.dependencies]
python = "^3.9"
"#
    );
    for (dep, value) in deps {
        content.push_str(&format!("{dep} = {value}\n"));
    }

    let pkg_dir = root.join(dir);
    fs::create_dir_all(&pkg_dir).unwrap();
    fs::write(pkg_dir.join("pyproject.toml"), content).unwrap();
}

/// Monorepo where `app -> lib -> core`, declared as registry versions
#[allow(unused)]
pub fn create_remote_monorepo() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write_package(root, "libs/core", "core", "0.1.0", &[("requests", "\"^2.31\"")]);
    write_package(root, "libs/lib", "lib", "0.2.0", &[("core", "\"^0.1.0\"")]);
    write_package(
        root,
        "apps/app",
        "app",
        "0.3.0",
        &[("lib", "\"^0.2.0\""), ("numpy", "\"^1.21.0\"")],
    );

    temp
}

/// Same monorepo with every internal dependency declared as a local path
#[allow(unused)]
pub fn create_local_monorepo() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write_package(root, "libs/core", "core", "0.1.0", &[("requests", "\"^2.31\"")]);
    write_package(
        root,
        "libs/lib",
        "lib",
        "0.2.0",
        &[("core", "{path = \"../core\", develop = true}")],
    );
    write_package(
        root,
        "apps/app",
        "app",
        "0.3.0",
        &[
            ("lib", "{path = \"../../libs/lib\", develop = true}"),
            ("numpy", "\"^1.21.0\""),
        ],
    );

    temp
}

#[allow(unused)]
pub fn read_manifest(root: &Path, dir: &str) -> String {
    fs::read_to_string(root.join(dir).join("pyproject.toml")).unwrap()
}

/// Helper to run a convert command
pub fn run_convert(root: &Path, action: &str, extra_args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = cargo_bin_cmd!("deplink");
    cmd.arg("convert")
        .arg(action)
        .arg(root)
        .args(extra_args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");

    cmd.assert()
}
