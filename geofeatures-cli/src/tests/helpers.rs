//! Test helpers for running commands against a throwaway database.

use super::*;
use camino::Utf8PathBuf;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::TempDir;

/// A database under a fresh temporary directory.
///
/// The database sits in a nested directory that does not exist yet, so the
/// first command also exercises parent directory creation.
pub(super) struct TestStore {
    dir: TempDir,
    config: StoreConfig,
}

impl TestStore {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let config = StoreConfig {
            database: root.join("data").join("store.db"),
        };
        Self { dir, config }
    }

    pub(super) fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Parse `args` as a command line and execute it, returning stdout.
    pub(super) fn run(&self, args: &[&str]) -> Result<String, CliError> {
        let cli = Cli::try_parse_from(std::iter::once("geofeatures").chain(args.iter().copied()))
            .map_err(CliError::ArgumentParsing)?;
        let mut output = Vec::new();
        execute(&self.config, cli.command, &mut output)?;
        Ok(String::from_utf8(output).expect("utf-8 output"))
    }

    /// Run a command that must succeed and decode its JSON output.
    pub(super) fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> T {
        let output = self
            .run(args)
            .unwrap_or_else(|err| panic!("command {args:?} failed: {err}"));
        serde_json::from_str(&output).unwrap_or_else(|err| panic!("decode {output:?}: {err}"))
    }

    /// Run a command that must fail.
    pub(super) fn run_err(&self, args: &[&str]) -> CliError {
        match self.run(args) {
            Ok(output) => panic!("command {args:?} unexpectedly succeeded with {output:?}"),
            Err(err) => err,
        }
    }

    /// Write `document` to a JSON file in the temporary directory.
    pub(super) fn write_input(&self, name: &str, document: &Value) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, document.to_string()).expect("write input document");
        path.to_str().expect("utf-8 input path").to_owned()
    }

    pub(super) fn create_collection(&self, name: &str) {
        self.run(&[
            "collections",
            "create",
            name,
            "--title",
            &format!("{name} title"),
            "--description",
            &format!("{name} description"),
        ])
        .unwrap_or_else(|err| panic!("create collection {name}: {err}"));
    }

    /// Add one point feature per `(x, y)` pair and return the stored page.
    pub(super) fn add_points(&self, collection: &str, points: &[(f64, f64)]) -> api::FeatureList {
        let features: Vec<Value> = points
            .iter()
            .enumerate()
            .map(|(index, (x, y))| {
                serde_json::json!({
                    "geometry": { "type": "Point", "coordinates": [x, y] },
                    "properties": { "index": index },
                })
            })
            .collect();
        let input = self.write_input(
            "points.json",
            &serde_json::json!({ "type": "FeatureCollection", "features": features }),
        );
        self.run_json(&["features", "add", collection, &input])
    }
}
