//! Integration tests for the publish pipeline.
//!
//! These tests drive `Pipeline` end to end against real on-disk git
//! repositories and an in-memory `MockForge`. The schema module is served
//! by fake loader strategies so no JavaScript runtime is needed.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use schemaship::core::config::{ConfigOverrides, FileConfig, PipelineConfig};
use schemaship::core::types::BranchName;
use schemaship::engine::{AtomicPublisher, Pipeline, PipelineError, PipelineOutcome, PublishFile, PublishUnit};
use schemaship::forge::mock::{FailOn, MockForge, MockOperation};
use schemaship::forge::{FileMode, ForgeError};
use schemaship::git::Git;
use schemaship::loader::{LoadError, ModuleFormat, SchemaLoader};

// =============================================================================
// Fixtures
// =============================================================================

/// Loader strategy with a canned result and a call counter.
struct Canned {
    name: &'static str,
    result: Result<Value, &'static str>,
    calls: Arc<AtomicUsize>,
}

impl Canned {
    fn ok(name: &'static str, value: Value) -> Self {
        Self {
            name,
            result: Ok(value),
            calls: Arc::default(),
        }
    }

    fn failing(name: &'static str, message: &'static str) -> Self {
        Self {
            name,
            result: Err(message),
            calls: Arc::default(),
        }
    }

    fn boxed(self) -> Box<dyn ModuleFormat> {
        Box::new(self)
    }
}

impl ModuleFormat for Canned {
    fn name(&self) -> &'static str {
        self.name
    }

    fn load_export(&self, _path: &Path, _export: &str) -> Result<Value, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(|message| LoadError::Runtime {
            status: "exit status: 1".into(),
            stderr: message.into(),
        })
    }
}

fn settings_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "apiKey": { "type": "string" },
            "interval": { "type": "number", "default": 30 }
        },
        "required": ["apiKey", "interval"]
    })
}

/// A plugin checkout with a build already run.
struct Plugin {
    dir: TempDir,
    repo: git2::Repository,
}

impl Plugin {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        let plugin = Self { dir, repo };
        plugin.write("manifest.json", "{\n  \"name\": \"weather\",\n  \"version\": \"1.0.0\"\n}\n");
        plugin.write("dist/index.js", "export default function plugin() {}\n");
        plugin.write("dist/index.js.map", "{\"version\":3}");
        plugin.write("dist/schema.js", "export const pluginSettingsSchema = {};\n");
        plugin
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }

    /// Commit whatever is in the index, as if the published revision had
    /// been pulled.
    fn commit_index(&self) {
        let mut index = self.repo.index().unwrap();
        index.read(true).unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = self.repo.signature().unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, "sync", &tree, &parents)
            .unwrap();
    }

    fn git(&self) -> Git {
        Git::open(self.root()).unwrap()
    }

    fn config(&self, dry_run: bool) -> PipelineConfig {
        let overrides = ConfigOverrides {
            dry_run,
            ..Default::default()
        };
        PipelineConfig::resolve(self.root(), FileConfig::default(), overrides, Some("token".into()))
            .unwrap()
    }

    fn pipeline(&self) -> Pipeline {
        let loader = SchemaLoader::with_strategies(
            vec![Canned::ok("fixed", settings_schema()).boxed()],
            "pluginSettingsSchema",
        );
        Pipeline::new(self.config(false), loader)
    }
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

// =============================================================================
// Full pipeline
// =============================================================================

mod full_pipeline {
    use super::*;

    #[tokio::test]
    async fn publishes_manifest_and_outputs_in_one_commit() {
        let plugin = Plugin::new();
        let forge = MockForge::new().with_branch("main", &[("README.md", "# weather\n")]);
        let before = forge.branch_head("main").unwrap();

        let outcome = plugin.pipeline().run(&plugin.git(), &forge).await.unwrap();

        let PipelineOutcome::Published { commit, files } = outcome else {
            panic!("expected publish, got {:?}", outcome);
        };
        assert_eq!(
            files,
            vec!["dist/index.js", "dist/index.js.map", "dist/schema.js", "manifest.json"]
        );
        assert_eq!(forge.commit(&commit).unwrap().parents, vec![before]);
        assert_eq!(forge.commit_count(), 2);

        let remote = forge.files_at("main").unwrap();
        assert_eq!(remote["README.md"], "# weather\n");
        assert_eq!(remote["manifest.json"], plugin.read("manifest.json"));
    }

    #[tokio::test]
    async fn manifest_gets_normalized_configuration() {
        let plugin = Plugin::new();
        let forge = MockForge::new().with_branch("main", &[]);

        plugin.pipeline().run(&plugin.git(), &forge).await.unwrap();

        let manifest: Value = serde_json::from_str(&plugin.read("manifest.json")).unwrap();
        assert_eq!(manifest["name"], "weather");
        assert_eq!(manifest["configuration"]["required"], json!(["apiKey"]));

        let keys: Vec<&String> = manifest.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "version", "configuration"]);
        assert!(plugin.read("manifest.json").ends_with("}\n"));
    }

    #[tokio::test]
    async fn unchanged_files_never_reach_the_forge() {
        let plugin = Plugin::new();
        let forge = MockForge::new().with_branch("main", &[]);

        // First run publishes and stages everything; committing the index
        // makes HEAD match what was published.
        plugin.pipeline().run(&plugin.git(), &forge).await.unwrap();
        plugin.commit_index();
        forge.clear_operations();

        let outcome = plugin.pipeline().run(&plugin.git(), &forge).await.unwrap();

        assert_eq!(outcome, PipelineOutcome::NoChanges);
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn only_a_rebuilt_output_triggers_a_publish() {
        let plugin = Plugin::new();
        let forge = MockForge::new().with_branch("main", &[]);
        plugin.pipeline().run(&plugin.git(), &forge).await.unwrap();
        plugin.commit_index();

        plugin.write("dist/index.js", "export default function plugin() { return 2; }\n");
        let outcome = plugin.pipeline().run(&plugin.git(), &forge).await.unwrap();

        assert!(matches!(outcome, PipelineOutcome::Published { .. }));
        assert_eq!(
            forge.files_at("main").unwrap()["dist/index.js"],
            "export default function plugin() { return 2; }\n"
        );
    }

    #[tokio::test]
    async fn extraction_failure_stops_before_manifest_and_forge() {
        let plugin = Plugin::new();
        let original = plugin.read("manifest.json");
        let forge = MockForge::new().with_branch("main", &[]);
        let loader = SchemaLoader::with_strategies(
            vec![
                Canned::failing("import", "SyntaxError: Unexpected token").boxed(),
                Canned::failing("require", "ReferenceError: exports is not defined").boxed(),
            ],
            "pluginSettingsSchema",
        );
        let pipeline = Pipeline::new(plugin.config(false), loader);

        let err = pipeline.run(&plugin.git(), &forge).await.unwrap_err();

        let PipelineError::Extraction(extraction) = &err else {
            panic!("expected extraction error, got {:?}", err);
        };
        assert_eq!(extraction.causes.len(), 2);
        let message = err.to_string();
        assert!(message.contains("SyntaxError"));
        assert!(message.contains("ReferenceError"));
        assert_eq!(plugin.read("manifest.json"), original);
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn malformed_manifest_is_fatal() {
        let plugin = Plugin::new();
        plugin.write("manifest.json", "{ not json");
        let forge = MockForge::new().with_branch("main", &[]);

        let err = plugin.pipeline().run(&plugin.git(), &forge).await.unwrap_err();

        assert!(matches!(err, PipelineError::Manifest(_)));
        assert_eq!(plugin.read("manifest.json"), "{ not json");
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn forge_failure_surfaces_as_publish_error() {
        let plugin = Plugin::new();
        let forge = MockForge::new()
            .with_branch("main", &[])
            .fail_on(FailOn::UpdateRef(ForgeError::AuthFailed("bad token".into())));
        let before = forge.branch_head("main");

        let err = plugin.pipeline().run(&plugin.git(), &forge).await.unwrap_err();

        let PipelineError::Publish(publish) = err else {
            panic!("expected publish error, got {:?}", err);
        };
        assert_eq!(publish.source, ForgeError::AuthFailed("bad token".into()));
        // Tree and commit were created but the branch never moved.
        assert_eq!(forge.branch_head("main"), before);
        assert_eq!(forge.commit_count(), 2);
    }

    #[tokio::test]
    async fn missing_remote_branch_is_fatal() {
        let plugin = Plugin::new();
        let forge = MockForge::new();

        let err = plugin.pipeline().run(&plugin.git(), &forge).await.unwrap_err();
        assert!(matches!(err, PipelineError::Publish(_)));
        assert_eq!(forge.operations().len(), 1);
    }
}

// =============================================================================
// Loader fallback
// =============================================================================

mod loader_fallback {
    use super::*;

    #[test]
    fn require_style_module_still_loads() {
        let plugin = Plugin::new();
        let import = Canned::failing("import", "ERR_REQUIRE_ESM");
        let require = Canned::ok("require", settings_schema());
        let require_calls = require.calls.clone();
        let loader = SchemaLoader::with_strategies(
            vec![import.boxed(), require.boxed()],
            "pluginSettingsSchema",
        );

        let value = loader.load(&plugin.root().join("dist/schema.js")).unwrap();

        assert_eq!(value, settings_schema());
        assert_eq!(require_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_success_skips_later_strategies() {
        let plugin = Plugin::new();
        let require = Canned::ok("require", json!({}));
        let require_calls = require.calls.clone();
        let loader = SchemaLoader::with_strategies(
            vec![Canned::ok("import", settings_schema()).boxed(), require.boxed()],
            "pluginSettingsSchema",
        );

        loader.load(&plugin.root().join("dist/schema.js")).unwrap();
        assert_eq!(require_calls.load(Ordering::SeqCst), 0);
    }
}

// =============================================================================
// Publisher protocol
// =============================================================================

mod publisher {
    use super::*;

    fn unit(files: &[(&str, &str)]) -> PublishUnit {
        PublishUnit::from_files(
            files
                .iter()
                .map(|(path, content)| PublishFile {
                    path: path.to_string(),
                    mode: FileMode::Blob,
                    content: content.to_string(),
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn tree_is_layered_on_base() {
        let forge = MockForge::new()
            .with_branch("main", &[("manifest.json", "A"), ("dist/index.js", "B")]);

        let commit = AtomicPublisher::new(&forge)
            .publish(&main_branch(), &unit(&[("manifest.json", "A2")]), "update")
            .await
            .unwrap();

        let tree = forge.commit(&commit).unwrap().tree;
        let files = forge.tree_files(&tree).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["manifest.json"].content, "A2");
        assert_eq!(files["dist/index.js"].content, "B");
    }

    #[tokio::test]
    async fn racing_writer_is_overwritten() {
        let forge = MockForge::new()
            .with_branch("main", &[("manifest.json", "A")])
            .race_after_read(&[("dist/other.js", "theirs")]);
        let original = forge.branch_head("main").unwrap();

        let commit = AtomicPublisher::new(&forge)
            .publish(&main_branch(), &unit(&[("manifest.json", "A2")]), "update")
            .await
            .unwrap();

        // The branch had moved past the head we read, yet the forced
        // update went through and the racing commit is no longer reachable.
        assert_eq!(forge.branch_head("main"), Some(commit.clone()));
        assert_eq!(forge.commit(&commit).unwrap().parents, vec![original]);
        assert!(forge.operations().contains(&MockOperation::UpdateRef {
            branch: "main".into(),
            commit,
            force: true,
        }));
        assert!(!forge.files_at("main").unwrap().contains_key("dist/other.js"));
    }

    #[tokio::test]
    async fn fast_forward_only_would_have_failed_the_race() {
        use schemaship::forge::{Forge, TreeEntry};

        let forge = MockForge::new()
            .with_branch("main", &[("manifest.json", "A")])
            .race_after_read(&[("dist/other.js", "theirs")]);

        let head = forge.get_ref(&main_branch()).await.unwrap();
        let tree = forge
            .create_tree(&head.tree, &[TreeEntry::file("manifest.json", "A2")])
            .await
            .unwrap();
        let commit = forge
            .create_commit("update", &tree, &[head.commit])
            .await
            .unwrap();

        let err = forge
            .update_ref(&main_branch(), &commit, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::ApiError { status: 422, .. }));
    }
}
