//! Shared test helpers for all trawl integration tests.
//!
//! Import from any integration test file with:
//!   `#[path = "../common/mod.rs"] mod common;`

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Write `content` at `root/rel`, creating parent directories. Returns the
/// absolute path as a string.
#[allow(dead_code)]
pub fn write_file(root: &Path, rel: &str, content: &str) -> String {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

/// A small polyglot project exercising most parser branches.
#[allow(dead_code)]
pub fn polyglot_project() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();

    write_file(
        &root,
        "src/base.ts",
        "/** Root of the model hierarchy. */\nexport class Base {\n  id: string;\n\n  describe(): string {\n    return this.id;\n  }\n}\n",
    );
    write_file(
        &root,
        "src/derived.ts",
        "import { Base } from './base';\n\nexport class Derived extends Base {\n  describe(): string {\n    return 'derived';\n  }\n}\n",
    );
    write_file(
        &root,
        "src/util.py",
        "MAX_SIZE = 100\n\ndef clamp(value: int) -> int:\n    \"\"\"Clamp to the configured maximum.\"\"\"\n    return min(value, MAX_SIZE)\n",
    );
    write_file(
        &root,
        "components/Card.vue",
        "<template>\n  <div><BaseButton /></div>\n</template>\n\n<script lang=\"ts\">\nimport BaseButton from './BaseButton.vue'\n</script>\n",
    );
    write_file(
        &root,
        "styles/app.css",
        ":root {\n  --accent: #446688;\n}\n\n.card {\n  color: var(--accent);\n}\n",
    );
    write_file(
        &root,
        "README.md",
        "# Sample\n\nOverview text.\n\n## Setup\n\n```sh\nnpm install\n```\n",
    );
    write_file(
        &root,
        "package.json",
        "{\n  \"name\": \"sample\",\n  \"main\": \"./src/base.ts\",\n  \"dependencies\": {\"lodash\": \"^4\"}\n}\n",
    );
    write_file(&root, "config/.env", "HOST=localhost\nAPI_KEY=hunter2\n");
    write_file(&root, "data.csv", "id,name\n1,alpha\n2,beta\n");

    (dir, root)
}
