use std::fmt;
use std::fs;
use std::io;
use std::sync::OnceLock;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use gqlfw_engine::TemplateDefinition;

/// One request body, with its JSON variables when a `.json` file of the same
/// name sits next to it.
#[derive(Clone)]
pub struct RequestFixture {
    pub label: String,
    pub body: String,
    pub variables: Option<String>,
}

impl fmt::Display for RequestFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

pub fn request_fixtures() -> &'static [RequestFixture] {
    static FIXTURES: OnceLock<Vec<RequestFixture>> = OnceLock::new();
    FIXTURES.get_or_init(load_request_fixtures).as_slice()
}

pub fn template_definitions() -> Vec<TemplateDefinition> {
    let path = fixtures_root().join("templates.json");
    let source = fs::read_to_string(path.as_std_path())
        .unwrap_or_else(|err| panic!("failed to read {path}: {err}"));
    serde_json::from_str(&source).unwrap_or_else(|err| panic!("failed to parse {path}: {err}"))
}

fn fixtures_root() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn load_request_fixtures() -> Vec<RequestFixture> {
    let root = fixtures_root().join("requests");

    let fixtures = collect_requests(&root)
        .unwrap_or_else(|err| panic!("failed to load request fixtures: {err}"));

    assert!(!fixtures.is_empty(), "no requests discovered under {root}");

    fixtures
}

fn collect_requests(dir: &Utf8Path) -> io::Result<Vec<RequestFixture>> {
    let mut fixtures = Vec::new();

    for entry in fs::read_dir(dir.as_std_path())? {
        let path = entry?.path();
        let path = Utf8PathBuf::from_path_buf(path).map_err(|original| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("path {} is not valid UTF-8", original.display()),
            )
        })?;

        if path.extension() != Some("graphql") {
            continue;
        }

        let body = fs::read_to_string(path.as_std_path())?;
        let variables_path = path.with_extension("json");
        let variables = if variables_path.is_file() {
            Some(fs::read_to_string(variables_path.as_std_path())?)
        } else {
            None
        };
        let label = path.file_stem().unwrap_or(path.as_str()).to_string();

        fixtures.push(RequestFixture {
            label,
            body,
            variables,
        });
    }

    fixtures.sort_by(|a, b| a.label.cmp(&b.label));

    Ok(fixtures)
}
