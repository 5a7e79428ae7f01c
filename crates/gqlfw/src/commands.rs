mod check;
mod paths;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use clap::Parser;
use clap::Subcommand;
use gqlfw_conf::Settings;
use gqlfw_engine::Engine;
use gqlfw_engine::TemplateDefinition;
use gqlfw_schema::Schema;
use serde::de::DeserializeOwned;

use crate::args::Args;
use crate::exit::Exit;

pub trait Command {
    fn execute(&self, args: &Args, settings: &Settings) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum GqlfwCommand {
    /// Match a request against the template set
    Check(self::check::Check),
    /// Print the structural paths of every template
    Paths(self::paths::Paths),
}

impl Command for GqlfwCommand {
    fn execute(&self, args: &Args, settings: &Settings) -> Result<Exit> {
        match self {
            GqlfwCommand::Check(check) => check.execute(args, settings),
            GqlfwCommand::Paths(paths) => paths.execute(args, settings),
        }
    }
}

/// Where the template set comes from. Flags override the settings files.
#[derive(Debug, Parser)]
pub struct TemplateSource {
    /// JSON file with the template definitions.
    #[arg(long)]
    templates: Option<Utf8PathBuf>,

    /// JSON file with the schema model.
    #[arg(long)]
    schema: Option<Utf8PathBuf>,
}

impl TemplateSource {
    pub fn load(&self, settings: &Settings) -> Result<Engine> {
        let templates = self
            .templates
            .as_ref()
            .or(settings.templates.as_ref())
            .context("No templates file given; pass --templates or set `templates` in gqlfw.toml")?;
        let definitions: Vec<TemplateDefinition> = read_json(templates)?;

        let schema: Option<Schema> = self
            .schema
            .as_ref()
            .or(settings.schema.as_ref())
            .map(|path| read_json(path))
            .transpose()?;

        let engine = Engine::new(definitions, schema)
            .with_context(|| format!("Failed to load templates from {templates}"))?;
        tracing::debug!(
            templates = engine.templates().len(),
            schema = engine.schema().is_some(),
            "loaded template set"
        );
        Ok(engine)
    }
}

fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&source).with_context(|| format!("Failed to parse {path}"))
}
