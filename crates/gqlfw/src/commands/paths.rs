use anyhow::Result;
use clap::Parser;
use gqlfw_conf::Settings;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::TemplateSource;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Paths {
    #[command(flatten)]
    source: TemplateSource,

    /// Only print this template.
    #[arg(long)]
    template: Option<String>,
}

impl Command for Paths {
    fn execute(&self, _args: &Args, settings: &Settings) -> Result<Exit> {
        let engine = self.source.load(settings)?;

        let mut printed = 0;
        for template in engine.templates() {
            if self.template.as_deref().is_some_and(|id| id != template.id()) {
                continue;
            }
            println!("{}", template.id());
            for path in template.paths() {
                println!("  {path}");
            }
            printed += 1;
        }

        match &self.template {
            Some(id) if printed == 0 => {
                Ok(Exit::error().with_message(format!("Template '{id}' is not defined.")))
            }
            _ => Ok(Exit::success()),
        }
    }
}
