use std::io::Read as _;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use gqlfw_conf::Settings;
use gqlfw_reduce::Operation;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::TemplateSource;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Check {
    /// File holding the request body. Reads stdin when omitted.
    body: Option<Utf8PathBuf>,

    #[command(flatten)]
    source: TemplateSource,

    /// Operation to select from the request document.
    #[arg(long = "operation")]
    operation_name: Option<String>,

    /// JSON file holding the request variables.
    #[arg(long)]
    variables: Option<Utf8PathBuf>,

    /// Report every matching template instead of the first.
    #[arg(long)]
    all: bool,

    /// Print the reduced operation before matching.
    #[arg(long)]
    reduced: bool,
}

impl Command for Check {
    fn execute(&self, _args: &Args, settings: &Settings) -> Result<Exit> {
        let mut engine = self.source.load(settings)?;

        let body = match &self.body {
            Some(path) => {
                std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?
            }
            None => {
                let mut body = String::new();
                std::io::stdin()
                    .read_to_string(&mut body)
                    .context("Failed to read stdin")?;
                body
            }
        };
        let variables = self
            .variables
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
            })
            .transpose()?;

        let mut matched = Vec::new();
        let mut failure = None;
        let on_operation = |operation: &Operation<'_>| {
            if self.reduced {
                println!("{}", operation.render());
            }
        };

        if self.all || settings.match_all {
            engine.match_all(
                &body,
                self.operation_name.as_deref(),
                variables.as_deref(),
                on_operation,
                |template| matched.push(template.id().to_string()),
                |err| failure = Some(err),
            );
        } else {
            engine.match_request(
                &body,
                self.operation_name.as_deref(),
                variables.as_deref(),
                on_operation,
                |template| matched.extend(template.map(|t| t.id().to_string())),
                |err| failure = Some(err),
            );
        }

        if let Some(err) = failure {
            tracing::debug!(?err, "request could not be reduced");
            return Ok(Exit::error().with_message(format!("Rejected: {err}")));
        }

        if matched.is_empty() {
            return Ok(Exit::error().with_message("Rejected: no template matches the request."));
        }

        for id in &matched {
            println!("{id}");
        }
        Ok(Exit::success())
    }
}
