use std::fmt;

use clap::Args;
use derive_more::{Display, Error};

/// Stage name reserved for production deployments.
pub(crate) const PRODUCTION: &str = "production";

/// Stage selection flags shared by all stage-aware subcommands.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct StageArgs {
    /// Target a preview stage.
    #[arg(long, value_name = "STAGE")]
    pub stage: Option<String>,

    /// Target the production deployment.
    #[arg(long)]
    pub production: bool,
}

/// Neither `--stage` nor `--production` were provided.
#[derive(Debug, Display, Error)]
#[display(fmt = "Please specify a stage with the --stage flag or the --production flag.")]
pub(crate) struct MissingStageError;

/// Resolved deployment stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Stage {
    /// Stage name passed to the wrapped tooling.
    name: String,

    /// Whether `production` was passed through `--stage`.
    named_production: bool,
}

impl StageArgs {
    /// Resolve the selected stage.
    ///
    /// `--production` takes precedence over `--stage`.
    pub(crate) fn resolve(&self) -> Result<Stage, MissingStageError> {
        let name = self
            .stage
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let named_production = name == Some(PRODUCTION);

        if self.production {
            return Ok(Stage {
                named_production,
                ..Stage::production()
            });
        }

        name.map(|name| Stage {
            name: name.to_owned(),
            named_production,
        })
        .ok_or(MissingStageError)
    }
}

impl Stage {
    /// Production stage, as selected by the `--production` flag.
    pub(crate) fn production() -> Self {
        Self {
            name: String::from(PRODUCTION),
            named_production: false,
        }
    }

    /// Stage name.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Whether this stage targets production resources.
    pub(crate) fn is_production(&self) -> bool {
        self.name == PRODUCTION
    }

    /// Production was selected with `--stage production`, with or without `--production`.
    pub(crate) fn is_named_production(&self) -> bool {
        self.named_production
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
