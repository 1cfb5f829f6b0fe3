use std::path::Path;

use anyhow::{Context, Result, anyhow};
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use fjoin_cli::config::{JoinConfig, LevelOverrides, parse_key_args};
use fjoin_cli::summary::print_differences;
use fjoin_cli::types::{JoinOutcome, PreviewOutcome};
use fjoin_core::{FuzzyJoinBuilder, REGISTERED};
use fjoin_ingest::{read_csv_table, write_csv_table};
use fjoin_model::JoinHow;

use crate::cli::{InputArgs, JoinArgs, KeyArgs, LevelArgs, PreviewArgs};

pub fn run_differences() -> Result<()> {
    print_differences(REGISTERED);
    Ok(())
}

pub fn run_join(args: &JoinArgs) -> Result<JoinOutcome> {
    let span = info_span!("join", left = %args.input.left.display(), right = %args.input.right.display());
    let _guard = span.enter();

    let config = load_config(&args.input, &args.keys, &args.level, args.how.map(JoinHow::from))?;
    let (left, right) = read_inputs(&args.input)?;
    let (left_rows, right_rows) = (left.height(), right.height());

    let mut join = config
        .builder(left, right)
        .and_then(FuzzyJoinBuilder::build)
        .context("configure join")?;
    let mut result = join.join(args.debug).context("run join")?;

    if let Some(path) = &args.output {
        write_csv_table(&mut result.frame, path)
            .with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), rows = result.row_count(), "joined table written");
    }

    Ok(JoinOutcome {
        left_rows,
        right_rows,
        result,
        output: args.output.clone(),
    })
}

pub fn run_preview(args: &PreviewArgs) -> Result<PreviewOutcome> {
    let span = info_span!("preview", level = args.index, sample = args.sample);
    let _guard = span.enter();

    let config = load_config(&args.input, &args.keys, &args.level, None)?;
    let (left, right) = read_inputs(&args.input)?;
    let join = config
        .builder(left, right)
        .and_then(FuzzyJoinBuilder::build)
        .context("configure join")?;

    let resolved = join
        .preview_level(args.index, args.sample)
        .with_context(|| format!("preview level {}", args.index))?;
    let binding = join
        .fuzzy_keys()
        .get(args.index)
        .ok_or_else(|| anyhow!("no fuzzy level {}", args.index))?;

    Ok(PreviewOutcome {
        level: args.index,
        left_column: binding.left.clone(),
        right_column: binding.right.clone(),
        resolved,
    })
}

fn load_config(
    input: &InputArgs,
    keys: &KeyArgs,
    level: &LevelArgs,
    how: Option<JoinHow>,
) -> Result<JoinConfig> {
    let mut config = match &input.config {
        Some(path) => JoinConfig::load(path)?,
        None => JoinConfig::default(),
    };
    let overrides = LevelOverrides {
        differences: level.differences.clone(),
        score_cutoff: level.cutoff,
        candidate_limit: level.limit,
        direction: level.direction.map(Into::into),
    };
    config.apply_overrides(
        parse_key_args(&keys.exact),
        parse_key_args(&keys.fuzzy),
        how,
        &overrides,
    )?;
    if config.exact_keys.is_none() && config.fuzzy_keys.is_none() {
        return Err(anyhow!(
            "no join keys; pass --exact/--fuzzy or a --config file"
        ));
    }
    Ok(config)
}

fn read_inputs(input: &InputArgs) -> Result<(DataFrame, DataFrame)> {
    Ok((read_input(&input.left)?, read_input(&input.right)?))
}

fn read_input(path: &Path) -> Result<DataFrame> {
    let df = read_csv_table(path).with_context(|| format!("read {}", path.display()))?;
    info!(path = %path.display(), rows = df.height(), columns = df.width(), "dataset loaded");
    Ok(df)
}
