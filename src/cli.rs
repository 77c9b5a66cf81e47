use crate::config::ScopeStrategyKind;
use crate::cooccur::FeatureValue;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "geoscope",
    version,
    about = "Category scoring, place-name disambiguation and document geo-scope"
)]
pub struct Cli {
    /// Config file path
    #[arg(long, env = "GEOSCOPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Train a co-occurrence table and score a feature vector
    Classify(ClassifyArgs),
    /// Resolve ambiguous place mentions in a document
    Disambiguate(DisambiguateArgs),
    /// Pick the location most representative of a set
    Scope(ScopeArgs),
}

#[derive(Parser)]
pub struct ClassifyArgs {
    /// Labelled training instances (JSON Lines)
    #[arg(long)]
    pub train: PathBuf,

    /// Nominal feature to classify, as attribute=value (repeatable)
    #[arg(long = "feature")]
    pub features: Vec<FeatureValue>,
}

#[derive(Parser)]
pub struct DisambiguateArgs {
    /// Document JSON: {"text": ..., "mentions": [...]}
    #[arg(long)]
    pub input: PathBuf,

    /// Linear scoring model JSON (overrides config)
    #[arg(long, conflicts_with = "train")]
    pub model: Option<PathBuf>,

    /// Train a co-occurrence scorer from candidates labelled "true"/"false" (JSON Lines)
    #[arg(long)]
    pub train: Option<PathBuf>,

    /// Resolve every mention to its first candidate instead of scoring
    #[arg(long, conflicts_with_all = ["model", "train"])]
    pub baseline: bool,

    /// Also report the document scope of the resolved locations
    #[arg(long)]
    pub scope: bool,
}

#[derive(Parser)]
pub struct ScopeArgs {
    /// JSON array of locations
    #[arg(long)]
    pub input: PathBuf,

    /// Center computation (default from config, else midpoint)
    #[arg(long, value_enum)]
    pub strategy: Option<ScopeStrategyKind>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_features() {
        let cli = Cli::try_parse_from([
            "geoscope", "classify", "--train", "t.jsonl", "--feature", "a=x", "--feature", "b=y",
        ])
        .unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.features, vec![FeatureValue::new("a", "x"), FeatureValue::new("b", "y")]);
    }

    #[test]
    fn model_and_train_conflict() {
        let res = Cli::try_parse_from([
            "geoscope", "disambiguate", "--input", "d.json", "--model", "m.json", "--train", "t.jsonl",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn baseline_conflicts_with_model() {
        let res = Cli::try_parse_from([
            "geoscope", "disambiguate", "--input", "d.json", "--baseline", "--model", "m.json",
        ]);
        assert!(res.is_err());
        let cli = Cli::try_parse_from(["geoscope", "disambiguate", "--input", "d.json", "--baseline"])
            .unwrap();
        let Command::Disambiguate(args) = cli.command else {
            panic!("expected disambiguate");
        };
        assert!(args.baseline);
    }

    #[test]
    fn strategy_value_enum() {
        let cli = Cli::try_parse_from(["geoscope", "scope", "--input", "l.json", "--strategy", "centroid"])
            .unwrap();
        let Command::Scope(args) = cli.command else {
            panic!("expected scope");
        };
        assert_eq!(args.strategy, Some(ScopeStrategyKind::Centroid));
    }
}
