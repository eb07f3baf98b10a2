use anyhow::{Context, Result};
use passage_eval::{EvalQuery, FusedRun, RankingSource, RecordedRun};
use passage_protocol::FusionStrategy;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A ranking strategy named on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategySpec {
    /// Fuse the recorded lexical and vector runs.
    Fused(FusionStrategy),
    /// The recorded lexical run on its own.
    Lexical,
    /// The recorded vector run on its own.
    Vector,
    /// A pre-fused recorded run file.
    Run(PathBuf),
}

impl FromStr for StrategySpec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Some(path) = value.strip_prefix("run:") {
            if path.is_empty() {
                return Err("run: strategy needs a file path".to_string());
            }
            return Ok(Self::Run(PathBuf::from(path)));
        }
        match value.to_ascii_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "vector" => Ok(Self::Vector),
            other => other
                .parse::<FusionStrategy>()
                .map(Self::Fused)
                .map_err(|_| {
                    format!("unknown strategy '{value}' (expected rrf|score|lexical|vector|run:<path>)")
                }),
        }
    }
}

impl fmt::Display for StrategySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fused(strategy) => f.write_str(strategy.as_str()),
            Self::Lexical => f.write_str("lexical"),
            Self::Vector => f.write_str("vector"),
            Self::Run(path) => write!(f, "run:{}", path.display()),
        }
    }
}

/// Recorded per-source runs shared by the fused strategies.
#[derive(Debug, Default)]
pub struct SourceRuns {
    lexical: Option<RecordedRun>,
    vector: Option<RecordedRun>,
}

impl SourceRuns {
    pub async fn load(lexical: Option<&Path>, vector: Option<&Path>) -> Result<Self> {
        let lexical = match lexical {
            Some(path) => Some(RecordedRun::load(path).await?),
            None => None,
        };
        let vector = match vector {
            Some(path) => Some(RecordedRun::load(path).await?),
            None => None,
        };
        Ok(Self { lexical, vector })
    }

    /// Warn about dataset queries a loaded run never recorded; they score zero.
    pub fn warn_unrecorded(&self, queries: &[EvalQuery]) {
        for (label, run) in [("lexical", &self.lexical), ("vector", &self.vector)] {
            let Some(run) = run else { continue };
            let missing = run.missing(queries);
            if !missing.is_empty() {
                log::warn!(
                    "{} of {} queries missing from the {label} run (first: '{}')",
                    missing.len(),
                    queries.len(),
                    missing[0]
                );
            }
        }
    }

    fn lexical(&self, spec: &StrategySpec) -> Result<&RecordedRun> {
        self.lexical
            .as_ref()
            .with_context(|| format!("Strategy '{spec}' requires --lexical <run.json>"))
    }

    fn vector(&self, spec: &StrategySpec) -> Result<&RecordedRun> {
        self.vector
            .as_ref()
            .with_context(|| format!("Strategy '{spec}' requires --vector <run.json>"))
    }

    /// Build the ranking source for `spec`, borrowing the recorded runs.
    pub async fn source<'a>(
        &'a self,
        spec: &StrategySpec,
        rrf_k: f64,
    ) -> Result<Box<dyn RankingSource + 'a>> {
        let source: Box<dyn RankingSource + 'a> = match spec {
            StrategySpec::Fused(strategy) => Box::new(
                FusedRun::new(self.lexical(spec)?, self.vector(spec)?, *strategy).rrf_k(rrf_k),
            ),
            StrategySpec::Lexical => Box::new(self.lexical(spec)?.clone()),
            StrategySpec::Vector => Box::new(self.vector(spec)?.clone()),
            StrategySpec::Run(path) => Box::new(RecordedRun::load(path).await?),
        };
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_strategy_form() {
        assert_eq!("rrf".parse(), Ok(StrategySpec::Fused(FusionStrategy::Rrf)));
        assert_eq!("Score".parse(), Ok(StrategySpec::Fused(FusionStrategy::Score)));
        assert_eq!("lexical".parse(), Ok(StrategySpec::Lexical));
        assert_eq!("vector".parse(), Ok(StrategySpec::Vector));
        assert_eq!(
            "run:runs/a.json".parse(),
            Ok(StrategySpec::Run(PathBuf::from("runs/a.json")))
        );
        assert!("run:".parse::<StrategySpec>().is_err());
        assert!("bm25".parse::<StrategySpec>().is_err());
    }

    #[test]
    fn display_round_trips_names() {
        assert_eq!(StrategySpec::Fused(FusionStrategy::Score).to_string(), "score");
        assert_eq!(StrategySpec::Run(PathBuf::from("x.json")).to_string(), "run:x.json");
    }

    #[tokio::test]
    async fn fused_strategy_without_runs_is_an_error() {
        let runs = SourceRuns::default();
        let err = runs
            .source(&StrategySpec::Fused(FusionStrategy::Rrf), 60.0)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("--lexical"));
    }
}
