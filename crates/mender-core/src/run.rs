//! The mend loop: list, classify, rewrite, write back, count.
//!
//! Items are handled strictly one after another in listing order. Per-item
//! failures (generation errors, items that vanished) are counted as skips;
//! any other library failure aborts the run with an error.

use crate::config::Config;
use crate::error::Result;
use crate::library::{JellyfinClient, Library, UpdateOutcome};
use crate::llm::{LlmProviderFactory, Rewriter};
use crate::types::{ChangeRecord, Item, RunStats};

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Server type names to list
    pub item_types: Vec<String>,
    /// Library or collection to restrict the listing to
    pub scope_id: Option<String>,
    /// Flat rate for the cost estimate
    pub cost_per_token: f64,
    /// Generate but do not write
    pub dry_run: bool,
    /// Stop after this many targets
    pub limit: Option<usize>,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            item_types: config.item_types(),
            scope_id: config.library.library_id.clone().filter(|s| !s.is_empty()),
            cost_per_token: config.llm.cost_per_token,
            dry_run: false,
            limit: None,
        }
    }
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// New overview written
    Updated,
    /// New overview generated, write suppressed by dry run
    WouldUpdate,
    /// Generation failed; nothing was written
    GenerationFailed,
    /// The item vanished or became inaccessible before the write
    Unavailable { reason: String },
}

impl ItemOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ItemOutcome::GenerationFailed | ItemOutcome::Unavailable { .. }
        )
    }
}

/// Reported to the caller after each target.
#[derive(Debug)]
pub struct ItemProgress<'a> {
    pub item: &'a Item,
    pub outcome: &'a ItemOutcome,
    /// Targets finished so far, this one included
    pub done: usize,
    pub total: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    /// One record per applied (or, in dry run, proposed) rewrite
    pub changes: Vec<ChangeRecord>,
    /// Approximate spend for the tokens used
    pub approx_cost: f64,
    pub dry_run: bool,
}

/// How a run ended, short of a fatal error.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// No item needed a new overview
    NothingToDo { listed: usize },
    Finished(RunReport),
}

/// Orchestrates the library and the rewriter.
pub struct Mender {
    library: Box<dyn Library>,
    rewriter: Rewriter,
    options: RunOptions,
}

impl Mender {
    pub fn new(library: Box<dyn Library>, rewriter: Rewriter, options: RunOptions) -> Self {
        Self {
            library,
            rewriter,
            options,
        }
    }

    /// Wire up the Jellyfin client and the configured LLM backend.
    ///
    /// An unknown provider or missing API key does not fail here: every item
    /// will be skipped with the reason instead.
    pub fn from_config(config: &Config, options: RunOptions) -> Result<Self> {
        let library = JellyfinClient::from_config(config)?;
        let provider =
            LlmProviderFactory::create_or_unavailable(config.provider(), config, config.model());
        Ok(Self::new(
            Box::new(library),
            Rewriter::new(provider),
            options,
        ))
    }

    /// List candidates and keep the ones whose overview is missing or short.
    ///
    /// Returns the number of listed (non-track) items alongside the targets.
    pub async fn find_targets(&self) -> Result<(usize, Vec<Item>)> {
        let items = self
            .library
            .list_items(&self.options.item_types, self.options.scope_id.as_deref())
            .await?;
        let listed = items.len();

        let mut targets: Vec<Item> = items
            .into_iter()
            .filter(|item| !item.is_track() && item.needs_overview())
            .collect();
        if let Some(limit) = self.options.limit {
            targets.truncate(limit);
        }

        tracing::info!(
            "{} of {listed} item(s) need a new overview",
            targets.len()
        );
        Ok((listed, targets))
    }

    /// Rewrite and write back each target, in order.
    ///
    /// `on_item` is called after every item, for progress display.
    pub async fn process<F>(&self, targets: &[Item], mut on_item: F) -> Result<RunReport>
    where
        F: FnMut(&ItemProgress<'_>),
    {
        let mut stats = RunStats {
            targets: targets.len(),
            ..Default::default()
        };
        let mut changes = Vec::new();

        for (idx, item) in targets.iter().enumerate() {
            let outcome = self.process_one(item, &mut stats, &mut changes).await?;
            if outcome.is_skip() {
                stats.skipped += 1;
            } else {
                stats.updated += 1;
            }
            on_item(&ItemProgress {
                item,
                outcome: &outcome,
                done: idx + 1,
                total: targets.len(),
            });
        }

        let approx_cost = stats.approx_cost(self.options.cost_per_token);
        let verb = if self.options.dry_run { "Would update" } else { "Updated" };
        tracing::info!(
            "Done. {verb} {}, skipped {}, tokens {} (≈${approx_cost:.4})",
            stats.updated,
            stats.skipped,
            stats.total_tokens
        );

        Ok(RunReport {
            stats,
            changes,
            approx_cost,
            dry_run: self.options.dry_run,
        })
    }

    async fn process_one(
        &self,
        item: &Item,
        stats: &mut RunStats,
        changes: &mut Vec<ChangeRecord>,
    ) -> Result<ItemOutcome> {
        let Some(rewrite) = self.rewriter.rewrite(item).await else {
            return Ok(ItemOutcome::GenerationFailed);
        };
        stats.total_tokens += rewrite.tokens;

        let outcome = if self.options.dry_run {
            ItemOutcome::WouldUpdate
        } else {
            match self.library.update_overview(&item.id, &rewrite.text).await? {
                UpdateOutcome::Updated => ItemOutcome::Updated,
                UpdateOutcome::Skipped { reason } => {
                    return Ok(ItemOutcome::Unavailable { reason });
                }
            }
        };

        let record = ChangeRecord::new(item, &rewrite.text);
        tracing::info!(target: "mender::changes", "\n{record}\n");
        changes.push(record);
        Ok(outcome)
    }

    /// Full run: find targets, then process them.
    pub async fn run<F>(&self, on_item: F) -> Result<RunOutcome>
    where
        F: FnMut(&ItemProgress<'_>),
    {
        tracing::info!(
            "Mender run via {} for types {}",
            self.rewriter.provider_name(),
            self.options.item_types.join(", ")
        );
        let (listed, targets) = self.find_targets().await?;
        if targets.is_empty() {
            return Ok(RunOutcome::NothingToDo { listed });
        }
        let report = self.process(&targets, on_item).await?;
        Ok(RunOutcome::Finished(report))
    }
}
