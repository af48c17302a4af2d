//! Handler for the `config` command group.

use crate::app::Config;
use crate::cli::output;
use crate::error::Result;

pub fn execute_show(path: &std::path::Path) -> Result<()> {
    let config = Config::load(path)?;

    output::section("effective configuration");
    output::field("Venues", config.engine.venues.join(", "));
    output::field("Dry run", config.dry_run);
    output::field("Store backend", format!("{:?}", config.store.backend));
    output::field("Feed backend", format!("{:?}", config.feed.backend));
    println!();

    output::section("matching & discovery");
    output::field("Min edge %", config.engine.min_edge_pct);
    output::field("Min liquidity", config.engine.min_liquidity);
    output::field("Semantic matching", config.matcher.semantic_matching);
    output::field("Internal arb", config.engine.include_internal);
    output::field("Cross-platform arb", config.engine.include_cross_platform);
    output::field("Edge-vs-fair-value", config.engine.include_edge);
    println!();

    output::section("circuit breaker");
    output::field("Max daily loss %", config.breaker.max_loss_pct_daily);
    output::field("Max consecutive failures", config.breaker.max_consecutive_failures);
    output::field("Auto reset", config.breaker.auto_reset);
    println!();

    if let Some(path) = &config.status_file {
        output::field("Status file", path.display());
    }
    println!();

    Ok(())
}

pub fn execute_validate(path: &std::path::Path) -> Result<()> {
    println!("Validating: {}", path.display());
    println!();

    match Config::load(path) {
        Ok(config) => {
            output::success("config file is valid");

            let mut warnings = Vec::new();
            if config.engine.venues.is_empty() {
                warnings.push("no venues configured (already fatal at load, should be unreachable)");
            }
            if config.engine.include_edge {
                warnings.push("edge-vs-fair-value enabled but no fair-value provider is wired in yet; family will be inert");
            }
            if config.dry_run {
                warnings.push("dry_run is set; mark_taken/record_outcome should not be driven from automation");
            }

            for w in warnings {
                output::warning(w);
            }
            println!();
            println!("Run 'arbitrex config show -c {}' to see resolved values", path.display());
            Ok(())
        }
        Err(e) => {
            output::error("config file is invalid");
            println!();
            println!("Error: {e}");
            Err(e)
        }
    }
}
