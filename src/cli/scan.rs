//! Handler for the `scan` command: run exactly one scan cycle.

use crate::app::{App, Config};
use crate::cli::{output, ScanArgs};
use crate::engine::{ScanOptions, SortKey};
use crate::error::Result;
use crate::opportunity::{Opportunity, OpportunityKind};

pub async fn execute(config_path: &std::path::Path, args: &ScanArgs) -> Result<()> {
    let config = Config::load(config_path)?;
    let app = App::build(&config).await?;

    let venues = args.venues.as_ref().map(|s| s.split(',').map(|v| v.trim().to_string()).collect());
    let opts = ScanOptions { venues, sort: SortKey::Score };

    let pb = output::muted("scanning venues...");
    println!("{pb}");
    let found = app.engine.scan(&opts).await;

    if args.json {
        let json: Vec<_> = found.iter().take(args.limit).map(opportunity_json).collect();
        let rendered = serde_json::to_string_pretty(&json).map_err(crate::error::StoreError::Serialization)?;
        println!("{rendered}");
    } else {
        print_table(&found, args.limit);
    }

    Ok(())
}

fn kind_label(kind: OpportunityKind) -> &'static str {
    match kind {
        OpportunityKind::Internal => "internal",
        OpportunityKind::CrossPlatform => "cross_platform",
        OpportunityKind::Edge => "edge",
    }
}

fn opportunity_json(opp: &Opportunity) -> serde_json::Value {
    serde_json::json!({
        "id": opp.id.to_string(),
        "kind": kind_label(opp.kind),
        "edge_pct": opp.edge_pct.to_string(),
        "score": opp.score,
        "confidence": opp.confidence,
        "total_liquidity": opp.total_liquidity.to_string(),
        "legs": opp.markets.len(),
    })
}

fn print_table(found: &[Opportunity], limit: usize) {
    output::section(&format!("{} opportunities found", found.len()));
    if found.is_empty() {
        return;
    }
    println!(
        "  {:<8} {:<14} {:>8} {:>7} {:>6} {:>12}",
        "id", "kind", "edge%", "score", "conf", "liquidity"
    );
    for opp in found.iter().take(limit) {
        let id_short = opp.id.to_string().chars().take(8).collect::<String>();
        let edge = if opp.edge_pct.is_sign_positive() { output::positive(opp.edge_pct) } else { output::negative(opp.edge_pct) };
        println!(
            "  {:<8} {:<14} {:>8} {:>7.1} {:>6.2} {:>12}",
            id_short,
            kind_label(opp.kind),
            edge,
            opp.score,
            opp.confidence,
            opp.total_liquidity
        );
    }
    println!();
}
