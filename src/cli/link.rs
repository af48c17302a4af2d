//! Handler for the `link` command group: manage manual market links.

use crate::app::{App, Config};
use crate::cli::{output, LinkCommands};
use crate::error::Result;
use crate::market::MarketKey;

pub async fn execute(config_path: &std::path::Path, command: &LinkCommands) -> Result<()> {
    let config = Config::load(config_path)?;
    let app = App::build(&config).await?;

    match command {
        LinkCommands::Add { venue_a, market_a, venue_b, market_b } => {
            let a = MarketKey::new(venue_a, market_a);
            let b = MarketKey::new(venue_b, market_b);
            app.engine.link_markets(a, b, 1.0).await?;
            output::success(&format!("linked {venue_a}:{market_a} <-> {venue_b}:{market_b}"));
        }
        LinkCommands::Remove { venue_a, market_a, venue_b, market_b } => {
            let a = MarketKey::new(venue_a, market_a);
            let b = MarketKey::new(venue_b, market_b);
            if app.engine.unlink_markets(&a, &b).await? {
                output::success(&format!("unlinked {venue_a}:{market_a} <-> {venue_b}:{market_b}"));
            } else {
                output::warning("no such link");
            }
        }
        LinkCommands::Show { venue, market } => {
            let key = MarketKey::new(venue, market);
            let identity = app.engine.get_linked_markets(&key);
            output::section(&format!("identity group for {venue}:{market}"));
            if identity.is_empty() {
                println!("  (no links)");
            }
            for member in identity {
                println!("  {}", member.as_str());
            }
            println!();
        }
    }
    Ok(())
}
