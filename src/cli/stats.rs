//! Handler for the `stats` command: query recorded analytics (C10).

use crate::app::{App, Config};
use crate::cli::{output, StatsArgs};
use crate::error::Result;
use crate::ports::StatsWindow;

fn parse_window(s: &str) -> StatsWindow {
    match s {
        "hour" => StatsWindow::LastHour,
        "week" => StatsWindow::LastWeek,
        "all" => StatsWindow::AllTime,
        _ => StatsWindow::LastDay,
    }
}

pub async fn execute(config_path: &std::path::Path, args: &StatsArgs) -> Result<()> {
    let config = Config::load(config_path)?;
    let app = App::build(&config).await?;
    let window = parse_window(&args.window);

    let stats = app.engine.get_analytics(window).await?;

    output::section(&format!("analytics ({})", args.window));
    output::field("Discovered", stats.total_opportunities);
    output::field("Taken", stats.taken);
    output::field("Wins", stats.wins);
    output::field(
        "Win rate",
        if stats.taken > 0 { format!("{:.1}%", stats.win_rate * 100.0) } else { "N/A".to_string() },
    );
    output::field("Avg edge", format!("{:.2}%", stats.avg_edge));
    let profit = if stats.total_profit.is_sign_negative() {
        output::negative(stats.total_profit)
    } else {
        output::positive(stats.total_profit)
    };
    output::field("Total P/L", format!("${profit}"));
    println!();

    if args.pairs {
        let pairs = app.engine.get_platform_pairs().await?;
        output::section("platform pairs");
        if pairs.is_empty() {
            println!("  (none recorded)");
        }
        for pair in pairs {
            println!(
                "  {:<12} {:<12} opps={:<6} taken={:<6} wins={:<6} avg_edge={:.2}%",
                pair.platform_a, pair.platform_b, pair.total_opportunities, pair.taken, pair.wins, pair.avg_edge
            );
        }
        println!();
    }

    Ok(())
}
