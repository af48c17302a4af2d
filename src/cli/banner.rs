//! ASCII banner for interactive `run` sessions.

use std::io::IsTerminal;

struct Colors {
    accent: &'static str,
    title: &'static str,
    subtitle: &'static str,
    reset: &'static str,
}

const COLOR: Colors = Colors {
    accent: "\x1b[38;2;120;170;200m",
    title: "\x1b[1;38;2;220;180;90m",
    subtitle: "\x1b[38;2;100;100;120m",
    reset: "\x1b[0m",
};

const PLAIN: Colors = Colors { accent: "", title: "", subtitle: "", reset: "" };

/// Print the arbitrex banner to stdout, falling back to plain text when
/// stdout isn't a terminal.
pub fn print_banner() {
    let c = if std::io::stdout().is_terminal() { &COLOR } else { &PLAIN };
    let a = c.accent;
    let t = c.title;
    let s = c.subtitle;
    let r = c.reset;

    println!(
        r#"
{a}   ╱╲╱╲   {t}arbitrex{r}
{a}  ╱    ╲  {r}cross-venue prediction-market arbitrage engine
{a} ╱  ◇◇  ╲ {r}
{a}╱________╲{r}  {s}"the spread is the signal"{r}
"#
    );
}
