//! Startup banner

use std::io::{self, IsTerminal, Write};

use yansi::Paint;

use crate::config::ColorChoice;

const RULE: &str = "==================================================";
const TITLE: &str = "📊 Plan C 暴落判定アプリ（日米別判定版）";
const SUBTITLE: &str = "毎月14日に実施 - 翌15日の投資額と配分を決定";

/// Render the banner for a script. Color codes are only emitted when `color` is set.
pub fn render(script: &str, color: bool) -> String {
    let starting = format!("Starting {script} ... (Ctrl+C to stop)");

    if !color {
        return format!("{RULE}\n  {TITLE}\n  {SUBTITLE}\n{RULE}\n{starting}\n");
    }

    format!(
        "{}\n  {}\n  {}\n{}\n{}\n",
        RULE.cyan(),
        TITLE.bold().cyan(),
        SUBTITLE.yellow(),
        RULE.cyan(),
        starting.green()
    )
}

/// Whether stdout should get colors under `choice`.
pub fn stdout_color(choice: ColorChoice) -> bool {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    choice.enabled(io::stdout().is_terminal(), no_color)
}

/// Print the banner to stdout.
pub fn print(script: &str, choice: ColorChoice) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(render(script, stdout_color(choice)).as_bytes())?;
    stdout.flush()
}
