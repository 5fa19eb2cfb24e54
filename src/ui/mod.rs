//! Text rendering for CryptoSpark
//!
//! Turns fetched market data into the plain-text views printed by the CLI.
//! Each renderer returns a `String` so output can be tested without a terminal.

pub mod format;
pub mod sparkline;

use crate::data::{CoinDetail, CoinMarket, MarketChartData};

use format::{format_change, format_millions_opt, format_supply, format_usd, format_usd_opt};
use sparkline::Sparkline;

/// Width of the chart sparkline in characters
pub const SPARKLINE_WIDTH: usize = 60;

/// Renders the market list, keeping only coins that match `search`
pub fn render_markets(coins: &[CoinMarket], search: Option<&str>) -> String {
    let term = search.unwrap_or("").trim();
    let filtered: Vec<&CoinMarket> = coins.iter().filter(|c| c.matches(term)).collect();

    if filtered.is_empty() {
        return format!("No data found for \"{}\"\n", term.to_uppercase());
    }

    let mut out = format!(
        "{:>4}  {:<24} {:<8} {:>16} {:>10} {:>14}\n",
        "#", "Name", "Symbol", "Price", "24h", "Volume"
    );
    for coin in filtered {
        let rank = coin
            .market_cap_rank
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        out.push_str(&format!(
            "{:>4}  {:<24} {:<8} {:>16} {:>10} {:>14}\n",
            rank,
            truncate(&coin.name, 24),
            coin.symbol.to_uppercase(),
            format_usd_opt(coin.current_price),
            format_change(coin.price_change_percentage_24h),
            format_millions_opt(coin.total_volume),
        ));
    }
    out
}

/// Renders the detail view of one coin
pub fn render_coin(coin: &CoinDetail) -> String {
    let data = &coin.market_data;

    let rank = coin
        .market_cap_rank
        .map_or_else(String::new, |r| format!("  (rank #{})", r));
    let mut lines = vec![
        format!("{} ({}){}", coin.name, coin.symbol.to_uppercase(), rank),
        format!(
            "{}  {} (24h)",
            format_usd_opt(data.current_price.usd),
            format_change(data.price_change_percentage_24h)
        ),
        String::new(),
    ];

    let rows = [
        ("Market Cap", format_usd_opt(data.market_cap.usd)),
        ("Volume (24h)", format_usd_opt(data.total_volume.usd)),
        ("Circulating Supply", format_supply(data.circulating_supply)),
        ("Total Supply", format_supply(data.total_supply)),
        ("24h High", format_usd_opt(data.high_24h.usd)),
        ("24h Low", format_usd_opt(data.low_24h.usd)),
    ];
    lines.extend(rows.iter().map(|(label, value)| format!("{:<20} {}", label, value)));

    let about = first_paragraph(&coin.description.en);
    if !about.is_empty() {
        lines.push(String::new());
        lines.push(about);
    }
    join_lines(&lines)
}

/// Renders a price summary and sparkline for `days` of history
pub fn render_chart(id: &str, days: u32, chart: &MarketChartData, width: usize) -> String {
    let points = chart.price_points(days);
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return format!("No chart data for {} over {} days\n", id, days);
    };

    let values = chart.price_values();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let change = if first.price != 0.0 {
        Some((last.price - first.price) / first.price * 100.0)
    } else {
        None
    };

    join_lines(&[
        format!("{} price, last {} day{}", id, days, if days == 1 { "" } else { "s" }),
        Sparkline::new(&values).render(width),
        format!("{} → {}", first.date, last.date),
        format!(
            "Low {}  High {}  Last {}  Change {}",
            format_usd(min),
            format_usd(max),
            format_usd(last.price),
            format_change(change)
        ),
    ])
}

/// Joins lines with a trailing newline after each
fn join_lines(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{}\n", line)).collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// First paragraph of an HTML-ish description, tags stripped
fn first_paragraph(description: &str) -> String {
    let normalized = description.replace("\r\n", "\n");
    let paragraph = normalized.split("\n\n").next().unwrap_or("");

    let mut out = String::with_capacity(paragraph.len());
    let mut in_tag = false;
    for c in paragraph.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}
