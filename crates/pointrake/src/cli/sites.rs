use anyhow::Result;
use console::style;

/// Supported sources and the history-page URL patterns that select them,
/// in extractor priority order.
const SITES: &[(&str, &str)] = &[
    ("wester", "icoca.jr-odekake.net/pc/pointref_search.do"),
    ("RakutenPoint", "point.rakuten.co.jp/history/"),
    ("Ponta", "point-portal.auone.jp/point/history"),
    ("VPoint", "mypage.tsite.jp, vpoint.jp"),
];

pub fn run() -> Result<()> {
    for (site, pattern) in SITES {
        println!("{:<14} {}", site, style(pattern).dim());
    }
    Ok(())
}
