// tests/analysis.rs
mod common;

use common::*;
use gold_market_analyzer::valuation::{InstrumentKind, TimingAdvice, TokenPrices};
use gold_market_analyzer::{AnalyzerConfig, GoldMarketAnalyzer, SnapshotCache, WaitPolicy};
use std::sync::Arc;
use std::time::Duration;

fn test_config() -> AnalyzerConfig {
    AnalyzerConfig {
        etf_url: ETF_URL.to_string(),
        price_board_url: BOARD_URL.to_string(),
        table_wait: WaitPolicy::immediate(),
        price_board_wait: WaitPolicy::immediate(),
        ..AnalyzerConfig::default()
    }
}

fn analyzer(script: &Arc<ScriptedSource>, config: AnalyzerConfig, tokens: TokenPrices) -> GoldMarketAnalyzer {
    GoldMarketAnalyzer::new(
        config,
        Arc::new(SharedSource(script.clone())),
        Arc::new(FixedQuotes(tokens)),
        Arc::new(RecordingWaiter::default()),
    )
}

fn board() -> String {
    price_board("1,000", "50", "2,000", "9,000")
}

fn three_funds() -> String {
    fund_table(&[
        fund_row("عیار", "صندوق کیان", "1.2M", "12,500", "12,000", "4.17%"),
        fund_row("طلا", "صندوق لوتوس", "850K", "10,000", "10,200", "-1.96%"),
        fund_row("زر", "صندوق زرافشان", "2B", "9,000", "9,100", "-1.1%"),
    ])
}

#[tokio::test]
async fn analysis_covers_the_whole_basket() {
    let script = Arc::new(
        ScriptedSource::new()
            .page(BOARD_URL, vec![board()])
            .page(ETF_URL, vec![three_funds()]),
    );
    let analysis = analyzer(&script, test_config(), TokenPrices::default())
        .get_analysis()
        .await
        .unwrap();

    assert_eq!(analysis.funds.len(), 3);
    assert_eq!(analysis.funds.symbols().collect::<Vec<_>>(), vec!["عیار", "طلا", "زر"]);
    assert_eq!(analysis.lowest_bubble.symbol, "طلا");
    assert_eq!(analysis.lowest_bubble.bubble_percent, -1.96);
    assert_eq!(analysis.highest_volume.symbol, "زر");
    assert_eq!(analysis.highest_volume.volume, 2_000_000_000);

    let kian = analysis.funds.get("عیار").unwrap();
    assert_eq!(kian.display_name, "صندوق کیان");
    assert_eq!(kian.price, 125_000.0);
    assert_eq!(kian.reference_value, 120_000.0);
    assert_eq!(kian.volume, 1_200_000);

    assert!((analysis.stats.avg_volume - 667_350_000.0).abs() < 1e-3);
    assert!(analysis
        .recommendations
        .iter()
        .any(|line| line.starts_with("طلا, زر have minimal bubble")));
    assert_eq!(script.closed(), script.opened());
}

#[tokio::test]
async fn no_reference_prices_means_no_fund_pass() {
    let script = Arc::new(
        ScriptedSource::new()
            .page(BOARD_URL, vec![LOADING.to_string()])
            .page(ETF_URL, vec![three_funds()]),
    );
    let result = analyzer(&script, test_config(), TokenPrices::default())
        .get_analysis()
        .await;

    assert!(result.is_none());
    assert_eq!(script.hits(ETF_URL), 0);
    assert_eq!(script.closed(), 1);
}

#[tokio::test]
async fn marker_only_table_yields_no_analysis() {
    let script = Arc::new(
        ScriptedSource::new()
            .page(BOARD_URL, vec![board()])
            .page(ETF_URL, vec![fund_table(&[])]),
    );
    let result = analyzer(&script, test_config(), TokenPrices::default())
        .get_analysis()
        .await;

    assert!(result.is_none());
}

#[tokio::test]
async fn rejected_rows_do_not_sink_the_pass() {
    let table = fund_table(&[
        fund_row("طلا", "صندوق لوتوس", "850K", "10,000", "10,200", "-1.96%"),
        fund_row("مفید", "صندوق مفید", "1M", "-", "10,000", "0.5%"),
    ]);
    let script = Arc::new(
        ScriptedSource::new()
            .page(BOARD_URL, vec![board()])
            .page(ETF_URL, vec![table]),
    );
    let analysis = analyzer(&script, test_config(), TokenPrices::default())
        .get_analysis()
        .await
        .unwrap();

    assert_eq!(analysis.funds.len(), 1);
    assert!(analysis.funds.get("مفید").is_none());
}

#[tokio::test]
async fn retry_recovers_from_a_slow_first_pass() {
    let script = Arc::new(
        ScriptedSource::new()
            .page(BOARD_URL, vec![board()])
            .page(ETF_URL, vec![LOADING.to_string(), three_funds()]),
    );
    let config = AnalyzerConfig {
        extraction_retries: 1,
        ..test_config()
    };
    let book = analyzer(&script, config, TokenPrices::default())
        .fetch_fund_records()
        .await
        .unwrap();

    assert_eq!(book.len(), 3);
    assert_eq!(script.opened(), 2);
    assert_eq!(script.closed(), 2);
}

#[tokio::test]
async fn without_retries_a_slow_pass_is_no_data() {
    let script = Arc::new(
        ScriptedSource::new().page(ETF_URL, vec![LOADING.to_string(), three_funds()]),
    );
    let result = analyzer(&script, test_config(), TokenPrices::default())
        .fetch_fund_records()
        .await;

    assert!(result.is_none());
    assert_eq!(script.opened(), 1);
}

#[tokio::test]
async fn cached_analysis_reuses_the_snapshot() {
    let script = Arc::new(
        ScriptedSource::new()
            .page(BOARD_URL, vec![board()])
            .page(ETF_URL, vec![three_funds()]),
    );
    let analyzer = analyzer(&script, test_config(), TokenPrices::default());
    let cache = SnapshotCache::new(Duration::from_secs(300));

    let first = analyzer.get_analysis_cached(&cache).await.unwrap();
    let second = analyzer.get_analysis_cached(&cache).await.unwrap();

    assert_eq!(first.generated_at, second.generated_at);
    assert_eq!(script.hits(BOARD_URL), 1);
    assert_eq!(script.hits(ETF_URL), 1);
}

#[tokio::test]
async fn overview_ranks_gold_coins_and_tokens() {
    let script = Arc::new(ScriptedSource::new().page(BOARD_URL, vec![board()]));
    let tokens = TokenPrices {
        paxg: Some(2010.0),
        xaut: None,
    };
    let overview = analyzer(&script, test_config(), tokens)
        .market_overview()
        .await
        .unwrap();

    assert_eq!(overview.gold_premium, -58.5);
    assert_eq!(overview.timing, TimingAdvice::GoodTimeToBuy);
    assert_eq!(overview.coins.len(), 1);
    assert_eq!(overview.coins[0].local_bubble, -17.0);
    assert_eq!(overview.tokens.len(), 1);
    assert_eq!(overview.tokens[0].premium, 0.5);
    assert_eq!(overview.tokens[0].price_local, 100_500.0);

    let kinds: Vec<_> = overview.options.iter().map(|o| o.kind).collect();
    assert_eq!(
        kinds,
        vec![InstrumentKind::DigitalToken, InstrumentKind::Coin, InstrumentKind::RawGold]
    );
    assert!(overview.best_investment.starts_with("PAXG is the best option"));
}

#[tokio::test]
async fn roster_falls_back_to_catalog() {
    let script = Arc::new(ScriptedSource::new().page(ETF_URL, vec![three_funds()]));
    let funds = analyzer(&script, test_config(), TokenPrices::default())
        .discover_funds()
        .await;

    let symbols: Vec<_> = funds.iter().map(|f| f.symbol.as_str()).collect();
    assert_eq!(
        symbols,
        vec!["طلا", "عیار", "مفید", "زر", "کزر", "صبا", "زرفام", "زرین", "تابان", "زاگرس", "آلتون"]
    );
    let zarfam = funds.iter().find(|f| f.symbol == "زرفام").unwrap();
    assert_eq!(zarfam.name, "صندوق سرمایه گذاری مبتنی بر طلای زرفام آشنا");
    let zarrin = funds.iter().find(|f| f.symbol == "زرین").unwrap();
    assert_eq!(zarrin.name, "صندوق سرمایه گذاری زرین آگاه");
    assert!(funds.iter().all(|f| f.gold_weight_grams == 0.01 && f.gold_purity == 1.0));
}

#[tokio::test]
async fn roster_is_read_from_the_nav_table() {
    let page = "<html><body><table id=\"navTable\"><tbody>\
        <tr><td><a href=\"/funds/kian-gold/\">عیار</a></td><td>1</td></tr>\
        <tr><td><a href=\"/funds/lotus\">طلا</a></td><td>2</td></tr>\
        </tbody></table></body></html>"
        .to_string();
    let script = Arc::new(ScriptedSource::new().page(ETF_URL, vec![page]));
    let funds = analyzer(&script, test_config(), TokenPrices::default())
        .discover_funds()
        .await;

    assert_eq!(funds.len(), 2);
    assert_eq!(funds[0].symbol, "عیار");
    assert_eq!(funds[0].name, "kian-gold");
    assert_eq!(funds[1].name, "lotus");
}

#[tokio::test]
async fn snapshot_cache_follows_configured_ttl() {
    let script = Arc::new(ScriptedSource::new().page(BOARD_URL, vec![board()]));
    let cached = analyzer(&script, test_config(), TokenPrices::default());
    let cache = cached.snapshot_cache();
    cached.market_overview_cached(&cache).await.unwrap();
    cached.market_overview_cached(&cache).await.unwrap();
    assert_eq!(script.hits(BOARD_URL), 1);

    let script = Arc::new(ScriptedSource::new().page(BOARD_URL, vec![board()]));
    let config = AnalyzerConfig {
        cache_ttl: Duration::ZERO,
        ..test_config()
    };
    let uncached = analyzer(&script, config, TokenPrices::default());
    let cache = uncached.snapshot_cache();
    uncached.market_overview_cached(&cache).await.unwrap();
    uncached.market_overview_cached(&cache).await.unwrap();
    assert_eq!(script.hits(BOARD_URL), 2);
}

#[tokio::test]
async fn unbounded_retry_setting_does_not_overflow() {
    let script = Arc::new(ScriptedSource::new().page(ETF_URL, vec![three_funds()]));
    let config = AnalyzerConfig {
        extraction_retries: u32::MAX,
        ..test_config()
    };
    let book = analyzer(&script, config, TokenPrices::default())
        .fetch_fund_records()
        .await
        .unwrap();

    assert_eq!(book.len(), 3);
    assert_eq!(script.opened(), 1);
}
