use crate::cli::StatsArgs;
use crate::client::TwoLevelCache;
use crate::metrics::CacheReport;
use anyhow::Result;

pub async fn execute(cache: &TwoLevelCache, args: &StatsArgs) -> Result<()> {
    let report = cache.get_stats().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.prometheus {
        print!("{}", report.to_prometheus());
    } else {
        print_human(&report);
    }

    Ok(())
}

fn print_human(report: &CacheReport) {
    println!("=== Cache Statistics ({}) ===\n", report.generated_at.to_rfc3339());
    println!("L1 Cache:");
    println!("  Hits:     {}", report.l1.hits);
    println!("  Misses:   {}", report.l1.misses);
    println!("  Hit Rate: {:.2}%", report.l1.hit_rate * 100.0);
    println!("  Sets:     {}", report.l1.sets);
    println!("  Deletes:  {}", report.l1.deletes);
    println!("  Entries:  {}", report.l1_entries);
    println!();
    println!("L2 Store:");
    match &report.l2 {
        Some(l2) => {
            println!("  Commands:    {}", l2.command_count);
            println!("  Connections: {}", l2.connection_count);
            println!("  Keys:        {}", l2.key_count);
        }
        None => println!("  ⚠️ unreachable"),
    }
    println!("  Errors:      {}", report.l2_errors);
}
