use anyhow::Result;

use realty_scout::config::Config;

/// Print a summary of a validated configuration
pub fn check_config(config: &Config) -> Result<()> {
    println!("Configuration OK");
    println!("  API: {}", config.api.url);
    println!(
        "  Fetch window: {}",
        if config.api.fetch_for_yesterday {
            "previous day"
        } else {
            "all dates"
        }
    );

    println!("  Categories:");
    for category in &config.categories {
        println!(
            "    {} {} (area field: {}, color: {})",
            category.id, category.name, category.area_field, category.color
        );
    }

    println!("  Regions:");
    for region in &config.regions {
        println!("    {}: {}", region.name, region.cities.join(", "));
    }

    if config.schedule.run_once {
        println!("  Schedule: run once");
    } else {
        println!("  Schedule: daily at {}", config.schedule.times.join(", "));
    }

    println!("  Database: {}", config.database.sqlite_path.display());
    println!("  Reports: {}", config.reports.output_dir.display());

    let email = &config.email;
    if email.sender.is_empty() || email.recipient.is_empty() {
        println!("  Email: disabled (sender or recipient not set)");
    } else {
        println!(
            "  Email: {} -> {} via {}:{}",
            email.sender, email.recipient, email.smtp_server, email.smtp_port
        );
    }

    Ok(())
}
