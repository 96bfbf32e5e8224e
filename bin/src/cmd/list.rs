//! Factor class listing command implementation.

use super::banner;
use anyhow::Result;
use huelva::factors::FactorCategory;
use huelva::factors::registry::factors_by_category;

const CATEGORIES: [(FactorCategory, &str); 6] = [
    (FactorCategory::Price, "Price"),
    (FactorCategory::TermStructure, "Term structure"),
    (FactorCategory::Intraday, "Intraday"),
    (FactorCategory::Correlation, "Correlation"),
    (FactorCategory::Positioning, "Positioning"),
    (FactorCategory::Market, "Market"),
];

/// List registered factor classes, optionally filtered by category.
pub(crate) fn list_factors(category: Option<&str>, verbose: bool) -> Result<()> {
    banner("Factor Classes");

    for (cat, cat_name) in CATEGORIES {
        if let Some(filter) = category
            && !cat_name.to_lowercase().contains(&filter.to_lowercase())
        {
            continue;
        }

        let infos = factors_by_category(&cat);
        if infos.is_empty() {
            continue;
        }

        println!("{} - {}", cat_name, cat.description());
        println!("{}", "-".repeat(60));

        for info in infos {
            if verbose {
                let shape = if info.uses_lambdas { "wins + lbds" } else { "wins" };
                println!(
                    "  {:10} {} ({shape}, lookback: {} sessions)",
                    info.class.as_str(),
                    info.description,
                    info.typical_lookback
                );
            } else {
                println!("  {}", info.class.as_str());
            }
        }
        println!();
    }

    if !verbose {
        println!("Use --verbose for descriptions and group shapes.\n");
    }

    Ok(())
}
