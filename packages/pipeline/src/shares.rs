//! Share of observations per category.

use std::path::PathBuf;

use power_map_analytics::{CategoryShare, category_shares};
use power_map_consumption::{read_records, write_table};

use crate::PipelineError;

/// Inputs and outputs of the category shares use case.
#[derive(Debug, Clone)]
pub struct SharesOptions {
    /// Any consumption CSV.
    pub input: PathBuf,
    /// Field delimiter of `input`.
    pub delimiter: u8,
    /// CSV of per-category shares.
    pub output: PathBuf,
}

/// Counts observations per category and writes the shares table.
///
/// # Errors
///
/// * If the input cannot be read
/// * If the output cannot be written
pub fn run(options: &SharesOptions) -> Result<Vec<CategoryShare>, PipelineError> {
    let records = read_records(&options.input, options.delimiter)?;
    let shares = category_shares(&records);

    for share in &shares {
        log::info!(
            "{}: {} observations ({:.2}%)",
            share.category,
            share.count,
            share.percent
        );
    }

    write_table(&options.output, &shares)?;
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use power_map_consumption::{COMMA, write_enriched_records};

    use super::*;
    use crate::test_support::record;

    #[test]
    fn writes_shares_largest_first() {
        let dir = std::env::temp_dir().join(format!("power_map_shares_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let input = dir.join("records.csv");
        write_enriched_records(
            &input,
            &[
                record("A", "Ladestasjoner", (2019, 1, 1), Some(1.0), None),
                record("B", "Belysning", (2019, 1, 1), Some(1.0), None),
                record("C", "Belysning", (2019, 1, 1), None, None),
                record("D", "Belysning", (2019, 1, 1), Some(2.0), None),
            ],
        )
        .unwrap();

        let options = SharesOptions {
            input,
            delimiter: COMMA,
            output: dir.join("shares.csv"),
        };
        let shares = run(&options).unwrap();

        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].category, "Belysning");
        assert!((shares[0].percent - 75.0).abs() < 1e-9);

        let written = std::fs::read_to_string(&options.output).unwrap();
        assert!(written.starts_with("category,count,percent\n"));
        assert!(written.contains("Ladestasjoner,1,25.0"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
