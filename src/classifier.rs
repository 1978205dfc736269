//! Partition of parser output into sales and error records

use crate::models::{InvalidSale, ParsedMessage, ValidSale};

/// Parsed messages split by outcome, each list in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedResults {
    pub sales: Vec<ValidSale>,
    pub errors: Vec<InvalidSale>,
}

impl ClassifiedResults {
    pub fn len(&self) -> usize {
        self.sales.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty() && self.errors.is_empty()
    }
}

/// Split records into valid sales and error records in one left-to-right pass
pub fn classify<I>(records: I) -> ClassifiedResults
where
    I: IntoIterator<Item = ParsedMessage>,
{
    records
        .into_iter()
        .fold(ClassifiedResults::default(), |mut acc, record| {
            match record {
                ParsedMessage::Valid(sale) => acc.sales.push(sale),
                ParsedMessage::Invalid(error) => acc.errors.push(error),
            }
            acc
        })
}
