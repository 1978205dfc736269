//! Ticket totals and selection of the sale to report

use crate::models::{AggregateReport, ValidSale};

/// Sum of ticket counts over all sales
pub fn total_tickets(sales: &[ValidSale]) -> u64 {
    sales.iter().map(|sale| u64::from(sale.ticket_count)).sum()
}

/// Build the report for a batch of sales.
///
/// The representative sale is the first one in retrieval order, not the newest
/// by date. An empty batch produces no report at all.
pub fn aggregate(sales: &[ValidSale]) -> Option<AggregateReport> {
    let representative_sale = sales.first()?.clone();
    Some(AggregateReport {
        total_tickets_sold: total_tickets(sales),
        representative_sale,
    })
}
