//! Summary tables computed from the loaded datasets.
//!
//! Revenue is always `quantity × price`: sales are joined to products for
//! the per-product figures and orders are joined to products for the
//! per-date and per-customer figures. Cells that are null or not numeric add
//! nothing to a sum, and rows without a group key are left out of the group.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    dataset::Datasets,
    table::{Row, Table, Value},
    BatchError,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub product_name: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRevenue {
    pub order_date: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopSeller {
    pub product_name: String,
    pub quantity_sold: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Segment {
    High,
    Medium,
    Low,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::High, Segment::Medium, Segment::Low];

    /// Name printed on the pie chart and in the report rows.
    pub fn label(&self) -> &'static str {
        match self {
            Segment::High => "High Value",
            Segment::Medium => "Medium Value",
            Segment::Low => "Low Value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customer_count: usize,
    pub revenue: f64,
}

/// Lower revenue bounds of the high and medium segments, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            high: 1000.0,
            medium: 250.0,
        }
    }
}

impl SegmentThresholds {
    /// Both thresholds are inclusive lower bounds.
    pub fn classify(&self, revenue: f64) -> Segment {
        if revenue >= self.high {
            Segment::High
        } else if revenue >= self.medium {
            Segment::Medium
        } else {
            Segment::Low
        }
    }
}

/// Everything the report shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    /// Sorted by product name.
    pub revenue_by_product: Vec<ProductRevenue>,
    pub total_revenue: f64,
    /// Sorted by order date.
    pub revenue_by_date: Vec<DateRevenue>,
    /// Highest quantity first.
    pub top_selling: Vec<TopSeller>,
    /// One entry per segment, high to low.
    pub segments: Vec<SegmentSummary>,
}

/// Joins orders with their customer and product columns.
pub fn merge(datasets: &Datasets) -> Result<Table, BatchError> {
    let merged = datasets
        .orders
        .left_join(&datasets.customers, "customer_id")?
        .left_join(&datasets.products, "product_id")?;
    info!(
        "Merged {} orders into {} columns",
        merged.len(),
        merged.columns().len()
    );
    Ok(merged)
}

/// Computes the [`SalesSummary`] of a set of datasets.
pub struct Aggregator {
    top_n: usize,
    thresholds: SegmentThresholds,
}

impl Aggregator {
    /// Sales are joined with products for revenue and top sellers; orders
    /// are joined with products for revenue by date and per customer.
    ///
    /// # Errors
    /// `BatchError::Schema` when a required column is missing.
    pub fn summarize(&self, datasets: &Datasets) -> Result<SalesSummary, BatchError> {
        let sales = datasets.sales.left_join(&datasets.products, "product_id")?;
        let orders = datasets.orders.left_join(&datasets.products, "product_id")?;

        let name = sales.require_column("product_name")?;
        let sold = sales.require_column("quantity_sold")?;
        let price = sales.require_column("price")?;

        let mut by_product: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        let mut total_revenue = 0.0;
        for row in sales.rows() {
            let revenue = revenue(row, sold, price);
            total_revenue += revenue;
            if let Some(product) = row.get(name).key() {
                let entry = by_product.entry(product).or_insert((0.0, 0.0));
                entry.0 += row.get(sold).as_f64().unwrap_or(0.0);
                entry.1 += revenue;
            }
        }

        let revenue_by_product = by_product
            .iter()
            .map(|(product_name, (_, revenue))| ProductRevenue {
                product_name: product_name.clone(),
                revenue: *revenue,
            })
            .collect();

        let mut top_selling: Vec<TopSeller> = by_product
            .into_iter()
            .map(|(product_name, (quantity_sold, revenue))| TopSeller {
                product_name,
                quantity_sold,
                revenue,
            })
            .collect();
        top_selling.sort_by(|a, b| b.quantity_sold.total_cmp(&a.quantity_sold));
        top_selling.truncate(self.top_n);

        let summary = SalesSummary {
            revenue_by_product,
            total_revenue,
            revenue_by_date: self.revenue_by_date(&orders)?,
            top_selling,
            segments: self.segments(&datasets.customers, &orders)?,
        };

        debug!(
            "Summary: {} products, {} order dates, total revenue {:.2}",
            summary.revenue_by_product.len(),
            summary.revenue_by_date.len(),
            summary.total_revenue
        );
        Ok(summary)
    }

    fn revenue_by_date(&self, orders: &Table) -> Result<Vec<DateRevenue>, BatchError> {
        let date = orders.require_column("order_date")?;
        let quantity = orders.require_column("quantity")?;
        let price = orders.require_column("price")?;

        let mut groups: Vec<(Value, f64)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for row in orders.rows() {
            let Some(key) = row.get(date).key() else {
                continue;
            };
            let position = *positions.entry(key).or_insert_with(|| {
                groups.push((row.get(date).clone(), 0.0));
                groups.len() - 1
            });
            groups[position].1 += revenue(row, quantity, price);
        }

        groups.sort_by(|(a, _), (b, _)| a.compare(b));
        Ok(groups
            .into_iter()
            .map(|(order_date, revenue)| DateRevenue {
                order_date: order_date.to_string(),
                revenue,
            })
            .collect())
    }

    /// Revenue per customer, then customers and revenue per segment.
    ///
    /// Customers without orders count towards the lowest segment; orders
    /// placed under an unknown customer id are still attributed to that id.
    fn segments(
        &self,
        customers: &Table,
        orders: &Table,
    ) -> Result<Vec<SegmentSummary>, BatchError> {
        let customer = orders.require_column("customer_id")?;
        let quantity = orders.require_column("quantity")?;
        let price = orders.require_column("price")?;

        let mut per_customer: HashMap<String, f64> = customers
            .values("customer_id")?
            .filter_map(Value::key)
            .map(|key| (key, 0.0))
            .collect();
        for row in orders.rows() {
            if let Some(key) = row.get(customer).key() {
                *per_customer.entry(key).or_insert(0.0) += revenue(row, quantity, price);
            }
        }

        let mut segments: Vec<SegmentSummary> = Segment::ALL
            .iter()
            .map(|segment| SegmentSummary {
                segment: *segment,
                customer_count: 0,
                revenue: 0.0,
            })
            .collect();
        for revenue in per_customer.values() {
            let segment = self.thresholds.classify(*revenue);
            if let Some(summary) = segments.iter_mut().find(|s| s.segment == segment) {
                summary.customer_count += 1;
                summary.revenue += revenue;
            }
        }

        Ok(segments)
    }
}

fn revenue(row: &Row, quantity: usize, price: usize) -> f64 {
    match (row.get(quantity).as_f64(), row.get(price).as_f64()) {
        (Some(quantity), Some(price)) => quantity * price,
        _ => 0.0,
    }
}

#[derive(Default)]
pub struct AggregatorBuilder {
    top_n: Option<usize>,
    thresholds: SegmentThresholds,
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of products kept in the top sellers. Defaults to 5.
    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    /// Revenue bounds of the High and Medium segments.
    pub fn thresholds(mut self, thresholds: SegmentThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn build(self) -> Aggregator {
        Aggregator {
            top_n: self.top_n.unwrap_or(5),
            thresholds: self.thresholds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::csv::csv_reader::CsvTableReaderBuilder;

    fn load(name: &str, csv: &str) -> Table {
        CsvTableReaderBuilder::new()
            .read_reader(name, csv.as_bytes())
            .unwrap()
    }

    fn datasets() -> Datasets {
        Datasets {
            customers: load(
                "customers",
                "customer_id,name,email\n1,Ada,ada@example.com\n2,Grace,grace@example.com\n3,Linus,linus@example.com\n",
            ),
            orders: load(
                "orders",
                "order_id,customer_id,product_id,quantity,order_date\n\
                 10,1,1,40,2025-01-02\n\
                 11,2,2,4,2025-01-01\n\
                 12,1,2,2,2025-01-02\n\
                 13,2,1,10,2025-01-03\n",
            ),
            products: load(
                "products",
                "product_id,product_name,price\n1,Lamp,25\n2,Pen,1.5\n3,Desk,120\n",
            ),
            sales: load(
                "sales",
                "sale_id,product_id,quantity_sold,sale_date\n\
                 100,1,3,2025-01-02\n\
                 101,2,10,2025-01-02\n\
                 102,3,1,2025-01-03\n\
                 103,1,2,2025-01-04\n\
                 104,9,5,2025-01-04\n",
            ),
        }
    }

    #[test]
    fn revenue_by_product_is_sorted_by_name() {
        let summary = AggregatorBuilder::new().build().summarize(&datasets()).unwrap();

        assert_eq!(
            summary.revenue_by_product,
            vec![
                ProductRevenue {
                    product_name: "Desk".to_string(),
                    revenue: 120.0
                },
                ProductRevenue {
                    product_name: "Lamp".to_string(),
                    revenue: 125.0
                },
                ProductRevenue {
                    product_name: "Pen".to_string(),
                    revenue: 15.0
                },
            ]
        );
        // the sale of unknown product 9 has no price and adds nothing
        assert_eq!(summary.total_revenue, 260.0);
    }

    #[test]
    fn revenue_by_date_uses_orders_and_sorts_by_date() {
        let summary = AggregatorBuilder::new().build().summarize(&datasets()).unwrap();

        let dates: Vec<(&str, f64)> = summary
            .revenue_by_date
            .iter()
            .map(|d| (d.order_date.as_str(), d.revenue))
            .collect();
        assert_eq!(
            dates,
            vec![
                ("2025-01-01", 6.0),
                ("2025-01-02", 1003.0),
                ("2025-01-03", 250.0)
            ]
        );
    }

    #[test]
    fn top_sellers_are_ordered_by_quantity_and_truncated() {
        let summary = AggregatorBuilder::new()
            .top_n(2)
            .build()
            .summarize(&datasets())
            .unwrap();

        let names: Vec<&str> = summary
            .top_selling
            .iter()
            .map(|t| t.product_name.as_str())
            .collect();
        assert_eq!(names, vec!["Pen", "Lamp"]);
        assert_eq!(summary.top_selling[1].quantity_sold, 5.0);
        assert_eq!(summary.top_selling[1].revenue, 125.0);
    }

    #[test]
    fn customers_are_bucketed_by_revenue() {
        let summary = AggregatorBuilder::new()
            .thresholds(SegmentThresholds {
                high: 1000.0,
                medium: 100.0,
            })
            .build()
            .summarize(&datasets())
            .unwrap();

        // Ada 40*25 + 2*1.5 = 1003, Grace 4*1.5 + 10*25 = 256, Linus 0
        assert_eq!(
            summary.segments,
            vec![
                SegmentSummary {
                    segment: Segment::High,
                    customer_count: 1,
                    revenue: 1003.0
                },
                SegmentSummary {
                    segment: Segment::Medium,
                    customer_count: 1,
                    revenue: 256.0
                },
                SegmentSummary {
                    segment: Segment::Low,
                    customer_count: 1,
                    revenue: 0.0
                },
            ]
        );
    }

    #[test]
    fn merge_appends_customer_and_product_columns() {
        let merged = merge(&datasets()).unwrap();

        assert_eq!(
            merged.column_names(),
            vec![
                "order_id",
                "customer_id",
                "product_id",
                "quantity",
                "order_date",
                "name",
                "email",
                "product_name",
                "price"
            ]
        );
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.rows()[1].get(5), &Value::Text("Grace".to_string()));
    }

    #[test]
    fn missing_price_column_is_a_schema_error() {
        let mut data = datasets();
        data.products = load("products", "product_id,product_name\n1,Lamp\n");

        let result = AggregatorBuilder::new().build().summarize(&data);

        assert!(matches!(result, Err(BatchError::Schema(_))));
    }

    #[test]
    fn thresholds_are_inclusive() {
        let thresholds = SegmentThresholds::default();

        assert_eq!(thresholds.classify(1000.0), Segment::High);
        assert_eq!(thresholds.classify(999.99), Segment::Medium);
        assert_eq!(thresholds.classify(250.0), Segment::Medium);
        assert_eq!(thresholds.classify(0.0), Segment::Low);
    }
}
