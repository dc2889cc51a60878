//! Result view shaping for the success screen

use serde::Serialize;
use std::fmt;
use upload_client::{ProductDetails, SubmissionMetadata, UploadResult};

/// Shown when the service did not return a record id
pub const MISSING_DOCUMENT_ID: &str = "N/A";

/// Labelled value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

/// One product with only the fields the service filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCard {
    pub name: String,
    pub fields: Vec<Field>,
}

/// Read-only view of an upload result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub document_id: String,
    pub user: Vec<Field>,
    pub product_count: usize,
    pub products: Vec<ProductCard>,
}

impl ResultView {
    /// Shape `result` for display alongside the submitter identity
    pub fn new(result: &UploadResult, metadata: &SubmissionMetadata) -> Self {
        let products: Vec<ProductCard> = result
            .products()
            .map(|(name, details)| ProductCard {
                name: name.to_string(),
                fields: product_fields(details),
            })
            .collect();

        Self {
            document_id: result
                .inserted_id
                .clone()
                .unwrap_or_else(|| MISSING_DOCUMENT_ID.to_string()),
            user: vec![
                field("User ID", &metadata.user_id),
                field("User Name", &metadata.user_name),
                field("Pick-up Location", &metadata.pick_up_location),
            ],
            product_count: products.len(),
            products,
        }
    }
}

fn field(label: &'static str, value: &str) -> Field {
    Field {
        label,
        value: value.to_string(),
    }
}

fn product_fields(details: &ProductDetails) -> Vec<Field> {
    [
        ("Qty", &details.quantity),
        ("Price", &details.price),
        ("Pick-up Time", &details.pick_up_time),
        ("Drop-off Time", &details.drop_off_time),
        ("Pick-up", &details.pick_up_location),
        ("Drop-off", &details.drop_off_location),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_deref().map(|value| field(label, value)))
    .collect()
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Upload Successful!")?;
        writeln!(f)?;
        writeln!(f, "User Information")?;
        for row in &self.user {
            writeln!(f, "  {:<18}{}", row.label, row.value)?;
        }
        writeln!(f, "  {:<18}{}", "Document ID", self.document_id)?;
        writeln!(f)?;
        writeln!(f, "Products ({})", self.product_count)?;
        for card in &self.products {
            writeln!(f, "  {}", card.name)?;
            for row in &card.fields {
                writeln!(f, "    {:<16}{}", row.label, row.value)?;
            }
        }
        Ok(())
    }
}
