use {
    super::error::OrderError,
    super::money::MoneyAmount,
    serde::{Deserialize, Serialize},
};

/// One purchased product, frozen at checkout time. Later catalog edits
/// never reach an order through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_ref: String,
    pub name: String,
    #[serde(alias = "qty")]
    pub quantity: u32,
    #[serde(default)]
    pub size: String,
    #[serde(alias = "price")]
    pub unit_price: MoneyAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> Option<MoneyAmount> {
        self.unit_price.checked_mul(self.quantity)
    }

    fn validate(&self, index: usize) -> Result<(), OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::Validation(format!(
                "item {index}: quantity must be at least 1"
            )));
        }
        if self.product_ref.trim().is_empty() {
            return Err(OrderError::Validation(format!(
                "item {index}: missing product reference"
            )));
        }
        Ok(())
    }
}

/// The buyer's pending selections as read once at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<LineItem>,
}

impl CartSnapshot {
    pub fn new(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Server-side total: Σ unit_price × quantity. Rejects empty carts,
    /// malformed items and overflow.
    pub fn total(&self) -> Result<MoneyAmount, OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::Validation("cart is empty".into()));
        }
        let mut total = MoneyAmount::ZERO;
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index)?;
            total = item
                .line_total()
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| OrderError::Validation("cart total overflows".into()))?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, quantity: u32) -> LineItem {
        LineItem {
            product_ref: "prod_1".into(),
            name: "Tee".into(),
            quantity,
            size: "M".into(),
            unit_price: MoneyAmount::new(price).unwrap(),
            image_ref: None,
        }
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let cart = CartSnapshot::new(vec![item(500, 2), item(300, 1)]);
        assert_eq!(cart.total().unwrap().minor(), 1300);
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert!(matches!(
            CartSnapshot::default().total(),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let cart = CartSnapshot::new(vec![item(500, 0)]);
        assert!(cart.total().is_err());
    }

    #[test]
    fn accepts_short_field_aliases() {
        let parsed: LineItem = serde_json::from_str(
            r#"{"productRef":"p1","name":"Cap","qty":3,"price":250}"#,
        )
        .unwrap();
        assert_eq!(parsed.line_total().unwrap().minor(), 750);
        assert_eq!(parsed.size, "");
    }
}
